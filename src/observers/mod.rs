//! # Snapshot observers.
//!
//! This module provides the [`Observe`] trait — the subscriber callback
//! contract — and convenience implementations.
//!
//! ## Contract
//! - Observers are invoked synchronously from inside a pass, one at a time,
//!   in stable ring order.
//! - An observer may submit new snapshots, register further subscribers, or
//!   revoke subscriptions; the scheduler pauses and resumes around such
//!   nested work.
//! - A panicking observer is isolated: the pass continues and the panic
//!   surfaces later through the scheduler's fault sink.
//!
//! ## Implementing a custom observer
//! ```
//! use std::rc::Rc;
//! use fanring::Observe;
//!
//! struct Renders;
//!
//! impl Observe<u32> for Renders {
//!     fn on_snapshot(&self, snapshot: &Rc<u32>) {
//!         // re-render from *snapshot...
//!         let _ = snapshot;
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "renders"
//!     }
//! }
//! ```

mod fn_observer;
mod observe;

pub use fn_observer::FnObserver;
pub use observe::Observe;

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogWriter;

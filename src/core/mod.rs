//! Scheduler core: intake, traversal, reentrancy, and fault isolation.
//!
//! The only state-bearing type here is [`Scheduler`]; everything else is the
//! machinery it is assembled from.
//!
//! Internal modules:
//! - [`scheduler`]: the instance itself — intake, the traversal loop, pause
//!   and resume;
//! - [`guard`]: the reentrancy coordinator (working flag + nested latch);
//! - [`faults`]: per-node panic capture and asynchronous re-raise;
//! - [`subscription`]: the collaborator-facing capability handle;
//! - [`builder`], [`config`]: assembly and settings.

mod builder;
mod config;
mod faults;
mod guard;
mod scheduler;
mod subscription;

pub use builder::SchedulerBuilder;
pub use config::Config;
pub use faults::{CollectSink, FaultSink, PanicSink, PassFault};
pub use scheduler::{Scheduler, UpdateScope, WeakScheduler};
pub use subscription::Subscription;

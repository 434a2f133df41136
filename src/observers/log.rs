//! # Simple logging observer for debugging and demos.
//!
//! [`LogWriter`] prints each snapshot it observes to stdout in a
//! human-readable format.
//!
//! ## Output format
//! ```text
//! [snapshot] 42
//! ```

use std::fmt;
use std::rc::Rc;

use super::observe::Observe;

/// Simple stdout logging observer.
///
/// Enabled via the `logging` feature. Prints every delivered snapshot for
/// debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Observe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

impl<S: fmt::Debug + 'static> Observe<S> for LogWriter {
    fn on_snapshot(&self, snapshot: &Rc<S>) {
        println!("[snapshot] {:?}", snapshot);
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}

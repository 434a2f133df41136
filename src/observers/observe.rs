//! Core observer trait.

use std::rc::Rc;

/// Contract for subscriber callbacks.
///
/// Called from inside a pass on the scheduler's thread. Implementations
/// should be quick; a stalled observer stalls the pass (there is no
/// timeout).
pub trait Observe<S> {
    /// Handles one snapshot.
    ///
    /// Invoked only when the snapshot differs (by identity) from the last
    /// one this subscriber observed.
    fn on_snapshot(&self, snapshot: &Rc<S>);

    /// Human-readable name (for logs/diagnostics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

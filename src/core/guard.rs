//! # Reentrancy coordinator.
//!
//! A depth-counted "working" flag plus a nested-work latch. A frame is any
//! synchronous update attributable to a node: a callback invocation driven by
//! the scheduler loop, or an external update bracketed by
//! [`UpdateScope`](crate::UpdateScope). While any frame is on the stack,
//! snapshot intake latches `nested`; the outermost frame exit reports it, and
//! the loop pauses itself instead of iterating over a ring the nested work
//! may have changed.

use std::cell::Cell;

pub(crate) struct Reentry {
    depth: Cell<u32>,
    nested: Cell<bool>,
}

impl Reentry {
    pub(crate) fn new() -> Self {
        Self {
            depth: Cell::new(0),
            nested: Cell::new(false),
        }
    }

    /// Enters a working frame.
    pub(crate) fn enter(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    /// Leaves a working frame. Returns the nested-work latch (cleared) when
    /// this was the outermost frame, `false` otherwise.
    pub(crate) fn leave(&self) -> bool {
        let depth = self
            .depth
            .get()
            .checked_sub(1)
            .expect("reentry guard left more often than entered");
        self.depth.set(depth);
        if depth == 0 {
            self.nested.take()
        } else {
            false
        }
    }

    /// True while any working frame is on the stack.
    #[inline]
    pub(crate) fn working(&self) -> bool {
        self.depth.get() > 0
    }

    /// Latches nested work, but only while a frame is on the stack; intake
    /// outside any frame needs no deferral.
    pub(crate) fn note_work(&self) {
        if self.working() {
            self.nested.set(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_outside_frame_is_not_nested() {
        let guard = Reentry::new();
        guard.note_work();
        guard.enter();
        assert!(!guard.leave());
    }

    #[test]
    fn test_work_inside_frame_reported_at_outermost_exit() {
        let guard = Reentry::new();
        guard.enter();
        guard.enter();
        guard.note_work();
        assert!(!guard.leave()); // inner frame: latch kept
        assert!(guard.working());
        assert!(guard.leave()); // outermost frame: latch reported
        assert!(!guard.working());
    }

    #[test]
    fn test_latch_clears_after_report() {
        let guard = Reentry::new();
        guard.enter();
        guard.note_work();
        assert!(guard.leave());
        guard.enter();
        assert!(!guard.leave());
    }
}

//! # Fault capture and asynchronous re-raise.
//!
//! A panicking subscriber must not abort the pass, and must not be silently
//! swallowed either. Each callback invocation runs under `catch_unwind`; the
//! captured payloads are buffered in invocation order as [`PassFault`]s and,
//! once the pass completes, re-raised one at a time as independent task-lane
//! units through the scheduler's [`FaultSink`].
//!
//! ## Sinks
//! - [`PanicSink`] (default): resumes the unwind on the draining thread,
//!   outside any caller's stack. The code that triggered the update cannot
//!   catch it; the fault surfaces to the host like any unhandled panic.
//! - [`CollectSink`]: buffers faults for the embedder to inspect. Useful in
//!   tests and in hosts that report faults through their own channel.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// One captured subscriber failure.
pub struct PassFault {
    node: u64,
    pass: u64,
    payload: Box<dyn Any + Send>,
}

impl PassFault {
    pub(crate) fn new(node: u64, pass: u64, payload: Box<dyn Any + Send>) -> Self {
        Self {
            node,
            pass,
            payload,
        }
    }

    /// Identity of the node whose callback failed.
    pub fn node(&self) -> u64 {
        self.node
    }

    /// The pass during which the failure was captured.
    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// The panic message, when the payload was a string.
    pub fn message(&self) -> Option<&str> {
        self.payload
            .downcast_ref::<&'static str>()
            .copied()
            .or_else(|| self.payload.downcast_ref::<String>().map(String::as_str))
    }

    /// Consumes the fault, yielding the raw panic payload.
    pub fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload
    }
}

impl fmt::Debug for PassFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassFault")
            .field("node", &self.node)
            .field("pass", &self.pass)
            .field("message", &self.message())
            .finish()
    }
}

/// Destination for faults drained after a pass.
pub trait FaultSink {
    /// Receives one fault. Called from a task-lane unit, never from inside a
    /// pass.
    fn raise(&self, fault: PassFault);
}

/// Default sink: re-raises the payload as an unhandled panic.
pub struct PanicSink;

impl FaultSink for PanicSink {
    fn raise(&self, fault: PassFault) {
        std::panic::resume_unwind(fault.into_payload())
    }
}

/// Buffering sink for embedders and tests.
#[derive(Default)]
pub struct CollectSink {
    faults: RefCell<Vec<PassFault>>,
}

impl CollectSink {
    pub fn rc() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Drains and returns the collected faults.
    pub fn take(&self) -> Vec<PassFault> {
        self.faults.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.faults.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.borrow().is_empty()
    }
}

impl FaultSink for CollectSink {
    fn raise(&self, fault: PassFault) {
        self.faults.borrow_mut().push(fault);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_extraction() {
        let fault = PassFault::new(1, 1, Box::new("boom"));
        assert_eq!(fault.message(), Some("boom"));

        let fault = PassFault::new(1, 1, Box::new("owned".to_string()));
        assert_eq!(fault.message(), Some("owned"));

        let fault = PassFault::new(1, 1, Box::new(42u32));
        assert_eq!(fault.message(), None);
    }

    #[test]
    fn test_collect_sink_buffers_in_order() {
        let sink = CollectSink::rc();
        sink.raise(PassFault::new(1, 1, Box::new("first")));
        sink.raise(PassFault::new(2, 1, Box::new("second")));

        let faults = sink.take();
        assert_eq!(faults.len(), 2);
        assert_eq!(faults[0].node(), 1);
        assert_eq!(faults[1].node(), 2);
        assert!(sink.is_empty());
    }
}

//! Builder for assembling a [`Scheduler`] with optional pieces.

use std::rc::Rc;

use crate::core::config::Config;
use crate::core::faults::{FaultSink, PanicSink};
use crate::core::scheduler::Scheduler;
use crate::store::Store;

/// Builder for constructing a [`Scheduler`] instance.
pub struct SchedulerBuilder<S: 'static, A: 'static = ()> {
    cfg: Config,
    sink: Option<Rc<dyn FaultSink>>,
    store: Option<Rc<dyn Store<S, A>>>,
}

impl<S: 'static, A: 'static> SchedulerBuilder<S, A> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            sink: None,
            store: None,
        }
    }

    /// Sets the destination for subscriber faults.
    ///
    /// Defaults to [`PanicSink`], which re-raises each fault as an unhandled
    /// panic once the pass that captured it has completed.
    pub fn with_fault_sink(mut self, sink: Rc<dyn FaultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attaches a state container during construction.
    ///
    /// Equivalent to calling [`Scheduler::attach_store`] on the built
    /// instance (including the initial snapshot submission).
    pub fn with_store(mut self, store: Rc<dyn Store<S, A>>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the scheduler.
    pub fn build(self) -> Scheduler<S, A> {
        let sink = self.sink.unwrap_or_else(|| Rc::new(PanicSink));
        let sched = Scheduler::assemble(self.cfg, sink);
        if let Some(store) = self.store {
            sched.attach_store(store);
        }
        sched
    }
}

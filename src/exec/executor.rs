//! # Two-lane deferred execution queue.
//!
//! [`Executor`] is the cooperative substitute for an ambient event loop: two
//! FIFO lanes of boxed closures, drained on the caller's thread by
//! [`Executor::run_until_idle`].
//!
//! ## Lanes
//! ```text
//!   push_micro(job) ──► [micro lane] ── drained fully before every task unit
//!   push_task(job)  ──► [task lane]  ── one unit per iteration, then micro again
//! ```
//!
//! The micro lane carries pass continuations (a paused traversal resuming
//! after a nested update frame unwinds). The task lane carries pass starts
//! and fault re-raises. Draining order reproduces the usual immediate-yield /
//! timer-queue distinction: before each task unit runs, every queued micro
//! unit (including ones queued by micro units themselves) has already run.
//!
//! ## Rules
//! - **Non-blocking push**: `push_micro`/`push_task` enqueue and return.
//! - **FIFO per lane**: units in the same lane run in push order.
//! - **Single drainer**: `run_until_idle` is not reentrant; a nested call
//!   (e.g. from inside a subscriber callback) is a warned no-op.
//! - **No threads, no timers**: work runs only while the host is draining.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use tracing::warn;

/// A single unit of deferred work.
pub(crate) type Job = Box<dyn FnOnce()>;

/// Two-lane FIFO queue of deferred work, drained cooperatively.
pub(crate) struct Executor {
    micro: RefCell<VecDeque<Job>>,
    tasks: RefCell<VecDeque<Job>>,
    draining: Cell<bool>,
}

impl Executor {
    pub(crate) fn new() -> Self {
        Self {
            micro: RefCell::new(VecDeque::new()),
            tasks: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
        }
    }

    /// Enqueues a unit on the micro lane (runs before any task-lane unit).
    pub(crate) fn push_micro(&self, job: Job) {
        self.micro.borrow_mut().push_back(job);
    }

    /// Enqueues a unit on the task lane.
    pub(crate) fn push_task(&self, job: Job) {
        self.tasks.borrow_mut().push_back(job);
    }

    /// True when both lanes are empty.
    pub(crate) fn is_idle(&self) -> bool {
        self.micro.borrow().is_empty() && self.tasks.borrow().is_empty()
    }

    /// Drains both lanes until idle.
    ///
    /// Units may enqueue further units while running; those are honored in
    /// the same drain. The queue borrow is released before a unit runs, so
    /// jobs are free to push into either lane. The drain flag is restored
    /// even when a unit unwinds (a fault sink re-raising counts on that).
    pub(crate) fn run_until_idle(&self) {
        if self.draining.replace(true) {
            warn!("run_until_idle called re-entrantly; ignored");
            return;
        }
        let _reset = DrainReset(&self.draining);
        loop {
            let job = self.micro.borrow_mut().pop_front();
            if let Some(job) = job {
                job();
                continue;
            }
            let job = self.tasks.borrow_mut().pop_front();
            match job {
                Some(job) => job(),
                None => break,
            }
        }
    }
}

/// Clears the drain flag on scope exit, unwinding included.
struct DrainReset<'a>(&'a Cell<bool>);

impl Drop for DrainReset<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

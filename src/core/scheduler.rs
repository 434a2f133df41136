//! # Scheduler: snapshot intake, ring traversal, and fault isolation.
//!
//! The [`Scheduler`] owns the subscriber ring, the pending-snapshot buffer,
//! the reentrancy guard, the two-lane executor, and the fault machinery. It
//! is an explicit instance: construct as many independent schedulers as
//! needed and hand out clones of the handle.
//!
//! ## High-level architecture
//! ```text
//! submit(snapshot) ──► [pending buffer] ──► task lane: start_pass()
//!                                               │ coalesce: keep latest, drop rest
//!                                               ▼
//!                                     ring.current = snapshot
//!                                               │ ring non-empty
//!                                               ▼
//!                  ┌──────────── traversal (advance) ────────────┐
//!                  │ due = cursor.next                           │
//!                  │   revoked?  ──► reap, continue              │
//!                  │   stamped current? ──► skip, advance        │
//!                  │   live + behind ──► invoke under isolation  │
//!                  │       ok: stamp; always: advance            │
//!                  │   nested work latched? ──► pause:           │
//!                  │       micro lane: resume() from cursor      │
//!                  │   cursor == tail ──► finish_pass()          │
//!                  └──────────────────────────────────────────────┘
//!                                               │
//!                     faults ──► task lane ──► FaultSink (one unit each)
//!                     pending non-empty ──► task lane: start_pass()
//! ```
//!
//! ## Rules
//! - At most one logical pass is active; a pass starts only after the
//!   previous one (and all its deferred continuations) fully completed.
//! - A paused pass resumes from the saved cursor; nothing is re-scanned and
//!   no node is skipped or double-visited.
//! - Coalescing is last-write-wins: superseded pending snapshots are
//!   discarded, eventual consistency is guaranteed, per-snapshot delivery is
//!   not.
//! - A subscriber panic never reaches the code that triggered the update; it
//!   surfaces through the [`FaultSink`] after the pass.

use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::core::builder::SchedulerBuilder;
use crate::core::config::Config;
use crate::core::faults::{FaultSink, PassFault};
use crate::core::guard::Reentry;
use crate::core::subscription::Subscription;
use crate::error::SchedulerError;
use crate::exec::Executor;
use crate::observers::Observe;
use crate::ring::{NodeKey, Reap, Ring, Watch};
use crate::store::Store;

/// Shared scheduler state behind the public handles.
pub(crate) struct Core<S: 'static, A: 'static> {
    cfg: Config,
    ring: RefCell<Ring<S>>,
    pending: RefCell<Vec<Rc<S>>>,
    reentry: Reentry,
    in_pass: Cell<bool>,
    passes: Cell<u64>,
    exec: Executor,
    faults: RefCell<Vec<PassFault>>,
    sink: Rc<dyn FaultSink>,
    store: RefCell<Option<Rc<dyn Store<S, A>>>>,
}

/// Outcome of scanning the ring for the next unit of traversal work.
enum Step<S: 'static> {
    /// A live, behind node is due: invoke it.
    Invoke {
        index: u32,
        node: u64,
        watch: Rc<dyn Observe<S>>,
        snapshot: Rc<S>,
    },
    /// The lap is complete (or the ring emptied).
    Done,
}

/// Cooperative update-propagation scheduler.
///
/// Fans submitted snapshots out to registered subscribers in stable ring
/// order, delivering each accepted snapshot to every live subscriber exactly
/// once. Cheap to clone; clones share the same instance.
///
/// The scheduler is single-threaded by construction (`!Send`); all entry
/// points must be called from the owning thread.
///
/// ## Example
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use fanring::{Config, FnObserver, Scheduler};
///
/// let sched: Scheduler<u32> = Scheduler::new(Config::default());
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let log = Rc::clone(&seen);
/// let sub = sched.subscribe(FnObserver::rc("collector", move |snap: &Rc<u32>| {
///     log.borrow_mut().push(**snap);
/// }));
///
/// sched.submit(Rc::new(1));
/// sched.run_until_idle();
/// assert_eq!(seen.borrow().as_slice(), &[1]);
///
/// sub.revoke();
/// ```
pub struct Scheduler<S: 'static, A: 'static = ()> {
    core: Rc<Core<S, A>>,
}

impl<S: 'static, A: 'static> Clone for Scheduler<S, A> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

/// Non-owning scheduler handle.
///
/// Subscriber callbacks and stores that need to reach back into their
/// scheduler should hold one of these instead of a [`Scheduler`]; a strong
/// handle inside the ring would keep the instance alive forever.
pub struct WeakScheduler<S: 'static, A: 'static = ()> {
    core: Weak<Core<S, A>>,
}

impl<S: 'static, A: 'static> Clone for WeakScheduler<S, A> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
        }
    }
}

impl<S: 'static, A: 'static> WeakScheduler<S, A> {
    pub fn upgrade(&self) -> Option<Scheduler<S, A>> {
        self.core.upgrade().map(|core| Scheduler { core })
    }
}

impl<S: 'static, A: 'static> Scheduler<S, A> {
    /// Creates a scheduler with the default fault sink
    /// ([`PanicSink`](crate::PanicSink)).
    pub fn new(cfg: Config) -> Self {
        Self::builder(cfg).build()
    }

    /// Returns a builder for assembling a scheduler with a custom fault sink
    /// or a pre-attached store.
    pub fn builder(cfg: Config) -> SchedulerBuilder<S, A> {
        SchedulerBuilder::new(cfg)
    }

    pub(crate) fn assemble(cfg: Config, sink: Rc<dyn FaultSink>) -> Self {
        let slots = cfg.slots;
        Self {
            core: Rc::new(Core {
                cfg,
                ring: RefCell::new(Ring::with_capacity(slots)),
                pending: RefCell::new(Vec::new()),
                reentry: Reentry::new(),
                in_pass: Cell::new(false),
                passes: Cell::new(0),
                exec: Executor::new(),
                faults: RefCell::new(Vec::new()),
                sink,
                store: RefCell::new(None),
            }),
        }
    }

    // ---------------------------
    // Registration
    // ---------------------------

    /// Registers a subscriber at the ring's tail.
    ///
    /// The subscriber's last-seen stamp is initialized to the current
    /// snapshot, so it is not invoked for a snapshot that predates its
    /// registration. Tear the subscriber down with
    /// [`Subscription::revoke`]; dropping the handle alone leaves the node
    /// registered.
    pub fn subscribe(&self, observer: Rc<dyn Observe<S>>) -> Subscription<S, A> {
        let key = self.core.ring.borrow_mut().append(observer);
        trace!(node = key.id(), "subscriber registered");
        Subscription::new(Rc::downgrade(&self.core), key)
    }

    // ---------------------------
    // Intake
    // ---------------------------

    /// Accepts a new snapshot for propagation.
    ///
    /// A snapshot pointer-identical to the last accepted one is ignored.
    /// Otherwise it lands in the pending buffer and a pass start is queued on
    /// the task lane, so the submitting call stack always unwinds before
    /// delivery begins. Bursts coalesce: only the most recent pending
    /// snapshot is propagated.
    pub fn submit(&self, snapshot: Rc<S>) {
        Core::submit(&self.core, snapshot);
    }

    /// Attaches the state container used by [`Scheduler::dispatch`].
    ///
    /// Idempotent: a second call is a no-op. The first call also submits the
    /// store's current state so subscribers converge on it.
    pub fn attach_store(&self, store: Rc<dyn Store<S, A>>) {
        {
            let mut slot = self.core.store.borrow_mut();
            if slot.is_some() {
                trace!("store already attached; ignored");
                return;
            }
            *slot = Some(Rc::clone(&store));
        }
        self.submit(store.state());
    }

    /// Forwards an action to the attached store.
    ///
    /// The store is expected to feed any resulting snapshot back through
    /// [`Scheduler::submit`]. Fails with [`SchedulerError::NoStore`] when no
    /// store has been attached.
    pub fn dispatch(&self, action: A) -> Result<(), SchedulerError> {
        let store = self.core.store.borrow().clone();
        match store {
            None => Err(SchedulerError::NoStore),
            Some(store) => {
                store.dispatch(action);
                Ok(())
            }
        }
    }

    // ---------------------------
    // Driving
    // ---------------------------

    /// Drains the deferred-work lanes until idle.
    ///
    /// This is where passes actually run; the host calls it after submitting
    /// or dispatching (or from its own loop tick). Calling it from inside a
    /// subscriber callback is a warned no-op.
    pub fn run_until_idle(&self) {
        self.core.exec.run_until_idle();
    }

    /// True when no deferred work is queued.
    pub fn is_idle(&self) -> bool {
        self.core.exec.is_idle()
    }

    /// Brackets a synchronous update performed outside the scheduler loop,
    /// attributable to the given subscription.
    ///
    /// While the returned scope is alive the scheduler is "working": a pass
    /// will not start, and snapshots submitted inside the scope are treated
    /// as nested work. Dropping the scope resumes the scheduler.
    #[must_use]
    pub fn begin_update(&self, sub: &Subscription<S, A>) -> UpdateScope<S, A> {
        self.core.reentry.enter();
        trace!(node = sub.id(), "external update started");
        UpdateScope {
            core: Rc::clone(&self.core),
            node: sub.id(),
        }
    }

    // ---------------------------
    // Diagnostics
    // ---------------------------

    /// Monotonic count of passes that began traversal.
    pub fn passes(&self) -> u64 {
        self.core.passes.get()
    }

    /// Number of ring-resident subscribers (including revoked ones not yet
    /// reaped).
    pub fn subscriber_count(&self) -> usize {
        self.core.ring.borrow().len()
    }

    /// The snapshot currently being (or last) propagated.
    pub fn current(&self) -> Option<Rc<S>> {
        self.core.ring.borrow().current()
    }

    /// Human-readable traversal order with the cursor position annotated.
    pub fn dump_ring(&self) -> String {
        self.core.ring.borrow().dump()
    }

    /// Returns a non-owning handle to this scheduler.
    pub fn downgrade(&self) -> WeakScheduler<S, A> {
        WeakScheduler {
            core: Rc::downgrade(&self.core),
        }
    }
}

/// RAII frame for an external synchronous update (see
/// [`Scheduler::begin_update`]).
pub struct UpdateScope<S: 'static, A: 'static = ()> {
    core: Rc<Core<S, A>>,
    node: u64,
}

impl<S: 'static, A: 'static> Drop for UpdateScope<S, A> {
    fn drop(&mut self) {
        let nested = self.core.reentry.leave();
        trace!(node = self.node, nested, "external update finished");
        let weak = Rc::downgrade(&self.core);
        self.core.exec.push_micro(Box::new(move || {
            if let Some(core) = weak.upgrade() {
                Core::resume(&core);
            }
        }));
    }
}

impl<S: 'static, A: 'static> Core<S, A> {
    pub(crate) fn seen(&self, key: NodeKey) -> Option<Rc<S>> {
        self.ring.borrow().seen(key)
    }

    pub(crate) fn current_snapshot(&self) -> Option<Rc<S>> {
        self.ring.borrow().current()
    }

    pub(crate) fn revoke(&self, key: NodeKey) -> bool {
        let revoked = self.ring.borrow_mut().revoke(key);
        if revoked {
            trace!(node = key.id(), "subscription revoked");
        }
        revoked
    }

    fn submit(core: &Rc<Self>, snapshot: Rc<S>) {
        if let Some(last) = core.last_accepted() {
            if Rc::ptr_eq(&last, &snapshot) {
                trace!("snapshot identical to last accepted; ignored");
                return;
            }
        }
        core.pending.borrow_mut().push(snapshot);
        core.reentry.note_work();

        let weak = Rc::downgrade(core);
        core.exec.push_task(Box::new(move || {
            if let Some(core) = weak.upgrade() {
                Core::start_pass(&core);
            }
        }));
    }

    /// Latest accepted snapshot: pending top, else the ring's current.
    fn last_accepted(&self) -> Option<Rc<S>> {
        if let Some(top) = self.pending.borrow().last() {
            return Some(Rc::clone(top));
        }
        self.ring.borrow().current()
    }

    /// Begins a pass when one can begin.
    ///
    /// No-op while working, while a pass is active, or with nothing pending.
    /// Panics if the cursor is away from the tail: that means a previous
    /// traversal never finished, which is a scheduler bug, not a recoverable
    /// condition.
    fn start_pass(core: &Rc<Self>) {
        if core.reentry.working() || core.in_pass.get() {
            return;
        }
        let next = {
            let mut pending = core.pending.borrow_mut();
            let Some(latest) = pending.pop() else { return };
            let dropped = pending.len();
            pending.clear();
            if dropped > 0 {
                debug!(dropped, "superseded pending snapshots discarded");
                if let Some(limit) = core.cfg.coalesce_warn_threshold() {
                    if dropped >= limit {
                        warn!(dropped, "pending snapshot burst exceeded threshold");
                    }
                }
            }
            latest
        };

        {
            let mut ring = core.ring.borrow_mut();
            assert!(
                ring.cursor_at_tail(),
                "pass started before the previous traversal completed"
            );
            ring.set_current(next);
            if ring.is_empty() {
                return;
            }
        }

        core.in_pass.set(true);
        core.passes.set(core.passes.get() + 1);
        trace!(pass = core.passes.get(), "pass started");
        Core::advance(core);
    }

    /// Runs the traversal from the saved cursor until the lap completes or
    /// the pass pauses on nested work.
    fn advance(core: &Rc<Self>) {
        debug_assert!(core.in_pass.get());
        loop {
            match Core::next_step(core) {
                Step::Done => {
                    Core::finish_pass(core);
                    return;
                }
                Step::Invoke {
                    index,
                    node,
                    watch,
                    snapshot,
                } => {
                    core.reentry.enter();
                    let outcome = catch_unwind(AssertUnwindSafe(|| watch.on_snapshot(&snapshot)));
                    let nested = core.reentry.leave();

                    let lap_done = {
                        let mut ring = core.ring.borrow_mut();
                        if outcome.is_ok() {
                            ring.stamp(index, snapshot);
                        }
                        // Advance regardless of outcome: a failing node is
                        // not retried within the pass.
                        ring.advance_cursor(index);
                        ring.cursor_at_tail()
                    };

                    if let Err(payload) = outcome {
                        warn!(node, pass = core.passes.get(), "subscriber panicked; isolated");
                        core.faults
                            .borrow_mut()
                            .push(PassFault::new(node, core.passes.get(), payload));
                    }

                    if lap_done {
                        Core::finish_pass(core);
                        return;
                    }
                    if nested {
                        trace!(node, "nested update detected; pass paused");
                        let weak = Rc::downgrade(core);
                        core.exec.push_micro(Box::new(move || {
                            if let Some(core) = weak.upgrade() {
                                Core::resume(&core);
                            }
                        }));
                        return;
                    }
                }
            }
        }
    }

    /// Scans from `cursor.next`, reaping revoked nodes and skipping
    /// already-current ones, until an invocable node or the end of the lap.
    fn next_step(core: &Rc<Self>) -> Step<S> {
        let mut ring = core.ring.borrow_mut();
        loop {
            let Some(index) = ring.due() else {
                return Step::Done;
            };

            if ring.watch(index).is_revoked() {
                let id = ring.node_id(index);
                match ring.reap_due() {
                    Reap::Emptied => {
                        trace!(node = id, "revoked node reaped; ring empty");
                        return Step::Done;
                    }
                    Reap::TailMoved => {
                        trace!(node = id, "revoked tail reaped; lap complete");
                        return Step::Done;
                    }
                    Reap::Spliced => {
                        trace!(node = id, "revoked node reaped");
                        continue;
                    }
                }
            }

            let snapshot = ring.current().expect("pass running without a snapshot");
            let already_current = ring
                .seen_of(index)
                .is_some_and(|seen| Rc::ptr_eq(&seen, &snapshot));
            if already_current {
                // Delivered through another path (e.g. created mid-pass);
                // stamp check only, no invocation.
                ring.advance_cursor(index);
                if ring.cursor_at_tail() {
                    return Step::Done;
                }
                continue;
            }

            let Watch::Live(watch) = ring.watch(index) else {
                unreachable!("revoked nodes are reaped above")
            };
            return Step::Invoke {
                index,
                node: ring.node_id(index),
                watch: Rc::clone(watch),
                snapshot,
            };
        }
    }

    /// Completes a pass: drains faults to the sink (one task-lane unit each)
    /// and queues the next pass when snapshots arrived meanwhile.
    fn finish_pass(core: &Rc<Self>) {
        core.in_pass.set(false);
        trace!(pass = core.passes.get(), "pass complete");

        let drained: Vec<PassFault> = core.faults.borrow_mut().drain(..).collect();
        for fault in drained {
            let sink = Rc::clone(&core.sink);
            core.exec.push_task(Box::new(move || sink.raise(fault)));
        }

        if !core.pending.borrow().is_empty() {
            let weak = Rc::downgrade(core);
            core.exec.push_task(Box::new(move || {
                if let Some(core) = weak.upgrade() {
                    Core::start_pass(&core);
                }
            }));
        }
    }

    /// Continues after a working frame unwound: picks the paused pass back
    /// up from the saved cursor, or starts a fresh one if snapshots are
    /// waiting. Idempotent; safe to schedule more than once.
    fn resume(core: &Rc<Self>) {
        if core.reentry.working() {
            return;
        }
        if core.in_pass.get() {
            trace!("pass resumed");
            Core::advance(core);
        } else {
            Core::start_pass(core);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::faults::CollectSink;
    use crate::observers::FnObserver;
    use crate::store::CellStore;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<(&'static str, u32)>>>;

    fn harness() -> (Scheduler<u32>, Rc<CollectSink>, Log) {
        let sink = CollectSink::rc();
        let sched = Scheduler::builder(Config::default())
            .with_fault_sink(sink.clone())
            .build();
        (sched, sink, Rc::new(RefCell::new(Vec::new())))
    }

    fn recorder(log: &Log, tag: &'static str) -> Rc<dyn Observe<u32>> {
        let log = Rc::clone(log);
        FnObserver::rc(tag, move |snap: &Rc<u32>| {
            log.borrow_mut().push((tag, **snap));
        })
    }

    #[test]
    fn test_full_pass_delivers_in_ring_order() {
        let (sched, _sink, log) = harness();
        let a = sched.subscribe(recorder(&log, "a"));
        let b = sched.subscribe(recorder(&log, "b"));
        let c = sched.subscribe(recorder(&log, "c"));

        let s1 = Rc::new(1);
        sched.submit(Rc::clone(&s1));
        sched.run_until_idle();

        assert_eq!(log.borrow().as_slice(), &[("a", 1), ("b", 1), ("c", 1)]);
        assert_eq!(sched.passes(), 1);
        for sub in [&a, &b, &c] {
            assert!(Rc::ptr_eq(&sub.observed().unwrap(), &s1));
            assert!(!sub.is_behind());
        }
    }

    #[test]
    fn test_subscriber_created_after_pass_not_invoked_for_seen_snapshot() {
        let (sched, _sink, log) = harness();
        sched.subscribe(recorder(&log, "a"));
        sched.submit(Rc::new(1));
        sched.run_until_idle();
        log.borrow_mut().clear();

        // Registered between passes: stamped with the current snapshot.
        let d = sched.subscribe(recorder(&log, "d"));
        assert!(!d.is_behind());
        sched.run_until_idle();
        assert!(log.borrow().is_empty());

        // Visited in the very next pass, right after the prior tail.
        sched.submit(Rc::new(2));
        sched.run_until_idle();
        assert_eq!(log.borrow().as_slice(), &[("a", 2), ("d", 2)]);
    }

    #[test]
    fn test_burst_coalesces_to_latest_snapshot() {
        let (sched, _sink, log) = harness();
        sched.subscribe(recorder(&log, "a"));

        sched.submit(Rc::new(1));
        sched.submit(Rc::new(2));
        sched.run_until_idle();

        // The first snapshot is never delivered to anyone.
        assert_eq!(log.borrow().as_slice(), &[("a", 2)]);
        assert_eq!(sched.passes(), 1);
    }

    #[test]
    fn test_identical_snapshot_is_ignored() {
        let (sched, _sink, log) = harness();
        sched.subscribe(recorder(&log, "a"));

        let s1 = Rc::new(1);
        sched.submit(Rc::clone(&s1));
        sched.run_until_idle();
        sched.submit(s1);
        sched.run_until_idle();

        assert_eq!(log.borrow().len(), 1);
        assert_eq!(sched.passes(), 1);
    }

    #[test]
    fn test_revoked_node_reaped_and_never_invoked() {
        let (sched, _sink, log) = harness();
        sched.subscribe(recorder(&log, "a"));
        let b = sched.subscribe(recorder(&log, "b"));
        sched.subscribe(recorder(&log, "c"));

        b.revoke();
        sched.submit(Rc::new(1));
        sched.run_until_idle();

        assert_eq!(log.borrow().as_slice(), &[("a", 1), ("c", 1)]);
        assert_eq!(sched.subscriber_count(), 2);
        assert_eq!(sched.dump_ring(), "#1(live) -> #3(live)*");
    }

    #[test]
    fn test_revoking_sole_subscriber_empties_ring() {
        let (sched, _sink, log) = harness();
        let a = sched.subscribe(recorder(&log, "a"));

        a.revoke();
        sched.submit(Rc::new(1));
        sched.run_until_idle();

        assert!(log.borrow().is_empty());
        assert_eq!(sched.subscriber_count(), 0);
        assert_eq!(sched.dump_ring(), "(empty)");
    }

    #[test]
    fn test_nested_submit_pauses_pass_then_runs_followup() {
        let (sched, _sink, log) = harness();
        let weak = sched.downgrade();
        let s2 = Rc::new(2);

        sched.subscribe(recorder(&log, "a"));
        // b submits the next snapshot from inside its own invocation.
        let b_log = Rc::clone(&log);
        let nested = Rc::clone(&s2);
        sched.subscribe(FnObserver::rc("b", move |snap: &Rc<u32>| {
            b_log.borrow_mut().push(("b", **snap));
            if **snap == 1 {
                weak.upgrade().unwrap().submit(Rc::clone(&nested));
            }
        }));
        sched.subscribe(recorder(&log, "c"));

        sched.submit(Rc::new(1));
        sched.run_until_idle();

        // The in-flight pass still delivers 1 to c before 2 goes out.
        assert_eq!(
            log.borrow().as_slice(),
            &[("a", 1), ("b", 1), ("c", 1), ("a", 2), ("b", 2), ("c", 2)]
        );
        assert_eq!(sched.passes(), 2);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let (sched, sink, log) = harness();
        sched.subscribe(recorder(&log, "a"));
        let b = sched.subscribe(FnObserver::rc("b", |_snap: &Rc<u32>| {
            panic!("boom");
        }));
        sched.subscribe(recorder(&log, "c"));

        sched.submit(Rc::new(1));
        sched.run_until_idle();

        // Later subscribers still ran; the fault surfaced exactly once.
        assert_eq!(log.borrow().as_slice(), &[("a", 1), ("c", 1)]);
        let faults = sink.take();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].node(), b.id());
        assert_eq!(faults[0].pass(), 1);
        assert_eq!(faults[0].message(), Some("boom"));

        // The failing node was not stamped and stays behind.
        assert!(b.is_behind());
    }

    #[test]
    fn test_fault_per_failing_invocation() {
        let (sched, sink, _log) = harness();
        sched.subscribe(FnObserver::rc("b", |_snap: &Rc<u32>| {
            panic!("boom");
        }));

        sched.submit(Rc::new(1));
        sched.run_until_idle();
        sched.submit(Rc::new(2));
        sched.run_until_idle();

        let faults = sink.take();
        assert_eq!(faults.len(), 2);
        assert_eq!(faults[0].pass(), 1);
        assert_eq!(faults[1].pass(), 2);
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn test_default_sink_reraises_as_unhandled_panic() {
        let sched: Scheduler<u32> = Scheduler::new(Config::default());
        sched.subscribe(FnObserver::rc("b", |_snap: &Rc<u32>| panic!("boom")));
        sched.submit(Rc::new(1));
        sched.run_until_idle();
    }

    #[test]
    fn test_builder_with_store_attaches_before_first_drain() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let store = CellStore::rc(7u32, |state: &u32, action: u32| state + action);
        let sched: Scheduler<u32, u32> = Scheduler::builder(Config::default())
            .with_fault_sink(CollectSink::rc())
            .with_store(store.clone())
            .build();
        store.bind(&sched);

        // Registered after construction but before the deferred first pass:
        // still sees the initial snapshot.
        let a_log = Rc::clone(&log);
        sched.subscribe(FnObserver::rc("a", move |snap: &Rc<u32>| {
            a_log.borrow_mut().push(("a", **snap));
        }));
        sched.run_until_idle();
        assert_eq!(log.borrow().as_slice(), &[("a", 7)]);

        sched.dispatch(1).unwrap();
        sched.run_until_idle();
        assert_eq!(log.borrow().as_slice(), &[("a", 7), ("a", 8)]);
    }

    #[test]
    fn test_subscribe_inside_callback_joins_current_lap_as_current() {
        let (sched, _sink, log) = harness();
        let weak = sched.downgrade();
        let d_log = Rc::clone(&log);
        let spawned: Rc<RefCell<Option<Subscription<u32>>>> = Rc::new(RefCell::new(None));
        let spawned_slot = Rc::clone(&spawned);

        let a_log = Rc::clone(&log);
        sched.subscribe(FnObserver::rc("a", move |snap: &Rc<u32>| {
            a_log.borrow_mut().push(("a", **snap));
            if **snap == 1 {
                let d_log = Rc::clone(&d_log);
                let sub = weak.upgrade().unwrap().subscribe(FnObserver::rc(
                    "d",
                    move |snap: &Rc<u32>| {
                        d_log.borrow_mut().push(("d", **snap));
                    },
                ));
                *spawned_slot.borrow_mut() = Some(sub);
            }
        }));
        sched.subscribe(recorder(&log, "b"));

        sched.submit(Rc::new(1));
        sched.run_until_idle();
        // d was stamped with the in-flight snapshot at creation: visited at
        // the end of the lap, skipped, not invoked.
        assert_eq!(log.borrow().as_slice(), &[("a", 1), ("b", 1)]);

        sched.submit(Rc::new(2));
        sched.run_until_idle();
        assert_eq!(
            log.borrow().as_slice(),
            &[("a", 1), ("b", 1), ("a", 2), ("b", 2), ("d", 2)]
        );
    }

    #[test]
    fn test_revoke_other_node_inside_callback() {
        let (sched, _sink, log) = harness();
        let c: Rc<RefCell<Option<Subscription<u32>>>> = Rc::new(RefCell::new(None));
        let c_slot = Rc::clone(&c);

        let a_log = Rc::clone(&log);
        sched.subscribe(FnObserver::rc("a", move |snap: &Rc<u32>| {
            a_log.borrow_mut().push(("a", **snap));
            if let Some(c) = c_slot.borrow().as_ref() {
                c.revoke();
            }
        }));
        sched.subscribe(recorder(&log, "b"));
        *c.borrow_mut() = Some(sched.subscribe(recorder(&log, "c")));

        sched.submit(Rc::new(1));
        sched.run_until_idle();

        assert_eq!(log.borrow().as_slice(), &[("a", 1), ("b", 1)]);
        assert_eq!(sched.subscriber_count(), 2);
    }

    #[test]
    fn test_self_revoke_completes_current_invocation() {
        let (sched, _sink, log) = harness();
        let me: Rc<RefCell<Option<Subscription<u32>>>> = Rc::new(RefCell::new(None));
        let me_slot = Rc::clone(&me);

        let b_log = Rc::clone(&log);
        sched.subscribe(recorder(&log, "a"));
        *me.borrow_mut() = Some(sched.subscribe(FnObserver::rc("b", move |snap: &Rc<u32>| {
            b_log.borrow_mut().push(("b", **snap));
            if let Some(me) = me_slot.borrow().as_ref() {
                me.revoke();
            }
        })));

        sched.submit(Rc::new(1));
        sched.run_until_idle();
        assert_eq!(log.borrow().as_slice(), &[("a", 1), ("b", 1)]);

        // Reaped on the next traversal, never invoked again.
        sched.submit(Rc::new(2));
        sched.run_until_idle();
        assert_eq!(
            log.borrow().as_slice(),
            &[("a", 1), ("b", 1), ("a", 2)]
        );
        assert_eq!(sched.subscriber_count(), 1);
    }

    #[test]
    fn test_reentrant_drive_inside_callback_is_noop() {
        let (sched, _sink, log) = harness();
        let weak = sched.downgrade();

        let a_log = Rc::clone(&log);
        sched.subscribe(FnObserver::rc("a", move |snap: &Rc<u32>| {
            a_log.borrow_mut().push(("a", **snap));
            weak.upgrade().unwrap().run_until_idle();
        }));
        sched.subscribe(recorder(&log, "b"));

        sched.submit(Rc::new(1));
        sched.run_until_idle();
        assert_eq!(log.borrow().as_slice(), &[("a", 1), ("b", 1)]);
    }

    #[test]
    fn test_update_scope_defers_pass_until_dropped() {
        let (sched, _sink, log) = harness();
        let a = sched.subscribe(recorder(&log, "a"));

        let scope = sched.begin_update(&a);
        sched.submit(Rc::new(1));
        sched.run_until_idle();
        // Working frame still open: nothing delivered.
        assert!(log.borrow().is_empty());

        drop(scope);
        sched.run_until_idle();
        assert_eq!(log.borrow().as_slice(), &[("a", 1)]);
    }

    #[test]
    fn test_dispatch_without_store_fails() {
        let sink = CollectSink::rc();
        let sched: Scheduler<u32, u32> = Scheduler::builder(Config::default())
            .with_fault_sink(sink)
            .build();
        let err = sched.dispatch(1).unwrap_err();
        assert_eq!(err.as_label(), "scheduler_no_store");
    }

    #[test]
    fn test_attach_store_is_idempotent_and_submits_initial_state() {
        let (sched, log) = {
            let sink = CollectSink::rc();
            let sched: Scheduler<u32, u32> = Scheduler::builder(Config::default())
                .with_fault_sink(sink)
                .build();
            let log: Log = Rc::new(RefCell::new(Vec::new()));
            (sched, log)
        };
        let a_log = Rc::clone(&log);
        sched.subscribe(FnObserver::rc("a", move |snap: &Rc<u32>| {
            a_log.borrow_mut().push(("a", **snap));
        }));

        let store = CellStore::rc(10u32, |state: &u32, action: u32| state + action);
        store.bind(&sched);
        sched.attach_store(store.clone());
        sched.attach_store(store.clone());
        sched.run_until_idle();

        // Initial state delivered exactly once.
        assert_eq!(log.borrow().as_slice(), &[("a", 10)]);

        sched.dispatch(5).unwrap();
        sched.run_until_idle();
        assert_eq!(log.borrow().as_slice(), &[("a", 10), ("a", 15)]);
        assert_eq!(sched.current().map(|s| *s), Some(15));
    }

    #[test]
    fn test_nested_dispatch_inside_callback() {
        let sink = CollectSink::rc();
        let sched: Scheduler<u32, u32> = Scheduler::builder(Config::default())
            .with_fault_sink(sink)
            .build();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let weak = sched.downgrade();

        let a_log = Rc::clone(&log);
        sched.subscribe(FnObserver::rc("a", move |snap: &Rc<u32>| {
            a_log.borrow_mut().push(("a", **snap));
            if **snap == 1 {
                weak.upgrade().unwrap().dispatch(1).unwrap();
            }
        }));

        let store = CellStore::rc(0u32, |state: &u32, action: u32| state + action);
        store.bind(&sched);
        sched.attach_store(store);
        sched.run_until_idle(); // initial 0

        sched.dispatch(1).unwrap();
        sched.run_until_idle();

        // 0, then 1 (which nests a dispatch producing 2), then 2.
        assert_eq!(
            log.borrow().as_slice(),
            &[("a", 0), ("a", 1), ("a", 2)]
        );
    }

    #[test]
    fn test_weak_scheduler_drops_with_instance() {
        let sink = CollectSink::rc();
        let sched: Scheduler<u32> = Scheduler::builder(Config::default())
            .with_fault_sink(sink)
            .build();
        let weak = sched.downgrade();
        assert!(weak.upgrade().is_some());
        drop(sched);
        assert!(weak.upgrade().is_none());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// After a drain, every live subscriber's stamp is the latest
            /// submitted snapshot, regardless of how registrations, revokes
            /// and submissions interleaved.
            #[test]
            fn prop_live_nodes_converge_on_latest(ops in proptest::collection::vec(0u8..=2, 1..48)) {
                let sched: Scheduler<u32> = Scheduler::builder(Config::default())
                    .with_fault_sink(CollectSink::rc())
                    .build();
                let mut subs: Vec<Subscription<u32>> = Vec::new();
                let mut revoked = 0usize;
                let mut latest: Option<Rc<u32>> = None;
                let mut counter = 0u32;

                for op in ops {
                    match op {
                        0 => subs.push(sched.subscribe(FnObserver::rc("node", |_snap: &Rc<u32>| {}))),
                        1 => {
                            if revoked < subs.len() {
                                subs[revoked].revoke();
                                revoked += 1;
                            }
                        }
                        _ => {
                            counter += 1;
                            let snap = Rc::new(counter);
                            latest = Some(Rc::clone(&snap));
                            sched.submit(snap);
                        }
                    }
                }
                sched.run_until_idle();

                if let Some(latest) = latest {
                    for sub in subs.iter().skip(revoked) {
                        let seen = sub.observed();
                        prop_assert!(seen.is_some_and(|seen| Rc::ptr_eq(&seen, &latest)));
                        prop_assert!(!sub.is_behind());
                    }
                }
            }
        }
    }
}

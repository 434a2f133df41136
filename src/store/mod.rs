//! # State container contract.
//!
//! The scheduler does not own application state; it propagates snapshots a
//! state container produces. [`Store`] is the interface the scheduler's
//! dispatch passthrough talks to, and [`CellStore`] is a small reducer-backed
//! reference implementation that also demonstrates the collaborator
//! contract: whenever its state changes, it feeds the new snapshot back into
//! its bound scheduler via [`Scheduler::submit`].
//!
//! ```text
//! dispatch(action) ──► Scheduler ──► Store::dispatch
//!                                       │ reduce(state, action)
//!                                       ▼
//!                      Scheduler ◄── submit(new snapshot)
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::{Scheduler, WeakScheduler};

/// Contract for state containers attached to a scheduler.
pub trait Store<S, A> {
    /// Returns the current state snapshot.
    fn state(&self) -> Rc<S>;

    /// Applies an action. Containers are expected to notify their scheduler
    /// of the resulting snapshot via [`Scheduler::submit`].
    fn dispatch(&self, action: A);
}

/// Reducer-backed in-memory store.
///
/// # Example
/// ```
/// use std::rc::Rc;
/// use fanring::{CellStore, Config, Scheduler};
///
/// let sched: Scheduler<u32, u32> = Scheduler::new(Config::default());
/// let store = CellStore::rc(0u32, |state: &u32, action: u32| state + action);
/// store.bind(&sched);
/// sched.attach_store(store.clone());
/// sched.run_until_idle();
///
/// sched.dispatch(5).unwrap();
/// sched.run_until_idle();
/// assert_eq!(*store.get(), 5);
/// ```
pub struct CellStore<S: 'static, A: 'static> {
    state: RefCell<Rc<S>>,
    reduce: Box<dyn Fn(&S, A) -> S>,
    sched: RefCell<Option<WeakScheduler<S, A>>>,
}

impl<S: 'static, A: 'static> CellStore<S, A> {
    /// Creates a store with an initial state and a reducer.
    pub fn rc(initial: S, reduce: impl Fn(&S, A) -> S + 'static) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(Rc::new(initial)),
            reduce: Box::new(reduce),
            sched: RefCell::new(None),
        })
    }

    /// Binds the scheduler this store notifies on state changes.
    ///
    /// Held weakly; an unbound (or outlived) store still reduces, it just
    /// stops notifying.
    pub fn bind(&self, scheduler: &Scheduler<S, A>) {
        *self.sched.borrow_mut() = Some(scheduler.downgrade());
    }

    /// Returns the current state snapshot.
    pub fn get(&self) -> Rc<S> {
        self.state.borrow().clone()
    }
}

impl<S: 'static, A: 'static> Store<S, A> for CellStore<S, A> {
    fn state(&self) -> Rc<S> {
        self.get()
    }

    fn dispatch(&self, action: A) {
        let next = {
            let current = self.state.borrow();
            Rc::new((self.reduce)(&current, action))
        };
        *self.state.borrow_mut() = Rc::clone(&next);

        let bound = self
            .sched
            .borrow()
            .as_ref()
            .and_then(WeakScheduler::upgrade);
        if let Some(scheduler) = bound {
            scheduler.submit(next);
        }
    }
}

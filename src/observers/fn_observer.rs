//! Function-backed observer.
//!
//! [`FnObserver`] wraps a closure as an [`Observe`] implementation, the
//! common case for bindings and tests.

use std::marker::PhantomData;
use std::rc::Rc;

use super::observe::Observe;

/// Observer backed by a plain closure.
///
/// # Example
/// ```
/// use std::rc::Rc;
/// use fanring::{Config, FnObserver, Scheduler};
///
/// let sched: Scheduler<u32> = Scheduler::new(Config::default());
/// let sub = sched.subscribe(FnObserver::rc("printer", |snap: &Rc<u32>| {
///     let _ = snap; // render, print, ...
/// }));
/// # sub.revoke();
/// ```
pub struct FnObserver<S, F> {
    name: &'static str,
    f: F,
    _state: PhantomData<fn(&Rc<S>)>,
}

impl<S: 'static, F: Fn(&Rc<S>) + 'static> FnObserver<S, F> {
    /// Wraps a closure into a shareable observer handle.
    pub fn rc(name: &'static str, f: F) -> Rc<dyn Observe<S>> {
        Rc::new(Self {
            name,
            f,
            _state: PhantomData,
        })
    }
}

impl<S, F: Fn(&Rc<S>)> Observe<S> for FnObserver<S, F> {
    fn on_snapshot(&self, snapshot: &Rc<S>) {
        (self.f)(snapshot)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

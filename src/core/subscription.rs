//! # Subscription: the collaborator-facing capability handle.
//!
//! Registration returns a [`Subscription`] instead of exposing the node.
//! The handle carries exactly the capabilities the binding layer needs:
//! tear the subscriber down ([`Subscription::revoke`]) and compare "what I
//! last rendered" against "what the scheduler is propagating"
//! ([`Subscription::observed`] / [`Subscription::is_behind`]).
//!
//! Revocation is a logical death only; the node stays ring-resident until
//! the traversal reaches it (lazy reaping). Dropping the handle without
//! calling `revoke` leaves the subscriber registered.

use std::rc::{Rc, Weak};

use crate::core::scheduler::Core;
use crate::ring::NodeKey;

/// Handle to one registered subscriber.
///
/// Holds a non-owning reference to its scheduler; every operation degrades
/// to a no-op (or `None`) once the scheduler instance is gone.
pub struct Subscription<S: 'static, A: 'static = ()> {
    core: Weak<Core<S, A>>,
    key: NodeKey,
}

impl<S: 'static, A: 'static> Subscription<S, A> {
    pub(crate) fn new(core: Weak<Core<S, A>>, key: NodeKey) -> Self {
        Self { core, key }
    }

    /// Marks the subscriber as torn down.
    ///
    /// Idempotent. The node becomes invisible to future invocation and is
    /// physically removed the next time the traversal reaches it.
    pub fn revoke(&self) {
        if let Some(core) = self.core.upgrade() {
            core.revoke(self.key);
        }
    }

    /// The snapshot this subscriber last observed, if it is still
    /// ring-resident.
    pub fn observed(&self) -> Option<Rc<S>> {
        self.core.upgrade().and_then(|core| core.seen(self.key))
    }

    /// The snapshot the scheduler is currently propagating (or last
    /// propagated).
    pub fn current(&self) -> Option<Rc<S>> {
        self.core.upgrade().and_then(|core| core.current_snapshot())
    }

    /// True when the shared snapshot has advanced past what this subscriber
    /// observed (compared by identity).
    pub fn is_behind(&self) -> bool {
        match (self.observed(), self.current()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(seen), Some(current)) => !Rc::ptr_eq(&seen, &current),
        }
    }

    /// The node's identity (monotone per scheduler, never reused).
    pub fn id(&self) -> u64 {
        self.key.id()
    }
}

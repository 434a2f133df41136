//! # Node: one subscriber's slot in the traversal order.
//!
//! A node records what its subscriber has observed and whether the
//! subscriber is still reachable. Nodes live in the ring's slot arena and are
//! addressed by [`NodeKey`]; the key carries the node's identity so a key
//! outliving its node (slot reused after a reap) is detected rather than
//! silently aliased.

use std::rc::Rc;

use crate::observers::Observe;

/// Stable handle to a node in the ring arena.
///
/// Carries the arena index plus the node's identity. All key-based lookups
/// validate the identity, so a stale key (node reaped, slot reused) behaves
/// like a miss instead of touching an unrelated node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeKey {
    pub(crate) index: u32,
    pub(crate) id: u64,
}

impl NodeKey {
    /// The node's identity: assigned at creation, monotonically increasing
    /// per scheduler, never reused. Useful for ordering and diagnostics.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Callback cell of a resident node.
///
/// `Live` holds the subscriber callback; `Revoked` marks a subscriber that
/// was torn down and awaits lazy reaping. The third state, a vacated arena
/// slot, is reached only when the traversal reaps the node.
pub(crate) enum Watch<S: 'static> {
    Live(Rc<dyn Observe<S>>),
    Revoked,
}

impl<S: 'static> Watch<S> {
    #[inline]
    pub(crate) fn is_revoked(&self) -> bool {
        matches!(self, Watch::Revoked)
    }
}

/// One subscriber's record in the ring.
pub(crate) struct Node<S: 'static> {
    /// Monotone identity; never reused.
    pub(crate) id: u64,
    /// Ring link; always points at a resident slot while this node is
    /// resident.
    pub(crate) next: u32,
    /// Last snapshot this subscriber observed (`None` before any snapshot
    /// existed at creation time).
    pub(crate) seen: Option<Rc<S>>,
    /// Tri-state callback cell.
    pub(crate) watch: Watch<S>,
}

/// Arena slot: a resident node or a vacancy left by a reap.
pub(crate) enum Slot<S: 'static> {
    Occupied(Node<S>),
    Vacant,
}

impl<S: 'static> Slot<S> {
    #[inline]
    pub(crate) fn node(&self) -> Option<&Node<S>> {
        match self {
            Slot::Occupied(node) => Some(node),
            Slot::Vacant => None,
        }
    }

    #[inline]
    pub(crate) fn node_mut(&mut self) -> Option<&mut Node<S>> {
        match self {
            Slot::Occupied(node) => Some(node),
            Slot::Vacant => None,
        }
    }
}

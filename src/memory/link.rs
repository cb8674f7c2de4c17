//! Intrusive doubly-linked list membership.
//!
//! A [`Link`] is embedded in a pooled object and records the handles of its
//! neighbours, so active-hypothesis lists can be spliced in O(1) without any
//! per-membership allocation. Links own nothing: the pool owns the objects and
//! the list is only a view over them.
//!
//! List operations live on [`LinkStore`], which both pools implement for element
//! types that embed a link (see [`Linked`]).

use super::free_list::Handle;

/// Neighbour handles of a node. A fresh link is unlinked, i.e. a singleton list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Link {
    prev: Option<Handle>,
    next: Option<Handle>,
}

impl Link {
    pub const fn new() -> Self {
        Self {
            prev: None,
            next: None,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.prev.is_some() || self.next.is_some()
    }

    pub fn prev(&self) -> Option<Handle> {
        self.prev
    }

    pub fn next(&self) -> Option<Handle> {
        self.next
    }
}

/// Objects that embed a [`Link`].
pub trait Linked {
    fn link(&self) -> &Link;
    fn link_mut(&mut self) -> &mut Link;
}

/// Storage of linked nodes addressed by handle.
///
/// All operations take handles of live nodes; passing a freed handle panics in
/// the underlying pool.
pub trait LinkStore {
    fn link(&self, node: Handle) -> &Link;
    fn link_mut(&mut self, node: Handle) -> &mut Link;

    fn is_linked(&self, node: Handle) -> bool {
        self.link(node).is_linked()
    }

    fn prev(&self, node: Handle) -> Option<Handle> {
        self.link(node).prev
    }

    fn next(&self, node: Handle) -> Option<Handle> {
        self.link(node).next
    }

    /// Splice `node` into the list of `reference`, directly before it.
    ///
    /// A node that is already a member of some list is unlinked from it first.
    fn insert_before(&mut self, node: Handle, reference: Handle) {
        assert_ne!(node, reference, "cannot insert a node next to itself");
        self.unlink(node);

        let prev = self.link(reference).prev;
        *self.link_mut(node) = Link {
            prev,
            next: Some(reference),
        };
        self.link_mut(reference).prev = Some(node);
        if let Some(p) = prev {
            self.link_mut(p).next = Some(node);
        }
    }

    /// Splice `node` into the list of `reference`, directly after it.
    fn insert_after(&mut self, node: Handle, reference: Handle) {
        assert_ne!(node, reference, "cannot insert a node next to itself");
        self.unlink(node);

        let next = self.link(reference).next;
        *self.link_mut(node) = Link {
            prev: Some(reference),
            next,
        };
        self.link_mut(reference).next = Some(node);
        if let Some(n) = next {
            self.link_mut(n).prev = Some(node);
        }
    }

    /// Remove `node` from its list, leaving it a singleton. No-op if unlinked.
    fn unlink(&mut self, node: Handle) {
        let Link { prev, next } = *self.link(node);
        if let Some(p) = prev {
            self.link_mut(p).next = next;
        }
        if let Some(n) = next {
            self.link_mut(n).prev = prev;
        }
        *self.link_mut(node) = Link::new();
    }

    /// Walk forward from `head`, yielding `head` first.
    fn iter_from(&self, head: Handle) -> LinkIter<'_, Self>
    where
        Self: Sized,
    {
        LinkIter {
            store: self,
            cur: Some(head),
        }
    }
}

/// Forward traversal over a linked list.
pub struct LinkIter<'a, S> {
    store: &'a S,
    cur: Option<Handle>,
}

impl<S: LinkStore> Iterator for LinkIter<'_, S> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        let node = self.cur?;
        self.cur = self.store.next(node);
        Some(node)
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Focus ownership.
//!
//! Focus changes are requested at any time and settle during the FocusFlush
//! phase, after layout and paint, so a request never observes a half-built
//! tree.

use crate::node::{NodeId, NodeStore};

/// Tracks the focused node and a pending focus request.
#[derive(Clone, Debug, Default)]
pub struct FocusManager {
    focused: Option<NodeId>,
    pending: Option<NodeId>,
}

impl FocusManager {
    /// Creates a manager with nothing focused.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The focused node, as of the last FocusFlush.
    #[must_use]
    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Asks for `node` to take focus at the next FocusFlush.
    pub fn request(&mut self, node: NodeId) {
        self.pending = Some(node);
    }

    /// Whether a request is waiting for the next flush.
    #[must_use]
    pub fn has_pending_request(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops focus and any pending request.
    pub fn clear(&mut self) {
        self.focused = None;
        self.pending = None;
    }

    /// Settles focus. Returns `true` if the focused node changed.
    ///
    /// A pending request wins if its node can take focus. A focused node
    /// that became dead, hidden, disabled, unfocusable, or detached loses
    /// focus. With nothing focused and `dirty` non-empty, focus falls back
    /// to the first focusable node under `root` in pre-order.
    pub(crate) fn flush(
        &mut self,
        store: &NodeStore,
        root: Option<NodeId>,
        dirty: &[NodeId],
    ) -> bool {
        let before = self.focused;

        if let Some(req) = self.pending.take() {
            if can_focus(store, root, req) {
                self.focused = Some(req);
            } else {
                tracing::debug!(node = %req, "focus request rejected");
            }
        }

        if let Some(cur) = self.focused
            && !can_focus(store, root, cur)
        {
            tracing::debug!(node = %cur, "focused node can no longer hold focus");
            self.focused = None;
        }

        if self.focused.is_none()
            && (!dirty.is_empty() || before.is_some())
            && let Some(root) = root
            && store.is_alive(root)
        {
            self.focused = store
                .descendants(root)
                .find(|&id| can_focus(store, Some(root), id));
        }

        if before != self.focused {
            tracing::debug!(from = ?before, to = ?self.focused, "focus moved");
            true
        } else {
            false
        }
    }
}

fn can_focus(store: &NodeStore, root: Option<NodeId>, id: NodeId) -> bool {
    if !store.is_alive(id) {
        return false;
    }
    let flags = store.flags(id);
    flags.focusable && !flags.disabled && store.is_effectively_visible(id) && attached(store, root, id)
}

/// Whether `id` is `root` or one of its descendants.
pub(crate) fn attached(store: &NodeStore, root: Option<NodeId>, id: NodeId) -> bool {
    let Some(root) = root else {
        return false;
    };
    let mut cur = Some(id);
    while let Some(n) = cur {
        if n == root {
            return true;
        }
        cur = store.parent(n);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    fn focusable(store: &mut NodeStore, parent: NodeId) -> NodeId {
        let n = store.create_node(NodeKind::Container);
        store.update_flags(n, |f| f.focusable = true);
        store.add_child(parent, n);
        n
    }

    #[test]
    fn falls_back_to_first_focusable_in_pre_order() {
        let mut store = NodeStore::new();
        let root = store.create_node(NodeKind::Root);
        let a = focusable(&mut store, root);
        let _b = focusable(&mut store, root);
        let mut focus = FocusManager::new();

        assert!(focus.flush(&store, Some(root), &[a]), "focus should settle");
        assert_eq!(focus.focused(), Some(a), "first focusable wins");
    }

    #[test]
    fn request_moves_focus_and_hidden_node_loses_it() {
        let mut store = NodeStore::new();
        let root = store.create_node(NodeKind::Root);
        let a = focusable(&mut store, root);
        let b = focusable(&mut store, root);
        let mut focus = FocusManager::new();

        focus.request(b);
        assert!(focus.flush(&store, Some(root), &[]), "request applies");
        assert_eq!(focus.focused(), Some(b), "requested node focused");

        store.update_flags(b, |f| f.visible = false);
        assert!(focus.flush(&store, Some(root), &[b]), "hidden node drops focus");
        assert_eq!(focus.focused(), Some(a), "focus falls back");
    }

    #[test]
    fn detached_request_is_rejected() {
        let mut store = NodeStore::new();
        let root = store.create_node(NodeKind::Root);
        let loose = store.create_node(NodeKind::Container);
        store.update_flags(loose, |f| f.focusable = true);
        let mut focus = FocusManager::new();

        focus.request(loose);
        assert!(!focus.flush(&store, Some(root), &[]), "nothing changes");
        assert_eq!(focus.focused(), None, "detached node never focused");
    }

    #[test]
    fn no_scan_without_trigger() {
        let mut store = NodeStore::new();
        let root = store.create_node(NodeKind::Root);
        focusable(&mut store, root);
        let mut focus = FocusManager::new();
        assert!(!focus.flush(&store, Some(root), &[]), "clean flush is a no-op");
    }
}

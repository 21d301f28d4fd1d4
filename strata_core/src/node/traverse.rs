// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, NodeId};
use super::store::NodeStore;

/// An iterator over the direct children of a node.
///
/// Created by [`NodeStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a NodeStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a NodeStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        self.store.handle(idx)
    }
}

/// A pre-order walk of a subtree, starting with its root.
///
/// Created by [`NodeStore::descendants`]. Walks the sibling links directly,
/// so it never allocates.
#[derive(Debug)]
pub struct Descendants<'a> {
    store: &'a NodeStore,
    top: u32,
    next: u32,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(store: &'a NodeStore, top: u32) -> Self {
        Self {
            store,
            top,
            next: top,
        }
    }
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.next == INVALID {
            return None;
        }
        let idx = self.next;
        let s = self.store;

        // Descend first, then the next sibling, then climb until an ancestor
        // below `top` has a next sibling.
        self.next = if s.first_child[idx as usize] != INVALID {
            s.first_child[idx as usize]
        } else {
            let mut cur = idx;
            loop {
                if cur == self.top {
                    break INVALID;
                }
                let sib = s.next_sibling[cur as usize];
                if sib != INVALID {
                    break sib;
                }
                cur = s.parent[cur as usize];
                if cur == INVALID {
                    break INVALID;
                }
            }
        };
        s.handle(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::super::store::NodeKind;
    use super::*;

    #[test]
    fn descendants_are_pre_order_and_bounded() {
        let mut store = NodeStore::new();
        let root = store.create_node(NodeKind::Root);
        let a = store.create_node(NodeKind::Container);
        let a1 = store.create_node(NodeKind::Leaf);
        let a2 = store.create_node(NodeKind::Leaf);
        let b = store.create_node(NodeKind::Leaf);
        store.add_child(root, a);
        store.add_child(a, a1);
        store.add_child(a, a2);
        store.add_child(root, b);

        let all: Vec<_> = store.descendants(root).collect();
        assert_eq!(all, vec![root, a, a1, a2, b]);

        let sub: Vec<_> = store.descendants(a).collect();
        assert_eq!(sub, vec![a, a1, a2], "walk stops at the subtree top");

        let leaf: Vec<_> = store.descendants(a2).collect();
        assert_eq!(leaf, vec![a2], "a leaf's siblings are outside its subtree");
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! State restoration across process restarts.
//!
//! Nodes opt in by registering under an integer restore id. Saving polls
//! each registered node's [`Buildable::restore_info`] and writes the
//! non-empty payloads into a JSON object keyed by the id. Restoring loads
//! such an object; payloads are handed to nodes when they register, and can
//! be read back with [`RestorationRegistry::restore_info`].
//!
//! [`Buildable::restore_info`]: crate::node::Buildable::restore_info

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::error::RestoreError;
use crate::node::{NodeId, NodeStore};

/// Restore id → node registrations plus loaded payloads.
#[derive(Debug, Default)]
pub struct RestorationRegistry {
    nodes: BTreeMap<i32, NodeId>,
    payloads: HashMap<i32, String>,
}

impl RestorationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `node` under `id`, replacing an earlier registration.
    ///
    /// If a payload was restored for `id`, the node's build behavior
    /// receives it immediately.
    pub fn store_node(&mut self, store: &mut NodeStore, id: i32, node: NodeId) {
        if let Some(old) = self.nodes.insert(id, node)
            && old != node
        {
            tracing::warn!(id, "restore id already registered, replacing");
        }
        let Some(info) = self.payloads.get(&id) else {
            return;
        };
        if !store.is_alive(node) || info.is_empty() {
            return;
        }
        if let Some(builder) = store.builder[node.idx as usize].as_mut() {
            builder.restore(info);
        }
    }

    /// Drops the registration for `id`.
    pub fn remove_node(&mut self, id: i32) {
        self.nodes.remove(&id);
    }

    /// Collects the payloads of every live registered node into a JSON
    /// object. Nodes with nothing to save are skipped.
    #[must_use]
    pub fn stored_node_info(&self, store: &NodeStore) -> String {
        let mut out = Map::new();
        for (&id, &node) in &self.nodes {
            if !store.is_alive(node) {
                continue;
            }
            let Some(builder) = store.builder[node.idx as usize].as_ref() else {
                continue;
            };
            let info = builder.restore_info();
            if !info.is_empty() {
                out.insert(id.to_string(), Value::String(info));
            }
        }
        Value::Object(out).to_string()
    }

    /// Loads payloads from a JSON object of id → string.
    ///
    /// An id that already has a payload keeps it. Entries with non-integer
    /// keys or non-string values are skipped and logged.
    pub fn restore_node_info(&mut self, json: &str) -> Result<(), RestoreError> {
        let value: Value = serde_json::from_str(json).inspect_err(|err| {
            tracing::warn!(%err, "restore payload is not valid JSON");
        })?;
        let Value::Object(map) = value else {
            tracing::warn!("restore payload is not an object");
            return Err(RestoreError::NotObject(json.to_owned()));
        };
        for (key, value) in map {
            let Ok(id) = key.parse::<i32>() else {
                tracing::warn!(%key, "skipping restore entry with non-integer id");
                continue;
            };
            let Value::String(info) = value else {
                tracing::warn!(id, "skipping restore entry with non-string payload");
                continue;
            };
            self.payloads.entry(id).or_insert(info);
        }
        Ok(())
    }

    /// The payload restored for `id`, or `""`.
    #[must_use]
    pub fn restore_info(&self, id: i32) -> &str {
        match self.payloads.get(&id) {
            Some(info) => info,
            None => {
                tracing::debug!(id, "no restore info");
                ""
            }
        }
    }

    /// Number of registered nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forgets every registration and payload.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.payloads.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::node::{BuildCx, Buildable, NodeKind};

    struct Scroller {
        offset: Rc<RefCell<String>>,
    }

    impl Buildable for Scroller {
        fn build(&mut self, _cx: &mut BuildCx<'_>) {}

        fn restore_info(&self) -> String {
            self.offset.borrow().clone()
        }

        fn restore(&mut self, info: &str) {
            *self.offset.borrow_mut() = info.to_owned();
        }
    }

    fn scroller(store: &mut NodeStore, state: &str) -> (NodeId, Rc<RefCell<String>>) {
        let node = store.create_node(NodeKind::Container);
        let offset = Rc::new(RefCell::new(state.to_owned()));
        store.set_builder(
            node,
            Scroller {
                offset: offset.clone(),
            },
        );
        (node, offset)
    }

    #[test]
    fn saves_non_empty_payloads() {
        let mut store = NodeStore::new();
        let mut reg = RestorationRegistry::new();
        let (a, _) = scroller(&mut store, "120");
        let (b, _) = scroller(&mut store, "");
        reg.store_node(&mut store, 1, a);
        reg.store_node(&mut store, 2, b);
        assert_eq!(reg.stored_node_info(&store), r#"{"1":"120"}"#);
    }

    #[test]
    fn restored_payload_reaches_node_on_registration() {
        let mut store = NodeStore::new();
        let mut reg = RestorationRegistry::new();
        reg.restore_node_info(r#"{"7":"42","bad":"x","8":3}"#).unwrap();
        assert_eq!(reg.restore_info(7), "42");
        assert_eq!(reg.restore_info(8), "", "non-string payload skipped");

        let (node, offset) = scroller(&mut store, "0");
        reg.store_node(&mut store, 7, node);
        assert_eq!(*offset.borrow(), "42");
    }

    #[test]
    fn first_restored_value_wins() {
        let mut reg = RestorationRegistry::new();
        reg.restore_node_info(r#"{"1":"a"}"#).unwrap();
        reg.restore_node_info(r#"{"1":"b"}"#).unwrap();
        assert_eq!(reg.restore_info(1), "a");
    }

    #[test]
    fn corrupt_payloads_are_errors() {
        let mut reg = RestorationRegistry::new();
        assert!(matches!(
            reg.restore_node_info("{"),
            Err(RestoreError::Json(_))
        ));
        assert!(matches!(
            reg.restore_node_info("[1]"),
            Err(RestoreError::NotObject(_))
        ));
    }

    #[test]
    fn dead_nodes_are_not_polled() {
        let mut store = NodeStore::new();
        let mut reg = RestorationRegistry::new();
        let (a, _) = scroller(&mut store, "5");
        reg.store_node(&mut store, 1, a);
        store.destroy_node(a);
        assert_eq!(reg.stored_node_info(&store), "{}");
    }
}

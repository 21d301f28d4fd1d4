// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text dumps of pipeline state for debugging tools.

use super::context::PipelineContext;
use crate::animation::set_duration_scale;
use crate::node::{NodeId, NodeStore};

/// Line returned for an unknown dump selector.
pub const UNSUPPORTED_DUMP: &str = "Error: Unsupported dump params!";

impl PipelineContext {
    /// Renders diagnostic state selected by `params[0]`.
    ///
    /// | selector               | output                                   |
    /// |------------------------|------------------------------------------|
    /// | `-element`             | tree structure with kinds and labels     |
    /// | `-render`              | geometry, flags, and dirty bits per node |
    /// | `-focus`               | focusable nodes, focused one marked      |
    /// | `-layer`               | repaint boundaries and their rects       |
    /// | `-frontend`            | the frontend's own dump                  |
    /// | `-animationscale <x>`  | sets the global duration scale           |
    ///
    /// Anything else yields [`UNSUPPORTED_DUMP`]. No parameters yields
    /// nothing.
    #[must_use]
    pub fn dump(&self, params: &[&str]) -> Vec<String> {
        let Some(&selector) = params.first() else {
            tracing::warn!("dump called without parameters");
            return Vec::new();
        };
        let root = self.root.filter(|&r| self.store.is_alive(r));
        match (selector, params.get(1)) {
            ("-element", _) => tree_lines(&self.store, root, |store, id| {
                let mut line = format!("{:?} {id}", store.kind(id));
                if let Some(label) = store.label(id) {
                    line.push_str(&format!(" \"{label}\""));
                }
                line
            }),
            ("-render", _) => tree_lines(&self.store, root, |store, id| {
                let r = store.global_rect(id);
                let flags = store.flags(id);
                format!(
                    "{id} rect=({}, {}, {}, {}) visible={} z={} dirty={:?}",
                    r.x0,
                    r.y0,
                    r.x1,
                    r.y1,
                    flags.visible,
                    store.z_index(id),
                    store.dirty_bits(id),
                )
            }),
            ("-focus", _) => {
                let focused = self.focus.focused();
                let Some(root) = root else {
                    return vec!["no root".to_owned()];
                };
                let mut out = vec![format!("focused: {focused:?}")];
                for id in self.store.descendants(root) {
                    if !self.store.flags(id).focusable {
                        continue;
                    }
                    let mark = if Some(id) == focused { "*" } else { " " };
                    let indent = "  ".repeat(self.store.depth(id));
                    out.push(format!("{indent}{mark} {id}"));
                }
                out
            }
            ("-layer", _) => {
                let Some(root) = root else {
                    return vec!["no root".to_owned()];
                };
                self.store
                    .descendants(root)
                    .filter(|&id| id == root || self.store.flags(id).repaint_boundary)
                    .map(|id| {
                        let r = self.store.global_rect(id);
                        format!(
                            "layer {id} ({}, {}, {}, {})",
                            r.x0, r.y0, r.x1, r.y1
                        )
                    })
                    .collect()
            }
            ("-frontend", _) => match self.frontend.as_ref() {
                Some(frontend) => {
                    let mut out = vec![format!("frontend: {:?}", frontend.kind())];
                    out.extend(frontend.dump());
                    out
                }
                None => vec!["no frontend".to_owned()],
            },
            ("-animationscale", Some(value)) => match value.parse::<f64>() {
                Ok(scale) if set_duration_scale(scale) => {
                    vec![format!("Set Animation Scale. scale: {value}")]
                }
                _ => vec![format!("Error: invalid animation scale: {value}")],
            },
            _ => vec![UNSUPPORTED_DUMP.to_owned()],
        }
    }
}

/// One line per node under `root`, indented by depth.
fn tree_lines(
    store: &NodeStore,
    root: Option<NodeId>,
    describe: impl Fn(&NodeStore, NodeId) -> String,
) -> Vec<String> {
    let Some(root) = root else {
        return vec!["no root".to_owned()];
    };
    let base = store.depth(root);
    store
        .descendants(root)
        .map(|id| {
            let indent = "  ".repeat(store.depth(id) - base);
            format!("{indent}{}", describe(store, id))
        })
        .collect()
}

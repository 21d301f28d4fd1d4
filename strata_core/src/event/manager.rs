// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event routing with per-gesture cached target chains.
//!
//! A chain is computed once when a gesture starts (touch down, mouse press,
//! axis begin, key down) and reused by every later sample of that gesture
//! until a terminating sample clears it. Re-testing mid-gesture would let a
//! layout change move the gesture to a different node.
//!
//! Chains hold [`NodeId`]s only. A target destroyed mid-gesture is skipped
//! silently when its turn comes.

use std::collections::HashMap;

use kurbo::Point;

use super::hit_test::{HitMode, TouchTarget, hit_test, touch_test};
use super::types::{
    AxisAction, AxisEvent, HoverChange, KeyAction, KeyCode, KeyEvent, MouseAction, MouseEvent,
    TouchEvent, TouchRestrict, TouchType,
};
use crate::node::{NodeId, NodeStore};

/// Routes input samples to node handlers.
#[derive(Debug, Default)]
pub struct EventManager {
    touch_results: HashMap<i32, Vec<TouchTarget>>,
    mouse_chain: Vec<NodeId>,
    hovered: Vec<NodeId>,
    axis_chain: Vec<NodeId>,
    key_chains: HashMap<KeyCode, Vec<NodeId>>,
}

impl EventManager {
    /// Creates a manager with no cached chains.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Touch --

    /// Hit-tests `event` from `root` and caches the chain for its pointer id.
    ///
    /// Returns the chain length. A missing root caches an empty chain.
    pub fn touch_test(
        &mut self,
        store: &NodeStore,
        root: Option<NodeId>,
        event: &TouchEvent,
        restrict: TouchRestrict,
    ) -> usize {
        let chain = match root {
            Some(root) => touch_test(store, root, event.point, restrict),
            None => Vec::new(),
        };
        tracing::debug!(
            pointer = event.id,
            x = event.point.x,
            y = event.point.y,
            targets = chain.len(),
            "touch test"
        );
        let len = chain.len();
        self.touch_results.insert(event.id, chain);
        len
    }

    /// Delivers `event` front-to-back through its pointer's cached chain.
    ///
    /// Stops at the first handler that consumes the sample and returns
    /// whether any did. Up and Cancel clear the chain after delivery.
    pub fn dispatch_touch_event(&mut self, store: &mut NodeStore, event: &TouchEvent) -> bool {
        let Some(chain) = self.touch_results.get(&event.id) else {
            tracing::debug!(pointer = event.id, "no touch chain for pointer");
            return false;
        };
        let mut consumed = false;
        for target in chain {
            if !store.is_alive(target.node) {
                continue;
            }
            if let Some(handler) = store.handlers[target.node.idx as usize].touch.as_mut()
                && handler(event, target.allowed)
            {
                consumed = true;
                break;
            }
        }
        if event.kind.is_terminal() {
            self.touch_results.remove(&event.id);
        }
        consumed
    }

    /// Tests on Down, then dispatches. Every other sample reuses the chain.
    pub fn handle_touch(
        &mut self,
        store: &mut NodeStore,
        root: Option<NodeId>,
        event: &TouchEvent,
        restrict: TouchRestrict,
    ) -> bool {
        if event.kind == TouchType::Down {
            self.touch_test(store, root, event, restrict);
        }
        self.dispatch_touch_event(store, event)
    }

    /// The cached chain for a pointer, if a gesture is in progress.
    #[must_use]
    pub fn touch_chain(&self, pointer: i32) -> Option<&[TouchTarget]> {
        self.touch_results.get(&pointer).map(Vec::as_slice)
    }

    // -- Mouse --

    /// Delivers a mouse sample.
    ///
    /// Press fixes the chain, release delivers to it and clears it, and
    /// other samples reuse a fixed chain or test afresh without caching.
    pub fn dispatch_mouse_event(
        &mut self,
        store: &mut NodeStore,
        root: Option<NodeId>,
        event: &MouseEvent,
    ) -> bool {
        let fresh = |store: &NodeStore| mouse_test(store, root, event.point);
        let chain = match event.action {
            MouseAction::Press => {
                self.mouse_chain = fresh(store);
                self.mouse_chain.clone()
            }
            MouseAction::Release => {
                if self.mouse_chain.is_empty() {
                    fresh(store)
                } else {
                    core::mem::take(&mut self.mouse_chain)
                }
            }
            MouseAction::Move | MouseAction::None => {
                if self.mouse_chain.is_empty() {
                    fresh(store)
                } else {
                    self.mouse_chain.clone()
                }
            }
        };

        for node in chain {
            if !store.is_alive(node) {
                continue;
            }
            if let Some(handler) = store.handlers[node.idx as usize].mouse.as_mut()
                && handler(event)
            {
                return true;
            }
        }
        false
    }

    /// Recomputes the hovered set at `point` and fires exit then enter
    /// for nodes whose membership changed.
    ///
    /// Returns whether the hovered set changed.
    pub fn dispatch_mouse_hover_event(
        &mut self,
        store: &mut NodeStore,
        root: Option<NodeId>,
        point: Point,
    ) -> bool {
        let current: Vec<NodeId> = match root {
            Some(root) => hit_test(
                store,
                root,
                point,
                HitMode::All,
                TouchRestrict::NONE,
                &|h| h.hover.is_some(),
            )
            .into_iter()
            .map(|t| t.node)
            .collect(),
            None => Vec::new(),
        };
        let previous = core::mem::replace(&mut self.hovered, current);

        let mut changed = false;
        for &node in &previous {
            if !self.hovered.contains(&node) {
                changed = true;
                notify_hover(store, node, HoverChange::Exit);
            }
        }
        for &node in &self.hovered {
            if !previous.contains(&node) {
                changed = true;
                notify_hover(store, node, HoverChange::Enter);
            }
        }
        changed
    }

    /// Nodes currently under the mouse, innermost-first.
    #[must_use]
    pub fn hovered(&self) -> &[NodeId] {
        &self.hovered
    }

    /// Fires exit for every hovered node and forgets them.
    pub fn clear_hover(&mut self, store: &mut NodeStore) {
        for node in core::mem::take(&mut self.hovered) {
            notify_hover(store, node, HoverChange::Exit);
        }
    }

    // -- Axis --

    /// Delivers an axis sample. Begin fixes the chain, End clears it.
    pub fn dispatch_axis_event(
        &mut self,
        store: &mut NodeStore,
        root: Option<NodeId>,
        event: &AxisEvent,
    ) -> bool {
        let fresh = |store: &NodeStore| -> Vec<NodeId> {
            match root {
                Some(root) => hit_test(
                    store,
                    root,
                    event.point,
                    HitMode::First,
                    TouchRestrict::NONE,
                    &|h| h.axis.is_some(),
                )
                .into_iter()
                .map(|t| t.node)
                .collect(),
                None => Vec::new(),
            }
        };
        let chain = match event.action {
            AxisAction::Begin => {
                self.axis_chain = fresh(store);
                self.axis_chain.clone()
            }
            AxisAction::Update if !self.axis_chain.is_empty() => self.axis_chain.clone(),
            AxisAction::End if !self.axis_chain.is_empty() => core::mem::take(&mut self.axis_chain),
            _ => fresh(store),
        };

        for node in chain {
            if !store.is_alive(node) {
                continue;
            }
            if let Some(handler) = store.handlers[node.idx as usize].axis.as_mut()
                && handler(event)
            {
                return true;
            }
        }
        false
    }

    // -- Keys --

    /// Delivers a key event up the focus path.
    ///
    /// Key down fixes the chain (focused node, then its ancestors) for that
    /// key; key up delivers to the fixed chain and clears it.
    pub fn dispatch_key_event(
        &mut self,
        store: &mut NodeStore,
        focused: Option<NodeId>,
        event: &KeyEvent,
    ) -> bool {
        let chain = match event.action {
            KeyAction::Down => {
                let chain = focus_path(store, focused);
                self.key_chains.insert(event.code, chain.clone());
                chain
            }
            KeyAction::Up => self
                .key_chains
                .remove(&event.code)
                .unwrap_or_else(|| focus_path(store, focused)),
            KeyAction::LongPress | KeyAction::Click => self
                .key_chains
                .get(&event.code)
                .cloned()
                .unwrap_or_else(|| focus_path(store, focused)),
        };

        for node in chain {
            if !store.is_alive(node) {
                continue;
            }
            if let Some(handler) = store.handlers[node.idx as usize].key.as_mut()
                && handler(event)
            {
                return true;
            }
        }
        false
    }

    // -- Housekeeping --

    /// Forgets every cached chain and the hovered set without notifying.
    pub fn clear_results(&mut self) {
        self.touch_results.clear();
        self.mouse_chain.clear();
        self.hovered.clear();
        self.axis_chain.clear();
        self.key_chains.clear();
    }

    /// Number of pointers with a gesture in progress.
    #[must_use]
    pub fn active_pointers(&self) -> usize {
        self.touch_results.len()
    }
}

fn mouse_test(store: &NodeStore, root: Option<NodeId>, point: Point) -> Vec<NodeId> {
    match root {
        Some(root) => hit_test(
            store,
            root,
            point,
            HitMode::All,
            TouchRestrict::NONE,
            &|h| h.mouse.is_some(),
        )
        .into_iter()
        .map(|t| t.node)
        .collect(),
        None => Vec::new(),
    }
}

fn focus_path(store: &NodeStore, focused: Option<NodeId>) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut cur = focused.filter(|&n| store.is_alive(n));
    while let Some(node) = cur {
        if store.handlers[node.idx as usize].key.is_some() {
            path.push(node);
        }
        cur = store.parent(node);
    }
    path
}

fn notify_hover(store: &mut NodeStore, node: NodeId, change: HoverChange) {
    if !store.is_alive(node) {
        return;
    }
    if let Some(handler) = store.handlers[node.idx as usize].hover.as_mut() {
        handler(change);
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The three behavior interfaces a node can carry, and their contexts.
//!
//! Behaviors are stored as boxed trait objects next to the node. To call
//! one, the store takes the box out of its slot, hands the behavior a
//! context that may borrow the store mutably, and puts the box back if the
//! node is still alive afterwards. A behavior can therefore restructure the
//! tree around itself, including destroying its own node.

use kurbo::{Point, Rect, Size};
use serde::Serialize;

use super::id::NodeId;
use super::store::{DirtyBits, NodeKind, NodeStore};
use crate::dirty;
use crate::error::NodeError;

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Rebuilds a node's children from logical state.
pub trait Buildable {
    /// Called in the Build phase when the node is build-dirty.
    fn build(&mut self, cx: &mut BuildCx<'_>);

    /// State to persist under the node's restoration key. Empty means
    /// nothing to save.
    fn restore_info(&self) -> String {
        String::new()
    }

    /// Receives the payload saved under the node's restoration key.
    fn restore(&mut self, _info: &str) {}
}

/// Context handed to [`Buildable::build`].
#[derive(Debug)]
pub struct BuildCx<'a> {
    store: &'a mut NodeStore,
    node: NodeId,
}

impl<'a> BuildCx<'a> {
    pub(crate) fn new(store: &'a mut NodeStore, node: NodeId) -> Self {
        Self { store, node }
    }

    /// The node being built.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Read access to the tree.
    #[must_use]
    pub fn store(&self) -> &NodeStore {
        self.store
    }

    /// Write access to the tree.
    pub fn store_mut(&mut self) -> &mut NodeStore {
        self.store
    }

    /// Creates a node and appends it to the node being built.
    pub fn add_child(&mut self, kind: NodeKind) -> NodeId {
        let child = self.store.create_node(kind);
        self.store.add_child(self.node, child);
        child
    }

    /// Detaches and destroys every child subtree.
    pub fn clear_children(&mut self) {
        let kids: Vec<NodeId> = self.store.children(self.node).collect();
        for kid in kids {
            self.store.remove_from_parent(kid);
            self.store.destroy_subtree(kid);
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Computes a node's size and places its children.
pub trait Layoutable {
    /// Returns the node's new size. On error the node keeps its previous
    /// geometry.
    fn layout(&mut self, cx: &mut LayoutCx<'_>) -> Result<Size, NodeError>;
}

/// Context handed to [`Layoutable::layout`].
#[derive(Debug)]
pub struct LayoutCx<'a> {
    store: &'a mut NodeStore,
    node: NodeId,
    available: Size,
}

impl LayoutCx<'_> {
    /// The node being laid out.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Space offered by the parent.
    #[must_use]
    pub fn available(&self) -> Size {
        self.available
    }

    /// Read access to the tree.
    #[must_use]
    pub fn store(&self) -> &NodeStore {
        self.store
    }

    /// The node's children in insertion order.
    #[must_use]
    pub fn children(&self) -> Vec<NodeId> {
        self.store.children(self.node).collect()
    }

    /// Lays out `child` within `available` and returns its size.
    pub fn layout_child(&mut self, child: NodeId, available: Size) -> Size {
        self.store.layout_node(child, available)
    }

    /// Moves `child` to `origin` in this node's coordinate space.
    pub fn place_child(&mut self, child: NodeId, origin: Point) {
        self.store.set_origin(child, origin);
    }
}

// ---------------------------------------------------------------------------
// Paint
// ---------------------------------------------------------------------------

/// Records a node's drawing.
pub trait Paintable {
    /// Called when the node's repaint boundary repaints.
    fn paint(&mut self, cx: &mut PaintCx);

    /// Called in the PaintFinish phase if [`PaintCx::request_paint_finish`]
    /// was used.
    fn paint_finish(&mut self) {}
}

/// Packed `0xRRGGBBAA` color.
pub type Color = u32;

/// One recorded drawing operation, in global coordinates.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Filled rectangle.
    FillRect {
        /// Area.
        #[serde(serialize_with = "ser_rect")]
        rect: Rect,
        /// Fill color.
        color: Color,
    },
    /// Rectangle outline.
    StrokeRect {
        /// Area.
        #[serde(serialize_with = "ser_rect")]
        rect: Rect,
        /// Stroke color.
        color: Color,
        /// Stroke width.
        width: f64,
    },
}

fn ser_rect<S: serde::Serializer>(rect: &Rect, s: S) -> Result<S::Ok, S::Error> {
    [rect.x0, rect.y0, rect.x1, rect.y1].serialize(s)
}

/// The drawing one node recorded in a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayItem {
    /// Which node drew this.
    pub node: NodeId,
    /// The node's global rect when it painted.
    pub bounds: Rect,
    /// What it drew.
    pub commands: Vec<DrawCommand>,
}

/// Context handed to [`Paintable::paint`].
#[derive(Debug)]
pub struct PaintCx {
    node: NodeId,
    bounds: Rect,
    commands: Vec<DrawCommand>,
    wants_finish: bool,
}

impl PaintCx {
    fn new(node: NodeId, bounds: Rect) -> Self {
        Self {
            node,
            bounds,
            commands: Vec::new(),
            wants_finish: false,
        }
    }

    /// The node being painted.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The node's global rect.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Fills `rect`, given relative to the node's origin.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let rect = rect + self.bounds.origin().to_vec2();
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    /// Strokes `rect`, given relative to the node's origin.
    pub fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64) {
        let rect = rect + self.bounds.origin().to_vec2();
        self.commands.push(DrawCommand::StrokeRect { rect, color, width });
    }

    /// Fills the node's whole area.
    pub fn fill_bounds(&mut self, color: Color) {
        self.commands.push(DrawCommand::FillRect {
            rect: self.bounds,
            color,
        });
    }

    /// Asks for a [`Paintable::paint_finish`] call later this frame.
    pub fn request_paint_finish(&mut self) {
        self.wants_finish = true;
    }
}

// ---------------------------------------------------------------------------
// Driving behaviors from the store
// ---------------------------------------------------------------------------

impl NodeStore {
    /// Runs the node's build behavior and clears its build bit.
    ///
    /// Returns `false` if the node has no build behavior.
    pub(crate) fn run_build(&mut self, id: NodeId) -> bool {
        self.clear_bits(id.idx, DirtyBits::BUILD);
        let i = id.idx as usize;
        let Some(mut builder) = self.builder[i].take() else {
            return false;
        };
        builder.build(&mut BuildCx::new(self, id));
        if self.is_alive(id) && self.builder[i].is_none() {
            self.builder[i] = Some(builder);
        }
        true
    }

    /// Lays out `id` within `available` and returns its resulting size.
    ///
    /// A node without a layout behavior keeps its size and lays out any
    /// layout-dirty children at their current sizes.
    pub(crate) fn layout_node(&mut self, id: NodeId, available: Size) -> Size {
        if !self.is_alive(id) {
            return Size::ZERO;
        }
        self.clear_bits(id.idx, DirtyBits::LAYOUT);
        let i = id.idx as usize;

        let Some(mut layouter) = self.layouter[i].take() else {
            let kids: Vec<NodeId> = self.children(id).collect();
            for kid in kids {
                if self.dirty_bits(kid).contains(DirtyBits::LAYOUT) {
                    let size = self.paint_rect(kid).size();
                    self.layout_node(kid, size);
                }
            }
            return self.paint_rect[i].size();
        };

        let result = layouter.layout(&mut LayoutCx {
            store: self,
            node: id,
            available,
        });
        if !self.is_alive(id) {
            return Size::ZERO;
        }
        if self.layouter[i].is_none() {
            self.layouter[i] = Some(layouter);
        }
        match result {
            Ok(size) => {
                self.set_size(id, size);
                size
            }
            Err(err) => {
                tracing::warn!(node = %id, %err, "layout failed, keeping previous geometry");
                self.paint_rect[i].size()
            }
        }
    }

    /// Paints `id` and its visible subtree in z order, appending display
    /// items and clearing paint bits.
    pub(crate) fn paint_subtree(&mut self, id: NodeId, out: &mut Vec<DisplayItem>) {
        let i = id.idx as usize;
        self.clear_bits(id.idx, DirtyBits::PAINT);
        if !self.flags[i].visible {
            return;
        }
        if let Some(painter) = self.painter[i].as_mut() {
            let mut cx = PaintCx::new(id, self.global_rect[i]);
            painter.paint(&mut cx);
            if cx.wants_finish {
                self.mark(id.idx, dirty::PAINT_FINISH);
            }
            if !cx.commands.is_empty() {
                out.push(DisplayItem {
                    node: id,
                    bounds: cx.bounds,
                    commands: cx.commands,
                });
            }
        }
        for kid in self.children_by_z(id) {
            self.paint_subtree(kid, out);
        }
    }

    /// Delivers the paint-finish notification.
    pub(crate) fn run_paint_finish(&mut self, id: NodeId) {
        if let Some(painter) = self.painter[id.idx as usize].as_mut() {
            painter.paint_finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    struct Fixed(Size);

    impl Layoutable for Fixed {
        fn layout(&mut self, _cx: &mut LayoutCx<'_>) -> Result<Size, NodeError> {
            Ok(self.0)
        }
    }

    struct Row;

    impl Layoutable for Row {
        fn layout(&mut self, cx: &mut LayoutCx<'_>) -> Result<Size, NodeError> {
            let mut x = 0.0;
            let mut height: f64 = 0.0;
            for kid in cx.children() {
                let size = cx.layout_child(kid, cx.available());
                cx.place_child(kid, Point::new(x, 0.0));
                x += size.width;
                height = height.max(size.height);
            }
            Ok(Size::new(x, height))
        }
    }

    struct Broken;

    impl Layoutable for Broken {
        fn layout(&mut self, _cx: &mut LayoutCx<'_>) -> Result<Size, NodeError> {
            Err(NodeError::layout("no fit"))
        }
    }

    struct Swatch(Color, Rc<Cell<u32>>);

    impl Paintable for Swatch {
        fn paint(&mut self, cx: &mut PaintCx) {
            cx.fill_bounds(self.0);
            cx.request_paint_finish();
        }

        fn paint_finish(&mut self) {
            self.1.set(self.1.get() + 1);
        }
    }

    struct Spawner(usize);

    impl Buildable for Spawner {
        fn build(&mut self, cx: &mut BuildCx<'_>) {
            cx.clear_children();
            for _ in 0..self.0 {
                cx.add_child(NodeKind::Leaf);
            }
        }
    }

    #[test]
    fn row_places_children_side_by_side() {
        let mut store = NodeStore::new();
        let row = store.create_node(NodeKind::Container);
        let a = store.create_node(NodeKind::Leaf);
        let b = store.create_node(NodeKind::Leaf);
        store.add_child(row, a);
        store.add_child(row, b);
        store.set_layouter(row, Row);
        store.set_layouter(a, Fixed(Size::new(30.0, 10.0)));
        store.set_layouter(b, Fixed(Size::new(20.0, 40.0)));

        let size = store.layout_node(row, Size::new(500.0, 500.0));
        assert_eq!(size, Size::new(50.0, 40.0));
        assert_eq!(store.paint_rect(b), Rect::new(30.0, 0.0, 50.0, 40.0));
        assert!(!store.dirty_bits(a).contains(DirtyBits::LAYOUT));
    }

    #[test]
    fn layout_error_keeps_geometry() {
        let mut store = NodeStore::new();
        let n = store.create_node(NodeKind::Leaf);
        store.set_paint_rect(n, Rect::new(0.0, 0.0, 7.0, 9.0));
        store.set_layouter(n, Broken);
        let size = store.layout_node(n, Size::new(100.0, 100.0));
        assert_eq!(size, Size::new(7.0, 9.0));
        assert_eq!(store.paint_rect(n), Rect::new(0.0, 0.0, 7.0, 9.0));
    }

    #[test]
    fn build_replaces_children() {
        let mut store = NodeStore::new();
        let root = store.create_node(NodeKind::Root);
        store.set_builder(root, Spawner(3));
        assert!(store.run_build(root));
        assert_eq!(store.children(root).count(), 3);
        assert!(store.run_build(root));
        assert_eq!(store.children(root).count(), 3, "old children are destroyed");
        assert_eq!(store.live_count(), 4);
    }

    #[test]
    fn paint_skips_hidden_and_requests_finish() {
        let finished = Rc::new(Cell::new(0));
        let mut store = NodeStore::new();
        let root = store.create_node(NodeKind::Root);
        let shown = store.create_node(NodeKind::Leaf);
        let hidden = store.create_node(NodeKind::Leaf);
        store.add_child(root, shown);
        store.add_child(root, hidden);
        store.set_paint_rect(shown, Rect::new(10.0, 10.0, 20.0, 20.0));
        store.set_painter(shown, Swatch(0xff00_00ff, finished.clone()));
        store.set_painter(hidden, Swatch(0x00ff_00ff, finished.clone()));
        store.update_flags(hidden, |f| f.visible = false);
        let _ = store.sync_geometry();

        let mut items = Vec::new();
        store.paint_subtree(root, &mut items);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].node, shown);
        assert_eq!(items[0].bounds, Rect::new(10.0, 10.0, 20.0, 20.0));

        for id in store.drain_channel(dirty::PAINT_FINISH) {
            store.run_paint_finish(id);
        }
        assert_eq!(finished.get(), 1);
    }

    #[test]
    fn draw_commands_serialize_as_tagged_json() {
        let cmd = DrawCommand::FillRect {
            rect: Rect::new(0.0, 0.0, 1.0, 2.0),
            color: 7,
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["op"], "fill_rect");
        assert_eq!(json["rect"], serde_json::json!([0.0, 0.0, 1.0, 2.0]));
    }
}

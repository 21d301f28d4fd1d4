// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and dirty marking.

use core::fmt;

use kurbo::{Point, Rect, Size, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::behavior::{Buildable, Layoutable, Paintable};
use super::id::{INVALID, NodeId};
use super::traverse::{Children, Descendants};
use crate::dirty::{self, DirtySet};
use crate::event::{
    AxisEvent, AxisHandler, EventHandlers, GestureMask, HoverChange, HoverHandler, KeyEvent,
    KeyHandler, MouseEvent, MouseHandler, TouchEvent, TouchHandler, VisibilityHandler,
};

/// The closed set of node variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Top of a tree. Never a child.
    Root,
    /// Holds ordered children.
    Container,
    /// Draws content, has no children.
    Leaf,
}

/// Per-node boolean flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeFlags {
    /// Whether the node and its subtree are drawn and hit-testable.
    pub visible: bool,
    /// Disabled nodes and their subtrees are skipped by hit testing.
    pub disabled: bool,
    /// Whether the node can hold keyboard focus.
    pub focusable: bool,
    /// Paint invalidation stops here; the subtree repaints as one unit.
    pub repaint_boundary: bool,
    /// Layout invalidation stops here.
    pub layout_boundary: bool,
    /// The node is playing a disappearing transition after removal.
    pub disappearing: bool,
    /// The node's global rect is reported to the surface as a blur region.
    pub window_blur: bool,
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self {
            visible: true,
            disabled: false,
            focusable: false,
            repaint_boundary: false,
            layout_boundary: false,
            disappearing: false,
            window_blur: false,
        }
    }
}

/// Per-node dirty-state bitmask.
///
/// The bits mark every node on a propagation path; the tracker channels in
/// [`dirty`] hold only the node that owns the work (the nearest boundary).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DirtyBits(u8);

impl DirtyBits {
    /// Needs rebuild.
    pub const BUILD: Self = Self(1 << 0);
    /// Needs layout.
    pub const LAYOUT: Self = Self(1 << 1);
    /// Needs repaint.
    pub const PAINT: Self = Self(1 << 2);

    /// Returns `true` if every bit in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl fmt::Debug for DirtyBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::BUILD) {
            names.push("build");
        }
        if self.contains(Self::LAYOUT) {
            names.push("layout");
        }
        if self.contains(Self::PAINT) {
            names.push("paint");
        }
        write!(f, "DirtyBits({})", names.join("|"))
    }
}

/// Struct-of-arrays storage for the render tree.
///
/// Nodes are addressed by [`NodeId`] handles. Each node occupies a slot in
/// parallel arrays; destroyed nodes are recycled through a free list and a
/// per-slot generation counter makes stale handles detectable.
///
/// Every mutator marks the matching dirty channel and raises the
/// [`needs_frame`](Self::take_needs_frame) flag so the pipeline can request a
/// vsync.
pub struct NodeStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) kind: Vec<NodeKind>,

    // -- Geometry --
    /// Relative to the parent's origin.
    pub(crate) paint_rect: Vec<Rect>,
    /// Absolute, written by [`sync_geometry`](Self::sync_geometry).
    pub(crate) global_rect: Vec<Rect>,
    /// Hit regions in the parent's coordinate space; `None` means the paint rect.
    pub(crate) touch_rects: Vec<Option<Vec<Rect>>>,
    pub(crate) z_index: Vec<i32>,

    // -- State --
    pub(crate) flags: Vec<NodeFlags>,
    pub(crate) dirty_bits: Vec<DirtyBits>,
    pub(crate) gestures: Vec<GestureMask>,
    pub(crate) forbid: Vec<GestureMask>,
    pub(crate) label: Vec<Option<String>>,

    // -- Behaviors and callbacks --
    pub(crate) builder: Vec<Option<Box<dyn Buildable>>>,
    pub(crate) layouter: Vec<Option<Box<dyn Layoutable>>>,
    pub(crate) painter: Vec<Option<Box<dyn Paintable>>>,
    pub(crate) handlers: Vec<EventHandlers>,
    pub(crate) visibility: Vec<Option<VisibilityHandler>>,
    pub(crate) last_visible: Vec<bool>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,
    // One bit per dirty set marked since its last drain.
    pending: u8,
    needs_frame: bool,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeStore")
            .field("len", &self.len)
            .field("free", &self.free_list.len())
            .field("needs_frame", &self.needs_frame)
            .finish_non_exhaustive()
    }
}

impl NodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            kind: Vec::new(),
            paint_rect: Vec::new(),
            global_rect: Vec::new(),
            touch_rects: Vec::new(),
            z_index: Vec::new(),
            flags: Vec::new(),
            dirty_bits: Vec::new(),
            gestures: Vec::new(),
            forbid: Vec::new(),
            label: Vec::new(),
            builder: Vec::new(),
            layouter: Vec::new(),
            painter: Vec::new(),
            handlers: Vec::new(),
            visibility: Vec::new(),
            last_visible: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending: 0,
            needs_frame: false,
        }
    }

    // -- Allocation API --

    /// Creates a detached node and returns its handle.
    ///
    /// The node starts visible, with an empty paint rect, no behaviors, and
    /// build-dirty.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.kind[i] = kind;
            self.paint_rect[i] = Rect::ZERO;
            self.global_rect[i] = Rect::ZERO;
            self.touch_rects[i] = None;
            self.z_index[i] = 0;
            self.flags[i] = NodeFlags::default();
            self.dirty_bits[i] = DirtyBits::default();
            self.gestures[i] = GestureMask::NONE;
            self.forbid[i] = GestureMask::NONE;
            self.label[i] = None;
            self.last_visible[i] = false;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.kind.push(kind);
            self.paint_rect.push(Rect::ZERO);
            self.global_rect.push(Rect::ZERO);
            self.touch_rects.push(None);
            self.z_index.push(0);
            self.flags.push(NodeFlags::default());
            self.dirty_bits.push(DirtyBits::default());
            self.gestures.push(GestureMask::NONE);
            self.forbid.push(GestureMask::NONE);
            self.label.push(None);
            self.builder.push(None);
            self.layouter.push(None);
            self.painter.push(None);
            self.handlers.push(EventHandlers::default());
            self.visibility.push(None);
            self.last_visible.push(false);
            self.generation.push(0);
            idx
        };

        let id = NodeId {
            idx,
            generation: self.generation[idx as usize],
        };
        self.mark_needs_build(id);
        id
    }

    /// Destroys a childless node, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the node has children or if the handle is stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy node with children"
        );

        if self.parent[idx as usize] != INVALID {
            let p = self.parent[idx as usize];
            self.unlink_from_parent(idx);
            self.mark_render_at(p);
        }

        self.dirty.remove_key(idx);

        let i = idx as usize;
        self.builder[i] = None;
        self.layouter[i] = None;
        self.painter[i] = None;
        self.handlers[i] = EventHandlers::default();
        self.visibility[i] = None;
        self.label[i] = None;
        self.touch_rects[i] = None;

        self.generation[i] += 1;
        self.free_list.push(idx);
        self.needs_frame = true;
    }

    /// Destroys `id` and every node below it, children first.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_subtree(&mut self, id: NodeId) {
        self.validate(id);
        let mut order: Vec<NodeId> = self.descendants(id).collect();
        while let Some(node) = order.pop() {
            self.destroy_node(node);
        }
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Number of live nodes.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Topology API --

    /// Appends `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, `child` already has a parent,
    /// `child` is a root, or `parent` is a leaf.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        self.check_attach(p, c);

        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        self.attached(p, c);
    }

    /// Inserts `child` before `sibling` under `sibling`'s parent.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, or
    /// `sibling` has no parent.
    pub fn insert_before(&mut self, child: NodeId, sibling: NodeId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");
        self.check_attach(p, c);

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        self.attached(p, c);
    }

    /// Detaches `child` from its parent. The subtree stays alive.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn remove_from_parent(&mut self, child: NodeId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "node has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);
        self.dirty.remove_dependency(c, p, dirty::GEOMETRY.channel());
        self.mark_eager(c, dirty::GEOMETRY);

        self.mark_layout_at(p);
        self.mark_render_at(p);
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.handle(self.parent[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a node, in insertion
    /// order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns `id` and every node below it in pre-order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        self.validate(id);
        Descendants::new(self, id.idx)
    }

    /// Returns the direct children stably sorted by ascending z-index, so the
    /// topmost child comes last.
    #[must_use]
    pub fn children_by_z(&self, id: NodeId) -> Vec<NodeId> {
        let mut kids: Vec<NodeId> = self.children(id).collect();
        kids.sort_by_key(|c| self.z_index[c.idx as usize]);
        kids
    }

    /// Number of ancestors above `id`.
    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        self.validate(id);
        self.depth_at(id.idx)
    }

    // -- Property getters --

    /// Returns the node's variant.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.validate(id);
        self.kind[id.idx as usize]
    }

    /// Returns the paint rect, relative to the parent's origin.
    #[must_use]
    pub fn paint_rect(&self, id: NodeId) -> Rect {
        self.validate(id);
        self.paint_rect[id.idx as usize]
    }

    /// Returns the absolute rect computed by the last geometry sync.
    #[must_use]
    pub fn global_rect(&self, id: NodeId) -> Rect {
        self.validate(id);
        self.global_rect[id.idx as usize]
    }

    /// Returns the node's hit regions in its parent's coordinate space.
    #[must_use]
    pub fn touch_rects(&self, id: NodeId) -> Vec<Rect> {
        self.validate(id);
        let i = id.idx as usize;
        match &self.touch_rects[i] {
            Some(rects) => rects.clone(),
            None => vec![self.paint_rect[i]],
        }
    }

    /// Returns the stacking order among siblings.
    #[must_use]
    pub fn z_index(&self, id: NodeId) -> i32 {
        self.validate(id);
        self.z_index[id.idx as usize]
    }

    /// Returns the node's flags.
    #[must_use]
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns the node's pending dirty bits.
    #[must_use]
    pub fn dirty_bits(&self, id: NodeId) -> DirtyBits {
        self.validate(id);
        self.dirty_bits[id.idx as usize]
    }

    /// Returns the gesture classes the node recognizes.
    #[must_use]
    pub fn gestures(&self, id: NodeId) -> GestureMask {
        self.validate(id);
        self.gestures[id.idx as usize]
    }

    /// Returns the gesture classes the node forbids for its subtree.
    #[must_use]
    pub fn forbidden_gestures(&self, id: NodeId) -> GestureMask {
        self.validate(id);
        self.forbid[id.idx as usize]
    }

    /// Returns the diagnostic label.
    #[must_use]
    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.validate(id);
        self.label[id.idx as usize].as_deref()
    }

    /// Whether the node and all of its ancestors are visible.
    #[must_use]
    pub fn is_effectively_visible(&self, id: NodeId) -> bool {
        self.validate(id);
        let mut cur = id.idx;
        while cur != INVALID {
            if !self.flags[cur as usize].visible {
                return false;
            }
            cur = self.parent[cur as usize];
        }
        true
    }

    /// Whether a touch handler is attached.
    #[must_use]
    pub fn has_touch_handler(&self, id: NodeId) -> bool {
        self.validate(id);
        self.handlers[id.idx as usize].has_touch()
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets the paint rect, relative to the parent's origin.
    ///
    /// Marks the node and its descendants geometry-dirty and requests a
    /// repaint of both the node and its parent.
    pub fn set_paint_rect(&mut self, id: NodeId, rect: Rect) {
        self.validate(id);
        let i = id.idx as usize;
        if self.paint_rect[i] == rect {
            return;
        }
        self.paint_rect[i] = rect;
        self.mark_eager(id.idx, dirty::GEOMETRY);
        self.mark_render_at(id.idx);
        if self.parent[i] != INVALID {
            self.mark_render_at(self.parent[i]);
        }
    }

    /// Changes the paint rect's size, keeping its origin.
    pub fn set_size(&mut self, id: NodeId, size: Size) {
        let origin = self.paint_rect(id).origin();
        self.set_paint_rect(id, Rect::from_origin_size(origin, size));
    }

    /// Moves the paint rect, keeping its size.
    pub fn set_origin(&mut self, id: NodeId, origin: Point) {
        let size = self.paint_rect(id).size();
        self.set_paint_rect(id, Rect::from_origin_size(origin, size));
    }

    /// Replaces the hit regions. `None` restores the paint-rect default.
    pub fn set_touch_rects(&mut self, id: NodeId, rects: Option<Vec<Rect>>) {
        self.validate(id);
        self.touch_rects[id.idx as usize] = rects;
    }

    /// Sets the stacking order among siblings and repaints the parent.
    pub fn set_z_index(&mut self, id: NodeId, z: i32) {
        self.validate(id);
        let i = id.idx as usize;
        if self.z_index[i] == z {
            return;
        }
        self.z_index[i] = z;
        let p = self.parent[i];
        self.mark_render_at(if p == INVALID { id.idx } else { p });
    }

    /// Replaces the node's flags.
    ///
    /// Visibility changes repaint the node's parent; focusability and
    /// visibility changes mark the focus channel.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) {
        self.validate(id);
        let i = id.idx as usize;
        let old = self.flags[i];
        if old == flags {
            return;
        }
        self.flags[i] = flags;
        if old.visible != flags.visible || old.focusable != flags.focusable {
            self.mark(id.idx, dirty::FOCUS);
        }
        if old.visible != flags.visible {
            let p = self.parent[i];
            self.mark_render_at(if p == INVALID { id.idx } else { p });
        }
        self.mark_render_at(id.idx);
    }

    /// Updates the flags through a closure.
    pub fn update_flags(&mut self, id: NodeId, f: impl FnOnce(&mut NodeFlags)) {
        let mut flags = self.flags(id);
        f(&mut flags);
        self.set_flags(id, flags);
    }

    /// Sets the gesture classes the node recognizes.
    pub fn set_gestures(&mut self, id: NodeId, mask: GestureMask) {
        self.validate(id);
        self.gestures[id.idx as usize] = mask;
    }

    /// Sets the gesture classes the node forbids for itself and its subtree.
    pub fn set_forbidden_gestures(&mut self, id: NodeId, mask: GestureMask) {
        self.validate(id);
        self.forbid[id.idx as usize] = mask;
    }

    /// Sets the diagnostic label shown in dumps.
    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) {
        self.validate(id);
        self.label[id.idx as usize] = Some(label.into());
    }

    // -- Behaviors and callbacks --

    /// Attaches the build behavior and marks the node build-dirty.
    pub fn set_builder(&mut self, id: NodeId, builder: impl Buildable + 'static) {
        self.validate(id);
        self.builder[id.idx as usize] = Some(Box::new(builder));
        self.mark_needs_build(id);
    }

    /// Attaches the layout behavior and marks the node layout-dirty.
    pub fn set_layouter(&mut self, id: NodeId, layouter: impl Layoutable + 'static) {
        self.validate(id);
        self.layouter[id.idx as usize] = Some(Box::new(layouter));
        self.mark_needs_layout(id);
    }

    /// Attaches the paint behavior and marks the node paint-dirty.
    pub fn set_painter(&mut self, id: NodeId, painter: impl Paintable + 'static) {
        self.validate(id);
        self.painter[id.idx as usize] = Some(Box::new(painter));
        self.mark_needs_render(id);
    }

    /// Attaches a touch handler; only nodes with one join touch target chains.
    pub fn on_touch(
        &mut self,
        id: NodeId,
        handler: impl FnMut(&TouchEvent, GestureMask) -> bool + 'static,
    ) {
        self.validate(id);
        let h: TouchHandler = Box::new(handler);
        self.handlers[id.idx as usize].touch = Some(h);
    }

    /// Attaches a mouse handler.
    pub fn on_mouse(&mut self, id: NodeId, handler: impl FnMut(&MouseEvent) -> bool + 'static) {
        self.validate(id);
        let h: MouseHandler = Box::new(handler);
        self.handlers[id.idx as usize].mouse = Some(h);
    }

    /// Attaches a hover enter/exit handler.
    pub fn on_hover(&mut self, id: NodeId, handler: impl FnMut(HoverChange) + 'static) {
        self.validate(id);
        let h: HoverHandler = Box::new(handler);
        self.handlers[id.idx as usize].hover = Some(h);
    }

    /// Attaches an axis handler.
    pub fn on_axis(&mut self, id: NodeId, handler: impl FnMut(&AxisEvent) -> bool + 'static) {
        self.validate(id);
        let h: AxisHandler = Box::new(handler);
        self.handlers[id.idx as usize].axis = Some(h);
    }

    /// Attaches a key handler.
    pub fn on_key(&mut self, id: NodeId, handler: impl FnMut(&KeyEvent) -> bool + 'static) {
        self.validate(id);
        let h: KeyHandler = Box::new(handler);
        self.handlers[id.idx as usize].key = Some(h);
    }

    /// Attaches a callback fired when the node's on-screen visibility flips.
    pub fn on_visibility_change(&mut self, id: NodeId, handler: impl FnMut(bool) + 'static) {
        self.validate(id);
        let i = id.idx as usize;
        self.visibility[i] = Some(Box::new(handler));
        self.last_visible[i] = false;
    }

    // -- Dirty marking --

    /// Marks the node for rebuild in the next Build phase.
    pub fn mark_needs_build(&mut self, id: NodeId) {
        self.validate(id);
        self.dirty_bits[id.idx as usize].insert(DirtyBits::BUILD);
        self.mark(id.idx, dirty::BUILD);
    }

    /// Marks the node for layout.
    ///
    /// Every node from `id` up to the nearest layout boundary (or the top of
    /// the tree) gets the layout bit; only the boundary enters the channel.
    pub fn mark_needs_layout(&mut self, id: NodeId) {
        self.validate(id);
        self.mark_layout_at(id.idx);
    }

    /// Marks the node for repaint.
    ///
    /// The work is owned by the nearest repaint boundary above `id` (or the
    /// top of the tree), which repaints its whole subtree.
    pub fn mark_needs_render(&mut self, id: NodeId) {
        self.validate(id);
        self.mark_render_at(id.idx);
    }

    /// Marks the node for focus revalidation.
    pub fn mark_focus_dirty(&mut self, id: NodeId) {
        self.validate(id);
        self.mark(id.idx, dirty::FOCUS);
    }

    /// Returns and clears the flag raised by every mutation since the last
    /// call.
    pub fn take_needs_frame(&mut self) -> bool {
        core::mem::take(&mut self.needs_frame)
    }

    /// Whether any dirty set was marked since the phase that drains it last
    /// ran.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.pending != 0
    }

    /// Drains a local channel into a `Vec` of live handles, shallowest first.
    ///
    /// Marks made while the caller iterates the result land in the next
    /// drain.
    pub(crate) fn drain_channel(&mut self, set: DirtySet) -> Vec<NodeId> {
        self.pending &= !set.bit();
        let drained: Vec<u32> = self
            .dirty
            .drain(set.channel())
            .deterministic()
            .run()
            .collect();
        let mut ids: Vec<NodeId> = drained
            .into_iter()
            .filter(|&idx| self.slot_alive(idx))
            .filter_map(|idx| self.handle(idx))
            .collect();
        ids.sort_by_cached_key(|id| self.depth_at(id.idx));
        ids
    }

    /// Clears a dirty bit after the owning phase processed the node.
    pub(crate) fn clear_bits(&mut self, idx: u32, bits: DirtyBits) {
        self.dirty_bits[idx as usize].remove(bits);
    }

    /// Recomputes global rects for every geometry-dirty node and its
    /// descendants, parents first. Returns the nodes whose global rect changed.
    pub fn sync_geometry(&mut self) -> Vec<NodeId> {
        self.pending &= !dirty::GEOMETRY.bit();
        let mut drained: Vec<u32> = self
            .dirty
            .drain(dirty::GEOMETRY.channel())
            .affected()
            .deterministic()
            .run()
            .collect();
        drained.retain(|&idx| self.slot_alive(idx));
        drained.sort_by_cached_key(|&idx| self.depth_at(idx));

        let mut changed = Vec::new();
        for idx in drained {
            let i = idx as usize;
            let p = self.parent[i];
            let offset = if p == INVALID {
                Vec2::ZERO
            } else {
                self.global_rect[p as usize].origin().to_vec2()
            };
            let global = self.paint_rect[i] + offset;
            if self.global_rect[i] != global {
                self.global_rect[i] = global;
                if let Some(id) = self.handle(idx) {
                    changed.push(id);
                }
            }
        }
        changed
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Builds the current handle for a raw slot index.
    pub(crate) fn handle(&self, idx: u32) -> Option<NodeId> {
        if idx == INVALID || idx >= self.len {
            return None;
        }
        Some(NodeId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    fn slot_alive(&self, idx: u32) -> bool {
        idx < self.len && !self.free_list.contains(&idx)
    }

    pub(crate) fn depth_at(&self, idx: u32) -> usize {
        let mut depth = 0;
        let mut cur = self.parent[idx as usize];
        while cur != INVALID {
            depth += 1;
            cur = self.parent[cur as usize];
        }
        depth
    }

    fn check_attach(&self, p: u32, c: u32) {
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        assert!(
            self.kind[c as usize] != NodeKind::Root,
            "a root node cannot be a child"
        );
        assert!(
            self.kind[p as usize] != NodeKind::Leaf,
            "leaf nodes cannot have children"
        );
    }

    fn attached(&mut self, p: u32, c: u32) {
        let _ = self.dirty.add_dependency(c, p, dirty::GEOMETRY.channel());
        self.mark_eager(c, dirty::GEOMETRY);
        self.mark_layout_at(p);
        self.mark_render_at(p);
    }

    pub(crate) fn mark(&mut self, idx: u32, set: DirtySet) {
        self.dirty.mark(idx, set.channel());
        self.pending |= set.bit();
        self.needs_frame = true;
    }

    fn mark_eager(&mut self, idx: u32, set: DirtySet) {
        self.dirty.mark_with(idx, set.channel(), &EagerPolicy);
        self.pending |= set.bit();
        self.needs_frame = true;
    }

    fn mark_layout_at(&mut self, idx: u32) {
        let mut cur = idx;
        loop {
            let i = cur as usize;
            self.dirty_bits[i].insert(DirtyBits::LAYOUT);
            let p = self.parent[i];
            if self.flags[i].layout_boundary || p == INVALID {
                self.mark(cur, dirty::LAYOUT);
                break;
            }
            cur = p;
        }
    }

    fn mark_render_at(&mut self, idx: u32) {
        self.dirty_bits[idx as usize].insert(DirtyBits::PAINT);
        let mut cur = idx;
        loop {
            let i = cur as usize;
            let p = self.parent[i];
            if self.flags[i].repaint_boundary || p == INVALID {
                self.dirty_bits[i].insert(DirtyBits::PAINT);
                self.mark(cur, dirty::PAINT);
                break;
            }
            cur = p;
        }
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}

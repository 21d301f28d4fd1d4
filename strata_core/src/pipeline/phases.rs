// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The fixed flush phases.
//!
//! Every phase that owns a dirty set drains it into a `Vec` before touching
//! a node. Work a phase causes for an earlier phase (a layout callback that
//! marks a node for build, say) waits for the next frame.

use kurbo::Rect;

use super::context::PipelineContext;
use super::focus::attached;
use crate::dirty;
use crate::node::{BuildCx, DirtyBits, NodeId};
use crate::surface::FrameCommit;
use crate::time::HostTime;
use crate::trace::{CommitEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind};

impl PipelineContext {
    /// Runs the phases in order. `vsync` is `None` for an immediate flush,
    /// which skips AnimationAdvance.
    pub(super) fn run_phases(&mut self, vsync: Option<HostTime>) {
        if let Some(now) = vsync {
            self.phase(PhaseKind::AnimationAdvance, |cx| cx.schedule.run(now));
        }
        self.phase(PhaseKind::Build, Self::build_phase);
        self.phase(PhaseKind::PostAnimationHooks, Self::post_animation_phase);
        self.phase(PhaseKind::Layout, Self::layout_phase);

        let mut frame = FrameCommit {
            frame_index: self.frame_index,
            dirty_rect: None,
            full_repaint: false,
            items: Vec::new(),
        };
        self.phase(PhaseKind::Paint, |cx| cx.paint_phase(&mut frame));
        self.phase(PhaseKind::SendMessages, |cx| cx.send_phase(&frame));

        self.phase(PhaseKind::PaintFinish, Self::paint_finish_phase);
        self.phase(PhaseKind::WindowBlurRecompute, Self::window_blur_phase);
        self.phase(PhaseKind::FocusFlush, Self::focus_phase);
        self.phase(PhaseKind::VisibilityChangeFire, Self::visibility_phase);
        self.phase(PhaseKind::PostFlushListeners, Self::post_flush_phase);
        self.phase(
            PhaseKind::ClearDeactivatedSubtrees,
            Self::clear_deactivated_phase,
        );
    }

    /// Runs one phase between trace begin/end events. `f` returns how many
    /// entries it drained.
    fn phase(&mut self, phase: PhaseKind, f: impl FnOnce(&mut Self) -> usize) {
        let start = self.clock.now();
        self.tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.frame_index,
            phase,
            timestamp: start,
        });
        let drained = f(self);
        let end = self.clock.now();
        self.tracer.phase_end(&PhaseEndEvent {
            frame_index: self.frame_index,
            phase,
            timestamp: end,
            drained,
        });
        if let Some(summary) = self.summary.as_mut() {
            summary.phase_begin(phase, start);
            summary.phase_end(phase, end, drained);
        }
    }

    // -- Build --

    fn build_phase(&mut self) -> usize {
        let dirty = self.store.drain_channel(dirty::BUILD);
        for &id in &dirty {
            if !self.store.is_alive(id) || !self.store.dirty_bits(id).contains(DirtyBits::BUILD) {
                continue;
            }
            if self.store.run_build(id) {
                continue;
            }
            // The root has no builder of its own; the frontend fills it.
            if Some(id) == self.root
                && let Some(frontend) = self.frontend.as_mut()
            {
                frontend.build(&mut BuildCx::new(&mut self.store, id));
            }
        }
        for callback in core::mem::take(&mut self.build_after) {
            callback(self);
        }
        dirty.len()
    }

    fn post_animation_phase(&mut self) -> usize {
        let listeners = core::mem::take(&mut self.post_animation);
        let n = listeners.len();
        for listener in listeners {
            listener(self);
        }
        n
    }

    // -- Layout --

    fn layout_phase(&mut self) -> usize {
        let dirty = self.store.drain_channel(dirty::LAYOUT);
        for &id in &dirty {
            if !self.store.is_alive(id) || !self.store.dirty_bits(id).contains(DirtyBits::LAYOUT) {
                continue;
            }
            let available = self.store.paint_rect(id).size();
            self.store.layout_node(id, available);
        }
        let moved = self.store.sync_geometry();
        if !moved.is_empty() {
            tracing::trace!(moved = moved.len(), "global geometry synced");
        }
        dirty.len()
    }

    // -- Paint and commit --

    fn paint_phase(&mut self, frame: &mut FrameCommit) -> usize {
        let dirty = self.store.drain_channel(dirty::PAINT);
        let forced = core::mem::take(&mut self.forced_refresh);
        let Some(root) = self.root.filter(|&r| self.store.is_alive(r)) else {
            if !dirty.is_empty() {
                tracing::debug!("no root, paint skipped");
            }
            return dirty.len();
        };
        let root_rect = self.store.global_rect(root);

        let targets: Vec<NodeId> = dirty
            .iter()
            .copied()
            .filter(|&id| {
                self.store.is_alive(id)
                    && self.store.dirty_bits(id).contains(DirtyBits::PAINT)
                    && attached(&self.store, Some(root), id)
            })
            .collect();
        let full = forced
            || targets
                .iter()
                .any(|&id| id == root || covers(self.store.global_rect(id), root_rect));

        if full {
            frame.full_repaint = true;
            frame.dirty_rect = Some(root_rect);
            self.store.paint_subtree(root, &mut frame.items);
            return dirty.len();
        }

        for id in targets {
            // Already painted as part of an earlier target's subtree.
            if !self.store.dirty_bits(id).contains(DirtyBits::PAINT) {
                continue;
            }
            let bounds = self.store.global_rect(id);
            frame.dirty_rect = Some(frame.dirty_rect.map_or(bounds, |r| r.union(bounds)));
            self.store.paint_subtree(id, &mut frame.items);
        }
        dirty.len()
    }

    fn send_phase(&mut self, frame: &FrameCommit) -> usize {
        if frame.is_empty() {
            return 0;
        }
        self.surface.commit(frame);
        let committed_at = self.clock.now();
        tracing::debug!(
            frame = frame.frame_index,
            items = frame.items.len(),
            full = frame.full_repaint,
            "frame committed"
        );
        self.tracer.commit(&CommitEvent {
            frame_index: frame.frame_index,
            committed_at,
            items: frame.items.len(),
            dirty_rect: frame.dirty_rect,
            full_repaint: frame.full_repaint,
        });
        if let Some(summary) = self.summary.as_mut() {
            summary.set_committed(true);
        }
        1
    }

    fn paint_finish_phase(&mut self) -> usize {
        let dirty = self.store.drain_channel(dirty::PAINT_FINISH);
        for &id in &dirty {
            if self.store.is_alive(id) {
                self.store.run_paint_finish(id);
            }
        }
        dirty.len()
    }

    // -- Post-paint --

    fn window_blur_phase(&mut self) -> usize {
        let regions: Vec<Rect> = match self.root.filter(|&r| self.store.is_alive(r)) {
            Some(root) => self
                .store
                .descendants(root)
                .filter(|&id| {
                    self.store.flags(id).window_blur && self.store.is_effectively_visible(id)
                })
                .map(|id| self.store.global_rect(id))
                .collect(),
            None => Vec::new(),
        };
        if regions == self.blur_regions {
            return 0;
        }
        tracing::debug!(regions = regions.len(), "window blur regions changed");
        self.surface.set_window_blur_regions(&regions);
        self.blur_regions = regions;
        self.blur_regions.len()
    }

    fn focus_phase(&mut self) -> usize {
        let dirty = self.store.drain_channel(dirty::FOCUS);
        self.focus.flush(&self.store, self.root, &dirty);
        dirty.len()
    }

    fn visibility_phase(&mut self) -> usize {
        let root_rect = self
            .root
            .filter(|&r| self.store.is_alive(r))
            .map(|r| self.store.global_rect(r));
        let mut fired = 0;
        for idx in 0..self.store.len {
            let i = idx as usize;
            if self.store.visibility[i].is_none() {
                continue;
            }
            let Some(id) = self.store.handle(idx).filter(|&id| self.store.is_alive(id)) else {
                continue;
            };
            let visible = root_rect.is_some_and(|r| {
                attached(&self.store, self.root, id)
                    && self.store.is_effectively_visible(id)
                    && self.store.global_rect(id).intersect(r).area() > 0.0
            });
            if visible == self.store.last_visible[i] {
                continue;
            }
            self.store.last_visible[i] = visible;
            if let Some(handler) = self.store.visibility[i].as_mut() {
                handler(visible);
            }
            fired += 1;
        }
        fired
    }

    fn post_flush_phase(&mut self) -> usize {
        let listeners = core::mem::take(&mut self.post_flush);
        let n = listeners.len();
        for listener in listeners {
            listener(self);
        }
        n
    }

    fn clear_deactivated_phase(&mut self) -> usize {
        if self.deactivated.is_empty() {
            return 0;
        }
        let mut cleared = 0;
        for (key, node) in core::mem::take(&mut self.deactivated) {
            let alive = self.store.is_alive(node);
            if alive && self.store.flags(node).disappearing {
                self.deactivated.insert(key, node);
                continue;
            }
            cleared += 1;
            if alive && self.store.parent(node).is_none() && Some(node) != self.root {
                tracing::debug!(node = %node, "destroying deactivated subtree");
                self.store.destroy_subtree(node);
            }
        }
        cleared
    }
}

fn covers(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::super::harness::ready;
    use super::*;
    use crate::animation::ScheduleTask;
    use crate::config::PipelineConfig;
    use crate::node::{Buildable, NodeFlags, NodeKind, PaintCx, Paintable};

    struct CountBuilds(Rc<Cell<u32>>);

    impl Buildable for CountBuilds {
        fn build(&mut self, _cx: &mut BuildCx<'_>) {
            self.0.set(self.0.get() + 1);
        }
    }

    /// Marks another node for build from inside its own build.
    struct MarkOther(NodeId);

    impl Buildable for MarkOther {
        fn build(&mut self, cx: &mut BuildCx<'_>) {
            cx.store_mut().mark_needs_build(self.0);
        }
    }

    fn boundary() -> NodeFlags {
        NodeFlags {
            repaint_boundary: true,
            ..NodeFlags::default()
        }
    }

    #[test]
    fn build_marked_mid_frame_runs_next_frame() {
        let mut h = ready(PipelineConfig::standard());
        let builds = Rc::new(Cell::new(0));
        let root = h.ctx.root().expect("root");
        let (late, early) = h.ctx.mutate(|store| {
            let late = store.create_node(NodeKind::Container);
            store.add_child(root, late);
            store.set_builder(late, CountBuilds(builds.clone()));
            let early = store.create_node(NodeKind::Container);
            store.add_child(root, early);
            store.set_builder(early, MarkOther(late));
            (late, early)
        });
        h.frame();
        h.frame();
        let base = builds.get();
        assert!(base >= 1, "initial build ran");

        h.ctx.mutate(|store| store.mark_needs_build(early));
        h.frame();
        assert_eq!(builds.get(), base, "mark made during Build waits");
        assert!(h.ctx.is_frame_requested(), "leftover work requests a frame");

        h.frame();
        assert_eq!(builds.get(), base + 1, "built on the following frame");

        h.ctx.add_post_animation_listener(move |cx| {
            cx.mutate(|store| store.mark_needs_build(late));
        });
        h.frame();
        assert_eq!(builds.get(), base + 1, "mark made after Build waits too");
        h.frame();
        assert_eq!(builds.get(), base + 2, "and lands next frame");
    }

    #[test]
    fn dirty_rect_unions_repainted_boundaries() {
        let mut h = ready(PipelineConfig::standard());
        let a = h.leaf(Rect::new(0.0, 0.0, 50.0, 50.0), boundary());
        let b = h.leaf(Rect::new(100.0, 100.0, 150.0, 150.0), boundary());
        h.frame();

        h.ctx.mutate(|store| {
            store.mark_needs_render(a);
            store.mark_needs_render(b);
        });
        h.frame();
        let commit = h.surface.last_commit().expect("commit");
        assert!(!commit.full_repaint, "partial repaint");
        assert_eq!(
            commit.dirty_rect,
            Some(Rect::new(0.0, 0.0, 150.0, 150.0)),
            "union of both boundaries"
        );
        assert_eq!(commit.items.len(), 2, "one item per painted leaf");
    }

    #[test]
    fn node_covering_root_short_circuits_to_full_repaint() {
        let mut h = ready(PipelineConfig::standard());
        let cover = h.leaf(Rect::new(-10.0, -10.0, 500.0, 400.0), boundary());
        h.frame();
        h.ctx.mutate(|store| store.mark_needs_render(cover));
        h.frame();
        let commit = h.surface.last_commit().expect("commit");
        assert!(commit.full_repaint, "covering node repaints everything");
        assert_eq!(
            commit.dirty_rect,
            Some(Rect::new(0.0, 0.0, 400.0, 300.0)),
            "clamped to the root"
        );
    }

    #[test]
    fn clean_frame_commits_nothing() {
        let mut h = ready(PipelineConfig::standard());
        h.frame();
        let before = h.surface.commits().len();
        h.frame();
        assert_eq!(h.surface.commits().len(), before, "no dirty work, no commit");
    }

    #[test]
    fn paint_finish_follows_commit() {
        struct Finisher(Rc<RefCell<Vec<&'static str>>>);

        impl Paintable for Finisher {
            fn paint(&mut self, cx: &mut PaintCx) {
                self.0.borrow_mut().push("paint");
                cx.fill_bounds(0xffff_ffff);
                cx.request_paint_finish();
            }

            fn paint_finish(&mut self) {
                self.0.borrow_mut().push("finish");
            }
        }

        let mut h = ready(PipelineConfig::standard());
        let log = Rc::new(RefCell::new(Vec::new()));
        let leaf = h.leaf(Rect::new(0.0, 0.0, 10.0, 10.0), NodeFlags::default());
        h.ctx
            .mutate(|store| store.set_painter(leaf, Finisher(log.clone())));
        h.ctx.mutate(|store| store.mark_needs_render(leaf));
        h.frame();
        assert_eq!(*log.borrow(), ["paint", "finish"], "finish after paint");
        assert!(!h.ctx.store().has_pending_work(), "finish set drained");
    }

    #[test]
    fn visibility_callbacks_fire_on_flips_only() {
        let mut h = ready(PipelineConfig::standard());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let leaf = h.leaf(Rect::new(0.0, 0.0, 10.0, 10.0), NodeFlags::default());
        let s = seen.clone();
        h.ctx
            .mutate(|store| store.on_visibility_change(leaf, move |v| s.borrow_mut().push(v)));
        h.frame();
        h.frame();
        assert_eq!(*seen.borrow(), [true], "on screen once");

        h.ctx
            .mutate(|store| store.set_origin(leaf, kurbo::Point::new(1000.0, 1000.0)));
        h.frame();
        assert_eq!(*seen.borrow(), [true, false], "moved off screen");

        h.ctx.mutate(|store| {
            store.set_origin(leaf, kurbo::Point::ZERO);
            store.update_flags(leaf, |f| f.visible = false);
        });
        h.frame();
        assert_eq!(*seen.borrow(), [true, false], "back on screen but hidden");
    }

    #[test]
    fn blur_regions_follow_flagged_nodes() {
        let mut h = ready(PipelineConfig::standard());
        let flags = NodeFlags {
            window_blur: true,
            ..NodeFlags::default()
        };
        let leaf = h.leaf(Rect::new(10.0, 10.0, 60.0, 60.0), flags);
        h.frame();
        assert_eq!(
            h.surface.blur_regions(),
            [Rect::new(10.0, 10.0, 60.0, 60.0)],
            "global rect pushed"
        );

        h.ctx.mutate(|store| store.update_flags(leaf, |f| f.visible = false));
        h.frame();
        assert!(h.surface.blur_regions().is_empty(), "hidden region removed");
        assert!(h.ctx.blur_regions().is_empty(), "cached copy matches");
    }

    #[test]
    fn focus_settles_on_first_focusable_node() {
        let mut h = ready(PipelineConfig::standard());
        let flags = NodeFlags {
            focusable: true,
            ..NodeFlags::default()
        };
        let first = h.leaf(Rect::new(0.0, 0.0, 10.0, 10.0), flags);
        let second = h.leaf(Rect::new(20.0, 0.0, 30.0, 10.0), flags);
        h.frame();
        assert_eq!(h.ctx.focused(), Some(first), "pre-order fallback");

        h.ctx.request_focus(second);
        h.frame();
        assert_eq!(h.ctx.focused(), Some(second), "explicit request");
    }

    #[test]
    fn deactivated_subtree_lives_until_transition_ends() {
        let mut h = ready(PipelineConfig::standard());
        let leaf = h.leaf(Rect::new(0.0, 0.0, 10.0, 10.0), NodeFlags::default());
        h.ctx.mutate(|store| {
            store.remove_from_parent(leaf);
            store.update_flags(leaf, |f| f.disappearing = true);
        });
        h.ctx.add_deactivate_node(1, leaf);
        h.frame();
        assert!(h.ctx.store().is_alive(leaf), "kept while disappearing");

        h.ctx
            .mutate(|store| store.update_flags(leaf, |f| f.disappearing = false));
        h.frame();
        assert!(!h.ctx.store().is_alive(leaf), "detached subtree destroyed");
    }

    #[test]
    fn immediate_flush_skips_animation_and_guards_reentry() {
        struct Ticks(Rc<Cell<u32>>);

        impl ScheduleTask for Ticks {
            fn tick(&mut self, _now: HostTime) -> bool {
                self.0.set(self.0.get() + 1);
                true
            }
        }

        let mut h = ready(PipelineConfig::standard());
        let ticks = Rc::new(Cell::new(0));
        let task: Rc<RefCell<dyn ScheduleTask>> = Rc::new(RefCell::new(Ticks(ticks.clone())));
        let id = h.ctx.add_schedule_task(&task);

        let leaf = h.leaf(Rect::new(0.0, 0.0, 10.0, 10.0), NodeFlags::default());
        h.ctx.flush_pipeline_immediately();
        assert_eq!(ticks.get(), 0, "no animation tick outside vsync");

        h.frame();
        assert_eq!(ticks.get(), 1, "ticked by vsync");

        let commits = h.surface.commits().len();
        h.ctx.add_post_flush_listener(move |cx| {
            cx.mutate(|store| store.mark_needs_render(leaf));
            cx.flush_pipeline_immediately();
        });
        h.frame();
        assert_eq!(h.surface.commits().len(), commits, "nested flush ignored");
        assert!(h.ctx.store().has_pending_work(), "render mark left for next frame");

        assert_eq!(ticks.get(), 2, "ticked again");
        h.ctx.remove_schedule_task(id);
        h.frame();
        assert_eq!(ticks.get(), 2, "removed task stops ticking");
        assert_eq!(h.surface.commits().len(), commits + 1, "deferred repaint committed");
    }

    #[test]
    fn build_phase_without_root_builder_uses_nothing() {
        let mut h = ready(PipelineConfig::standard());
        let root = h.ctx.root().expect("root");
        h.ctx.mutate(|store| store.mark_needs_build(root));
        h.frame();
        assert!(
            !h.ctx.store().dirty_bits(root).contains(DirtyBits::BUILD),
            "bit cleared even without a frontend"
        );
    }

    #[cfg(feature = "trace")]
    #[test]
    fn phases_are_traced_in_order() {
        use crate::trace::{FrameSummary, TraceSink};

        #[derive(Default)]
        struct Rec {
            begins: Vec<PhaseKind>,
            summaries: Vec<FrameSummary>,
            commits: usize,
        }

        impl TraceSink for Rec {
            fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
                self.begins.push(e.phase);
            }

            fn on_commit(&mut self, _e: &CommitEvent) {
                self.commits += 1;
            }

            fn on_frame_summary(&mut self, s: &FrameSummary) {
                self.summaries.push(s.clone());
            }
        }

        let mut h = ready(PipelineConfig::standard());
        let rec = Rc::new(RefCell::new(Rec::default()));
        h.ctx.set_trace_sink(Box::new(rec.clone()));
        h.ctx.mark_forced_refresh();
        h.frame();

        let rec = rec.borrow();
        assert_eq!(rec.begins, PhaseKind::ALL, "every phase, in order");
        assert_eq!(rec.commits, 1, "one commit");
        assert_eq!(rec.summaries.len(), 1, "one summary");
        assert!(rec.summaries[0].committed, "summary records the commit");
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame orchestration.
//!
//! A [`PipelineContext`] turns vsync ticks into committed frames. Each frame
//! runs twelve fixed phases; see [`PhaseKind`](crate::trace::PhaseKind) for
//! the order. Mutations coalesce into one frame request per vsync, and the
//! surface must report a nonzero size before any frame runs.

mod context;
mod diagnostics;
mod focus;
mod input;
mod phases;

pub use context::{AnimationCallback, KeyModifiers, Listener, PipelineContext, SurfaceState};
pub use diagnostics::UNSUPPORTED_DUMP;
pub use focus::FocusManager;

#[cfg(test)]
mod harness {
    use std::sync::Arc;

    use kurbo::Rect;

    use super::PipelineContext;
    use crate::config::PipelineConfig;
    use crate::lane::{LaneQueues, UiLane};
    use crate::node::{NodeFlags, NodeId, NodeKind, PaintCx, Paintable};
    use crate::surface::HeadlessSurface;
    use crate::time::HostTime;

    pub(super) struct Harness {
        pub(super) ctx: PipelineContext,
        pub(super) surface: HeadlessSurface,
        pub(super) queues: Arc<LaneQueues>,
        pub(super) clock_ms: u64,
    }

    impl Harness {
        /// Runs one frame 16ms after the previous one.
        pub(super) fn frame(&mut self) {
            self.clock_ms += 16;
            self.ctx
                .on_vsync_event(HostTime(self.clock_ms * 1_000_000), 1);
        }

        /// Runs one frame at an absolute time.
        pub(super) fn frame_at(&mut self, ms: u64) {
            self.clock_ms = ms;
            self.ctx.on_vsync_event(HostTime(ms * 1_000_000), 1);
        }

        /// Adds a painted leaf under the root.
        pub(super) fn leaf(&mut self, rect: Rect, flags: NodeFlags) -> NodeId {
            let root = self.ctx.create_root();
            self.ctx.mutate(|store| {
                let leaf = store.create_node(NodeKind::Leaf);
                store.add_child(root, leaf);
                store.set_paint_rect(leaf, rect);
                store.set_flags(leaf, flags);
                store.set_painter(leaf, Fill(0xff00_00ff));
                leaf
            })
        }
    }

    pub(super) struct Fill(pub(super) u32);

    impl Paintable for Fill {
        fn paint(&mut self, cx: &mut PaintCx) {
            cx.fill_bounds(self.0);
        }
    }

    /// A context that is not ready yet and has no root.
    pub(super) fn pipeline(config: PipelineConfig) -> Harness {
        let queues = Arc::new(LaneQueues::new());
        let ui = queues.bind::<UiLane>().expect("fresh queues bind the UI lane");
        let surface = HeadlessSurface::new();
        let ctx = PipelineContext::new(ui, Box::new(surface.clone()), config)
            .with_executor(queues.clone());
        Harness {
            ctx,
            surface,
            queues,
            clock_ms: 0,
        }
    }

    /// A ready 400x300 context with a root.
    pub(super) fn ready(config: PipelineConfig) -> Harness {
        let mut h = pipeline(config);
        h.ctx.create_root();
        h.ctx.on_surface_changed(400, 300);
        h
    }
}

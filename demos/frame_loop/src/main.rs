// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless frame loop that exercises the pipeline end to end.
//!
//! Builds a small tree on a [`HeadlessSurface`], slides one node across the
//! surface with an [`Animator`], taps it halfway through, and fires vsync
//! only when the pipeline asked for a frame. Events are recorded with a
//! [`RecorderSink`], replayed through a [`PrettyPrintSink`], and exported as
//! Chrome trace JSON.

use std::cell::RefCell;
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;
use std::sync::Arc;

use kurbo::Rect;
use strata_core::animation::{Animator, AnimatorConfig, Curve, CurveAnimation, FillMode};
use strata_core::config::PipelineConfig;
use strata_core::event::{TouchEvent, TouchType};
use strata_core::lane::{Lane, LaneQueues, UiLane};
use strata_core::node::{NodeFlags, NodeId, NodeKind, PaintCx, Paintable};
use strata_core::pipeline::PipelineContext;
use strata_core::surface::HeadlessSurface;
use strata_core::time::HostTime;
use strata_core::trace::TraceSink;
use strata_debug::pretty::PrettyPrintSink;
use strata_debug::recorder::{RecordedEvent, RecorderSink, decode};

const TICKS: u64 = 40;
/// 16.6ms refresh interval in nanoseconds (≈60 Hz).
const REFRESH_INTERVAL_NS: u64 = 16_666_667;
const SLIDE_MS: i32 = 300;

struct Solid(u32);

impl Paintable for Solid {
    fn paint(&mut self, cx: &mut PaintCx) {
        cx.fill_bounds(self.0);
    }
}

type Slide = Rc<RefCell<CurveAnimation<Rect>>>;

/// Copies the animated rect into the tree after every animation step.
fn follow(ctx: &mut PipelineContext, node: NodeId, slide: Slide, animator: Rc<RefCell<Animator>>) {
    let rect = *slide.borrow().value();
    ctx.mutate(|store| store.set_paint_rect(node, rect));
    if animator.borrow().is_running() {
        ctx.add_post_animation_listener(move |ctx| follow(ctx, node, slide, animator));
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    // -- context -------------------------------------------------------------
    let queues = Arc::new(LaneQueues::new());
    let ui = queues
        .bind::<UiLane>()
        .expect("fresh queues bind the UI lane");
    let surface = HeadlessSurface::new();
    let config = PipelineConfig::standard().with_view_scale(2.0);
    tracing::info!(
        config = %serde_json::to_string(&config).expect("config serializes"),
        "creating pipeline"
    );
    let mut ctx =
        PipelineContext::new(ui, Box::new(surface.clone()), config).with_executor(queues.clone());
    let recorder = Rc::new(RefCell::new(RecorderSink::new()));
    ctx.set_trace_sink(Box::new(recorder.clone()));

    // -- tree ----------------------------------------------------------------
    let root = ctx.create_root();
    let (background, card) = ctx.mutate(|store| {
        let background = store.create_node(NodeKind::Leaf);
        store.add_child(root, background);
        store.set_paint_rect(background, Rect::new(0.0, 0.0, 400.0, 300.0));
        store.set_painter(background, Solid(0xff20_2020));

        let card = store.create_node(NodeKind::Leaf);
        store.add_child(root, card);
        store.set_paint_rect(card, Rect::new(20.0, 20.0, 120.0, 80.0));
        store.set_flags(
            card,
            NodeFlags {
                repaint_boundary: true,
                focusable: true,
                ..NodeFlags::default()
            },
        );
        store.set_painter(card, Solid(0xff3a_86ff));
        store.set_label(card, "card");
        store.on_touch(card, |e, _| {
            tracing::info!(kind = ?e.kind, x = e.point.x, y = e.point.y, "card touched");
            true
        });
        (background, card)
    });
    tracing::info!(%background, %card, "tree built");
    ctx.on_surface_changed(800, 600);

    // -- animation -----------------------------------------------------------
    let slide: Slide = Rc::new(RefCell::new(CurveAnimation::new(
        Rect::new(20.0, 20.0, 120.0, 80.0),
        Rect::new(260.0, 200.0, 360.0, 260.0),
        Curve::EaseInOut,
    )));
    let animator = Animator::new_shared(ctx.schedule_handle());
    {
        let mut a = animator.borrow_mut();
        a.set_config(AnimatorConfig::new(SLIDE_MS).with_fill_mode(FillMode::Forwards))
            .expect("valid animator config");
        a.add_interpolator(slide.clone());
        a.add_listener(|event| tracing::info!(?event, "slide"));
        a.play();
    }
    {
        let (slide, animator) = (slide.clone(), animator.clone());
        ctx.add_post_animation_listener(move |ctx| follow(ctx, card, slide, animator));
    }
    ctx.request_frame_if_needed();

    // -- loop ----------------------------------------------------------------
    let ctx = ctx.into_shared();
    let mut now = 1_000_000_000;
    let mut frames = 0;
    for tick in 0..TICKS {
        now += REFRESH_INTERVAL_NS;
        if tick == 10 {
            let rect = ctx.borrow().store().global_rect(card);
            let (x, y) = (rect.center().x * 2.0, rect.center().y * 2.0);
            let mut c = ctx.borrow_mut();
            c.on_touch_event(&TouchEvent::new(1, TouchType::Down, x, y));
            c.on_touch_event(&TouchEvent::new(1, TouchType::Up, x, y));
        }
        if surface.frame_requests() == 0 {
            continue;
        }
        surface.fire_vsync(HostTime(now));
        queues.run_pending(Lane::Script);
        frames += 1;
    }

    // -- report --------------------------------------------------------------
    {
        let c = ctx.borrow();
        for line in c.dump(&["-render"]) {
            tracing::info!("{line}");
        }
        tracing::info!(
            frames,
            commits = surface.commits().len(),
            "loop finished after {TICKS} ticks"
        );
    }

    let bytes = recorder.borrow().as_bytes().to_vec();
    let mut pretty = PrettyPrintSink::with_writer(std::io::stdout()).without_phases();
    for event in decode(&bytes) {
        match event {
            RecordedEvent::Vsync(e) => pretty.on_vsync(&e),
            RecordedEvent::PhaseBegin(e) => pretty.on_phase_begin(&e),
            RecordedEvent::PhaseEnd(e) => pretty.on_phase_end(&e),
            RecordedEvent::Commit(e) => pretty.on_commit(&e),
            RecordedEvent::FrameSummary(s) => pretty.on_frame_summary(&s),
        }
    }

    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    strata_debug::chrome::export(&bytes, &mut writer).expect("failed to write Chrome trace");
    println!("Wrote {path} ({frames} frames)");

    ctx.borrow_mut().destroy();
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame pipeline, animation timelines, and input dispatch for a
//! retained-mode UI engine.
//!
//! `strata_core` owns the render tree of one window and turns vsync ticks
//! into committed frames. It never draws: paint records display items and
//! hands them to a [`RenderSurface`](surface::RenderSurface).
//!
//! # Architecture
//!
//! ```text
//!   RenderSurface (vsync source)
//!       │
//!       ▼
//!   PipelineContext::on_vsync_event()
//!       │
//!       ├─► AnimationAdvance ─► Build ─► PostAnimationHooks ─► Layout
//!       │                                                        │
//!       │   ┌────────────────────────────────────────────────────┘
//!       │   ▼
//!       ├─► Paint ─► SendMessages ──► RenderSurface::commit()
//!       │
//!       └─► PaintFinish ─► WindowBlur ─► Focus ─► Visibility
//!                          ─► PostFlushListeners ─► ClearDeactivated
//!
//!   touch / mouse / axis / key ──► EventManager ──► node handlers
//! ```
//!
//! **[`node`]**: Arena render tree with generation-checked [`NodeId`]s.
//! Mutations mark per-phase dirty sets and, eventually, request a frame.
//!
//! **[`dirty`]**: The per-phase dirty sets, as channels of one
//! `understory_dirty` tracker.
//!
//! **[`pipeline`]**: [`PipelineContext`], the twelve-phase frame loop,
//! surface readiness, focus, listeners, and input entry points.
//!
//! **[`animation`]**: [`Animator`](animation::Animator) timelines, curves,
//! and the schedule of tasks ticked once per frame.
//!
//! **[`event`]**: Hit testing, per-pointer cached chains, hover diffing, and
//! key dispatch.
//!
//! **[`lane`]**: Named lanes of control and the executor that moves work
//! between them.
//!
//! **[`surface`]** and **[`frontend`]**: The two outward contracts, the
//! platform surface and the script frontend.
//!
//! **[`restore`]**: JSON state restoration keyed by restore id.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).
//!
//! [`NodeId`]: node::NodeId
//! [`PipelineContext`]: pipeline::PipelineContext

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod animation;
pub mod config;
pub mod dirty;
pub mod error;
pub mod event;
pub mod frontend;
pub mod lane;
pub mod node;
pub mod pipeline;
pub mod restore;
pub mod surface;
pub mod time;
pub mod trace;

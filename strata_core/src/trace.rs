// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame pipeline.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! the pipeline calls at each stage of a frame. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] owns an optional boxed sink. When the `trace` feature is
//! **off**, every `Tracer` method compiles to nothing and installed sinks are
//! dropped. When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! A sink shared as `Rc<RefCell<S>>` is itself a sink, so a caller can keep
//! one handle for inspection and install another in the pipeline.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps during a frame and
//! produces a [`FrameSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::Rect;

use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// One of the fixed pipeline phases, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhaseKind {
    /// Tick scheduled animation tasks.
    AnimationAdvance,
    /// Run build callbacks of build-dirty nodes.
    Build,
    /// One-shot listeners registered for after animation and build.
    PostAnimationHooks,
    /// Measure and place layout-dirty nodes, then sync global geometry.
    Layout,
    /// Record display items for paint-dirty nodes.
    Paint,
    /// Hand the frame to the surface.
    SendMessages,
    /// Post-paint callbacks.
    PaintFinish,
    /// Recompute window blur regions.
    WindowBlurRecompute,
    /// Resolve focus.
    FocusFlush,
    /// Fire visibility change callbacks.
    VisibilityChangeFire,
    /// One-shot listeners registered for after the flush.
    PostFlushListeners,
    /// Drop finished disappearing subtrees.
    ClearDeactivatedSubtrees,
}

impl PhaseKind {
    /// Every phase, in execution order.
    pub const ALL: [Self; 12] = [
        Self::AnimationAdvance,
        Self::Build,
        Self::PostAnimationHooks,
        Self::Layout,
        Self::Paint,
        Self::SendMessages,
        Self::PaintFinish,
        Self::WindowBlurRecompute,
        Self::FocusFlush,
        Self::VisibilityChangeFire,
        Self::PostFlushListeners,
        Self::ClearDeactivatedSubtrees,
    ];

    /// Position in [`ALL`](Self::ALL).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AnimationAdvance => "animation_advance",
            Self::Build => "build",
            Self::PostAnimationHooks => "post_animation_hooks",
            Self::Layout => "layout",
            Self::Paint => "paint",
            Self::SendMessages => "send_messages",
            Self::PaintFinish => "paint_finish",
            Self::WindowBlurRecompute => "window_blur_recompute",
            Self::FocusFlush => "focus_flush",
            Self::VisibilityChangeFire => "visibility_change_fire",
            Self::PostFlushListeners => "post_flush_listeners",
            Self::ClearDeactivatedSubtrees => "clear_deactivated_subtrees",
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a vsync tick starts a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VsyncEvent {
    /// Pipeline frame counter.
    pub frame_index: u64,
    /// Vsync timestamp from the surface.
    pub timestamp: HostTime,
    /// Platform frame counter.
    pub frame_count: u32,
}

/// Marks the beginning of a pipeline phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a pipeline phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
    /// Nodes the phase drained from its dirty set.
    pub drained: usize,
}

/// Emitted when a frame is handed to the surface.
#[derive(Clone, Copy, Debug)]
pub struct CommitEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Host time of the commit.
    pub committed_at: HostTime,
    /// Number of display items.
    pub items: usize,
    /// Repainted area.
    pub dirty_rect: Option<Rect>,
    /// Whether the whole root repainted.
    pub full_repaint: bool,
}

/// Per-frame timing summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Vsync timestamp the frame was driven by.
    pub vsync: HostTime,
    /// Wall time per phase in nanoseconds, indexed by [`PhaseKind::index`].
    /// Zero for phases that did not run.
    pub phase_nanos: [u64; 12],
    /// Dirty nodes drained per phase.
    pub drained: [usize; 12],
    /// Whether a frame was committed.
    pub committed: bool,
}

impl FrameSummary {
    /// Total wall time across phases.
    #[must_use]
    pub fn total_nanos(&self) -> u64 {
        self.phase_nanos.iter().sum()
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the pipeline.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a vsync starts a frame.
    fn on_vsync(&mut self, e: &VsyncEvent) {
        _ = e;
    }

    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a frame is committed.
    fn on_commit(&mut self, e: &CommitEvent) {
        _ = e;
    }

    /// Called with a per-frame timing summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

impl<S: TraceSink + ?Sized> TraceSink for Rc<RefCell<S>> {
    fn on_vsync(&mut self, e: &VsyncEvent) {
        self.borrow_mut().on_vsync(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.borrow_mut().on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.borrow_mut().on_phase_end(e);
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        self.borrow_mut().on_commit(e);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.borrow_mut().on_frame_summary(s);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin owner of an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
#[derive(Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to `sink`.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            drop(sink);
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`VsyncEvent`].
    #[inline]
    pub fn vsync(&mut self, e: &VsyncEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_vsync(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CommitEvent`].
    #[inline]
    pub fn commit(&mut self, e: &CommitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_commit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a frame and produces a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    vsync: VsyncEvent,
    phase_starts: [Option<HostTime>; 12],
    phase_ends: [Option<HostTime>; 12],
    drained: [usize; 12],
    committed: bool,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the frame `vsync` started.
    #[must_use]
    pub fn new(vsync: &VsyncEvent) -> Self {
        Self {
            vsync: *vsync,
            phase_starts: [None; 12],
            phase_ends: [None; 12],
            drained: [0; 12],
            committed: false,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_starts[phase.index()] = Some(t);
    }

    /// Records the end of a phase and how many nodes it drained.
    pub fn phase_end(&mut self, phase: PhaseKind, t: HostTime, drained: usize) {
        self.phase_ends[phase.index()] = Some(t);
        self.drained[phase.index()] = drained;
    }

    /// Records that a frame was committed.
    pub fn set_committed(&mut self, committed: bool) {
        self.committed = committed;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        let mut phase_nanos = [0; 12];
        for phase in PhaseKind::ALL {
            let i = phase.index();
            if let (Some(start), Some(end)) = (self.phase_starts[i], self.phase_ends[i]) {
                phase_nanos[i] = end.saturating_duration_since(start).nanos();
            }
        }
        FrameSummary {
            frame_index: self.vsync.frame_index,
            vsync: self.vsync.timestamp,
            phase_nanos,
            drained: self.drained,
            committed: self.committed,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in microseconds.

use std::io::Write;

use strata_core::time::HostTime;
use strata_core::trace::{
    CommitEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink, VsyncEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    phases: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("phases", &self.phases)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            phases: true,
        }
    }

    /// Drops per-phase lines, keeping vsync, commit, and summary.
    #[must_use]
    pub fn without_phases(mut self) -> Self {
        self.phases = false;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn us(t: HostTime) -> f64 {
    t.nanos() as f64 / 1000.0
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_vsync(&mut self, e: &VsyncEvent) {
        let _ = writeln!(
            self.writer,
            "[vsync] frame={} count={} at {:.1}µs",
            e.frame_index,
            e.frame_count,
            us(e.timestamp),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        if !self.phases {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        if !self.phases {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}µs drained={}",
            e.frame_index,
            e.phase.name(),
            us(e.timestamp),
            e.drained,
        );
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        let area = match e.dirty_rect {
            Some(r) if e.full_repaint => format!("full ({}x{})", r.width(), r.height()),
            Some(r) => format!("({}, {}, {}, {})", r.x0, r.y0, r.x1, r.y1),
            None => "none".to_owned(),
        };
        let _ = writeln!(
            self.writer,
            "[commit] frame={} items={} dirty={area} at {:.1}µs",
            e.frame_index,
            e.items,
            us(e.committed_at),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let busiest = PhaseKind::ALL
            .into_iter()
            .max_by_key(|p| s.phase_nanos[p.index()])
            .filter(|p| s.phase_nanos[p.index()] > 0);
        let _ = write!(
            self.writer,
            "[summary] frame={} total={:.1}µs committed={}",
            s.frame_index,
            s.total_nanos() as f64 / 1000.0,
            s.committed,
        );
        if let Some(p) = busiest {
            let _ = write!(
                self.writer,
                " busiest={} ({:.1}µs)",
                p.name(),
                s.phase_nanos[p.index()] as f64 / 1000.0
            );
        }
        let _ = writeln!(self.writer);
    }
}

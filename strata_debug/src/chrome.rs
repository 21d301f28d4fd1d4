// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};
use strata_core::time::HostTime;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Phases become duration slices on thread 0; vsync, commit, and summary
/// events are instants.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = decode(bytes).map(to_trace_event).collect();
    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn to_trace_event(recorded: RecordedEvent) -> Value {
    match recorded {
        RecordedEvent::Vsync(e) => json!({
            "ph": "i",
            "name": "Vsync",
            "cat": "Frame",
            "ts": us(e.timestamp),
            "pid": 0,
            "tid": 0,
            "s": "g",
            "args": {
                "frame_index": e.frame_index,
                "frame_count": e.frame_count,
            }
        }),
        RecordedEvent::PhaseBegin(e) => json!({
            "ph": "B",
            "name": e.phase.name(),
            "cat": "Phase",
            "ts": us(e.timestamp),
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
            }
        }),
        RecordedEvent::PhaseEnd(e) => json!({
            "ph": "E",
            "name": e.phase.name(),
            "cat": "Phase",
            "ts": us(e.timestamp),
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
                "drained": e.drained,
            }
        }),
        RecordedEvent::Commit(e) => json!({
            "ph": "i",
            "name": "Commit",
            "cat": "Frame",
            "ts": us(e.committed_at),
            "pid": 0,
            "tid": 0,
            "s": "t",
            "args": {
                "frame_index": e.frame_index,
                "items": e.items,
                "full_repaint": e.full_repaint,
                "dirty_rect": e.dirty_rect.map(|r| [r.x0, r.y0, r.x1, r.y1]),
            }
        }),
        RecordedEvent::FrameSummary(s) => {
            let phases: serde_json::Map<String, Value> = strata_core::trace::PhaseKind::ALL
                .iter()
                .map(|p| {
                    (
                        format!("{}_us", p.name()),
                        json!(s.phase_nanos[p.index()] as f64 / 1000.0),
                    )
                })
                .collect();
            json!({
                "ph": "i",
                "name": "FrameSummary",
                "cat": "Summary",
                "ts": us(s.vsync),
                "pid": 0,
                "tid": 0,
                "s": "g",
                "args": {
                    "frame_index": s.frame_index,
                    "committed": s.committed,
                    "total_us": s.total_nanos() as f64 / 1000.0,
                    "phases": phases,
                }
            })
        }
    }
}

fn us(t: HostTime) -> f64 {
    t.nanos() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use strata_core::trace::{PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink, VsyncEvent};

    use super::*;
    use crate::recorder::RecorderSink;

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_vsync(&VsyncEvent {
            frame_index: 1,
            timestamp: HostTime(1_000_000),
            frame_count: 1,
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 1,
            phase: PhaseKind::Build,
            timestamp: HostTime(1_000_000),
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 1,
            phase: PhaseKind::Build,
            timestamp: HostTime(1_000_100),
            drained: 2,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).expect("writing to a Vec succeeds");
        let parsed: Vec<Value> = serde_json::from_slice(&out).expect("valid JSON array");
        assert_eq!(parsed.len(), 3, "one object per event");

        assert_eq!(parsed[0]["ph"], "i", "vsync is an instant");
        assert_eq!(parsed[0]["ts"], 1000.0, "microseconds");
        assert_eq!(parsed[1]["ph"], "B", "phase begin");
        assert_eq!(parsed[1]["name"], "build", "phase name");
        assert_eq!(parsed[2]["ph"], "E", "phase end");
        assert_eq!(parsed[2]["args"]["drained"], 2, "drained count carried");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).expect("writing to a Vec succeeds");
        let parsed: Vec<Value> = serde_json::from_slice(&out).expect("valid JSON array");
        assert!(parsed.is_empty(), "no events");
    }
}

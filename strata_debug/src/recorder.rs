// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Phases are stored by their [`PhaseKind::index`]; a recording made by a
//! build with a different phase list decodes up to the first unknown index.

use kurbo::Rect;
use strata_core::time::HostTime;
use strata_core::trace::{
    CommitEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink, VsyncEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_VSYNC: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_COMMIT: u8 = 4;
const TAG_FRAME_SUMMARY: u8 = 5;

const PHASES: usize = PhaseKind::ALL.len();

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, n: usize) {
        self.write_u32(u32::try_from(n).unwrap_or(u32::MAX));
    }

    fn write_phase(&mut self, p: PhaseKind) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "there are twelve phases"
        )]
        self.write_u8(p.index() as u8);
    }

    fn write_option_rect(&mut self, r: Option<Rect>) {
        let r = match r {
            Some(r) => {
                self.write_u8(1);
                r
            }
            None => {
                self.write_u8(0);
                Rect::ZERO
            }
        };
        self.write_f64(r.x0);
        self.write_f64(r.y0);
        self.write_f64(r.x1);
        self.write_f64(r.y1);
    }
}

impl TraceSink for RecorderSink {
    fn on_vsync(&mut self, e: &VsyncEvent) {
        self.write_u8(TAG_VSYNC);
        self.write_u64(e.frame_index);
        self.write_u64(e.timestamp.nanos());
        self.write_u32(e.frame_count);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
        self.write_count(e.drained);
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        self.write_u8(TAG_COMMIT);
        self.write_u64(e.frame_index);
        self.write_u64(e.committed_at.nanos());
        self.write_count(e.items);
        self.write_option_rect(e.dirty_rect);
        self.write_u8(u8::from(e.full_repaint));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u64(s.vsync.nanos());
        for nanos in s.phase_nanos {
            self.write_u64(nanos);
        }
        for drained in s.drained {
            self.write_count(drained);
        }
        self.write_u8(u8::from(s.committed));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`VsyncEvent`].
    Vsync(VsyncEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`CommitEvent`].
    Commit(CommitEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

impl RecordedEvent {
    /// Frame counter the event belongs to.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        match self {
            Self::Vsync(e) => e.frame_index,
            Self::PhaseBegin(e) => e.frame_index,
            Self::PhaseEnd(e) => e.frame_index,
            Self::Commit(e) => e.frame_index,
            Self::FrameSummary(s) => s.frame_index,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
///
/// Stops at the first unknown tag or truncated record.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let bytes = self.data.get(self.pos..end)?.try_into().ok()?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.take().map(f64::from_le_bytes)
    }

    fn read_count(&mut self) -> Option<usize> {
        self.read_u32().and_then(|n| usize::try_from(n).ok())
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        PhaseKind::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_option_rect(&mut self) -> Option<Option<Rect>> {
        let present = self.read_u8()?;
        let r = Rect::new(
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
        );
        Some((present != 0).then_some(r))
    }

    fn decode_vsync(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Vsync(VsyncEvent {
            frame_index: self.read_u64()?,
            timestamp: self.read_time()?,
            frame_count: self.read_u32()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
            drained: self.read_count()?,
        }))
    }

    fn decode_commit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Commit(CommitEvent {
            frame_index: self.read_u64()?,
            committed_at: self.read_time()?,
            items: self.read_count()?,
            dirty_rect: self.read_option_rect()?,
            full_repaint: self.read_u8()? != 0,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let vsync = self.read_time()?;
        let mut phase_nanos = [0; PHASES];
        for slot in &mut phase_nanos {
            *slot = self.read_u64()?;
        }
        let mut drained = [0; PHASES];
        for slot in &mut drained {
            *slot = self.read_count()?;
        }
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index,
            vsync,
            phase_nanos,
            drained,
            committed: self.read_u8()? != 0,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_VSYNC => self.decode_vsync(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_COMMIT => self.decode_commit(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => {
                tracing::warn!(tag, offset = self.pos - 1, "unknown record tag, stopping");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

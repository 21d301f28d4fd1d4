// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named lanes of control and the executor contract.
//!
//! A lane is one logical thread of control. Work crosses lanes only by being
//! posted as a [`Task`]; nothing is shared mutably between lanes. Several
//! lanes may be collapsed onto one real thread by the embedder.
//!
//! # Lane capabilities
//!
//! Code that must run on a particular lane asks for a [`LaneHandle`] for it.
//! Handles are minted by [`LaneQueues::bind`] at most once per lane and are
//! `!Send`, so holding one proves the caller is on the thread that drives
//! that lane. [`PipelineContext`](crate::pipeline::PipelineContext) can only
//! be constructed from a `LaneHandle<UiLane>`.
//!
//! Blocking submission from a lane to itself would deadlock.
//! [`LaneHandle::post_sync`] requires `From: DistinctFrom<To>`, which is
//! implemented only for pairs of different lanes, so that call does not
//! compile.

use core::fmt;
use core::marker::PhantomData;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::LaneError;

/// A unit of work posted to a lane.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// The closed set of lanes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lane {
    /// Owns the render tree, dirty sets, and animators.
    Ui,
    /// Runs the script frontend and animation callbacks.
    Script,
    /// CPU-heavy background computation.
    Background,
    /// Platform embedding callbacks.
    Platform,
    /// File and network I/O.
    Io,
    /// GPU submission.
    Gpu,
}

impl Lane {
    /// Every lane, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Ui,
        Self::Script,
        Self::Background,
        Self::Platform,
        Self::Io,
        Self::Gpu,
    ];

    const fn slot(self) -> usize {
        self as usize
    }

    /// Short lowercase name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ui => "ui",
            Self::Script => "script",
            Self::Background => "background",
            Self::Platform => "platform",
            Self::Io => "io",
            Self::Gpu => "gpu",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Submits work to lanes.
pub trait TaskExecutor {
    /// Queues `task` on `lane` and returns immediately.
    fn post(&self, lane: Lane, task: Task) -> Result<(), LaneError>;

    /// Queues `task` on `lane` and returns once it has run.
    ///
    /// Calling this from `lane` itself deadlocks; typed callers go through
    /// [`LaneHandle::post_sync`], which rules that out at compile time.
    fn post_sync(&self, lane: Lane, task: Task) -> Result<(), LaneError>;
}

// ---------------------------------------------------------------------------
// Typed lanes
// ---------------------------------------------------------------------------

mod sealed {
    pub trait Sealed {}
}

/// A type-level lane marker.
pub trait LaneKind: sealed::Sealed + 'static {
    /// The runtime lane this marker names.
    const LANE: Lane;
}

/// Implemented for `A: DistinctFrom<B>` exactly when `A` and `B` are
/// different lanes.
pub trait DistinctFrom<L: LaneKind>: LaneKind {}

macro_rules! lanes {
    ($($marker:ident => $lane:ident),* $(,)?) => {
        $(
            #[doc = concat!("Type-level marker for [`Lane::", stringify!($lane), "`].")]
            #[derive(Clone, Copy, Debug)]
            pub enum $marker {}

            impl sealed::Sealed for $marker {}

            impl LaneKind for $marker {
                const LANE: Lane = Lane::$lane;
            }
        )*
    };
}

macro_rules! distinct {
    ($a:ident: $($b:ident),*) => {
        $(impl DistinctFrom<$b> for $a {})*
    };
}

lanes! {
    UiLane => Ui,
    ScriptLane => Script,
    BackgroundLane => Background,
    PlatformLane => Platform,
    IoLane => Io,
    GpuLane => Gpu,
}

distinct!(UiLane: ScriptLane, BackgroundLane, PlatformLane, IoLane, GpuLane);
distinct!(ScriptLane: UiLane, BackgroundLane, PlatformLane, IoLane, GpuLane);
distinct!(BackgroundLane: UiLane, ScriptLane, PlatformLane, IoLane, GpuLane);
distinct!(PlatformLane: UiLane, ScriptLane, BackgroundLane, IoLane, GpuLane);
distinct!(IoLane: UiLane, ScriptLane, BackgroundLane, PlatformLane, GpuLane);
distinct!(GpuLane: UiLane, ScriptLane, BackgroundLane, PlatformLane, IoLane);

/// Proof that the holder runs on lane `L`.
///
/// Not `Send`: a handle cannot leave the thread it was minted on.
pub struct LaneHandle<L: LaneKind> {
    _marker: PhantomData<(L, *const ())>,
}

impl<L: LaneKind> fmt::Debug for LaneHandle<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LaneHandle").field(&L::LANE).finish()
    }
}

impl<L: LaneKind> LaneHandle<L> {
    fn mint() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// The lane this handle is for.
    #[must_use]
    pub fn lane(&self) -> Lane {
        L::LANE
    }

    /// Queues `task` on lane `To` without waiting.
    pub fn post<To: LaneKind>(
        &self,
        executor: &dyn TaskExecutor,
        task: impl FnOnce() + Send + 'static,
    ) -> Result<(), LaneError> {
        executor.post(To::LANE, Box::new(task))
    }

    /// Runs `task` on lane `To` and waits for it. Only compiles when `To`
    /// differs from the current lane.
    pub fn post_sync<To: LaneKind>(
        &self,
        executor: &dyn TaskExecutor,
        task: impl FnOnce() + Send + 'static,
    ) -> Result<(), LaneError>
    where
        L: DistinctFrom<To>,
    {
        executor.post_sync(To::LANE, Box::new(task))
    }
}

// ---------------------------------------------------------------------------
// In-process executor
// ---------------------------------------------------------------------------

/// A FIFO queue per lane, drained by whoever drives the lane.
///
/// Suitable for single-threaded embeddings and tests: the embedder calls
/// [`run_pending`](Self::run_pending) for each lane from its loop. Posting is
/// thread-safe.
pub struct LaneQueues {
    queues: [Mutex<VecDeque<Task>>; 6],
    bound: [AtomicBool; 6],
    closed: AtomicBool,
}

impl fmt::Debug for LaneQueues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("LaneQueues");
        for lane in Lane::ALL {
            s.field(lane.name(), &self.pending(lane));
        }
        s.field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for LaneQueues {
    fn default() -> Self {
        Self::new()
    }
}

impl LaneQueues {
    /// Creates an open executor with empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queues: core::array::from_fn(|_| Mutex::new(VecDeque::new())),
            bound: core::array::from_fn(|_| AtomicBool::new(false)),
            closed: AtomicBool::new(false),
        }
    }

    /// Claims lane `L` for the calling thread.
    ///
    /// Returns `None` if the lane was already claimed.
    pub fn bind<L: LaneKind>(&self) -> Option<LaneHandle<L>> {
        let slot = &self.bound[L::LANE.slot()];
        if slot.swap(true, Ordering::AcqRel) {
            tracing::warn!(lane = %L::LANE, "lane already bound");
            None
        } else {
            Some(LaneHandle::mint())
        }
    }

    /// Runs the tasks queued on `lane` at the time of the call, in order.
    ///
    /// Tasks they post to the same lane wait for the next call. Returns the
    /// number of tasks run.
    pub fn run_pending(&self, lane: Lane) -> usize {
        let batch = core::mem::take(&mut *self.lock(lane));
        let n = batch.len();
        for task in batch {
            task();
        }
        if n > 0 {
            tracing::trace!(%lane, tasks = n, "ran lane tasks");
        }
        n
    }

    /// Number of tasks waiting on `lane`.
    #[must_use]
    pub fn pending(&self, lane: Lane) -> usize {
        self.lock(lane).len()
    }

    /// Refuses further submissions. Queued tasks can still be run.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn lock(&self, lane: Lane) -> std::sync::MutexGuard<'_, VecDeque<Task>> {
        self.queues[lane.slot()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_open(&self, lane: Lane) -> Result<(), LaneError> {
        if self.closed.load(Ordering::Acquire) {
            Err(LaneError::Closed(lane))
        } else {
            Ok(())
        }
    }
}

impl TaskExecutor for LaneQueues {
    fn post(&self, lane: Lane, task: Task) -> Result<(), LaneError> {
        self.check_open(lane)?;
        self.lock(lane).push_back(task);
        Ok(())
    }

    /// Runs everything already queued on `lane`, then `task`, on the calling
    /// thread. FIFO order within the lane is preserved.
    fn post_sync(&self, lane: Lane, task: Task) -> Result<(), LaneError> {
        self.check_open(lane)?;
        self.run_pending(lane);
        task();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn tasks_run_in_fifo_order() {
        let exec = LaneQueues::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = Arc::clone(&log);
            exec.post(Lane::Script, Box::new(move || log.lock().unwrap().push(i)))
                .unwrap();
        }
        assert_eq!(exec.pending(Lane::Script), 3);
        assert_eq!(exec.pending(Lane::Ui), 0, "lanes are separate");
        assert_eq!(exec.run_pending(Lane::Script), 3);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn post_sync_drains_queue_first() {
        let exec = LaneQueues::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let l1 = Arc::clone(&log);
        exec.post(Lane::Io, Box::new(move || l1.lock().unwrap().push("queued")))
            .unwrap();
        let l2 = Arc::clone(&log);
        exec.post_sync(Lane::Io, Box::new(move || l2.lock().unwrap().push("sync")))
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["queued", "sync"]);
    }

    #[test]
    fn closed_executor_rejects_work() {
        let exec = LaneQueues::new();
        exec.shutdown();
        let err = exec.post(Lane::Gpu, Box::new(|| {})).unwrap_err();
        assert_eq!(err, LaneError::Closed(Lane::Gpu));
    }

    #[test]
    fn lanes_bind_once() {
        let exec = LaneQueues::new();
        let ui = exec.bind::<UiLane>();
        assert!(ui.is_some());
        assert!(exec.bind::<UiLane>().is_none(), "second bind fails");
        assert!(exec.bind::<ScriptLane>().is_some());
    }

    #[test]
    fn typed_handles_post_across_lanes() {
        let exec = LaneQueues::new();
        let ui = exec.bind::<UiLane>().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        ui.post::<ScriptLane>(&exec, move || {
            h.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        let h = Arc::clone(&hits);
        ui.post_sync::<BackgroundLane>(&exec, move || {
            h.fetch_add(10, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 10);
        exec.run_pending(Lane::Script);
        assert_eq!(hits.load(Ordering::Relaxed), 11);
        assert_eq!(ui.lane(), Lane::Ui);
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame task scheduling for running animations.
//!
//! The pipeline owns a [`ScheduleRegistry`] and hands [`ScheduleHandle`]s to
//! animators. Every AnimationAdvance phase swaps the registered task map
//! out, ticks each task with the vsync timestamp, and re-registers the ones
//! that report they are still running. Tasks added during the phase wait
//! for the next vsync.
//!
//! Registered tasks are held weakly: dropping the last strong reference to
//! an animator removes it from scheduling.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

use crate::time::{Duration, HostTime};

/// Something ticked once per vsync while registered.
pub trait ScheduleTask {
    /// Advances to `now`. Returns `true` to stay registered.
    fn tick(&mut self, now: HostTime) -> bool;
}

type TaskRef = Weak<RefCell<dyn ScheduleTask>>;

#[derive(Default)]
struct Registry {
    tasks: BTreeMap<u32, TaskRef>,
    next_id: u32,
    running: bool,
    cancelled: BTreeSet<u32>,
    wants_frame: bool,
}

/// The pipeline-owned set of schedule tasks.
#[derive(Default)]
pub struct ScheduleRegistry {
    inner: Rc<RefCell<Registry>>,
}

impl core::fmt::Debug for ScheduleRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScheduleRegistry")
            .field("tasks", &self.len())
            .finish_non_exhaustive()
    }
}

impl ScheduleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle animators use to register themselves.
    #[must_use]
    pub fn handle(&self) -> ScheduleHandle {
        ScheduleHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().tasks.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns and clears the flag raised when a task was added.
    pub fn take_wants_frame(&self) -> bool {
        core::mem::take(&mut self.inner.borrow_mut().wants_frame)
    }

    /// Ticks every registered task once. Returns how many ran.
    pub fn run(&self, now: HostTime) -> usize {
        let batch = {
            let mut r = self.inner.borrow_mut();
            r.running = true;
            core::mem::take(&mut r.tasks)
        };
        let mut ran = 0;
        let mut keep = Vec::new();
        for (id, task) in batch {
            let Some(task) = task.upgrade() else {
                continue;
            };
            ran += 1;
            // A task already borrowed is ticking further up the stack.
            let Ok(mut t) = task.try_borrow_mut() else {
                keep.push((id, Rc::downgrade(&task)));
                continue;
            };
            if t.tick(now) {
                keep.push((id, Rc::downgrade(&task)));
            }
        }
        let mut r = self.inner.borrow_mut();
        r.running = false;
        let cancelled = core::mem::take(&mut r.cancelled);
        for (id, task) in keep {
            if !cancelled.contains(&id) {
                r.tasks.insert(id, task);
            }
        }
        ran
    }

    /// Drops every task.
    pub fn clear(&self) {
        let mut r = self.inner.borrow_mut();
        r.tasks.clear();
        r.cancelled.clear();
    }

    /// Registers a task directly. See [`ScheduleHandle::add`].
    pub fn add(&self, task: &Rc<RefCell<dyn ScheduleTask>>) -> u32 {
        self.handle().add(task).unwrap_or(u32::MAX)
    }

    /// Unregisters a task. See [`ScheduleHandle::remove`].
    pub fn remove(&self, id: u32) {
        self.handle().remove(id);
    }
}

/// A weak handle to a [`ScheduleRegistry`].
///
/// Outlives the pipeline safely: once the registry is gone every call is a
/// no-op.
#[derive(Clone, Debug, Default)]
pub struct ScheduleHandle {
    inner: Weak<RefCell<Registry>>,
}

impl ScheduleHandle {
    /// Registers `task` and returns its id, or `None` if the registry is
    /// gone.
    pub fn add(&self, task: &Rc<RefCell<dyn ScheduleTask>>) -> Option<u32> {
        self.add_weak(Rc::downgrade(task))
    }

    pub(crate) fn add_weak(&self, task: TaskRef) -> Option<u32> {
        let inner = self.inner.upgrade()?;
        let mut r = inner.borrow_mut();
        r.next_id = r.next_id.wrapping_add(1);
        let id = r.next_id;
        r.tasks.insert(id, task);
        r.wants_frame = true;
        Some(id)
    }

    /// Unregisters the task with `id`, including one ticking this frame.
    pub fn remove(&self, id: u32) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut r = inner.borrow_mut();
        if r.tasks.remove(&id).is_none() && r.running {
            r.cancelled.insert(id);
        }
    }

    /// Whether the registry still exists.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

// ---------------------------------------------------------------------------
// Frame clock
// ---------------------------------------------------------------------------

/// Converts vsync timestamps into whole-millisecond deltas.
///
/// Sub-millisecond remainders carry into the next delta, so the deltas
/// always sum to the elapsed wall time truncated to milliseconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameClock {
    last: Option<HostTime>,
    remainder: Duration,
}

impl FrameClock {
    /// Creates a clock with no reference point.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: None,
            remainder: Duration::ZERO,
        }
    }

    /// Milliseconds since the previous call. The first call after creation
    /// or [`reset`](Self::reset) returns `0`.
    pub fn advance(&mut self, now: HostTime) -> i64 {
        let Some(last) = self.last.replace(now) else {
            self.remainder = Duration::ZERO;
            return 0;
        };
        let span = now.saturating_duration_since(last) + self.remainder;
        let millis = span.whole_millis();
        self.remainder = span.saturating_sub(Duration::from_millis(millis));
        i64::try_from(millis).unwrap_or(i64::MAX)
    }

    /// Forgets the reference point.
    pub fn reset(&mut self) {
        self.last = None;
        self.remainder = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        ticks: u32,
        stop_after: u32,
    }

    impl ScheduleTask for Counter {
        fn tick(&mut self, _now: HostTime) -> bool {
            self.ticks += 1;
            self.ticks < self.stop_after
        }
    }

    #[test]
    fn tasks_stay_registered_while_running() {
        let reg = ScheduleRegistry::new();
        let task: Rc<RefCell<Counter>> = Rc::new(RefCell::new(Counter {
            ticks: 0,
            stop_after: 2,
        }));
        let dyn_task: Rc<RefCell<dyn ScheduleTask>> = task.clone();
        reg.add(&dyn_task);
        assert!(reg.take_wants_frame());
        assert_eq!(reg.run(HostTime(0)), 1);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.run(HostTime(1)), 1);
        assert!(reg.is_empty(), "finished task is not re-registered");
        assert_eq!(task.borrow().ticks, 2);
    }

    #[test]
    fn dropped_tasks_are_skipped() {
        let reg = ScheduleRegistry::new();
        let task: Rc<RefCell<dyn ScheduleTask>> = Rc::new(RefCell::new(Counter {
            ticks: 0,
            stop_after: 10,
        }));
        reg.add(&task);
        drop(task);
        assert_eq!(reg.run(HostTime(0)), 0);
        assert!(reg.is_empty());
    }

    #[test]
    fn removal_by_id() {
        let reg = ScheduleRegistry::new();
        let task: Rc<RefCell<dyn ScheduleTask>> = Rc::new(RefCell::new(Counter {
            ticks: 0,
            stop_after: 10,
        }));
        let id = reg.add(&task);
        reg.remove(id);
        assert_eq!(reg.run(HostTime(0)), 0);
    }

    #[test]
    fn handle_outliving_registry_is_inert() {
        let handle = ScheduleRegistry::new().handle();
        assert!(!handle.is_connected());
        let task: Rc<RefCell<dyn ScheduleTask>> = Rc::new(RefCell::new(Counter {
            ticks: 0,
            stop_after: 1,
        }));
        assert_eq!(handle.add(&task), None);
    }

    #[test]
    fn clock_carries_remainder() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(HostTime(0)), 0, "first tick sets the origin");
        assert_eq!(clock.advance(HostTime(16_666_667)), 16);
        assert_eq!(clock.advance(HostTime(33_333_334)), 16);
        assert_eq!(clock.advance(HostTime(50_000_001)), 17, "carried 0.67ms twice");
        clock.reset();
        assert_eq!(clock.advance(HostTime(90_000_000)), 0);
    }
}

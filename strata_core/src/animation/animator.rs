// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The animation timeline state machine.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use super::interpolator::Interpolator;
use super::motion::Motion;
use super::scale::{duration_scale, scale_millis};
use super::scheduler::{FrameClock, ScheduleHandle, ScheduleTask};
use crate::error::AnimatorError;
use crate::time::HostTime;

/// Playback direction of successive loops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationDirection {
    /// Every loop runs 0 → 1.
    #[default]
    Normal,
    /// Every loop runs 1 → 0.
    Reverse,
    /// Loops alternate, starting 0 → 1.
    Alternate,
    /// Loops alternate, starting 1 → 0.
    AlternateReverse,
}

impl AnimationDirection {
    const fn starts_reversed(self) -> bool {
        matches!(self, Self::Reverse | Self::AlternateReverse)
    }

    const fn alternates(self) -> bool {
        matches!(self, Self::Alternate | Self::AlternateReverse)
    }
}

/// Which value is held outside the active interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Neither: the initial value before and after.
    #[default]
    None,
    /// Hold the terminal value after completion.
    Forwards,
    /// Show the start value during the start delay.
    Backwards,
    /// Both of the above.
    Both,
}

impl FillMode {
    const fn holds_end(self) -> bool {
        matches!(self, Self::Forwards | Self::Both)
    }

    const fn fills_delay(self) -> bool {
        matches!(self, Self::Backwards | Self::Both)
    }
}

/// Animator lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AnimatorStatus {
    /// Never started, or cancelled.
    #[default]
    Idle,
    /// Advancing on every frame.
    Running,
    /// Holding its position.
    Paused,
    /// Finished or stopped.
    Stopped,
}

/// Notifications delivered to animator listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnimatorEvent {
    /// Playback began.
    Start,
    /// Playback paused.
    Pause,
    /// Playback resumed.
    Resume,
    /// One or more loops completed and another began.
    Repeat,
    /// Playback stopped, by completion or request.
    Stop,
    /// Playback was cancelled.
    Cancel,
}

/// Timeline parameters. All times in milliseconds before the global
/// duration scale is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorConfig {
    /// Length of one loop.
    pub duration: i32,
    /// Wait before the first loop.
    pub start_delay: i32,
    /// Number of loops; `-1` repeats forever.
    pub iteration: i32,
    /// Loop direction.
    pub direction: AnimationDirection,
    /// Fill outside the active interval.
    pub fill_mode: FillMode,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

impl AnimatorConfig {
    /// Iteration count meaning "forever".
    pub const INFINITE: i32 = -1;

    /// One normal loop of `duration` with no delay.
    #[must_use]
    pub const fn new(duration: i32) -> Self {
        Self {
            duration,
            start_delay: 0,
            iteration: 1,
            direction: AnimationDirection::Normal,
            fill_mode: FillMode::None,
        }
    }

    /// Returns the config with a start delay.
    #[must_use]
    pub const fn with_start_delay(mut self, delay: i32) -> Self {
        self.start_delay = delay;
        self
    }

    /// Returns the config with an iteration count.
    #[must_use]
    pub const fn with_iteration(mut self, iteration: i32) -> Self {
        self.iteration = iteration;
        self
    }

    /// Returns the config with a direction.
    #[must_use]
    pub const fn with_direction(mut self, direction: AnimationDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Returns the config with a fill mode.
    #[must_use]
    pub const fn with_fill_mode(mut self, fill_mode: FillMode) -> Self {
        self.fill_mode = fill_mode;
        self
    }

    fn validate(&self) -> Result<(), AnimatorError> {
        if self.duration < 0 {
            return Err(AnimatorError::InvalidDuration(self.duration));
        }
        if self.start_delay < 0 {
            return Err(AnimatorError::InvalidStartDelay(self.start_delay));
        }
        if self.iteration < Self::INFINITE {
            return Err(AnimatorError::InvalidIteration(self.iteration));
        }
        Ok(())
    }
}

/// Animator event listener.
pub type AnimatorListener = Box<dyn FnMut(AnimatorEvent)>;

/// Maps elapsed frame time to normalized progress and drives interpolators.
///
/// An animator created with [`new_shared`](Self::new_shared) registers
/// itself with the pipeline's schedule while running and is ticked on every
/// vsync. One created with [`new`](Self::new) is advanced by hand through
/// [`on_frame`](Self::on_frame).
///
/// Listeners and interpolators must not call back into the animator that
/// drives them.
pub struct Animator {
    config: AnimatorConfig,
    status: AnimatorStatus,
    // Iteration count minus one; -1 is infinite.
    repeat_times: i32,
    repeat_left: i32,
    elapsed: i64,
    // Effective direction of the current loop.
    cur_reversed: bool,
    // Effective direction of the first loop.
    start_reversed: bool,
    backwards_notified: bool,
    interpolators: Vec<Rc<RefCell<dyn Interpolator>>>,
    proxies: Vec<Rc<RefCell<Self>>>,
    listeners: Vec<AnimatorListener>,
    motion: Option<Box<dyn Motion>>,
    motion_elapsed: i64,
    clock: FrameClock,
    schedule: ScheduleHandle,
    task_id: Option<u32>,
    this: Weak<RefCell<Self>>,
}

impl core::fmt::Debug for Animator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Animator")
            .field("config", &self.config)
            .field("status", &self.status)
            .field("repeat_left", &self.repeat_left)
            .field("elapsed", &self.elapsed)
            .field("reversed", &self.cur_reversed)
            .finish_non_exhaustive()
    }
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}

impl Animator {
    /// Creates an idle, unscheduled animator with a zero-length single loop.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: AnimatorConfig::default(),
            status: AnimatorStatus::Idle,
            repeat_times: 0,
            repeat_left: 0,
            elapsed: 0,
            cur_reversed: false,
            start_reversed: false,
            backwards_notified: false,
            interpolators: Vec::new(),
            proxies: Vec::new(),
            listeners: Vec::new(),
            motion: None,
            motion_elapsed: 0,
            clock: FrameClock::new(),
            schedule: ScheduleHandle::default(),
            task_id: None,
            this: Weak::new(),
        }
    }

    /// Creates an animator that schedules itself through `schedule`.
    #[must_use]
    pub fn new_shared(schedule: ScheduleHandle) -> Rc<RefCell<Self>> {
        Rc::new_cyclic(|this| {
            let mut animator = Self::new();
            animator.schedule = schedule;
            animator.this = this.clone();
            RefCell::new(animator)
        })
    }

    /// Replaces the whole configuration. Rejected configs leave the animator
    /// unchanged.
    pub fn set_config(&mut self, config: AnimatorConfig) -> Result<(), AnimatorError> {
        if let Err(err) = config.validate() {
            tracing::warn!(%err, "animator config rejected");
            return Err(err);
        }
        self.config = config;
        self.repeat_times = if config.iteration == AnimatorConfig::INFINITE {
            -1
        } else {
            config.iteration - 1
        };
        Ok(())
    }

    /// Sets the loop duration in milliseconds.
    pub fn set_duration(&mut self, duration: i32) -> Result<(), AnimatorError> {
        self.set_config(AnimatorConfig {
            duration,
            ..self.config
        })
    }

    /// Sets the start delay in milliseconds.
    pub fn set_start_delay(&mut self, start_delay: i32) -> Result<(), AnimatorError> {
        self.set_config(AnimatorConfig {
            start_delay,
            ..self.config
        })
    }

    /// Sets the loop count; `-1` repeats forever.
    pub fn set_iteration(&mut self, iteration: i32) -> Result<(), AnimatorError> {
        self.set_config(AnimatorConfig {
            iteration,
            ..self.config
        })
    }

    /// Sets the loop direction.
    pub fn set_direction(&mut self, direction: AnimationDirection) {
        self.config.direction = direction;
    }

    /// Sets the fill mode.
    pub fn set_fill_mode(&mut self, fill_mode: FillMode) {
        self.config.fill_mode = fill_mode;
    }

    /// The current configuration.
    #[must_use]
    pub fn config(&self) -> AnimatorConfig {
        self.config
    }

    /// Lifecycle state.
    #[must_use]
    pub fn status(&self) -> AnimatorStatus {
        self.status
    }

    /// Whether the animator is [`Running`](AnimatorStatus::Running).
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == AnimatorStatus::Running
    }

    /// Loops left after the current one; `-1` when infinite.
    #[must_use]
    pub fn repeat_times_left(&self) -> i32 {
        self.repeat_left
    }

    /// Time into the current loop, in scaled milliseconds.
    #[must_use]
    pub fn played_time(&self) -> i64 {
        (self.elapsed - self.scaled_delay()).clamp(0, i64::from(i32::MAX))
    }

    /// Whether the current loop runs 1 → 0.
    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.cur_reversed
    }

    /// Attaches an interpolator.
    pub fn add_interpolator(&mut self, interpolator: Rc<RefCell<dyn Interpolator>>) {
        self.interpolators.push(interpolator);
    }

    /// Detaches every interpolator.
    pub fn clear_interpolators(&mut self) {
        self.interpolators.clear();
    }

    /// Attaches an animator that follows this one: it is ticked before this
    /// one and receives the same playback commands.
    pub fn add_proxy(&mut self, proxy: Rc<RefCell<Self>>) {
        self.proxies.push(proxy);
    }

    /// Registers a listener.
    pub fn add_listener(&mut self, listener: impl FnMut(AnimatorEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // -- Playback API --

    /// Plays forwards from the current position.
    pub fn play(&mut self) {
        self.start(false, true);
    }

    /// Plays backwards from the current position.
    ///
    /// On a running or paused animator this turns the current loop around
    /// in place. [`play`](Self::play) leaves a running animator alone.
    pub fn reverse(&mut self) {
        self.start(true, true);
    }

    /// Drives `motion` on every frame until it comes to rest.
    pub fn play_motion(&mut self, motion: Box<dyn Motion>) {
        self.motion = Some(motion);
        self.motion_elapsed = 0;
        self.status = AnimatorStatus::Running;
        self.clock.reset();
        self.register();
        self.emit(AnimatorEvent::Start);
    }

    /// Holds the current position.
    pub fn pause(&mut self) {
        self.for_each_proxy(Self::pause);
        if self.status != AnimatorStatus::Running {
            return;
        }
        self.status = AnimatorStatus::Paused;
        self.unregister();
        self.emit(AnimatorEvent::Pause);
    }

    /// Continues from a pause.
    pub fn resume(&mut self) {
        self.for_each_proxy(Self::resume);
        if self.status != AnimatorStatus::Paused {
            return;
        }
        self.status = AnimatorStatus::Running;
        self.backwards_notified = false;
        self.clock.reset();
        self.register();
        self.emit(AnimatorEvent::Resume);
    }

    /// Stops and rewinds to the start. Interpolators see the initial value
    /// unless the fill mode holds the end.
    pub fn stop(&mut self) {
        self.for_each_proxy(Self::stop);
        if !matches!(self.status, AnimatorStatus::Running | AnimatorStatus::Paused) {
            return;
        }
        if !self.config.fill_mode.holds_end() {
            self.notify(self.initial_value());
        }
        self.enter_stopped();
    }

    /// Jumps to the end of the last loop, notifies the terminal value, and
    /// stops. An infinite animator finishes its current loop.
    pub fn finish(&mut self) {
        self.for_each_proxy(Self::finish);
        if !matches!(self.status, AnimatorStatus::Running | AnimatorStatus::Paused) {
            return;
        }
        let mut last_reversed = self.cur_reversed;
        if self.config.direction.alternates() && self.repeat_left > 0 && self.repeat_left % 2 == 1
        {
            last_reversed = !last_reversed;
        }
        self.cur_reversed = last_reversed;
        self.repeat_left = self.repeat_left.min(0);
        self.notify(self.completion_value());
        self.enter_stopped();
    }

    /// Discards progress and returns to idle without a completion
    /// notification.
    pub fn cancel(&mut self) {
        self.for_each_proxy(Self::cancel);
        if self.status == AnimatorStatus::Idle {
            return;
        }
        self.unregister();
        self.motion = None;
        self.elapsed = 0;
        self.status = AnimatorStatus::Idle;
        self.notify(self.initial_value());
        self.emit(AnimatorEvent::Cancel);
    }

    /// Seeks to `ms` milliseconds into the current loop and notifies the
    /// resulting value.
    pub fn update_played_time(&mut self, ms: i32) -> Result<(), AnimatorError> {
        if ms < 0 || ms > self.config.duration {
            let err =
                AnimatorError::seek(format!("{ms}ms outside 0..={}ms", self.config.duration));
            tracing::warn!(%err, "seek rejected");
            return Err(err);
        }
        for proxy in &self.proxies {
            if let Ok(mut p) = proxy.try_borrow_mut() {
                // Proxies may be shorter; their own range check applies.
                let _ = p.update_played_time(ms);
            }
        }
        let scale = duration_scale();
        let duration = scale_millis(self.config.duration, scale);
        let played = scale_millis(ms, scale).min(duration);
        self.elapsed = played + self.scaled_delay();
        let t = if duration == 0 {
            1.0
        } else {
            ratio(played, duration)
        };
        self.notify(self.directed(t));
        Ok(())
    }

    // -- Frame API --

    /// Advances the timeline by `delta_ms`.
    pub fn on_frame(&mut self, delta_ms: i64) {
        if self.status != AnimatorStatus::Running {
            return;
        }
        for proxy in &self.proxies {
            if let Ok(mut p) = proxy.try_borrow_mut() {
                p.on_frame(delta_ms);
            }
        }
        if self.motion.is_some() {
            self.advance_motion(delta_ms);
            return;
        }

        let scale = duration_scale();
        let duration = scale_millis(self.config.duration, scale);
        let delay = scale_millis(self.config.start_delay, scale);

        self.elapsed = self.elapsed.saturating_add(delta_ms.max(0));
        if self.elapsed < delay {
            if self.config.fill_mode.fills_delay() && !self.backwards_notified {
                self.backwards_notified = true;
                self.notify(if self.cur_reversed { 1.0 } else { 0.0 });
            }
            return;
        }

        let mut played = (self.elapsed - delay).clamp(0, i64::from(i32::MAX));
        let mut finished = false;
        if played >= duration {
            let loops = if duration == 0 {
                i64::from(i32::MAX)
            } else {
                played / duration
            };
            let before = self.repeat_left;
            if before >= 0 {
                let left = i64::from(before) - loops;
                finished = left < 0;
                self.repeat_left = i32::try_from(left.max(0)).unwrap_or(0);
            }
            if self.config.direction.alternates() {
                let toggle = if duration == 0 {
                    self.config.iteration % 2 == 0
                } else if finished {
                    // Direction of the last loop actually played.
                    before % 2 == 1
                } else {
                    loops % 2 == 1
                };
                if toggle {
                    self.cur_reversed = !self.cur_reversed;
                }
            }
            if duration != 0 {
                played %= duration;
            }
            self.elapsed = played + delay;
            if !finished {
                self.emit(AnimatorEvent::Repeat);
            }
        }

        if finished {
            self.notify(self.completion_value());
            self.enter_stopped();
            return;
        }
        let t = if duration == 0 {
            1.0
        } else {
            ratio(played, duration)
        };
        self.notify(self.directed(t));
    }

    // -- Internals --

    fn start(&mut self, reverse: bool, schedule: bool) {
        if self.config.iteration == 0 {
            tracing::debug!("animator has zero iterations, not starting");
            return;
        }
        for proxy in &self.proxies {
            if let Ok(mut p) = proxy.try_borrow_mut() {
                p.start(reverse, false);
            }
        }
        match self.status {
            AnimatorStatus::Running => {
                if reverse {
                    self.turn_around();
                }
                return;
            }
            AnimatorStatus::Paused => {
                if reverse {
                    self.turn_around();
                }
            }
            AnimatorStatus::Idle | AnimatorStatus::Stopped => {
                self.cur_reversed = reverse ^ self.config.direction.starts_reversed();
                self.elapsed = 0;
                self.repeat_left = self.repeat_times;
                self.backwards_notified = false;
                self.start_reversed = self.cur_reversed;
                for interpolator in &self.interpolators {
                    if let Ok(mut i) = interpolator.try_borrow_mut() {
                        i.on_init();
                    }
                }
            }
        }
        self.status = AnimatorStatus::Running;
        self.clock.reset();
        if schedule {
            self.register();
        }
        self.emit(AnimatorEvent::Start);
    }

    /// Flips the direction of the current loop, mirroring the played time
    /// so the notified value does not jump.
    fn turn_around(&mut self) {
        self.cur_reversed = !self.cur_reversed;
        let scale = duration_scale();
        let duration = scale_millis(self.config.duration, scale);
        let delay = scale_millis(self.config.start_delay, scale);
        if self.elapsed < delay || duration == 0 {
            return;
        }
        let played = (self.elapsed - delay).min(duration);
        self.elapsed = delay + (duration - played);
    }

    fn advance_motion(&mut self, delta_ms: i64) {
        self.motion_elapsed = self.motion_elapsed.saturating_add(delta_ms.max(0));
        let Some(motion) = self.motion.as_mut() else {
            return;
        };
        motion.on_timestamp_changed(self.motion_elapsed as f64);
        if motion.is_completed() {
            self.motion = None;
            self.enter_stopped();
        }
    }

    fn enter_stopped(&mut self) {
        self.elapsed = 0;
        self.status = AnimatorStatus::Stopped;
        self.motion = None;
        self.unregister();
        self.emit(AnimatorEvent::Stop);
    }

    fn scaled_delay(&self) -> i64 {
        scale_millis(self.config.start_delay, duration_scale())
    }

    fn initial_value(&self) -> f64 {
        if self.start_reversed { 1.0 } else { 0.0 }
    }

    fn completion_value(&self) -> f64 {
        if self.config.fill_mode.holds_end() {
            if self.cur_reversed { 0.0 } else { 1.0 }
        } else {
            self.initial_value()
        }
    }

    fn directed(&self, t: f64) -> f64 {
        if self.cur_reversed { 1.0 - t } else { t }
    }

    fn notify(&self, t: f64) {
        for interpolator in &self.interpolators {
            if let Ok(mut i) = interpolator.try_borrow_mut() {
                i.on_normalized(t, self.cur_reversed);
            }
        }
    }

    fn emit(&mut self, event: AnimatorEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    fn for_each_proxy(&self, f: fn(&mut Self)) {
        for proxy in &self.proxies {
            if let Ok(mut p) = proxy.try_borrow_mut() {
                f(&mut p);
            }
        }
    }

    fn register(&mut self) {
        if self.task_id.is_some() {
            return;
        }
        let this: Weak<RefCell<dyn ScheduleTask>> = self.this.clone();
        if this.strong_count() == 0 {
            return;
        }
        self.task_id = self.schedule.add_weak(this);
    }

    fn unregister(&mut self) {
        if let Some(id) = self.task_id.take() {
            self.schedule.remove(id);
        }
    }
}

fn ratio(played: i64, duration: i64) -> f64 {
    played as f64 / duration as f64
}

impl ScheduleTask for Animator {
    fn tick(&mut self, now: HostTime) -> bool {
        let delta = self.clock.advance(now);
        self.on_frame(delta);
        let running = self.status == AnimatorStatus::Running;
        if !running {
            // The registry drops the task; forget the id.
            self.task_id = None;
        }
        running
    }
}

impl Drop for Animator {
    fn drop(&mut self) {
        if matches!(self.status, AnimatorStatus::Running | AnimatorStatus::Paused) {
            tracing::trace!(status = ?self.status, "stopping dropped animator");
            self.stop();
        }
        self.unregister();
    }
}

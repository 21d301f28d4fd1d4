// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic timestamps and time sources.
//!
//! [`HostTime`] is a point on the monotonic clock expressed in nanoseconds,
//! which is the unit vsync callbacks deliver. [`Duration`] is a span in the
//! same unit. Animation code works in whole milliseconds; the conversions
//! here are the only place the two meet.
//!
//! A [`TimeSource`] is the pipeline's view of "now", used to stamp trace
//! events. [`MonotonicClock`] reads [`std::time::Instant`]; [`ManualClock`]
//! is stepped by hand and is what tests and replay harnesses use.

use core::cell::Cell;
use core::fmt;
use core::ops::{Add, Sub};
use std::time::Instant;

const NANOS_PER_MILLI: u64 = 1_000_000;

/// A point in time, in nanoseconds on a monotonic clock.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Returns the duration between `self` and an earlier time, or zero if
    /// `earlier` is after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Checked addition of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, duration: Duration) -> Option<Self> {
        match self.0.checked_add(duration.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({}ns)", self.0)
    }
}

/// A span of time in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Creates a duration from whole milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(NANOS_PER_MILLI))
    }

    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Returns the number of whole milliseconds, discarding the remainder.
    #[inline]
    #[must_use]
    pub const fn whole_millis(self) -> u64 {
        self.0 / NANOS_PER_MILLI
    }

    /// Returns the span in fractional microseconds.
    #[inline]
    #[must_use]
    pub fn as_micros_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Saturating addition.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({}ns)", self.0)
    }
}

/// Supplies monotonic timestamps to the pipeline.
pub trait TimeSource {
    /// Returns the current time. Successive calls never go backwards.
    fn now(&self) -> HostTime;
}

/// A [`TimeSource`] backed by [`Instant`], counting from construction.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Starts a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for MonotonicClock {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u64 nanoseconds cover ~584 years of uptime"
    )]
    fn now(&self) -> HostTime {
        HostTime(self.origin.elapsed().as_nanos() as u64)
    }
}

/// A [`TimeSource`] that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub fn new(start: HostTime) -> Self {
        Self {
            now: Cell::new(start.0),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by.0));
    }

    /// Jumps to `t`. Earlier values are ignored so the clock stays monotonic.
    pub fn set(&self, t: HostTime) {
        if t.0 > self.now.get() {
            self.now.set(t.0);
        }
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> HostTime {
        HostTime(self.now.get())
    }
}

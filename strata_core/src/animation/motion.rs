// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Physics-driven motions.
//!
//! A [`Motion`] is not bounded by a duration: the animator feeds it total
//! elapsed time until it reports completion.

/// A time-driven value that decides on its own when it is done.
pub trait Motion {
    /// Total time since the motion started, in milliseconds.
    fn on_timestamp_changed(&mut self, elapsed_ms: f64);

    /// Whether the motion has come to rest.
    fn is_completed(&self) -> bool;

    /// The value at the last timestamp.
    fn current_value(&self) -> f64;
}

/// Exponentially decaying velocity, as for a fling.
///
/// With friction `f`, start `x0`, and start velocity `v0` (units per
/// second), the position at `t` seconds is `x0 + v0 / f * (1 - e^(-f t))`.
pub struct FrictionMotion {
    friction: f64,
    start: f64,
    velocity: f64,
    threshold: f64,
    position: f64,
    current_velocity: f64,
    listeners: Vec<Box<dyn FnMut(f64)>>,
}

impl core::fmt::Debug for FrictionMotion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrictionMotion")
            .field("friction", &self.friction)
            .field("position", &self.position)
            .field("velocity", &self.current_velocity)
            .finish_non_exhaustive()
    }
}

impl FrictionMotion {
    /// Resting velocity below which the motion completes.
    pub const DEFAULT_THRESHOLD: f64 = 1.0;

    /// Creates a motion. A friction that is not strictly positive falls
    /// back to `1.0`.
    #[must_use]
    pub fn new(friction: f64, start: f64, velocity: f64) -> Self {
        let friction = if friction.is_finite() && friction > 0.0 {
            friction
        } else {
            tracing::warn!(friction, "invalid friction, using 1.0");
            1.0
        };
        Self {
            friction,
            start,
            velocity,
            threshold: Self::DEFAULT_THRESHOLD,
            position: start,
            current_velocity: velocity,
            listeners: Vec::new(),
        }
    }

    /// Sets the completion threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.abs();
        self
    }

    /// Where the motion comes to rest.
    #[must_use]
    pub fn final_position(&self) -> f64 {
        self.start + self.velocity / self.friction
    }

    /// Current velocity, units per second.
    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.current_velocity
    }

    /// Registers a listener for position updates.
    pub fn add_listener(&mut self, listener: impl FnMut(f64) + 'static) {
        self.listeners.push(Box::new(listener));
    }
}

impl Motion for FrictionMotion {
    fn on_timestamp_changed(&mut self, elapsed_ms: f64) {
        let t = elapsed_ms.max(0.0) / 1000.0;
        let decay = (-self.friction * t).exp();
        self.position = self.start + self.velocity / self.friction * (1.0 - decay);
        self.current_velocity = self.velocity * decay;
        if self.is_completed() {
            self.position = self.final_position();
        }
        for listener in &mut self.listeners {
            listener(self.position);
        }
    }

    fn is_completed(&self) -> bool {
        self.current_velocity.abs() < self.threshold
    }

    fn current_value(&self) -> f64 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friction_decays_towards_final_position() {
        let mut m = FrictionMotion::new(2.0, 0.0, 1000.0);
        assert_eq!(m.final_position(), 500.0);
        m.on_timestamp_changed(100.0);
        let early = m.current_value();
        assert!(early > 0.0 && early < 500.0, "{early}");
        assert!(!m.is_completed());
        m.on_timestamp_changed(10_000.0);
        assert!(m.is_completed());
        assert_eq!(m.current_value(), 500.0);
    }

    #[test]
    fn invalid_friction_is_replaced() {
        let m = FrictionMotion::new(-1.0, 10.0, 5.0);
        assert_eq!(m.final_position(), 15.0);
    }
}

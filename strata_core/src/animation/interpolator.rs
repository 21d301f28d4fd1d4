// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interpolators: what an [`Animator`](super::Animator) drives.

use kurbo::{Point, Rect, Size, Vec2};

use super::curve::Curve;

/// Receives normalized progress from an animator.
pub trait Interpolator {
    /// The animator is starting from idle or stopped.
    fn on_init(&mut self) {}

    /// New progress `t` in `[0, 1]`. `reverse` reports whether the current
    /// loop runs backwards; `t` is already flipped accordingly.
    fn on_normalized(&mut self, t: f64, reverse: bool);
}

/// Linear interpolation between two values.
pub trait Lerp: Sized {
    /// Value at `t` between `a` (0) and `b` (1).
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for f32 {
    #[expect(clippy::cast_possible_truncation, reason = "f32 in, f32 out")]
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        (f64::from(*a) + (f64::from(*b) - f64::from(*a)) * t) as f32
    }
}

impl Lerp for Vec2 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a.lerp(*b, t)
    }
}

impl Lerp for Point {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a.lerp(*b, t)
    }
}

impl Lerp for Size {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Size::new(f64::lerp(&a.width, &b.width, t), f64::lerp(&a.height, &b.height, t))
    }
}

impl Lerp for Rect {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Rect::from_points(
            Point::lerp(&a.origin(), &b.origin(), t),
            Point::lerp(&Point::new(a.x1, a.y1), &Point::new(b.x1, b.y1), t),
        )
    }
}

/// Listener for [`CurveAnimation`] values.
pub type ValueListener<T> = Box<dyn FnMut(&T)>;

/// Eases between `begin` and `end` and publishes every value.
pub struct CurveAnimation<T> {
    begin: T,
    end: T,
    curve: Curve,
    value: T,
    listeners: Vec<ValueListener<T>>,
}

impl<T: core::fmt::Debug> core::fmt::Debug for CurveAnimation<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CurveAnimation")
            .field("begin", &self.begin)
            .field("end", &self.end)
            .field("curve", &self.curve)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

impl<T: Lerp + Clone> CurveAnimation<T> {
    /// Creates an animation sitting at `begin`.
    pub fn new(begin: T, end: T, curve: Curve) -> Self {
        Self {
            value: begin.clone(),
            begin,
            end,
            curve,
            listeners: Vec::new(),
        }
    }

    /// Registers a listener called with each new value.
    pub fn add_listener(&mut self, listener: impl FnMut(&T) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// The most recent value.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Retargets the animation. The current value is left alone until the
    /// next tick.
    pub fn set_range(&mut self, begin: T, end: T) {
        self.begin = begin;
        self.end = end;
    }

    /// The easing curve.
    #[must_use]
    pub fn curve(&self) -> Curve {
        self.curve
    }
}

impl<T: Lerp + Clone> Interpolator for CurveAnimation<T> {
    fn on_init(&mut self) {
        self.value = self.begin.clone();
    }

    fn on_normalized(&mut self, t: f64, _reverse: bool) {
        self.value = T::lerp(&self.begin, &self.end, self.curve.transform(t));
        for listener in &mut self.listeners {
            listener(&self.value);
        }
    }
}

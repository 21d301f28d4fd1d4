// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Easing curves.

use serde::{Deserialize, Serialize};

/// Maps linear progress in `[0, 1]` to eased progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curve {
    /// Identity.
    #[default]
    Linear,
    /// `cubic-bezier(0.25, 0.1, 0.25, 1.0)`.
    Ease,
    /// `cubic-bezier(0.42, 0.0, 1.0, 1.0)`.
    EaseIn,
    /// `cubic-bezier(0.0, 0.0, 0.58, 1.0)`.
    EaseOut,
    /// `cubic-bezier(0.42, 0.0, 0.58, 1.0)`.
    EaseInOut,
    /// A CSS-style cubic Bézier through `(0,0)`, `(x1,y1)`, `(x2,y2)`, `(1,1)`.
    CubicBezier {
        /// First control point x, clamped to `[0, 1]`.
        x1: f64,
        /// First control point y.
        y1: f64,
        /// Second control point x, clamped to `[0, 1]`.
        x2: f64,
        /// Second control point y.
        y2: f64,
    },
}

impl Curve {
    /// Applies the curve. Input is clamped to `[0, 1]`.
    #[must_use]
    pub fn transform(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Ease => bezier(0.25, 0.1, 0.25, 1.0, t),
            Self::EaseIn => bezier(0.42, 0.0, 1.0, 1.0, t),
            Self::EaseOut => bezier(0.0, 0.0, 0.58, 1.0, t),
            Self::EaseInOut => bezier(0.42, 0.0, 0.58, 1.0, t),
            Self::CubicBezier { x1, y1, x2, y2 } => {
                bezier(x1.clamp(0.0, 1.0), y1, x2.clamp(0.0, 1.0), y2, t)
            }
        }
    }
}

// One coordinate of a cubic Bézier with endpoints 0 and 1.
fn sample(p1: f64, p2: f64, s: f64) -> f64 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

fn slope(p1: f64, p2: f64, s: f64) -> f64 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

fn bezier(x1: f64, y1: f64, x2: f64, y2: f64, t: f64) -> f64 {
    if t <= 0.0 || t >= 1.0 {
        return t;
    }
    // Newton first, bisection if it stalls on a flat slope.
    let mut s = t;
    for _ in 0..8 {
        let err = sample(x1, x2, s) - t;
        if err.abs() < 1e-7 {
            return sample(y1, y2, s);
        }
        let d = slope(x1, x2, s);
        if d.abs() < 1e-6 {
            break;
        }
        s -= err / d;
    }
    let (mut lo, mut hi) = (0.0, 1.0);
    s = t;
    for _ in 0..64 {
        let x = sample(x1, x2, s);
        if (x - t).abs() < 1e-7 {
            break;
        }
        if x < t {
            lo = s;
        } else {
            hi = s;
        }
        s = 0.5 * (lo + hi);
    }
    sample(y1, y2, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn endpoints_are_fixed() {
        for curve in [
            Curve::Linear,
            Curve::Ease,
            Curve::EaseIn,
            Curve::EaseOut,
            Curve::EaseInOut,
        ] {
            assert_eq!(curve.transform(0.0), 0.0, "{curve:?} at 0");
            assert_eq!(curve.transform(1.0), 1.0, "{curve:?} at 1");
            assert_eq!(curve.transform(-3.0), 0.0, "{curve:?} clamps");
        }
    }

    #[test]
    fn ease_in_out_is_symmetric() {
        let a = Curve::EaseInOut.transform(0.25);
        let b = Curve::EaseInOut.transform(0.75);
        assert!(close(a + b, 1.0), "{a} + {b}");
        assert!(close(Curve::EaseInOut.transform(0.5), 0.5));
    }

    #[test]
    fn ease_in_starts_slow() {
        assert!(Curve::EaseIn.transform(0.2) < 0.2);
        assert!(Curve::EaseOut.transform(0.2) > 0.2);
    }

    #[test]
    fn linear_bezier_is_identity() {
        let c = Curve::CubicBezier {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
        };
        assert!(close(c.transform(0.3), 0.3));
    }

    #[test]
    fn deserializes_by_name() {
        let c: Curve = serde_json::from_str(r#""ease_out""#).unwrap();
        assert_eq!(c, Curve::EaseOut);
    }
}

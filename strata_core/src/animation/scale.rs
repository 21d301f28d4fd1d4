// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Process-wide animation duration scale.
//!
//! Developer settings slow down or speed up every animation at once. The
//! knob is written rarely and read on every tick, so it lives in an atomic
//! holding the `f64` bit pattern.

use std::sync::atomic::{AtomicU64, Ordering};

const UNSCALED: u64 = 1.0_f64.to_bits();

#[cfg(not(test))]
static DURATION_SCALE: AtomicU64 = AtomicU64::new(UNSCALED);

// Unit tests run in parallel threads; each gets its own knob.
#[cfg(test)]
thread_local! {
    static DURATION_SCALE: AtomicU64 = const { AtomicU64::new(UNSCALED) };
}

fn with_scale<R>(f: impl FnOnce(&AtomicU64) -> R) -> R {
    #[cfg(not(test))]
    {
        f(&DURATION_SCALE)
    }
    #[cfg(test)]
    {
        DURATION_SCALE.with(f)
    }
}

/// Sets the multiplier applied to every animator's duration and start delay.
///
/// Negative or non-finite values are rejected and logged; the previous
/// scale stays in effect. Returns whether the value was accepted.
pub fn set_duration_scale(scale: f64) -> bool {
    if !scale.is_finite() || scale < 0.0 {
        tracing::warn!(scale, "rejected animation duration scale");
        return false;
    }
    with_scale(|cell| cell.store(scale.to_bits(), Ordering::Relaxed));
    tracing::info!(scale, "animation duration scale set");
    true
}

/// The current duration multiplier. `1.0` unless changed.
#[must_use]
pub fn duration_scale() -> f64 {
    f64::from_bits(with_scale(|cell| cell.load(Ordering::Relaxed)))
}

/// Applies `scale` to a millisecond span, truncating toward zero.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "result is clamped to the i64 range the timeline uses"
)]
pub(crate) fn scale_millis(ms: i32, scale: f64) -> i64 {
    (f64::from(ms) * scale).clamp(0.0, i64::MAX as f64) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_truncates() {
        assert_eq!(scale_millis(1000, 1.0), 1000);
        assert_eq!(scale_millis(1000, 0.5), 500);
        assert_eq!(scale_millis(3, 0.5), 1, "1.5ms truncates");
        assert_eq!(scale_millis(1000, 0.0), 0, "zero scale completes instantly");
    }

    #[test]
    fn invalid_scale_is_rejected() {
        assert!(!set_duration_scale(-1.0));
        assert!(!set_duration_scale(f64::NAN));
        assert!(set_duration_scale(1.0));
        assert_eq!(duration_scale(), 1.0);
    }
}

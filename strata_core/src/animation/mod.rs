// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation timelines.
//!
//! An [`Animator`] turns frame deltas into normalized progress and pushes it
//! into [`Interpolator`]s. Running animators live in the pipeline's
//! [`ScheduleRegistry`] and advance once per vsync during the
//! AnimationAdvance phase. A process-wide [duration scale](set_duration_scale)
//! stretches every timeline at once.

mod animator;
mod curve;
mod interpolator;
mod motion;
mod scale;
mod scheduler;

pub use animator::{
    AnimationDirection, Animator, AnimatorConfig, AnimatorEvent, AnimatorListener,
    AnimatorStatus, FillMode,
};
pub use curve::Curve;
pub use interpolator::{CurveAnimation, Interpolator, Lerp, ValueListener};
pub use motion::{FrictionMotion, Motion};
pub use scale::{duration_scale, set_duration_scale};
pub use scheduler::{FrameClock, ScheduleHandle, ScheduleRegistry, ScheduleTask};

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::event::{GestureMask, TouchRestrict};

/// Tunables for a [`PipelineContext`](crate::pipeline::PipelineContext).
///
/// Plain data with `const` presets. Embedders that load settings from disk
/// can deserialize it; missing fields take the [`standard`](Self::standard)
/// values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Device pixels per logical pixel. Input coordinates are divided by it.
    pub view_scale: f64,
    /// Gesture classes forbidden for every touch target.
    pub touch_restrict: TouchRestrict,
    /// Continuous pointer movement requests a frame and a forced repaint.
    pub refresh_on_move: bool,
    /// An idle callback flushes mutations queued since the last frame.
    pub flush_on_idle: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl PipelineConfig {
    /// Full applications.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            view_scale: 1.0,
            touch_restrict: TouchRestrict::NONE,
            refresh_on_move: true,
            flush_on_idle: true,
        }
    }

    /// Embedded cards: no drag-and-drop, no idle flushing, and no repaint
    /// on pointer movement.
    #[must_use]
    pub const fn card() -> Self {
        Self {
            view_scale: 1.0,
            touch_restrict: TouchRestrict::NONE.forbid(GestureMask::DRAG),
            refresh_on_move: false,
            flush_on_idle: false,
        }
    }

    /// Returns the config with a different view scale.
    #[must_use]
    pub const fn with_view_scale(mut self, scale: f64) -> Self {
        self.view_scale = scale;
        self
    }

    /// Returns the config with a different global touch restriction.
    #[must_use]
    pub const fn with_touch_restrict(mut self, restrict: TouchRestrict) -> Self {
        self.touch_restrict = restrict;
        self
    }

    /// Returns the config with repaint-on-move switched.
    #[must_use]
    pub const fn with_refresh_on_move(mut self, on: bool) -> Self {
        self.refresh_on_move = on;
        self
    }

    /// Returns the config with idle flushing switched.
    #[must_use]
    pub const fn with_flush_on_idle(mut self, on: bool) -> Self {
        self.flush_on_idle = on;
        self
    }
}

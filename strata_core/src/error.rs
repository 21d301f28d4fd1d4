// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! None of these ever escape the frame loop: the pipeline logs them and
//! carries on with the previous state. They are returned from the public
//! configuration and restoration entry points so callers can react.

/// Rejected animator parameter. The animator keeps its previous value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimatorError {
    /// Duration was negative.
    #[error("invalid duration: {0}ms")]
    InvalidDuration(i32),

    /// Start delay was negative.
    #[error("invalid start delay: {0}ms")]
    InvalidStartDelay(i32),

    /// Iteration count was below `-1` (infinite).
    #[error("invalid iteration count: {0}")]
    InvalidIteration(i32),

    /// Manual seek outside `0..=duration`, or on a timeline that cannot seek.
    #[error("invalid seek: {0}")]
    InvalidSeek(String),
}

impl AnimatorError {
    /// Creates an [`InvalidSeek`](Self::InvalidSeek) error.
    pub fn seek(msg: impl Into<String>) -> Self {
        Self::InvalidSeek(msg.into())
    }
}

/// A restoration payload could not be applied.
#[derive(thiserror::Error, Debug)]
pub enum RestoreError {
    /// The payload was not valid JSON.
    #[error("restore payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but was not a JSON object.
    #[error("restore payload is not an object: {0}")]
    NotObject(String),
}

/// A task could not be submitted to a lane.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneError {
    /// The executor has been shut down.
    #[error("lane {0:?} is closed")]
    Closed(crate::lane::Lane),
}

/// A node failed to lay itself out. Its geometry is left unchanged.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    /// The layout behavior could not satisfy the given constraint.
    #[error("layout error: {0}")]
    Layout(String),
}

impl NodeError {
    /// Creates a [`Layout`](Self::Layout) error.
    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            AnimatorError::InvalidDuration(-5)
                .to_string()
                .starts_with("invalid duration:"),
            "duration prefix"
        );
        assert!(
            AnimatorError::seek("x").to_string().starts_with("invalid seek:"),
            "seek prefix"
        );
        assert!(
            NodeError::layout("x").to_string().starts_with("layout error:"),
            "layout prefix"
        );
        assert!(
            RestoreError::NotObject("[]".into())
                .to_string()
                .contains("not an object"),
            "restore prefix"
        );
    }

    #[test]
    fn json_errors_convert() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: RestoreError = err.into();
        assert!(err.to_string().contains("not valid JSON"), "got: {err}");
    }
}

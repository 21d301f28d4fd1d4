// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input events, hit testing, and dispatch.
//!
//! Coordinates reaching this module are already logical (divided by the view
//! scale); the pipeline does the conversion at its entry points.

mod manager;
mod types;

pub use hit_test::{HitMode, TouchTarget, hit_test, touch_test};
pub use manager::EventManager;
pub use types::{
    AxisAction, AxisEvent, AxisHandler, EventHandlers, GestureMask, HoverChange, HoverHandler,
    KeyAction, KeyCode, KeyEvent, KeyHandler, MOUSE_POINTER_ID, MouseAction, MouseButton,
    MouseEvent, MouseHandler, TouchEvent, TouchHandler, TouchRestrict, TouchType,
    VisibilityHandler,
};

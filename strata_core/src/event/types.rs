// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input event values, gesture masks, and handler types.

use core::fmt;
use core::ops::BitOr;

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::time::HostTime;

/// Pointer id used when a left-button mouse gesture is replayed as touch.
pub const MOUSE_POINTER_ID: i32 = 1000;

// ---------------------------------------------------------------------------
// Gesture classes
// ---------------------------------------------------------------------------

/// A set of gesture classes.
///
/// Nodes declare which classes they recognize; an ancestor can forbid
/// classes for its whole subtree through a [`TouchRestrict`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GestureMask(pub u32);

impl GestureMask {
    /// No gesture classes.
    pub const NONE: Self = Self(0);
    /// Tap / click.
    pub const CLICK: Self = Self(1 << 0);
    /// Press and hold.
    pub const LONG_PRESS: Self = Self(1 << 1);
    /// Single-pointer drag.
    pub const PAN: Self = Self(1 << 2);
    /// Fast directional fling.
    pub const SWIPE: Self = Self(1 << 3);
    /// Two-pointer scale.
    pub const PINCH: Self = Self(1 << 4);
    /// Two-pointer rotation.
    pub const ROTATION: Self = Self(1 << 5);
    /// Drag and drop.
    pub const DRAG: Self = Self(1 << 6);

    /// Returns `true` if no class is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every class in `other` is also in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Classes in `self` that are not in `other`.
    #[inline]
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Classes in either mask.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for GestureMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for GestureMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GestureMask({:#b})", self.0)
    }
}

/// Gesture classes that may not be recognized below some ancestor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TouchRestrict {
    /// Classes no node in the subtree may recognize.
    pub forbidden: GestureMask,
}

impl TouchRestrict {
    /// Nothing forbidden.
    pub const NONE: Self = Self {
        forbidden: GestureMask::NONE,
    };

    /// Returns a restriction that also forbids `mask`.
    #[must_use]
    pub const fn forbid(self, mask: GestureMask) -> Self {
        Self {
            forbidden: self.forbidden.union(mask),
        }
    }

    /// Returns the subset of `gestures` still allowed.
    #[must_use]
    pub const fn allowed(self, gestures: GestureMask) -> GestureMask {
        gestures.difference(self.forbidden)
    }
}

// ---------------------------------------------------------------------------
// Touch
// ---------------------------------------------------------------------------

/// Phase of a touch sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TouchType {
    /// First sample of a gesture; triggers a hit test.
    Down,
    /// Pointer lifted; ends the gesture.
    Up,
    /// Pointer moved while down.
    Move,
    /// Gesture aborted by the platform; ends the gesture.
    Cancel,
}

impl TouchType {
    /// Whether this sample ends the gesture and clears its cached chain.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Up | Self::Cancel)
    }
}

/// One touch sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchEvent {
    /// Pointer id; each finger has its own cached target chain.
    pub id: i32,
    /// Position, in device pixels until scaled by the pipeline.
    pub point: Point,
    /// Sample phase.
    pub kind: TouchType,
    /// Platform timestamp.
    pub time: HostTime,
}

impl TouchEvent {
    /// Creates a sample at `(x, y)` with a zero timestamp.
    #[must_use]
    pub fn new(id: i32, kind: TouchType, x: f64, y: f64) -> Self {
        Self {
            id,
            point: Point::new(x, y),
            kind,
            time: HostTime::default(),
        }
    }

    /// Returns the sample with its position divided by `scale`.
    ///
    /// A non-positive or non-finite scale leaves the position unchanged.
    #[must_use]
    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            point: scale_point(self.point, scale),
            ..*self
        }
    }
}

// ---------------------------------------------------------------------------
// Mouse
// ---------------------------------------------------------------------------

/// What a mouse sample reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseAction {
    /// No button transition; position only.
    None,
    /// A button went down.
    Press,
    /// A button went up.
    Release,
    /// The pointer moved.
    Move,
}

/// Which button a mouse sample is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// No button.
    None,
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Wheel button.
    Middle,
    /// Back side button.
    Back,
    /// Forward side button.
    Forward,
}

/// One mouse sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseEvent {
    /// Position, in device pixels until scaled.
    pub point: Point,
    /// What happened.
    pub action: MouseAction,
    /// Button the action refers to.
    pub button: MouseButton,
    /// Bitset of buttons currently held ([`MouseEvent::PRESSED_LEFT`], ...).
    pub pressed_buttons: u32,
    /// Platform timestamp.
    pub time: HostTime,
}

impl MouseEvent {
    /// Bit set in [`pressed_buttons`](Self::pressed_buttons) while the left
    /// button is held.
    pub const PRESSED_LEFT: u32 = 1;

    /// Creates a sample at `(x, y)` with no buttons held.
    #[must_use]
    pub fn new(action: MouseAction, button: MouseButton, x: f64, y: f64) -> Self {
        Self {
            point: Point::new(x, y),
            action,
            button,
            pressed_buttons: 0,
            time: HostTime::default(),
        }
    }

    /// Returns the sample with its position divided by `scale`.
    #[must_use]
    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            point: scale_point(self.point, scale),
            ..*self
        }
    }

    /// The touch sample a left-button gesture replays as, if any.
    ///
    /// Press, release, and move with the left button involved map to
    /// down, up, and move on [`MOUSE_POINTER_ID`].
    #[must_use]
    pub fn as_touch(&self) -> Option<TouchEvent> {
        let left = self.button == MouseButton::Left
            || self.pressed_buttons & Self::PRESSED_LEFT != 0;
        if !left {
            return None;
        }
        let kind = match self.action {
            MouseAction::Press => TouchType::Down,
            MouseAction::Release => TouchType::Up,
            MouseAction::Move => TouchType::Move,
            MouseAction::None => return None,
        };
        Some(TouchEvent {
            id: MOUSE_POINTER_ID,
            point: self.point,
            kind,
            time: self.time,
        })
    }
}

// ---------------------------------------------------------------------------
// Axis
// ---------------------------------------------------------------------------

/// Phase of a scroll-wheel / touchpad axis gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AxisAction {
    /// Stand-alone sample with no gesture around it.
    None,
    /// First sample of a gesture; triggers a hit test.
    Begin,
    /// Continuation sample.
    Update,
    /// Last sample; clears the cached target.
    End,
}

/// One axis sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisEvent {
    /// Device id.
    pub id: i32,
    /// Pointer position, in device pixels until scaled.
    pub point: Point,
    /// Horizontal scroll amount.
    pub horizontal: f64,
    /// Vertical scroll amount.
    pub vertical: f64,
    /// Gesture phase.
    pub action: AxisAction,
    /// Platform timestamp.
    pub time: HostTime,
}

impl AxisEvent {
    /// Creates a vertical scroll sample at `(x, y)`.
    #[must_use]
    pub fn vertical(action: AxisAction, x: f64, y: f64, amount: f64) -> Self {
        Self {
            id: 0,
            point: Point::new(x, y),
            horizontal: 0.0,
            vertical: amount,
            action,
            time: HostTime::default(),
        }
    }

    /// Returns the sample with its position divided by `scale`.
    #[must_use]
    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            point: scale_point(self.point, scale),
            ..*self
        }
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Platform key code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u32);

impl KeyCode {
    /// Letter A.
    pub const A: Self = Self(2017);
    /// Left shift.
    pub const SHIFT_LEFT: Self = Self(2047);
    /// Right shift.
    pub const SHIFT_RIGHT: Self = Self(2048);
    /// Tab.
    pub const TAB: Self = Self(2049);
    /// Enter.
    pub const ENTER: Self = Self(2054);
    /// Left control.
    pub const CTRL_LEFT: Self = Self(2072);
    /// Right control.
    pub const CTRL_RIGHT: Self = Self(2073);
    /// D-pad up.
    pub const DPAD_UP: Self = Self(2012);
    /// D-pad down.
    pub const DPAD_DOWN: Self = Self(2013);
    /// D-pad left.
    pub const DPAD_LEFT: Self = Self(2014);
    /// D-pad right.
    pub const DPAD_RIGHT: Self = Self(2015);

    /// Whether this is either shift key.
    #[must_use]
    pub const fn is_shift(self) -> bool {
        self.0 == Self::SHIFT_LEFT.0 || self.0 == Self::SHIFT_RIGHT.0
    }

    /// Whether this is either control key.
    #[must_use]
    pub const fn is_ctrl(self) -> bool {
        self.0 == Self::CTRL_LEFT.0 || self.0 == Self::CTRL_RIGHT.0
    }
}

/// Phase of a key event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Key went down; fixes the target chain for this key.
    Down,
    /// Key went up; clears the chain for this key.
    Up,
    /// Key held past the long-press threshold.
    LongPress,
    /// Synthesized activation.
    Click,
}

/// One key event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    /// Which key.
    pub code: KeyCode,
    /// What happened.
    pub action: KeyAction,
    /// Auto-repeat count.
    pub repeat: u32,
    /// Platform timestamp.
    pub time: HostTime,
}

impl KeyEvent {
    /// Creates a non-repeating event.
    #[must_use]
    pub fn new(code: KeyCode, action: KeyAction) -> Self {
        Self {
            code,
            action,
            repeat: 0,
            time: HostTime::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Hover membership transition delivered to a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HoverChange {
    /// Pointer entered the node's hit region.
    Enter,
    /// Pointer left the node's hit region.
    Exit,
}

/// Receives touch samples; the mask is the node's recognized gestures minus
/// everything its ancestors forbid. Returns `true` to consume.
pub type TouchHandler = Box<dyn FnMut(&TouchEvent, GestureMask) -> bool>;
/// Receives mouse samples. Returns `true` to consume.
pub type MouseHandler = Box<dyn FnMut(&MouseEvent) -> bool>;
/// Receives hover enter/exit.
pub type HoverHandler = Box<dyn FnMut(HoverChange)>;
/// Receives axis samples. Returns `true` to consume.
pub type AxisHandler = Box<dyn FnMut(&AxisEvent) -> bool>;
/// Receives key events routed through the focus chain. Returns `true` to
/// consume.
pub type KeyHandler = Box<dyn FnMut(&KeyEvent) -> bool>;
/// Receives on-screen visibility flips.
pub type VisibilityHandler = Box<dyn FnMut(bool)>;

/// The input callbacks attached to one node.
#[derive(Default)]
pub struct EventHandlers {
    pub(crate) touch: Option<TouchHandler>,
    pub(crate) mouse: Option<MouseHandler>,
    pub(crate) hover: Option<HoverHandler>,
    pub(crate) axis: Option<AxisHandler>,
    pub(crate) key: Option<KeyHandler>,
}

impl EventHandlers {
    /// Whether the node takes part in touch hit testing.
    #[must_use]
    pub fn has_touch(&self) -> bool {
        self.touch.is_some()
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("touch", &self.touch.is_some())
            .field("mouse", &self.mouse.is_some())
            .field("hover", &self.hover.is_some())
            .field("axis", &self.axis.is_some())
            .field("key", &self.key.is_some())
            .finish()
    }
}

fn scale_point(p: Point, scale: f64) -> Point {
    if scale.is_finite() && scale > 0.0 {
        Point::new(p.x / scale, p.y / scale)
    } else {
        p
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input entry points.
//!
//! Samples arrive in device pixels and are divided by the view scale before
//! they reach the [`EventManager`](crate::event::EventManager). Handlers may
//! mutate the tree; a frame is requested afterwards if they did.

use super::context::PipelineContext;
use crate::event::{AxisEvent, KeyAction, KeyEvent, MouseAction, MouseEvent, TouchEvent, TouchType};

impl PipelineContext {
    /// Delivers a touch sample. Returns whether a handler consumed it.
    ///
    /// Down hit-tests and caches the chain for the pointer; every other
    /// sample reuses it.
    pub fn on_touch_event(&mut self, event: &TouchEvent) -> bool {
        if !self.input_ready() {
            return false;
        }
        let event = event.scaled(self.config.view_scale);
        let consumed = self.route_touch(&event);
        self.request_frame_if_needed();
        consumed
    }

    /// Delivers a mouse sample. Returns whether a handler consumed it.
    ///
    /// Left-button presses, releases, and drags are replayed as touch
    /// samples first. Moves also update the hover set.
    pub fn on_mouse_event(&mut self, event: &MouseEvent) -> bool {
        if !self.input_ready() {
            return false;
        }
        let event = event.scaled(self.config.view_scale);
        let mut consumed = false;
        if let Some(touch) = event.as_touch() {
            consumed |= self.route_touch(&touch);
        }
        consumed |= self
            .events
            .dispatch_mouse_event(&mut self.store, self.root, &event);
        if matches!(event.action, MouseAction::Move | MouseAction::None) {
            self.events
                .dispatch_mouse_hover_event(&mut self.store, self.root, event.point);
        }
        self.request_frame_if_needed();
        consumed
    }

    /// Delivers a scroll sample. Returns whether a handler consumed it.
    pub fn on_axis_event(&mut self, event: &AxisEvent) -> bool {
        if !self.input_ready() {
            return false;
        }
        let event = event.scaled(self.config.view_scale);
        let consumed = self
            .events
            .dispatch_axis_event(&mut self.store, self.root, &event);
        self.request_frame_if_needed();
        consumed
    }

    /// Delivers a key event along the focus path. Returns whether a handler
    /// consumed it.
    ///
    /// Shift and control state is tracked before dispatch.
    pub fn on_key_event(&mut self, event: &KeyEvent) -> bool {
        if !self.input_ready() {
            return false;
        }
        let held = match event.action {
            KeyAction::Down => Some(true),
            KeyAction::Up => Some(false),
            KeyAction::LongPress | KeyAction::Click => None,
        };
        if let Some(held) = held {
            if event.code.is_shift() {
                self.modifiers.shift = held;
            } else if event.code.is_ctrl() {
                self.modifiers.ctrl = held;
            }
        }
        let focused = self.focus.focused();
        let consumed = self
            .events
            .dispatch_key_event(&mut self.store, focused, event);
        self.request_frame_if_needed();
        consumed
    }

    fn input_ready(&self) -> bool {
        if !self.alive {
            return false;
        }
        if !self.has_live_root() {
            tracing::debug!("input without a root ignored");
            return false;
        }
        true
    }

    fn route_touch(&mut self, event: &TouchEvent) -> bool {
        let consumed = self.events.handle_touch(
            &mut self.store,
            self.root,
            event,
            self.config.touch_restrict,
        );
        if event.kind == TouchType::Move && self.config.refresh_on_move {
            self.refresh_after_vsync = true;
            self.request_frame();
        }
        consumed
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use kurbo::{Point, Rect};

    use super::super::harness::{pipeline, ready};
    use crate::config::PipelineConfig;
    use crate::event::{KeyCode, MOUSE_POINTER_ID, MouseButton};
    use crate::node::NodeFlags;

    use super::*;

    #[test]
    fn touch_is_scaled_and_chain_reused_until_up() {
        let mut h = ready(PipelineConfig::standard().with_view_scale(2.0));
        let leaf = h.leaf(Rect::new(0.0, 0.0, 50.0, 50.0), NodeFlags::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        h.ctx.mutate(|store| {
            store.on_touch(leaf, move |e, _| {
                s.borrow_mut().push((e.kind, e.point));
                true
            });
        });
        h.frame();

        assert!(
            h.ctx.on_touch_event(&TouchEvent::new(1, TouchType::Down, 60.0, 60.0)),
            "hit at logical (30, 30)"
        );
        assert!(
            h.ctx.on_touch_event(&TouchEvent::new(1, TouchType::Move, 300.0, 300.0)),
            "move outside still reaches the cached chain"
        );
        assert!(h.ctx.events().touch_chain(1).is_some(), "chain cached");
        h.ctx.on_touch_event(&TouchEvent::new(1, TouchType::Up, 300.0, 300.0));
        assert!(h.ctx.events().touch_chain(1).is_none(), "up clears the chain");

        assert_eq!(
            *seen.borrow(),
            [
                (TouchType::Down, Point::new(30.0, 30.0)),
                (TouchType::Move, Point::new(150.0, 150.0)),
                (TouchType::Up, Point::new(150.0, 150.0)),
            ],
            "positions divided by the view scale"
        );
    }

    #[test]
    fn pointer_move_forces_refresh_after_vsync() {
        let mut h = ready(PipelineConfig::standard());
        h.frame();
        h.ctx
            .on_touch_event(&TouchEvent::new(1, TouchType::Down, 5.0, 5.0));
        assert!(!h.ctx.is_frame_requested(), "down alone changes nothing");
        h.ctx
            .on_touch_event(&TouchEvent::new(1, TouchType::Move, 8.0, 8.0));
        assert!(h.ctx.is_frame_requested(), "move requests a frame");
        h.frame();
        let commit = h.surface.last_commit().expect("forced repaint");
        assert!(commit.full_repaint, "refresh after vsync");
    }

    #[test]
    fn card_config_does_not_refresh_on_move() {
        let mut h = ready(PipelineConfig::card());
        h.frame();
        h.ctx
            .on_touch_event(&TouchEvent::new(1, TouchType::Move, 8.0, 8.0));
        assert!(!h.ctx.is_frame_requested(), "cards ignore pointer movement");
    }

    #[test]
    fn left_mouse_replays_as_touch_and_hover_diffs() {
        let mut h = ready(PipelineConfig::standard());
        let a = h.leaf(Rect::new(0.0, 0.0, 50.0, 50.0), NodeFlags::default());
        let b = h.leaf(Rect::new(100.0, 0.0, 150.0, 50.0), NodeFlags::default());
        let log = Rc::new(RefCell::new(Vec::new()));
        let (la, lb, lt) = (log.clone(), log.clone(), log.clone());
        h.ctx.mutate(|store| {
            store.on_hover(a, move |c| la.borrow_mut().push(format!("a:{c:?}")));
            store.on_hover(b, move |c| lb.borrow_mut().push(format!("b:{c:?}")));
            store.on_touch(b, move |e, _| {
                lt.borrow_mut().push(format!("touch:{}:{:?}", e.id, e.kind));
                false
            });
        });
        h.frame();

        let hover = |x, y| MouseEvent::new(MouseAction::Move, MouseButton::None, x, y);
        h.ctx.on_mouse_event(&hover(10.0, 10.0));
        h.ctx.on_mouse_event(&hover(120.0, 10.0));
        h.ctx.on_mouse_event(&MouseEvent::new(
            MouseAction::Press,
            MouseButton::Left,
            120.0,
            10.0,
        ));
        assert_eq!(
            *log.borrow(),
            [
                "a:Enter".to_owned(),
                "a:Exit".to_owned(),
                "b:Enter".to_owned(),
                format!("touch:{MOUSE_POINTER_ID}:Down"),
            ],
            "hover diffs and left press replays as touch"
        );

        h.ctx.on_hide();
        assert_eq!(log.borrow().last().map(String::as_str), Some("b:Exit"), "hide clears hover");
        assert!(h.ctx.events().hovered().is_empty(), "no hovered nodes");
    }

    #[test]
    fn key_events_without_root_are_ignored() {
        let mut h = pipeline(PipelineConfig::standard());
        assert!(
            !h.ctx
                .on_key_event(&KeyEvent::new(KeyCode::SHIFT_LEFT, KeyAction::Down)),
            "nothing to dispatch to"
        );
        assert!(!h.ctx.modifiers().shift, "modifiers untouched");
    }

    #[test]
    fn key_events_track_modifiers_and_reach_focus() {
        let mut h = ready(PipelineConfig::standard());
        let flags = NodeFlags {
            focusable: true,
            ..NodeFlags::default()
        };
        let field = h.leaf(Rect::new(0.0, 0.0, 50.0, 20.0), flags);
        let keys = Rc::new(RefCell::new(Vec::new()));
        let k = keys.clone();
        h.ctx.mutate(|store| {
            store.on_key(field, move |e| {
                k.borrow_mut().push(e.code);
                e.code == KeyCode::A
            });
        });
        h.frame();
        assert_eq!(h.ctx.focused(), Some(field), "focus settled");

        h.ctx
            .on_key_event(&KeyEvent::new(KeyCode::SHIFT_LEFT, KeyAction::Down));
        assert!(h.ctx.modifiers().shift, "shift held");
        assert!(
            h.ctx.on_key_event(&KeyEvent::new(KeyCode::A, KeyAction::Down)),
            "focused node consumes A"
        );
        h.ctx
            .on_key_event(&KeyEvent::new(KeyCode::CTRL_RIGHT, KeyAction::Down));
        h.ctx
            .on_key_event(&KeyEvent::new(KeyCode::SHIFT_LEFT, KeyAction::Up));
        assert_eq!(
            h.ctx.modifiers(),
            crate::pipeline::KeyModifiers {
                shift: false,
                ctrl: true
            },
            "modifier state follows down and up"
        );
        assert_eq!(keys.borrow()[1], KeyCode::A, "delivered to focused node");
    }

    #[test]
    fn axis_chain_is_scaled() {
        let mut h = ready(PipelineConfig::standard().with_view_scale(2.0));
        let leaf = h.leaf(Rect::new(0.0, 0.0, 50.0, 50.0), NodeFlags::default());
        let points = Rc::new(RefCell::new(Vec::new()));
        let p = points.clone();
        h.ctx.mutate(|store| {
            store.on_axis(leaf, move |e| {
                p.borrow_mut().push(e.point);
                true
            });
        });
        h.frame();
        assert!(
            h.ctx.on_axis_event(&AxisEvent::vertical(
                crate::event::AxisAction::Begin,
                40.0,
                40.0,
                3.0
            )),
            "scroll consumed"
        );
        assert_eq!(*points.borrow(), [Point::new(20.0, 20.0)], "scaled");
    }

    #[test]
    fn input_without_root_is_ignored() {
        let mut h = pipeline(PipelineConfig::standard());
        assert!(
            !h.ctx
                .on_touch_event(&TouchEvent::new(1, TouchType::Down, 1.0, 1.0)),
            "no root, no dispatch"
        );
        assert_eq!(h.ctx.events().active_pointers(), 0, "nothing cached");
    }
}

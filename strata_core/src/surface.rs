// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The presentation surface contract.
//!
//! A [`RenderSurface`] delivers vsync ticks and accepts one [`FrameCommit`]
//! per flushed frame. The pipeline never draws; it records
//! [`DisplayItem`]s and hands them over.
//!
//! [`HeadlessSurface`] is an in-memory implementation for tests, demos, and
//! replay. Its vsync is fired by hand.

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::Rect;

use crate::node::DisplayItem;
use crate::time::HostTime;

/// One vertical-sync signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VsyncTick {
    /// When the vsync happened. Non-decreasing across ticks.
    pub timestamp: HostTime,
    /// Platform frame counter.
    pub frame_count: u32,
}

/// Receives vsync ticks from a surface.
pub type VsyncCallback = Box<dyn FnMut(VsyncTick)>;

/// What one flushed frame hands to the surface.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameCommit {
    /// Sequential frame number assigned by the pipeline.
    pub frame_index: u64,
    /// Union of the global rects that repainted, if anything did.
    pub dirty_rect: Option<Rect>,
    /// The whole root was repainted.
    pub full_repaint: bool,
    /// Recorded drawing, in paint order.
    pub items: Vec<DisplayItem>,
}

impl FrameCommit {
    /// Whether anything was repainted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dirty_rect.is_none() && self.items.is_empty()
    }
}

/// A platform presentation target.
pub trait RenderSurface {
    /// Registers the function vsync ticks are delivered to, replacing any
    /// previous one.
    fn set_vsync_callback(&mut self, callback: VsyncCallback);

    /// Asks for one vsync tick.
    fn request_frame(&mut self);

    /// Presents a flushed frame.
    fn commit(&mut self, commit: &FrameCommit);

    /// Updates the regions the window compositor should blur behind.
    fn set_window_blur_regions(&mut self, _regions: &[Rect]) {}

    /// Releases platform resources. No callbacks fire afterwards.
    fn destroy(&mut self) {}
}

#[derive(Default)]
struct HeadlessState {
    callback: Option<VsyncCallback>,
    frame_requests: u32,
    commits: Vec<FrameCommit>,
    blur_regions: Vec<Rect>,
    destroyed: bool,
    frame_count: u32,
}

/// An in-memory [`RenderSurface`].
///
/// Clones share state: hand one clone to the pipeline and keep another to
/// fire vsync and inspect what was committed.
#[derive(Clone, Default)]
pub struct HeadlessSurface {
    state: Rc<RefCell<HeadlessState>>,
}

impl core::fmt::Debug for HeadlessSurface {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("HeadlessSurface")
            .field("frame_requests", &s.frame_requests)
            .field("commits", &s.commits.len())
            .field("destroyed", &s.destroyed)
            .finish_non_exhaustive()
    }
}

impl HeadlessSurface {
    /// Creates a surface with no callback registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a vsync tick at `timestamp` if a callback is registered and
    /// the surface is alive. Returns whether a callback ran.
    ///
    /// Pending frame requests are consumed.
    pub fn fire_vsync(&self, timestamp: HostTime) -> bool {
        let (callback, tick) = {
            let mut s = self.state.borrow_mut();
            if s.destroyed {
                return false;
            }
            s.frame_requests = 0;
            s.frame_count = s.frame_count.wrapping_add(1);
            let tick = VsyncTick {
                timestamp,
                frame_count: s.frame_count,
            };
            (s.callback.take(), tick)
        };
        let Some(mut callback) = callback else {
            return false;
        };
        callback(tick);
        let mut s = self.state.borrow_mut();
        if s.callback.is_none() && !s.destroyed {
            s.callback = Some(callback);
        }
        true
    }

    /// Frame requests since the last vsync.
    #[must_use]
    pub fn frame_requests(&self) -> u32 {
        self.state.borrow().frame_requests
    }

    /// Every frame committed so far.
    #[must_use]
    pub fn commits(&self) -> Vec<FrameCommit> {
        self.state.borrow().commits.clone()
    }

    /// The most recent commit.
    #[must_use]
    pub fn last_commit(&self) -> Option<FrameCommit> {
        self.state.borrow().commits.last().cloned()
    }

    /// The blur regions last pushed.
    #[must_use]
    pub fn blur_regions(&self) -> Vec<Rect> {
        self.state.borrow().blur_regions.clone()
    }

    /// Whether [`RenderSurface::destroy`] was called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }
}

impl RenderSurface for HeadlessSurface {
    fn set_vsync_callback(&mut self, callback: VsyncCallback) {
        self.state.borrow_mut().callback = Some(callback);
    }

    fn request_frame(&mut self) {
        self.state.borrow_mut().frame_requests += 1;
    }

    fn commit(&mut self, commit: &FrameCommit) {
        self.state.borrow_mut().commits.push(commit.clone());
    }

    fn set_window_blur_regions(&mut self, regions: &[Rect]) {
        self.state.borrow_mut().blur_regions = regions.to_vec();
    }

    fn destroy(&mut self) {
        let mut s = self.state.borrow_mut();
        s.destroyed = true;
        s.callback = None;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn vsync_fires_registered_callback() {
        let surface = HeadlessSurface::new();
        assert!(!surface.fire_vsync(HostTime(1)), "nothing registered");

        let seen = Rc::new(Cell::new(0_u32));
        let s = seen.clone();
        let mut handle = surface.clone();
        handle.set_vsync_callback(Box::new(move |tick| s.set(tick.frame_count)));
        handle.request_frame();
        handle.request_frame();
        assert_eq!(surface.frame_requests(), 2);

        assert!(surface.fire_vsync(HostTime(16)));
        assert_eq!(seen.get(), 2, "frame counter advances per fire");
        assert_eq!(surface.frame_requests(), 0);
    }

    #[test]
    fn destroyed_surface_is_silent() {
        let surface = HeadlessSurface::new();
        let mut handle = surface.clone();
        handle.set_vsync_callback(Box::new(|_| panic!("must not fire")));
        handle.destroy();
        assert!(!surface.fire_vsync(HostTime(1)));
        assert!(surface.is_destroyed());
    }
}

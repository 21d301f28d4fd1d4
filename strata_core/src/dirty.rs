// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Every per-phase dirty set of the frame pipeline is one channel of the
//! [`NodeStore`](crate::node::NodeStore)'s [`understory_dirty`] tracker.
//! Phases drain their channel into a `Vec` before touching any node, so a
//! node marked while a phase is running lands in the *next* drain of that
//! channel instead of being visited (or skipped) by the current one.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`GEOMETRY`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) with child → parent
//!   dependency edges: moving a node moves every descendant's global rect.
//!
//! - **Local-only**: [`BUILD`], [`LAYOUT`], [`PAINT`], [`PAINT_FINISH`] and
//!   [`FOCUS`] contain exactly the nodes that were marked. Upward
//!   propagation of layout and paint (to the nearest layout or repaint
//!   boundary) is done by the store before marking, mirroring how the render
//!   tree decides who owns the work.

use understory_dirty::Channel;

/// One per-phase dirty set: a tracker channel plus its bit in the store's
/// pending-work mask.
#[derive(Clone, Copy, Debug)]
pub struct DirtySet {
    channel: Channel,
    bit: u8,
}

impl DirtySet {
    const fn new(index: u8) -> Self {
        Self {
            channel: Channel::new(index),
            bit: 1 << index,
        }
    }

    /// The tracker channel.
    #[must_use]
    pub const fn channel(self) -> Channel {
        self.channel
    }

    pub(crate) const fn bit(self) -> u8 {
        self.bit
    }
}

/// Node must rebuild its children from the logical component tree.
pub const BUILD: DirtySet = DirtySet::new(0);

/// Node must recompute its size and place its children.
pub const LAYOUT: DirtySet = DirtySet::new(1);

/// Repaint boundary must re-record its display items.
pub const PAINT: DirtySet = DirtySet::new(2);

/// Node painted this frame and wants a paint-finish notification.
pub const PAINT_FINISH: DirtySet = DirtySet::new(3);

/// Node's focusability changed; the focus tree must be revalidated.
pub const FOCUS: DirtySet = DirtySet::new(4);

/// Node's paint rect changed; global rects of it and its descendants are stale.
pub const GEOMETRY: DirtySet = DirtySet::new(5);

/// Every dirty set, in channel order.
pub const ALL: [DirtySet; 6] = [BUILD, LAYOUT, PAINT, PAINT_FINISH, FOCUS, GEOMETRY];

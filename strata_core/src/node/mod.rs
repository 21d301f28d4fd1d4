// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render tree: an arena of nodes with generation-checked handles.
//!
//! A [`NodeStore`] owns every node. Parents own their children through
//! sibling links in the arena; the parent link is a plain index, so there are
//! no reference cycles to break. Anything outside the store (event chains,
//! focus, restoration) holds [`NodeId`]s and checks liveness before use.

mod behavior;
mod id;
mod store;
mod traverse;

pub use behavior::{
    BuildCx, Buildable, Color, DisplayItem, DrawCommand, LayoutCx, Layoutable, PaintCx, Paintable,
};
pub use id::{INVALID, NodeId};
pub use store::{DirtyBits, NodeFlags, NodeKind, NodeStore};
pub use traverse::{Children, Descendants};

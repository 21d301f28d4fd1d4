// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The script frontend contract.
//!
//! A frontend produces the logical component tree. The pipeline calls its
//! [`build`](ScriptFrontend::build) for the root node whenever the root is
//! build-dirty and carries no [`Buildable`](crate::node::Buildable) of its
//! own, and forwards lifecycle and surface notifications to it.

use crate::node::BuildCx;

/// Which flavor of frontend is attached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FrontendKind {
    /// A full declarative application.
    #[default]
    Declarative,
    /// A lightweight embedded card.
    Card,
}

/// Application lifecycle notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// The pipeline attached the frontend.
    Create,
    /// The pipeline is being destroyed.
    Destroy,
    /// The window became visible.
    Show,
    /// The window was hidden.
    Hide,
}

/// Handles navigation and external-intent actions raised by the UI.
pub type ActionHandler = Box<dyn FnMut(&str)>;

/// Supplies the component tree and receives lifecycle notifications.
pub trait ScriptFrontend {
    /// The frontend flavor.
    fn kind(&self) -> FrontendKind {
        FrontendKind::Declarative
    }

    /// Builds the children of the root node.
    fn build(&mut self, cx: &mut BuildCx<'_>);

    /// The callback actions are forwarded to. Asked for once, when the
    /// frontend is attached.
    fn action_handler(&mut self) -> Option<ActionHandler> {
        None
    }

    /// Lifecycle notification.
    fn on_lifecycle(&mut self, _event: Lifecycle) {}

    /// The surface size changed, in device pixels.
    fn on_surface_changed(&mut self, _width: u32, _height: u32) {}

    /// Frontend-specific diagnostic lines.
    fn dump(&self) -> Vec<String> {
        Vec::new()
    }
}

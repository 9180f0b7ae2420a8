// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host interface: everything the engine needs from the surrounding toolkit.
//!
//! ## Overview
//!
//! The engine owns no nodes. The visual tree, its hit-testing primitive, popups, focus,
//! native pointer capture, and event delivery all live behind [`InputHost`].
//!
//! Only the tree queries and [`InputHost::raise_pointer`] are required. Every other method has
//! a default that degrades to "no popup", "no focus", "no native capture", or a no-op, so a
//! minimal host is a few lines long.
//!
//! ## Re-entrancy
//!
//! [`InputHost::raise_pointer`] and [`InputHost::raise_drag`] are synchronous callouts into
//! application code. Handlers may mutate the tree, open or close popups, or pump further
//! messages into the same [`InputManager`](crate::InputManager). The engine re-reads all
//! state after every callout and never holds an internal borrow across one.

use kurbo::Point;

use crate::types::{DragEvent, NodeKey, PointerEvent, PointerId};

/// Returned by a host from a `raise_*` callout to abort the rest of the current message.
///
/// Events already delivered stay delivered; the engine still runs its per-message cleanup.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, thiserror::Error)]
#[error("event dispatch failed")]
pub struct DispatchFailed;

/// Description of an open popup, as reported by [`InputHost::popup_info`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PopupInfo<K> {
    /// The popup belongs to a flyout (menu, tooltip-like surface with a placement target).
    pub is_flyout: bool,
    /// The popup closes when input lands outside it.
    pub is_light_dismiss: bool,
    /// An element that input may reach *through* the light-dismiss layer.
    pub pass_through: Option<K>,
    /// The element the flyout was opened from (for example a drop-down button).
    pub placement_target: Option<K>,
}

impl<K> Default for PopupInfo<K> {
    fn default() -> Self {
        Self {
            is_flyout: false,
            is_light_dismiss: false,
            pass_through: None,
            placement_target: None,
        }
    }
}

/// Which popups a light-dismiss decision asks the host to close.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PopupClose<K> {
    /// Close the flyout owning this popup (and its nested flyouts), or every open flyout when `None`.
    Flyout(Option<K>),
    /// Close the topmost light-dismiss popup.
    TopmostLightDismiss,
}

/// The toolkit side of input routing.
pub trait InputHost {
    /// Node key type of the host's visual tree.
    type Node: NodeKey;

    /// Parent of `node`, or `None` for a root or a detached node.
    fn parent_of(&self, node: Self::Node) -> Option<Self::Node>;

    /// Whether `node` is attached to the live tree under [`InputHost::hit_test_root`].
    fn is_live(&self, node: Self::Node) -> bool;

    /// Whether `node` participates in hit testing. Entered and Exited only fire on such nodes.
    fn is_hit_test_visible(&self, node: Self::Node) -> bool;

    /// Root of the hit-testable tree (the hidden root). `None` means there is nothing to route to.
    fn hit_test_root(&self) -> Option<Self::Node>;

    /// Public root: the fallback target when a point hits nothing.
    fn public_root(&self) -> Option<Self::Node> {
        self.hit_test_root()
    }

    /// Topmost node under `point` within `root`, skipping the subtree rooted at `excluded`.
    fn hit_test(
        &self,
        point: Point,
        root: Self::Node,
        excluded: Option<Self::Node>,
    ) -> Option<Self::Node>;

    /// Currently focused node, used to route wheel input that hits nothing.
    fn focused_node(&self) -> Option<Self::Node> {
        None
    }

    /// Whether `node` is the light-dismiss layer that covers everything but the open popups.
    fn is_light_dismiss_overlay(&self, _node: Self::Node) -> bool {
        false
    }

    /// Topmost open popup that dismisses on outside input.
    fn topmost_light_dismiss_popup(&self) -> Option<Self::Node> {
        None
    }

    /// Nearest popup that contains `node` (including `node` itself).
    fn closest_popup_ancestor(&self, _node: Self::Node) -> Option<Self::Node> {
        None
    }

    /// Description of `popup`.
    fn popup_info(&self, _popup: Self::Node) -> PopupInfo<Self::Node> {
        PopupInfo::default()
    }

    /// Close popups as a light-dismiss decision requires.
    ///
    /// Hosts that remove nodes here should report them through
    /// [`InputManager::node_leaving_tree`](crate::InputManager::node_leaving_tree).
    fn close_popups(&mut self, _request: PopupClose<Self::Node>) {}

    /// Keep the flyout attached to `placement_target` from reopening on the current input.
    fn suppress_flyout_opening(&mut self, _placement_target: Self::Node) {}

    /// Whether drag-and-drop input should look through `node` to whatever lies beneath.
    fn allows_drag_drop_pass_through(&self, _node: Self::Node) -> bool {
        false
    }

    /// Take the native pointer capture for the window. Returns `false` when unavailable.
    fn acquire_native_capture(&mut self, _pointer: PointerId) -> bool {
        false
    }

    /// Give up the native pointer capture.
    fn release_native_capture(&mut self) {}

    /// Stop any pending press-and-hold context menu timer.
    fn stop_context_menu_timer(&mut self) {}

    /// A touch-like pointer went down on `node`; feed it to gesture recognition.
    fn interaction_started(&mut self, _pointer: PointerId, _node: Self::Node) {}

    /// A touch-like pointer's interaction is over.
    fn interaction_ended(&mut self, _pointer: PointerId) {}

    /// Deliver a pointer event to `event.target`.
    fn raise_pointer(&mut self, event: &mut PointerEvent<Self::Node>) -> Result<(), DispatchFailed>;

    /// Deliver a drag event to `event.target`.
    fn raise_drag(&mut self, _event: &mut DragEvent<Self::Node>) -> Result<(), DispatchFailed> {
        Ok(())
    }
}

/// Whether `ancestor` is `node` or one of its ancestors in the host tree.
pub(crate) fn is_ancestor_or_self<H: InputHost + ?Sized>(
    host: &H,
    ancestor: H::Node,
    node: H::Node,
) -> bool {
    let mut cur = Some(node);
    while let Some(n) = cur {
        if n == ancestor {
            return true;
        }
        cur = host.parent_of(n);
    }
    false
}

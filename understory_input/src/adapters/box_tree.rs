// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An [`InputHost`] over Understory Box Tree.
//!
//! ## Feature
//!
//! Enable with `box_tree_adapter`.
//!
//! ## Layout
//!
//! [`BoxTreeHost`] owns a [`Tree`] with a fixed skeleton:
//!
//! - a hidden root covering the window, visible but not pickable, used as the hit-test root;
//! - the content root (the public root), its first child, where the application builds its nodes;
//! - while any light-dismiss popup is open, an overlay covering the window above the content;
//! - popups, above the overlay, in the order they were opened.
//!
//! Handlers registered with [`BoxTreeHost::on_pointer`] and [`BoxTreeHost::on_drag`] receive the
//! host mutably, so they may edit the tree, open or close popups, or call back into an attached
//! [`InputManager`]. Every delivered event is appended to [`BoxTreeHost::log`].
//!
//! Removing nodes through [`BoxTreeHost::remove`] and [`BoxTreeHost::close_popup`] reports
//! them to the attached manager first, so their pending exits are deferred correctly.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashSet;
use kurbo::{Point, Rect};
use tracing::debug;
use understory_box_tree::{LocalNode, NodeFlags, NodeId, QueryFilter, Tree};

use crate::host::{DispatchFailed, InputHost, PopupClose, PopupInfo};
use crate::manager::InputManager;
use crate::types::{DragEvent, DragMessageKind, PointerEvent, PointerEventKind, PointerId};

/// Pointer event handler.
pub type PointerHandler =
    dyn Fn(&mut BoxTreeHost, &mut PointerEvent<NodeId>) -> Result<(), DispatchFailed>;

/// Drag event handler.
pub type DragHandler =
    dyn Fn(&mut BoxTreeHost, &mut DragEvent<NodeId>) -> Result<(), DispatchFailed>;

/// One delivered event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Routed {
    /// A pointer event.
    Pointer {
        /// Event kind.
        kind: PointerEventKind,
        /// Target node.
        node: NodeId,
        /// Pointer it was raised for.
        pointer: PointerId,
    },
    /// A drag event.
    Drag {
        /// Event kind.
        kind: DragMessageKind,
        /// Target node.
        node: NodeId,
    },
}

impl Routed {
    /// Target node of the event.
    pub fn node(&self) -> NodeId {
        match *self {
            Self::Pointer { node, .. } | Self::Drag { node, .. } => node,
        }
    }
}

/// Host over a [`Tree`], with a popup registry, focus, and native capture slot.
pub struct BoxTreeHost {
    tree: Tree,
    root: NodeId,
    content: NodeId,
    bounds: Rect,
    overlay: Option<NodeId>,
    /// Oldest first.
    popups: Vec<(NodeId, PopupInfo<NodeId>)>,
    focus: Option<NodeId>,
    native_capture: Option<PointerId>,
    native_capture_available: bool,
    drag_pass_through: HashSet<NodeId>,
    suppressed_reopen: Option<NodeId>,
    interactions: Vec<PointerId>,
    manager: Option<Rc<InputManager<NodeId>>>,
    pointer_handlers: Vec<(NodeId, PointerEventKind, Rc<PointerHandler>)>,
    drag_handlers: Vec<(NodeId, DragMessageKind, Rc<DragHandler>)>,
    log: Vec<Routed>,
}

impl fmt::Debug for BoxTreeHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxTreeHost")
            .field("tree", &self.tree)
            .field("root", &self.root)
            .field("content", &self.content)
            .field("overlay", &self.overlay)
            .field("popups", &self.popups.len())
            .field("focus", &self.focus)
            .field("native_capture", &self.native_capture)
            .field("manager", &self.manager.is_some())
            .field("log", &self.log.len())
            .finish_non_exhaustive()
    }
}

impl BoxTreeHost {
    /// Create a host whose window covers `bounds`.
    pub fn new(bounds: Rect) -> Self {
        let mut tree = Tree::new();
        let root = tree.insert(
            None,
            LocalNode {
                local_bounds: bounds,
                flags: NodeFlags::VISIBLE,
                ..Default::default()
            },
        );
        let content = tree.insert(
            Some(root),
            LocalNode {
                local_bounds: bounds,
                ..Default::default()
            },
        );
        Self {
            tree,
            root,
            content,
            bounds,
            overlay: None,
            popups: Vec::new(),
            focus: None,
            native_capture: None,
            native_capture_available: true,
            drag_pass_through: HashSet::new(),
            suppressed_reopen: None,
            interactions: Vec::new(),
            manager: None,
            pointer_handlers: Vec::new(),
            drag_handlers: Vec::new(),
            log: Vec::new(),
        }
    }

    /// Let handlers reach `manager` through [`BoxTreeHost::manager`], and report removals to it.
    pub fn attach_manager(&mut self, manager: Rc<InputManager<NodeId>>) {
        self.manager = Some(manager);
    }

    /// The attached manager.
    pub fn manager(&self) -> Option<Rc<InputManager<NodeId>>> {
        self.manager.clone()
    }

    /// The underlying tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable access to the underlying tree.
    ///
    /// Removing nodes directly bypasses deferred exits; use [`BoxTreeHost::remove`].
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// The hidden hit-test root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The content root.
    pub fn content(&self) -> NodeId {
        self.content
    }

    /// Insert a node under `parent`.
    pub fn insert(&mut self, parent: NodeId, local: LocalNode) -> NodeId {
        self.tree.insert(Some(parent), local)
    }

    /// Insert a node with default flags and the given bounds under `parent`.
    pub fn insert_rect(&mut self, parent: NodeId, bounds: Rect) -> NodeId {
        self.insert(
            parent,
            LocalNode {
                local_bounds: bounds,
                ..Default::default()
            },
        )
    }

    /// Remove `node` and its subtree, reporting it to the attached manager first.
    pub fn remove(&mut self, node: NodeId) {
        if let Some(manager) = self.manager.clone() {
            manager.node_leaving_tree(&*self, node);
        }
        self.tree.remove(node);
        self.popups.retain(|(p, _)| self.tree.is_alive(*p));
        if self.focus.is_some_and(|f| !self.tree.is_alive(f)) {
            self.focus = None;
        }
    }

    /// Move keyboard focus.
    pub fn set_focus(&mut self, node: Option<NodeId>) {
        self.focus = node;
    }

    /// Whether the platform grants native capture.
    pub fn set_native_capture_available(&mut self, available: bool) {
        self.native_capture_available = available;
    }

    /// Pointer holding the native capture slot.
    pub fn native_capture(&self) -> Option<PointerId> {
        self.native_capture
    }

    /// Let drag input look through `node`.
    pub fn set_drag_pass_through(&mut self, node: NodeId, enabled: bool) {
        if enabled {
            self.drag_pass_through.insert(node);
        } else {
            self.drag_pass_through.remove(&node);
        }
    }

    /// Placement target whose flyout was asked not to reopen, if any. Clears it.
    pub fn take_suppressed_reopen(&mut self) -> Option<NodeId> {
        self.suppressed_reopen.take()
    }

    /// Pointers with an interaction in progress.
    pub fn interactions(&self) -> &[PointerId] {
        &self.interactions
    }

    /// Open a popup covering `bounds`, above everything opened before it.
    ///
    /// The first light-dismiss popup also raises the overlay.
    pub fn open_popup(&mut self, bounds: Rect, info: PopupInfo<NodeId>) -> NodeId {
        if info.is_light_dismiss && self.overlay.is_none() {
            let overlay = self.tree.insert(
                Some(self.root),
                LocalNode {
                    local_bounds: self.bounds,
                    z_index: i32::MAX - 1,
                    ..Default::default()
                },
            );
            self.overlay = Some(overlay);
        }
        let popup = self.tree.insert(
            Some(self.root),
            LocalNode {
                local_bounds: bounds,
                z_index: i32::MAX,
                ..Default::default()
            },
        );
        debug!(?popup, flyout = info.is_flyout, "popup opened");
        self.popups.push((popup, info));
        popup
    }

    /// Close `popup`; the overlay goes away with the last light-dismiss popup.
    pub fn close_popup(&mut self, popup: NodeId) {
        if !self.popups.iter().any(|(p, _)| *p == popup) {
            return;
        }
        debug!(?popup, "popup closed");
        self.remove(popup);
        if let Some(overlay) = self.overlay
            && !self.popups.iter().any(|(_, i)| i.is_light_dismiss)
        {
            self.overlay = None;
            self.remove(overlay);
        }
    }

    /// Open popups, oldest first.
    pub fn popups(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.popups.iter().map(|(p, _)| *p)
    }

    /// The light-dismiss overlay, while one is up.
    pub fn overlay(&self) -> Option<NodeId> {
        self.overlay
    }

    /// Run `handler` for `kind` events targeted at `node`, after any handlers already registered.
    pub fn on_pointer(
        &mut self,
        node: NodeId,
        kind: PointerEventKind,
        handler: impl Fn(&mut Self, &mut PointerEvent<NodeId>) -> Result<(), DispatchFailed> + 'static,
    ) {
        let handler: Box<PointerHandler> = Box::new(handler);
        self.pointer_handlers.push((node, kind, Rc::from(handler)));
    }

    /// Run `handler` for `kind` drag events targeted at `node`.
    pub fn on_drag(
        &mut self,
        node: NodeId,
        kind: DragMessageKind,
        handler: impl Fn(&mut Self, &mut DragEvent<NodeId>) -> Result<(), DispatchFailed> + 'static,
    ) {
        let handler: Box<DragHandler> = Box::new(handler);
        self.drag_handlers.push((node, kind, Rc::from(handler)));
    }

    /// Every event delivered so far.
    pub fn log(&self) -> &[Routed] {
        &self.log
    }

    /// Take the event log, leaving it empty.
    pub fn take_log(&mut self) -> Vec<Routed> {
        core::mem::take(&mut self.log)
    }

    fn close_flyouts_from(&mut self, index: usize) {
        let closing: Vec<NodeId> = self.popups[index..]
            .iter()
            .filter(|(_, i)| i.is_flyout)
            .map(|(p, _)| *p)
            .collect();
        for popup in closing.into_iter().rev() {
            self.close_popup(popup);
        }
    }
}

impl InputHost for BoxTreeHost {
    type Node = NodeId;

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.tree.parent(node)
    }

    fn is_live(&self, node: NodeId) -> bool {
        self.tree.root_of(node) == Some(self.root)
    }

    fn is_hit_test_visible(&self, node: NodeId) -> bool {
        self.tree
            .flags(node)
            .is_some_and(|f| f.contains(NodeFlags::VISIBLE | NodeFlags::PICKABLE))
    }

    fn hit_test_root(&self) -> Option<NodeId> {
        self.tree.is_alive(self.root).then_some(self.root)
    }

    fn public_root(&self) -> Option<NodeId> {
        self.tree.is_alive(self.content).then_some(self.content)
    }

    fn hit_test(&self, point: Point, root: NodeId, excluded: Option<NodeId>) -> Option<NodeId> {
        let mut filter = QueryFilter::pickable();
        if let Some(x) = excluded {
            filter = filter.excluding(x);
        }
        self.tree
            .hit_test_subtree(root, point, filter)
            .map(|hit| hit.node)
    }

    fn focused_node(&self) -> Option<NodeId> {
        self.focus
    }

    fn is_light_dismiss_overlay(&self, node: NodeId) -> bool {
        self.overlay == Some(node)
    }

    fn topmost_light_dismiss_popup(&self) -> Option<NodeId> {
        self.popups
            .iter()
            .rev()
            .find(|(_, i)| i.is_light_dismiss)
            .map(|(p, _)| *p)
    }

    fn closest_popup_ancestor(&self, node: NodeId) -> Option<NodeId> {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if self.popups.iter().any(|(p, _)| *p == n) {
                return Some(n);
            }
            cur = self.tree.parent(n);
        }
        None
    }

    fn popup_info(&self, popup: NodeId) -> PopupInfo<NodeId> {
        self.popups
            .iter()
            .find(|(p, _)| *p == popup)
            .map(|(_, i)| *i)
            .unwrap_or_default()
    }

    fn close_popups(&mut self, request: PopupClose<NodeId>) {
        match request {
            PopupClose::Flyout(Some(popup)) => {
                if let Some(index) = self.popups.iter().position(|(p, _)| *p == popup) {
                    self.close_flyouts_from(index);
                }
            }
            PopupClose::Flyout(None) => self.close_flyouts_from(0),
            PopupClose::TopmostLightDismiss => {
                if let Some(popup) = self.topmost_light_dismiss_popup() {
                    self.close_popup(popup);
                }
            }
        }
    }

    fn suppress_flyout_opening(&mut self, placement_target: NodeId) {
        self.suppressed_reopen = Some(placement_target);
    }

    fn allows_drag_drop_pass_through(&self, node: NodeId) -> bool {
        self.drag_pass_through.contains(&node)
    }

    fn acquire_native_capture(&mut self, pointer: PointerId) -> bool {
        if self.native_capture_available {
            self.native_capture = Some(pointer);
        }
        self.native_capture_available
    }

    fn release_native_capture(&mut self) {
        self.native_capture = None;
    }

    fn interaction_started(&mut self, pointer: PointerId, _node: NodeId) {
        if !self.interactions.contains(&pointer) {
            self.interactions.push(pointer);
        }
    }

    fn interaction_ended(&mut self, pointer: PointerId) {
        self.interactions.retain(|p| *p != pointer);
    }

    fn raise_pointer(&mut self, event: &mut PointerEvent<NodeId>) -> Result<(), DispatchFailed> {
        self.log.push(Routed::Pointer {
            kind: event.kind,
            node: event.target,
            pointer: event.pointer,
        });
        let handlers: Vec<Rc<PointerHandler>> = self
            .pointer_handlers
            .iter()
            .filter(|(n, k, _)| *n == event.target && *k == event.kind)
            .map(|(_, _, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(self, event)?;
        }
        // A press on the overlay dismisses the topmost popup unless a handler took it.
        if event.kind == PointerEventKind::Pressed
            && !event.handled
            && self.overlay == Some(event.target)
        {
            self.close_popups(PopupClose::TopmostLightDismiss);
        }
        Ok(())
    }

    fn raise_drag(&mut self, event: &mut DragEvent<NodeId>) -> Result<(), DispatchFailed> {
        self.log.push(Routed::Drag {
            kind: event.kind,
            node: event.target,
        });
        let handlers: Vec<Rc<DragHandler>> = self
            .drag_handlers
            .iter()
            .filter(|(n, k, _)| *n == event.target && *k == event.kind)
            .map(|(_, _, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(self, event)?;
        }
        Ok(())
    }
}

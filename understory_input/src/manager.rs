// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-content-root input manager.
//!
//! ## Overview
//!
//! [`InputManager`] owns all routing state for one content root: the pointer table, pending
//! deferred exits, capture lists, drag state, and session bookkeeping. It is not a global;
//! a toolkit creates one per content root and passes it alongside the host.
//!
//! Every entry point takes `&self` and a `&mut` host. State lives behind a `RefCell` that is
//! only borrowed between callouts, never across one, so a handler may call back into the
//! same manager (for example to capture the pointer, or to pump a nested message). The
//! in-flight message stack detects such nesting and applies the configured
//! [`ReentrancyPolicy`](crate::config::ReentrancyPolicy).
//!
//! Pointer messages enter through [`InputManager::process_pointer_message`] and drag messages
//! through [`InputManager::process_drag_drop`]. Capture is requested from handlers with
//! [`InputManager::try_capture`].

use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Point;
use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::config::{InputConfig, ReentrancyPolicy};
use crate::drag::DragState;
use crate::error::InputError;
use crate::host::InputHost;
use crate::propagate::{Crossing, CrossingSink};
use crate::state::{
    CaptureLists, ExitedStateEntry, ExitedStates, PointerRecord, PointerStateTable, Session,
};
use crate::types::{
    DeviceType, InputMessage, KeyModifiers, NodeKey, PointerEvent, PointerEventKind, PointerId,
    RoutedMessage,
};

/// Routing state for one content root.
pub struct InputManager<K> {
    config: Cell<InputConfig>,
    state: RefCell<EngineState<K>>,
    in_flight: RefCell<Vec<InFlight>>,
}

pub(crate) struct EngineState<K> {
    pub(crate) pointers: PointerStateTable<K>,
    pub(crate) exited: ExitedStates<K>,
    pub(crate) captures: CaptureLists<K>,
    pub(crate) session: Session,
    pub(crate) drag: DragState<K>,
}

impl<K> Default for EngineState<K> {
    fn default() -> Self {
        Self {
            pointers: PointerStateTable::default(),
            exited: ExitedStates::default(),
            captures: CaptureLists::default(),
            session: Session::default(),
            drag: DragState::default(),
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct InFlight {
    message: RoutedMessage,
    superseded: bool,
}

impl<K: NodeKey> Default for InputManager<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: NodeKey> fmt::Debug for InputManager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("InputManager");
        d.field("config", &self.config.get());
        match self.state.try_borrow() {
            Ok(s) => {
                d.field("pointers", &s.pointers.len());
                d.field("pending_exits", &s.exited.len());
                d.field("drag_entered", &s.drag.entered);
            }
            Err(_) => {
                d.field("state", &"<borrowed>");
            }
        }
        d.field("in_flight", &self.in_flight.try_borrow().map(|s| s.len()).ok());
        d.finish_non_exhaustive()
    }
}

impl<K: NodeKey> InputManager<K> {
    /// Create a manager with the default configuration.
    pub fn new() -> Self {
        Self::with_config(InputConfig::default())
    }

    /// Create a manager with `config`.
    pub fn with_config(config: InputConfig) -> Self {
        Self {
            config: Cell::new(config),
            state: RefCell::new(EngineState::default()),
            in_flight: RefCell::new(Vec::new()),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> InputConfig {
        self.config.get()
    }

    /// Replace the configuration. Takes effect with the next message.
    pub fn set_config(&self, config: InputConfig) {
        self.config.set(config);
    }

    /// Node holding capture of `pointer`.
    pub fn captured_node(&self, pointer: PointerId) -> Option<K> {
        self.with_state(|s| s.pointers.get(pointer).and_then(|r| r.captured))
    }

    /// Innermost node of `pointer`'s hovered chain.
    pub fn entered_node(&self, pointer: PointerId) -> Option<K> {
        self.with_state(|s| s.pointers.get(pointer).and_then(|r| r.entered))
    }

    /// Snapshot of the record for `pointer`.
    pub fn pointer(&self, pointer: PointerId) -> Option<PointerRecord<K>> {
        self.with_state(|s| s.pointers.get(pointer).cloned())
    }

    /// Number of pointers with a live record.
    pub fn active_pointer_count(&self) -> usize {
        self.with_state(|s| s.pointers.len())
    }

    /// Pointers currently captured by `node`.
    pub fn pointer_captures(&self, node: K) -> SmallVec<[PointerId; 2]> {
        self.with_state(|s| s.captures.of(node))
    }

    /// Last position of the primary pointer (the most recent pointer-down), or the override.
    pub fn primary_pointer_last_position(&self) -> Option<Point> {
        self.with_state(|s| {
            s.session.primary_position_override.or_else(|| {
                s.session
                    .primary_pointer
                    .and_then(|id| s.pointers.get(id))
                    .map(|r| r.last_position)
            })
        })
    }

    /// Report `position` as the primary pointer's position until cleared.
    pub fn set_primary_pointer_position_override(&self, position: Point) {
        self.with_state(|s| s.session.primary_position_override = Some(position));
    }

    /// Drop the primary pointer position override.
    pub fn clear_primary_pointer_position_override(&self) {
        self.with_state(|s| s.session.primary_position_override = None);
    }

    /// Device of the most recent non-replayed pointer message.
    pub fn last_input_device(&self) -> Option<DeviceType> {
        self.with_state(|s| s.session.last_input_device)
    }

    /// Whether focus set through automation should survive the last pointer message.
    ///
    /// Cleared by any pointer message, except an update that repeats the previous position
    /// and device.
    pub fn keep_uia_focus_state(&self) -> bool {
        self.with_state(|s| s.session.keep_uia_focus_state)
    }

    /// Record that focus was just set through automation.
    pub fn set_keep_uia_focus_state(&self, keep: bool) {
        self.with_state(|s| s.session.keep_uia_focus_state = keep);
    }

    /// Pen barrel button state as of the last pointer message.
    pub fn is_barrel_button_pressed(&self) -> bool {
        self.with_state(|s| s.session.barrel_button_pressed)
    }

    /// Mark that a press-and-hold context menu is pending for touch input.
    pub fn set_context_menu_on_holding(&self, holding: bool) {
        self.with_state(|s| s.session.context_menu_on_holding = holding);
    }

    /// Number of deferred exits not yet drained.
    pub fn pending_exited_count(&self) -> usize {
        self.with_state(|s| s.exited.len())
    }

    /// Whether a message is currently being processed.
    pub fn is_processing(&self) -> bool {
        !self.in_flight.borrow().is_empty()
    }

    /// Raise `RightTapped` for the keyboard context-menu key.
    ///
    /// The event goes to the focused node, or the public root when nothing has focus, at the
    /// origin with a mouse device. Returns whether a handler marked it handled.
    pub fn raise_right_tapped_from_context_menu<H>(&self, host: &mut H) -> Result<bool, InputError>
    where
        H: InputHost<Node = K>,
    {
        let Some(target) = host.focused_node().or_else(|| host.public_root()) else {
            return Ok(false);
        };
        let mut ev = PointerEvent {
            kind: PointerEventKind::RightTapped,
            target,
            position: Point::ZERO,
            pointer: PointerId::MOUSE,
            device: DeviceType::Mouse,
            modifiers: KeyModifiers::empty(),
            wheel_delta: 0,
            handled: false,
        };
        raise(host, &mut ev)
    }

    /// Report that `node` is about to be detached from the tree.
    ///
    /// For every pointer whose hovered chain contains `node`, the nodes from its entered node
    /// up to `node` are queued as a deferred exit, and its entered node moves to `node`'s
    /// parent. Nodes whose `Entered` is still pending in a running propagation are left out.
    /// The exits fire at the start of that pointer's next message. Call this before the
    /// subtree is detached, while parent links are still intact.
    pub fn node_leaving_tree<H>(&self, host: &H, node: K)
    where
        H: InputHost<Node = K> + ?Sized,
    {
        let entered: SmallVec<[(PointerId, K, SmallVec<[K; 4]>); 4]> = self.with_state(|s| {
            s.pointers
                .iter()
                .filter_map(|r| r.entered.map(|e| (r.id, e, r.pending_enters.clone())))
                .collect()
        });
        let continuation = host.parent_of(node);
        for (pointer, exited, pending) in entered {
            let Some(mut detached_chain) = chain_up_to(host, exited, node) else {
                continue;
            };
            detached_chain.retain(|n| !pending.contains(n));
            trace!(?pointer, ?exited, ?node, "queued deferred exit");
            self.with_state(|s| {
                if !detached_chain.is_empty() {
                    s.exited.insert(ExitedStateEntry {
                        pointer,
                        exited,
                        detached_chain,
                    });
                }
                if let Some(r) = s.pointers.get_mut(pointer) {
                    r.entered = continuation;
                }
            });
        }

        let drag_entered = self.with_state(|s| s.drag.entered);
        if let Some(e) = drag_entered
            && chain_up_to(host, e, node).is_some()
        {
            self.with_state(|s| s.drag.entered = continuation);
        }
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut EngineState<K>) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }

    /// Push `message` onto the in-flight stack, applying the re-entrancy policy.
    pub(crate) fn enter_message(&self, message: RoutedMessage) -> Result<(), InputError> {
        let mut stack = self.in_flight.borrow_mut();
        if let Some(outer) = stack.last().map(|f| f.message) {
            for f in stack.iter_mut() {
                f.superseded = true;
            }
            warn!(?outer, nested = ?message, "re-entrant input message");
            if self.config.get().reentrancy == ReentrancyPolicy::Fault {
                return Err(InputError::Reentrancy {
                    outer,
                    nested: message,
                });
            }
        }
        stack.push(InFlight {
            message,
            superseded: false,
        });
        Ok(())
    }

    /// Pop the current message; returns whether a nested message superseded it.
    pub(crate) fn leave_message(&self) -> bool {
        self.in_flight
            .borrow_mut()
            .pop()
            .is_some_and(|f| f.superseded)
    }

    /// Fire every deferred exit queued for the message's pointer.
    ///
    /// Entries are taken before any event fires, so a handler that removes more nodes queues
    /// new entries instead of mutating the ones being drained. Dispatch failures are logged
    /// and do not stop the drain.
    pub(crate) fn drain_exited_states<H>(&self, host: &mut H, msg: &InputMessage)
    where
        H: InputHost<Node = K>,
    {
        let pointer = msg.pointer.id;
        let entries = self.with_state(|s| s.exited.take_for(pointer));
        for entry in entries {
            for &node in &entry.detached_chain {
                trace!(?pointer, ?node, "deferred PointerExited");
                let mut ev = PointerEvent::from_message(PointerEventKind::Exited, node, msg);
                let _ = raise(host, &mut ev);
            }
        }
    }
}

/// Deliver one pointer event and report whether it was handled.
pub(crate) fn raise<H: InputHost + ?Sized>(
    host: &mut H,
    ev: &mut PointerEvent<H::Node>,
) -> Result<bool, InputError> {
    match host.raise_pointer(ev) {
        Ok(()) => Ok(ev.handled),
        Err(_) => {
            warn!(event = ev.kind.name(), target = ?ev.target, "dispatch aborted");
            Err(InputError::Dispatch {
                event: ev.kind.name(),
            })
        }
    }
}

/// Chain from `from` up to and including `to`, or `None` when `to` is not an ancestor.
fn chain_up_to<H>(host: &H, from: H::Node, to: H::Node) -> Option<SmallVec<[H::Node; 8]>>
where
    H: InputHost + ?Sized,
{
    let mut chain = SmallVec::new();
    let mut cur = Some(from);
    while let Some(n) = cur {
        chain.push(n);
        if n == to {
            return Some(chain);
        }
        cur = host.parent_of(n);
    }
    None
}

/// Crossing sink for one pointer: entered node in the pointer's record, pointer events out.
pub(crate) struct PointerCrossings<'a, H: InputHost> {
    pub(crate) manager: &'a InputManager<H::Node>,
    pub(crate) host: &'a mut H,
    pub(crate) msg: &'a InputMessage,
}

impl<H: InputHost> CrossingSink<H::Node> for PointerCrossings<'_, H> {
    type Error = InputError;

    fn parent_of(&self, node: H::Node) -> Option<H::Node> {
        self.host.parent_of(node)
    }

    fn is_hit_test_visible(&self, node: H::Node) -> bool {
        self.host.is_hit_test_visible(node)
    }

    fn entered(&self) -> Option<H::Node> {
        self.manager.entered_node(self.msg.pointer.id)
    }

    fn set_entered(&mut self, node: Option<H::Node>) {
        let id = self.msg.pointer.id;
        self.manager.with_state(|s| {
            if let Some(r) = s.pointers.get_mut(id) {
                r.entered = node;
            }
        });
    }

    fn set_pending_enters(&mut self, pending: &[H::Node]) {
        let id = self.msg.pointer.id;
        self.manager.with_state(|s| {
            if let Some(r) = s.pointers.get_mut(id) {
                r.pending_enters.clear();
                r.pending_enters.extend_from_slice(pending);
            }
        });
    }

    fn fire(&mut self, crossing: Crossing, node: H::Node) -> Result<(), InputError> {
        let kind = match crossing {
            Crossing::Enter => PointerEventKind::Entered,
            Crossing::Exit => PointerEventKind::Exited,
        };
        trace!(pointer = ?self.msg.pointer.id, ?node, event = kind.name());
        let mut ev = PointerEvent::from_message(kind, node, self.msg);
        raise(&mut *self.host, &mut ev).map(|_| ())
    }
}

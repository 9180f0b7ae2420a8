// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording host over a small `u32` tree, shared by the unit tests.

use alloc::rc::Rc;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use kurbo::{Point, Rect};

use crate::host::{DispatchFailed, InputHost, PopupClose, PopupInfo};
use crate::manager::InputManager;
use crate::types::{
    DragEvent, DragMessageKind, DragOperations, InputMessage, PointerEvent, PointerEventKind,
    PointerId,
};

/// What a handler does when a matching event arrives.
#[derive(Clone, Debug)]
pub(crate) enum Action {
    Handle,
    Fail,
    Capture,
    Release,
    Detach(u32),
    Pump(InputMessage),
    Accept(DragOperations),
    Defer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Ev {
    P(PointerEventKind, u32),
    D(DragMessageKind, u32),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Note {
    InteractionStarted(PointerId, u32),
    InteractionEnded(PointerId),
    TimerStopped,
    NativeAcquired(PointerId),
    NativeReleased,
    Closed(PopupClose<u32>),
    Suppressed(u32),
}

/// Tree:
///
/// ```text
///  0 (hidden root, not hit-test visible)
///  └─ 1 (public root)   [0,0]..[100,100]
///     ├─ 2              [0,0]..[50,100]
///     │  ├─ 3           [0,0]..[50,50]
///     │  └─ 4           [0,50]..[50,100]
///     └─ 5              [50,0]..[100,100]
///        └─ 6           [50,0]..[100,50]
/// ```
pub(crate) struct TestHost {
    pub(crate) root: Option<u32>,
    pub(crate) public_root: Option<u32>,
    pub(crate) parents: HashMap<u32, u32>,
    /// Back to front.
    pub(crate) regions: Vec<(Rect, u32)>,
    pub(crate) hidden: HashSet<u32>,
    pub(crate) focus: Option<u32>,
    pub(crate) overlay: Option<u32>,
    pub(crate) popups: HashMap<u32, PopupInfo<u32>>,
    pub(crate) topmost_popup: Option<u32>,
    pub(crate) drag_pass_through: HashSet<u32>,
    pub(crate) native_available: bool,
    pub(crate) actions: Vec<(Ev, Action)>,
    pub(crate) manager: Option<Rc<InputManager<u32>>>,
    pub(crate) log: Vec<Ev>,
    pub(crate) positions: Vec<Point>,
    /// The pointer record's down flag as each pointer event was raised.
    pub(crate) down_flags: Vec<(Ev, bool)>,
    pub(crate) notes: Vec<Note>,
    pub(crate) errors: Vec<crate::InputError>,
}

impl TestHost {
    pub(crate) fn new() -> Self {
        let mut hidden = HashSet::new();
        hidden.insert(0);
        let mut parents = HashMap::new();
        for (child, parent) in [(1, 0), (2, 1), (3, 2), (4, 2), (5, 1), (6, 5)] {
            parents.insert(child, parent);
        }
        Self {
            root: Some(0),
            public_root: Some(1),
            parents,
            regions: alloc::vec![
                (Rect::new(0.0, 0.0, 100.0, 100.0), 1),
                (Rect::new(0.0, 0.0, 50.0, 100.0), 2),
                (Rect::new(0.0, 0.0, 50.0, 50.0), 3),
                (Rect::new(0.0, 50.0, 50.0, 100.0), 4),
                (Rect::new(50.0, 0.0, 100.0, 100.0), 5),
                (Rect::new(50.0, 0.0, 100.0, 50.0), 6),
            ],
            hidden,
            focus: None,
            overlay: None,
            popups: HashMap::new(),
            topmost_popup: None,
            drag_pass_through: HashSet::new(),
            native_available: true,
            actions: Vec::new(),
            manager: None,
            log: Vec::new(),
            positions: Vec::new(),
            down_flags: Vec::new(),
            notes: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn with_manager(manager: Rc<InputManager<u32>>) -> Self {
        let mut host = Self::new();
        host.manager = Some(manager);
        host
    }

    pub(crate) fn on(&mut self, ev: Ev, action: Action) {
        self.actions.push((ev, action));
    }

    pub(crate) fn add_node(&mut self, node: u32, parent: u32, rect: Rect) {
        self.parents.insert(node, parent);
        self.regions.push((rect, node));
    }

    /// Detach `node` and its subtree, reporting it to the manager first.
    pub(crate) fn detach(&mut self, node: u32) {
        if let Some(m) = self.manager.clone() {
            m.node_leaving_tree(self, node);
        }
        self.parents.remove(&node);
    }

    pub(crate) fn take_log(&mut self) -> Vec<Ev> {
        core::mem::take(&mut self.log)
    }

    fn is_under(&self, node: u32, ancestor: u32) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parents.get(&n).copied();
        }
        false
    }

    fn run(&mut self, ev: Ev, pointer: Option<PointerId>) -> (bool, DragOperations, bool) {
        let actions: Vec<Action> = self
            .actions
            .iter()
            .filter(|(e, _)| *e == ev)
            .map(|(_, a)| a.clone())
            .collect();
        let mut handled = false;
        let mut accepted = DragOperations::empty();
        let mut deferred = false;
        let target = match ev {
            Ev::P(_, n) | Ev::D(_, n) => n,
        };
        for action in actions {
            match action {
                Action::Handle => handled = true,
                Action::Fail => {}
                Action::Capture => {
                    if let (Some(m), Some(p)) = (self.manager.clone(), pointer) {
                        m.try_capture(self, target, p);
                    }
                }
                Action::Release => {
                    if let (Some(m), Some(p)) = (self.manager.clone(), pointer) {
                        if let Err(e) = m.release_capture(self, target, p) {
                            self.errors.push(e);
                        }
                    }
                }
                Action::Detach(n) => self.detach(n),
                Action::Pump(msg) => {
                    if let Some(m) = self.manager.clone() {
                        if let Err(e) = m.process_pointer_message(self, &msg) {
                            self.errors.push(e);
                        }
                    }
                }
                Action::Accept(ops) => accepted = ops,
                Action::Defer => deferred = true,
            }
        }
        (handled, accepted, deferred)
    }

    fn fails(&self, ev: Ev) -> bool {
        self.actions
            .iter()
            .any(|(e, a)| *e == ev && matches!(a, Action::Fail))
    }
}

impl InputHost for TestHost {
    type Node = u32;

    fn parent_of(&self, node: u32) -> Option<u32> {
        self.parents.get(&node).copied()
    }

    fn is_live(&self, node: u32) -> bool {
        self.root.is_some_and(|r| self.is_under(node, r))
    }

    fn is_hit_test_visible(&self, node: u32) -> bool {
        !self.hidden.contains(&node)
    }

    fn hit_test_root(&self) -> Option<u32> {
        self.root
    }

    fn public_root(&self) -> Option<u32> {
        self.public_root
    }

    fn hit_test(&self, point: Point, root: u32, excluded: Option<u32>) -> Option<u32> {
        self.regions
            .iter()
            .rev()
            .filter(|(rect, n)| {
                rect.contains(point)
                    && self.is_under(*n, root)
                    && !self.hidden.contains(n)
                    && excluded.is_none_or(|x| !self.is_under(*n, x))
            })
            .map(|(_, n)| *n)
            .next()
    }

    fn focused_node(&self) -> Option<u32> {
        self.focus
    }

    fn is_light_dismiss_overlay(&self, node: u32) -> bool {
        self.overlay == Some(node)
    }

    fn topmost_light_dismiss_popup(&self) -> Option<u32> {
        self.topmost_popup
    }

    fn closest_popup_ancestor(&self, node: u32) -> Option<u32> {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if self.popups.contains_key(&n) {
                return Some(n);
            }
            cur = self.parent_of(n);
        }
        None
    }

    fn popup_info(&self, popup: u32) -> PopupInfo<u32> {
        self.popups.get(&popup).copied().unwrap_or_default()
    }

    fn close_popups(&mut self, request: PopupClose<u32>) {
        self.notes.push(Note::Closed(request));
    }

    fn suppress_flyout_opening(&mut self, placement_target: u32) {
        self.notes.push(Note::Suppressed(placement_target));
    }

    fn allows_drag_drop_pass_through(&self, node: u32) -> bool {
        self.drag_pass_through.contains(&node)
    }

    fn acquire_native_capture(&mut self, pointer: PointerId) -> bool {
        if self.native_available {
            self.notes.push(Note::NativeAcquired(pointer));
        }
        self.native_available
    }

    fn release_native_capture(&mut self) {
        self.notes.push(Note::NativeReleased);
    }

    fn stop_context_menu_timer(&mut self) {
        self.notes.push(Note::TimerStopped);
    }

    fn interaction_started(&mut self, pointer: PointerId, node: u32) {
        self.notes.push(Note::InteractionStarted(pointer, node));
    }

    fn interaction_ended(&mut self, pointer: PointerId) {
        self.notes.push(Note::InteractionEnded(pointer));
    }

    fn raise_pointer(&mut self, event: &mut PointerEvent<u32>) -> Result<(), DispatchFailed> {
        let ev = Ev::P(event.kind, event.target);
        if self.fails(ev) {
            return Err(DispatchFailed);
        }
        self.log.push(ev);
        self.positions.push(event.position);
        if let Some(m) = &self.manager {
            let down = m.pointer(event.pointer).is_some_and(|r| r.is_down);
            self.down_flags.push((ev, down));
        }
        let (handled, _, _) = self.run(ev, Some(event.pointer));
        event.handled |= handled;
        Ok(())
    }

    fn raise_drag(&mut self, event: &mut DragEvent<u32>) -> Result<(), DispatchFailed> {
        let ev = Ev::D(event.kind, event.target);
        if self.fails(ev) {
            return Err(DispatchFailed);
        }
        self.log.push(ev);
        let (handled, accepted, deferred) = self.run(ev, None);
        event.handled |= handled;
        if !accepted.is_empty() {
            event.accepted = accepted;
        }
        event.deferred |= deferred;
        Ok(())
    }
}

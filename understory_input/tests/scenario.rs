// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end routing over a box tree.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use kurbo::{Point, Rect};
use understory_box_tree::NodeId;
use understory_input::adapters::box_tree::{BoxTreeHost, Routed};
use understory_input::{
    DragMessage, DragMessageKind, DragOperations, EnterOrder, InputConfig, InputError,
    InputManager, InputMessage, MessageKind, PointerEventKind as P, PointerId, PointerInfo,
    PopupInfo, ReentrancyPolicy, RoutedMessage,
};

/// Content root with `B` at (0, 0)..(100, 100), holding `A` on the left and `C` on the right.
struct Fixture {
    host: BoxTreeHost,
    manager: Rc<InputManager<NodeId>>,
    b: NodeId,
    a: NodeId,
    c: NodeId,
}

fn fixture(config: InputConfig) -> Fixture {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut host = BoxTreeHost::new(Rect::new(0.0, 0.0, 200.0, 200.0));
    let manager = Rc::new(InputManager::with_config(config));
    host.attach_manager(manager.clone());
    let content = host.content();
    let b = host.insert_rect(content, Rect::new(0.0, 0.0, 100.0, 100.0));
    let a = host.insert_rect(b, Rect::new(0.0, 0.0, 50.0, 50.0));
    let c = host.insert_rect(b, Rect::new(50.0, 0.0, 100.0, 50.0));
    Fixture {
        host,
        manager,
        b,
        a,
        c,
    }
}

impl Fixture {
    fn send(&mut self, msg: InputMessage) -> understory_input::PointerOutcome<NodeId> {
        self.manager
            .process_pointer_message(&mut self.host, &msg)
            .unwrap()
    }

    fn events(&mut self) -> Vec<(P, NodeId)> {
        self.host
            .take_log()
            .into_iter()
            .filter_map(|r| match r {
                Routed::Pointer { kind, node, .. } => Some((kind, node)),
                Routed::Drag { .. } => None,
            })
            .collect()
    }

    fn capture_on_press(&mut self, node: NodeId) {
        self.host.on_pointer(node, P::Pressed, |host, ev| {
            if let Some(m) = host.manager() {
                m.try_capture(host, ev.target, ev.pointer);
            }
            Ok(())
        });
    }
}

fn mouse(kind: MessageKind, x: f64, y: f64) -> InputMessage {
    InputMessage::new(kind, PointerInfo::mouse(), Point::new(x, y))
}

fn pressed(kind: MessageKind, x: f64, y: f64) -> InputMessage {
    InputMessage::new(
        kind,
        PointerInfo::mouse().in_contact(true),
        Point::new(x, y),
    )
}

#[test]
fn hover_capture_release_and_removal() {
    let mut f = fixture(InputConfig::default().with_enter_order(EnterOrder::RootToChild));
    let (a, b, c) = (f.a, f.b, f.c);
    let content = f.host.content();
    f.capture_on_press(c);

    f.send(mouse(MessageKind::PointerUpdate, 10.0, 10.0));
    assert_eq!(
        f.events(),
        [
            (P::Entered, content),
            (P::Entered, b),
            (P::Entered, a),
            (P::Moved, a)
        ]
    );

    f.send(mouse(MessageKind::PointerUpdate, 60.0, 10.0));
    assert_eq!(
        f.events(),
        [(P::Exited, a), (P::Entered, c), (P::Moved, c)],
        "B is the common ancestor and sees neither"
    );

    f.send(pressed(MessageKind::PointerDown, 60.0, 10.0));
    assert_eq!(f.events(), [(P::Pressed, c)]);
    assert_eq!(f.manager.captured_node(PointerId::MOUSE), Some(c));
    assert_eq!(f.host.native_capture(), Some(PointerId::MOUSE));

    f.send(pressed(MessageKind::PointerUpdate, 150.0, 150.0));
    let events = f.events();
    assert_eq!(events.last(), Some(&(P::Moved, c)));
    assert!(!events.iter().any(|(k, n)| *k == P::Entered && *n != c));

    f.send(mouse(MessageKind::PointerUp, 150.0, 150.0));
    let events = f.events();
    assert_eq!(events.first(), Some(&(P::Released, c)));
    assert!(!events.iter().any(|(k, _)| *k == P::CaptureLost));
    assert_eq!(f.manager.captured_node(PointerId::MOUSE), None);
    assert_eq!(f.host.native_capture(), None);

    f.send(mouse(MessageKind::PointerUpdate, 60.0, 10.0));
    assert_eq!(
        f.events(),
        [(P::Entered, b), (P::Entered, c), (P::Moved, c)]
    );

    f.host.remove(c);
    assert_eq!(f.manager.pending_exited_count(), 1);
    assert!(f.events().is_empty(), "exits wait for the next message");

    f.send(mouse(MessageKind::PointerUpdate, 10.0, 10.0));
    assert_eq!(
        f.events(),
        [(P::Exited, c), (P::Entered, a), (P::Moved, a)]
    );
    assert_eq!(f.manager.pending_exited_count(), 0);
}

#[test]
fn enter_and_exit_pair_up_per_node() {
    let mut f = fixture(InputConfig::default());
    let d = f.host.insert_rect(f.c, Rect::new(60.0, 10.0, 80.0, 30.0));
    let path = [
        (10.0, 10.0),
        (70.0, 20.0),
        (60.0, 40.0),
        (150.0, 150.0),
        (70.0, 20.0),
        (10.0, 60.0),
        (20.0, 20.0),
        (75.0, 25.0),
        (500.0, 500.0),
        (75.0, 25.0),
    ];
    for (i, (x, y)) in path.into_iter().enumerate() {
        let kind = if i == 4 {
            MessageKind::PointerDown
        } else if i == 6 {
            MessageKind::PointerUp
        } else {
            MessageKind::PointerUpdate
        };
        f.send(mouse(kind, x, y));
        if i == 1 {
            f.host.remove(d);
        }
    }
    f.send(mouse(MessageKind::PointerLeave, 75.0, 25.0));

    assert_balanced(&f.events());
    assert_eq!(f.manager.active_pointer_count(), 0);
}

fn assert_balanced(events: &[(P, NodeId)]) {
    let mut balance: HashMap<NodeId, i32> = HashMap::new();
    for (kind, node) in events {
        match kind {
            P::Entered => *balance.entry(*node).or_default() += 1,
            P::Exited => *balance.entry(*node).or_default() -= 1,
            _ => {}
        }
    }
    assert!(balance.values().all(|v| *v == 0), "unbalanced: {balance:?}");
}

#[test]
fn entered_handler_removing_an_ancestor_keeps_pairs() {
    let mut f = fixture(InputConfig::default());
    let (a, b) = (f.a, f.b);
    let content = f.host.content();
    f.host.on_pointer(a, P::Entered, move |host, _| {
        host.remove(b);
        Ok(())
    });

    f.send(mouse(MessageKind::PointerUpdate, 10.0, 10.0));
    assert_eq!(f.manager.entered_node(PointerId::MOUSE), Some(content));
    f.send(mouse(MessageKind::PointerLeave, 10.0, 10.0));

    let events = f.events();
    assert!(!events.iter().any(|(_, n)| *n == b), "b never finished entering");
    assert_balanced(&events);
}

#[test]
fn exited_handler_removing_the_new_target_keeps_pairs() {
    let mut f = fixture(InputConfig::default());
    let (b, c) = (f.b, f.c);
    let content = f.host.content();
    let x = f.host.insert_rect(content, Rect::new(150.0, 0.0, 200.0, 100.0));
    f.send(mouse(MessageKind::PointerUpdate, 160.0, 10.0));
    f.host.on_pointer(x, P::Exited, move |host, _| {
        host.remove(b);
        Ok(())
    });

    f.send(mouse(MessageKind::PointerUpdate, 60.0, 10.0));
    assert_eq!(f.manager.entered_node(PointerId::MOUSE), Some(content));
    f.send(mouse(MessageKind::PointerUpdate, 60.0, 10.0));
    f.send(mouse(MessageKind::PointerLeave, 60.0, 10.0));

    let events = f.events();
    assert!(!events.contains(&(P::Entered, c)));
    assert!(
        events.iter().filter(|e| **e == (P::Moved, c)).count() <= 1,
        "later messages do not route to the removed node"
    );
    assert_eq!(events.iter().filter(|e| **e == (P::Entered, content)).count(), 1);
    assert_balanced(&events);
}

#[test]
fn exits_precede_enters_within_one_move() {
    let mut f = fixture(InputConfig::default());
    let deep = f.host.insert_rect(f.a, Rect::new(0.0, 0.0, 20.0, 20.0));
    f.send(mouse(MessageKind::PointerUpdate, 10.0, 10.0));
    f.events();
    f.send(mouse(MessageKind::PointerUpdate, 150.0, 10.0));
    let kinds: Vec<P> = f.events().into_iter().map(|(k, _)| k).collect();
    assert_eq!(kinds, [P::Exited, P::Exited, P::Exited, P::Moved]);
    assert_ne!(f.manager.entered_node(PointerId::MOUSE), Some(deep));
}

#[test]
fn repeated_update_is_idle() {
    let mut f = fixture(InputConfig::default());
    f.send(mouse(MessageKind::PointerUpdate, 10.0, 10.0));
    f.events();
    let out = f.send(mouse(MessageKind::PointerUpdate, 10.0, 10.0));
    assert_eq!(out.target, Some(f.a));
    assert!(f.events().is_empty());
}

#[test]
fn capture_is_exclusive_across_mouse_pointers() {
    let mut f = fixture(InputConfig::default());
    let (a, c) = (f.a, f.c);
    f.capture_on_press(a);
    f.capture_on_press(c);
    let second = PointerInfo::new(PointerId(7), understory_input::DeviceType::Mouse);

    f.send(pressed(MessageKind::PointerDown, 10.0, 10.0));
    assert_eq!(f.manager.captured_node(PointerId::MOUSE), Some(a));
    assert!(!f.manager.try_capture(&mut f.host, c, PointerId::MOUSE));
    f.events();

    f.send(InputMessage::new(
        MessageKind::PointerDown,
        second.in_contact(true),
        Point::new(60.0, 10.0),
    ));
    let events = f.events();
    let lost = events.iter().position(|e| *e == (P::CaptureLost, a));
    let pressed = events.iter().position(|e| *e == (P::Pressed, c));
    assert!(lost.is_some() && pressed.is_some());
    assert_eq!(f.manager.captured_node(PointerId::MOUSE), None);
    assert_eq!(f.manager.captured_node(PointerId(7)), Some(c));
    assert_eq!(f.host.native_capture(), Some(PointerId(7)));
}

#[test]
fn nested_pump_supersedes_the_outer_message() {
    let mut f = fixture(InputConfig::default());
    let a = f.a;
    let c = f.c;
    f.host.on_pointer(a, P::Moved, |host, _| {
        if let Some(m) = host.manager() {
            let nested = InputMessage::new(
                MessageKind::PointerUpdate,
                PointerInfo::mouse(),
                Point::new(60.0, 10.0),
            );
            m.process_pointer_message(host, &nested)
                .map_err(|_| understory_input::DispatchFailed)?;
        }
        Ok(())
    });
    let out = f.send(mouse(MessageKind::PointerUpdate, 10.0, 10.0));
    assert!(out.superseded);
    assert_eq!(f.manager.entered_node(PointerId::MOUSE), Some(c));
    assert!(!f.manager.is_processing());
}

#[test]
fn nested_pump_faults_when_configured() {
    let mut f = fixture(InputConfig::default().with_reentrancy(ReentrancyPolicy::Fault));
    let errors: Rc<RefCell<Vec<InputError>>> = Rc::default();
    let sink = errors.clone();
    f.host.on_pointer(f.a, P::Moved, move |host, _| {
        if let Some(m) = host.manager() {
            let nested = InputMessage::new(
                MessageKind::PointerUpdate,
                PointerInfo::mouse(),
                Point::new(60.0, 10.0),
            );
            if let Err(e) = m.process_pointer_message(host, &nested) {
                sink.borrow_mut().push(e);
            }
        }
        Ok(())
    });
    let out = f.send(mouse(MessageKind::PointerUpdate, 10.0, 10.0));
    assert!(out.superseded);
    assert_eq!(
        *errors.borrow(),
        [InputError::Reentrancy {
            outer: RoutedMessage::Pointer(MessageKind::PointerUpdate),
            nested: RoutedMessage::Pointer(MessageKind::PointerUpdate),
        }]
    );
    assert_eq!(f.manager.entered_node(PointerId::MOUSE), Some(f.a));
}

fn open_flyout(f: &mut Fixture, placement_target: NodeId) -> NodeId {
    f.host.open_popup(
        Rect::new(120.0, 0.0, 200.0, 60.0),
        PopupInfo {
            is_flyout: true,
            is_light_dismiss: true,
            pass_through: None,
            placement_target: Some(placement_target),
        },
    )
}

#[test]
fn press_outside_a_flyout_lands_on_the_overlay_and_dismisses() {
    let mut f = fixture(InputConfig::default());
    let a = f.a;
    open_flyout(&mut f, a);
    let overlay = f.host.overlay().unwrap();

    let out = f.send(pressed(MessageKind::PointerDown, 10.0, 10.0));
    assert_eq!(out.target, Some(overlay));
    assert!(f.events().contains(&(P::Pressed, overlay)));
    assert_eq!(f.host.popups().count(), 0);
    assert_eq!(f.host.overlay(), None);

    f.send(mouse(MessageKind::PointerUp, 10.0, 10.0));
    let events = f.events();
    assert_eq!(events.first(), Some(&(P::Exited, overlay)));
    assert!(events.contains(&(P::Released, a)));
}

#[test]
fn right_press_passes_through_and_closes_flyouts() {
    let mut f = fixture(InputConfig::default());
    let a = f.a;
    open_flyout(&mut f, a);

    let msg = InputMessage::new(
        MessageKind::PointerDown,
        PointerInfo::mouse().in_contact(true).with_right_button(true),
        Point::new(10.0, 10.0),
    );
    let out = f.send(msg);
    assert_eq!(out.target, Some(a));
    assert!(f.events().contains(&(P::Pressed, a)));
    assert_eq!(f.host.popups().count(), 0);
}

#[test]
fn deferred_drag_over_then_drop() {
    let mut f = fixture(InputConfig::default());
    let a = f.a;
    f.host.on_drag(a, DragMessageKind::DragOver, |_, ev| {
        ev.accepted = DragOperations::COPY;
        ev.deferred = true;
        Ok(())
    });
    f.host.on_drag(a, DragMessageKind::Drop, |_, ev| {
        ev.accepted = ev.allowed;
        ev.handled = true;
        Ok(())
    });
    let over = DragMessage::new(DragMessageKind::DragOver, Point::new(10.0, 10.0))
        .with_allowed(DragOperations::COPY | DragOperations::MOVE);
    let out = f
        .manager
        .process_async_drag_drop(&mut f.host, &over)
        .unwrap();
    assert!(out.deferred);
    assert_eq!(out.accepted, DragOperations::COPY);
    assert_eq!(f.manager.drag_entered_node(), Some(a));
    f.host.take_log();

    let again = f
        .manager
        .process_async_drag_drop(&mut f.host, &over)
        .unwrap();
    assert!(again.deferred);
    assert!(f.host.take_log().is_empty());
    assert_eq!(f.manager.complete_drag_deferral(), Some(DragOperations::COPY));

    let drop = DragMessage::new(DragMessageKind::Drop, Point::new(10.0, 10.0))
        .with_allowed(DragOperations::MOVE);
    let out = f
        .manager
        .process_async_drag_drop(&mut f.host, &drop)
        .unwrap();
    assert!(out.handled);
    assert_eq!(out.accepted, DragOperations::MOVE);
    assert_eq!(
        f.host.take_log(),
        [Routed::Drag {
            kind: DragMessageKind::Drop,
            node: a
        }]
    );
    assert_eq!(f.manager.drag_entered_node(), None);
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer capture.
//!
//! A slider thumb captures the pointer when pressed, so moves keep reaching it after the
//! pointer leaves its bounds. Releasing the button drops the capture without a
//! `PointerCaptureLost`.
//!
//! Run:
//! - `cargo run -p understory_demos --example input_capture`

use std::rc::Rc;

use kurbo::{Point, Rect};
use understory_input::adapters::box_tree::{BoxTreeHost, Routed};
use understory_input::{
    InputManager, InputMessage, MessageKind, PointerEventKind, PointerId, PointerInfo,
};

fn main() {
    tracing_subscriber::fmt().init();

    let mut host = BoxTreeHost::new(Rect::new(0.0, 0.0, 400.0, 100.0));
    let manager = Rc::new(InputManager::new());
    host.attach_manager(manager.clone());
    let content = host.content();
    let track = host.insert_rect(content, Rect::new(0.0, 40.0, 400.0, 60.0));
    let thumb = host.insert_rect(track, Rect::new(0.0, 30.0, 20.0, 70.0));

    host.on_pointer(thumb, PointerEventKind::Pressed, |host, ev| {
        if let Some(m) = host.manager() {
            let granted = m.try_capture(host, ev.target, ev.pointer);
            println!("thumb pressed, capture granted: {granted}");
        }
        ev.handled = true;
        Ok(())
    });
    host.on_pointer(thumb, PointerEventKind::Moved, |_, ev| {
        println!("thumb dragged to x = {}", ev.position.x);
        Ok(())
    });

    let mut send = |kind, x: f64, down: bool| {
        let pointer = PointerInfo::mouse().in_contact(down);
        let msg = InputMessage::new(kind, pointer, Point::new(x, 50.0));
        manager.process_pointer_message(&mut host, &msg).unwrap()
    };

    let out = send(MessageKind::PointerDown, 10.0, true);
    assert!(out.event_handled);
    for x in [60.0, 200.0, 390.0] {
        send(MessageKind::PointerUpdate, x, true);
    }
    send(MessageKind::PointerUp, 390.0, false);

    let log = host.take_log();
    let moved_on_thumb = log
        .iter()
        .filter(|r| {
            matches!(r, Routed::Pointer { kind: PointerEventKind::Moved, node, .. } if *node == thumb)
        })
        .count();
    assert_eq!(moved_on_thumb, 3, "captured moves all reach the thumb");
    assert!(
        !log.iter()
            .any(|r| matches!(r, Routed::Pointer { kind: PointerEventKind::CaptureLost, .. })),
        "release on pointer-up is silent"
    );
    assert_eq!(manager.captured_node(PointerId::MOUSE), None);
    println!("{} events routed", log.len());
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drag and drop with a deferred result.
//!
//! A file list answers `DragOver` asynchronously: its handler marks the event deferred, and
//! until the answer arrives further `DragOver` messages are answered from the cached result
//! without hit testing. A toolbar that lets drags through shows the list beneath it.
//!
//! Run:
//! - `cargo run -p understory_demos --example input_drag_drop`

use kurbo::{Point, Rect};
use understory_input::adapters::box_tree::{BoxTreeHost, Routed};
use understory_input::{DragMessage, DragMessageKind, DragOperations, InputManager};

fn main() {
    tracing_subscriber::fmt().init();

    let mut host = BoxTreeHost::new(Rect::new(0.0, 0.0, 300.0, 300.0));
    let content = host.content();
    let list = host.insert_rect(content, Rect::new(0.0, 0.0, 300.0, 300.0));
    let toolbar = host.insert_rect(content, Rect::new(0.0, 0.0, 300.0, 30.0));
    host.set_drag_pass_through(toolbar, true);

    host.on_drag(list, DragMessageKind::DragOver, |_, ev| {
        ev.deferred = true;
        ev.accepted = DragOperations::COPY;
        Ok(())
    });
    host.on_drag(list, DragMessageKind::Drop, |_, ev| {
        println!("dropped at {:?} with {:?}", ev.position, ev.allowed);
        ev.accepted = DragOperations::COPY;
        ev.handled = true;
        Ok(())
    });

    let manager = InputManager::new();
    let allowed = DragOperations::COPY | DragOperations::MOVE;
    let at = |kind, x, y| DragMessage::new(kind, Point::new(x, y)).with_allowed(allowed);

    let out = manager
        .process_async_drag_drop(&mut host, &at(DragMessageKind::DragEnter, 100.0, 10.0))
        .unwrap();
    println!("over the toolbar: {out:?}");
    assert_eq!(out.target, Some(list), "the toolbar lets drags through");
    assert!(out.deferred);

    let out = manager
        .process_async_drag_drop(&mut host, &at(DragMessageKind::DragOver, 150.0, 150.0))
        .unwrap();
    assert!(out.deferred && out.accepted == DragOperations::COPY);

    manager.set_drag_accepted_operation(DragOperations::MOVE);
    let settled = manager.complete_drag_deferral();
    println!("deferral settled on {settled:?}");
    assert_eq!(settled, Some(DragOperations::MOVE));

    let out = manager
        .process_async_drag_drop(&mut host, &at(DragMessageKind::Drop, 150.0, 150.0))
        .unwrap();
    assert!(out.handled);
    assert_eq!(manager.drag_entered_node(), None);

    let drops = host
        .log()
        .iter()
        .filter(|r| matches!(r, Routed::Drag { kind: DragMessageKind::Drop, .. }))
        .count();
    assert_eq!(drops, 1);
}

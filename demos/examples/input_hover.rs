// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover routing.
//!
//! Move a mouse across a toolbar of buttons and print the Entered/Exited events each move
//! produces. Moving between two buttons exits only the old button and enters only the new
//! one; the toolbar, their common ancestor, sees neither.
//!
//! Run:
//! - `cargo run -p understory_demos --example input_hover`

use kurbo::{Point, Rect};
use understory_input::adapters::box_tree::{BoxTreeHost, Routed};
use understory_input::{
    EnterOrder, InputConfig, InputManager, InputMessage, MessageKind, PointerEventKind, PointerInfo,
};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
        .init();

    let mut host = BoxTreeHost::new(Rect::new(0.0, 0.0, 300.0, 200.0));
    let content = host.content();
    let toolbar = host.insert_rect(content, Rect::new(0.0, 0.0, 300.0, 40.0));
    let open = host.insert_rect(toolbar, Rect::new(0.0, 0.0, 100.0, 40.0));
    let save = host.insert_rect(toolbar, Rect::new(100.0, 0.0, 200.0, 40.0));

    let manager =
        InputManager::with_config(InputConfig::default().with_enter_order(EnterOrder::RootToChild));
    let mut moves = Vec::new();
    for (x, y) in [(50.0, 20.0), (150.0, 20.0), (150.0, 20.0), (150.0, 120.0)] {
        let msg = InputMessage::new(
            MessageKind::PointerUpdate,
            PointerInfo::mouse(),
            Point::new(x, y),
        );
        manager.process_pointer_message(&mut host, &msg).unwrap();
        let events: Vec<(PointerEventKind, _)> = host
            .take_log()
            .into_iter()
            .filter_map(|r| match r {
                Routed::Pointer { kind, node, .. } => Some((kind, node)),
                Routed::Drag { .. } => None,
            })
            .collect();
        println!("move to ({x}, {y}): {events:?}");
        moves.push(events);
    }

    use PointerEventKind::{Entered, Exited, Moved};
    assert_eq!(
        moves[0],
        [
            (Entered, content),
            (Entered, toolbar),
            (Entered, open),
            (Moved, open)
        ]
    );
    assert_eq!(moves[1], [(Exited, open), (Entered, save), (Moved, save)]);
    assert!(moves[2].is_empty(), "a repeated position is idle");
    assert_eq!(
        moves[3],
        [(Exited, save), (Exited, toolbar), (Moved, content)]
    );
}

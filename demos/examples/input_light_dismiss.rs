// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Light-dismiss flyouts.
//!
//! A menu flyout opened from a button raises an overlay over the rest of the window.
//! A left press outside the menu lands on the overlay, which closes the menu. A right press
//! passes through the overlay to the node beneath and closes the menu on the way.
//!
//! Run:
//! - `cargo run -p understory_demos --example input_light_dismiss`

use std::rc::Rc;

use kurbo::{Point, Rect};
use understory_box_tree::NodeId;
use understory_input::adapters::box_tree::BoxTreeHost;
use understory_input::{InputManager, InputMessage, MessageKind, PointerInfo, PopupInfo};

fn open_menu(host: &mut BoxTreeHost, button: NodeId) -> NodeId {
    host.open_popup(
        Rect::new(0.0, 40.0, 120.0, 160.0),
        PopupInfo {
            is_flyout: true,
            is_light_dismiss: true,
            pass_through: None,
            placement_target: Some(button),
        },
    )
}

fn main() {
    tracing_subscriber::fmt().init();

    let mut host = BoxTreeHost::new(Rect::new(0.0, 0.0, 400.0, 300.0));
    let manager = Rc::new(InputManager::new());
    host.attach_manager(manager.clone());
    let content = host.content();
    let button = host.insert_rect(content, Rect::new(0.0, 0.0, 80.0, 40.0));
    let canvas = host.insert_rect(content, Rect::new(0.0, 200.0, 400.0, 300.0));

    let menu = open_menu(&mut host, button);
    let item = host.insert_rect(menu, Rect::new(0.0, 40.0, 120.0, 70.0));
    let press = |right: bool| {
        InputMessage::new(
            MessageKind::PointerDown,
            PointerInfo::mouse().in_contact(true).with_right_button(right),
            Point::new(200.0, 250.0),
        )
    };

    // Inside the menu, input reaches the item as usual.
    let over_item = InputMessage::new(
        MessageKind::PointerUpdate,
        PointerInfo::mouse(),
        Point::new(60.0, 50.0),
    );
    let out = manager.process_pointer_message(&mut host, &over_item).unwrap();
    assert_eq!(out.target, Some(item));

    let overlay = host.overlay();
    let out = manager.process_pointer_message(&mut host, &press(false)).unwrap();
    println!("left press outside routed to {:?}", out.target);
    assert_eq!(out.target, overlay);
    assert_eq!(host.popups().count(), 0, "the overlay press closed the menu");
    let up = InputMessage::new(MessageKind::PointerUp, PointerInfo::mouse(), Point::new(200.0, 250.0));
    manager.process_pointer_message(&mut host, &up).unwrap();

    open_menu(&mut host, button);
    let out = manager.process_pointer_message(&mut host, &press(true)).unwrap();
    println!("right press outside routed to {:?}", out.target);
    assert_eq!(out.target, Some(canvas));
    assert_eq!(host.popups().count(), 0, "passing through closed the menu");
}

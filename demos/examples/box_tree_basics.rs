// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Box tree basics.
//!
//! Build a small tree, move a node, and hit-test, with and without a subtree excluded.
//!
//! Run:
//! - `cargo run -p understory_demos --example box_tree_basics`

use kurbo::{Affine, Point, Rect, Vec2};
use understory_box_tree::{LocalNode, QueryFilter, Tree};

fn main() {
    let mut tree = Tree::new();
    let root = tree.insert(
        None,
        LocalNode {
            local_bounds: Rect::new(0.0, 0.0, 200.0, 200.0),
            ..Default::default()
        },
    );
    let a = tree.insert(
        Some(root),
        LocalNode {
            local_bounds: Rect::new(10.0, 10.0, 60.0, 60.0),
            z_index: 0,
            ..Default::default()
        },
    );
    let b = tree.insert(
        Some(root),
        LocalNode {
            local_bounds: Rect::new(40.0, 40.0, 120.0, 120.0),
            z_index: 10,
            ..Default::default()
        },
    );

    // Move node A to the right; it now overlaps B at (50, 50).
    tree.set_local_transform(a, Affine::translate(Vec2::new(20.0, 0.0)));

    // Hit-test prefers the higher z-index (node B).
    let filter = QueryFilter::pickable();
    let hit = tree.hit_test_point(Point::new(50.0, 50.0), filter).unwrap();
    println!("hit node: {:?} path: {:?}", hit.node, hit.path);
    assert_eq!(hit.node, b, "hit-test should prefer higher z-index node B");

    // Excluding B looks through it to A.
    let hit = tree
        .hit_test_point(Point::new(50.0, 50.0), filter.excluding(b))
        .unwrap();
    println!("hit with B excluded: {:?}", hit.node);
    assert_eq!(hit.node, a);
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_input::EnterOrder;
use understory_input::propagate::{
    Crossing, CrossingSink, Eligibility, PropagateOptions, propagate,
};

/// A complete binary tree stored as parent indices; node 0 is the root.
struct Binary {
    len: u32,
    entered: Option<u32>,
    fired: usize,
}

impl Binary {
    fn new(depth: u32) -> Self {
        Self {
            len: (1 << depth) - 1,
            entered: None,
            fired: 0,
        }
    }

    fn leftmost_leaf(&self) -> u32 {
        let mut n = 0;
        while 2 * n + 1 < self.len {
            n = 2 * n + 1;
        }
        n
    }

    fn rightmost_leaf(&self) -> u32 {
        let mut n = 0;
        while 2 * n + 2 < self.len {
            n = 2 * n + 2;
        }
        n
    }
}

impl CrossingSink<u32> for Binary {
    type Error = ();

    fn parent_of(&self, node: u32) -> Option<u32> {
        (node > 0).then(|| (node - 1) / 2)
    }

    fn is_hit_test_visible(&self, _node: u32) -> bool {
        true
    }

    fn entered(&self) -> Option<u32> {
        self.entered
    }

    fn set_entered(&mut self, node: Option<u32>) {
        self.entered = node;
    }

    fn fire(&mut self, _crossing: Crossing, _node: u32) -> Result<(), ()> {
        self.fired += 1;
        Ok(())
    }
}

fn bench_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagate");
    for depth in [4_u32, 8, 12] {
        let tree = Binary::new(depth);
        let (left, right) = (tree.leftmost_leaf(), tree.rightmost_leaf());

        group.bench_function(format!("sibling_leaves/depth_{depth}"), |b| {
            let right_sibling = left + 1;
            b.iter_batched(
                || Binary::new(depth),
                |mut sink| {
                    propagate(
                        &mut sink,
                        black_box(Some(left)),
                        black_box(Some(right_sibling)),
                        Eligibility::All,
                        PropagateOptions::default(),
                    )
                    .unwrap()
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("across_root/depth_{depth}"), |b| {
            b.iter_batched(
                || Binary::new(depth),
                |mut sink| {
                    propagate(
                        &mut sink,
                        black_box(Some(left)),
                        black_box(Some(right)),
                        Eligibility::All,
                        PropagateOptions {
                            enter_order: EnterOrder::RootToChild,
                            ..PropagateOptions::default()
                        },
                    )
                    .unwrap()
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("under_capture/depth_{depth}"), |b| {
            b.iter_batched(
                || Binary::new(depth),
                |mut sink| {
                    propagate(
                        &mut sink,
                        black_box(Some(left)),
                        black_box(Some(right)),
                        Eligibility::UnderCapture(left),
                        PropagateOptions::default(),
                    )
                    .unwrap()
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_propagation);
criterion_main!(benches);

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect};
use understory_input::adapters::box_tree::BoxTreeHost;
use understory_input::{InputManager, InputMessage, MessageKind, PointerInfo};

/// An `n` x `n` grid of cells, each holding a nested button.
fn grid_host(n: usize, cell: f64) -> BoxTreeHost {
    let side = n as f64 * cell;
    let mut host = BoxTreeHost::new(Rect::new(0.0, 0.0, side, side));
    let content = host.content();
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            let cell_node = host.insert_rect(content, Rect::new(x0, y0, x0 + cell, y0 + cell));
            host.insert_rect(
                cell_node,
                Rect::new(x0 + 2.0, y0 + 2.0, x0 + cell - 2.0, y0 + cell - 2.0),
            );
        }
    }
    host
}

/// A diagonal sweep across the grid, crossing a cell boundary on most steps.
fn sweep(n: usize, cell: f64) -> Vec<InputMessage> {
    (0..n * 4)
        .map(|i| {
            let t = i as f64 * cell / 4.0 + 1.0;
            InputMessage::new(MessageKind::PointerUpdate, PointerInfo::mouse(), Point::new(t, t))
        })
        .collect()
}

fn bench_pointer_messages(c: &mut Criterion) {
    let mut group = c.benchmark_group("pointer_messages");
    for n in [8_usize, 32] {
        let messages = sweep(n, 20.0);
        group.throughput(Throughput::Elements(messages.len() as u64));

        group.bench_function(format!("hover_sweep/grid_{n}"), |b| {
            let mut host = grid_host(n, 20.0);
            let manager = InputManager::new();
            b.iter(|| {
                for msg in &messages {
                    black_box(manager.process_pointer_message(&mut host, msg).unwrap());
                }
                host.take_log();
            });
        });

        group.bench_function(format!("idle_updates/grid_{n}"), |b| {
            let mut host = grid_host(n, 20.0);
            let manager = InputManager::new();
            let msg = messages[messages.len() / 2];
            manager.process_pointer_message(&mut host, &msg).unwrap();
            b.iter(|| {
                for _ in 0..messages.len() {
                    black_box(manager.process_pointer_message(&mut host, &msg).unwrap());
                }
                host.take_log();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pointer_messages);
criterion_main!(benches);

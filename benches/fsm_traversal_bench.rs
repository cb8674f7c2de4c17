//! Graph traversal benchmark.
//!
//! Measures a breadth-first sweep over every state's outgoing arcs, the access
//! pattern a frame-synchronous search performs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sio_core::fsm::{Arc, Fsm, StateId};

fn grid_graph(num_states: i64, fanout: i32) -> Fsm {
    let mut arcs = Vec::with_capacity((num_states as usize) * fanout as usize);
    for s in 0..num_states as StateId {
        for k in 1..=fanout {
            let dst = (s + k).min(num_states as StateId - 1);
            arcs.push(Arc::new(s, dst, k, k, k as f32 * 0.1));
        }
    }
    Fsm::from_arcs(num_states, arcs).unwrap()
}

fn bench_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fsm Traversal");

    for num_states in [1_000i64, 100_000] {
        let fsm = grid_graph(num_states, 8);

        group.bench_with_input(BenchmarkId::new("Iterator", num_states), &fsm, |b, fsm| {
            b.iter(|| {
                let mut best = f32::MAX;
                for s in 0..fsm.num_states() as StateId {
                    for arc in fsm.arc_iterator(s) {
                        best = best.min(arc.weight + arc.dst as f32);
                    }
                }
                black_box(best);
            });
        });

        group.bench_with_input(BenchmarkId::new("Cursor", num_states), &fsm, |b, fsm| {
            b.iter(|| {
                let mut total = 0i64;
                for s in 0..fsm.num_states() as StateId {
                    let mut it = fsm.arc_iterator(s);
                    while !it.done() {
                        total += i64::from(it.value().olabel);
                        it.advance();
                    }
                }
                black_box(total);
            });
        });
    }

    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fsm Load");
    let fsm = grid_graph(10_000, 8);

    let mut binary = Vec::new();
    fsm.dump(&mut binary).unwrap();
    let text = fsm.to_string();

    group.bench_function("Binary", |b| {
        b.iter(|| black_box(Fsm::from_binary(binary.as_slice()).unwrap().num_arcs()));
    });
    group.bench_function("Text", |b| {
        b.iter(|| black_box(Fsm::from_text(text.as_bytes()).unwrap().num_arcs()));
    });

    group.finish();
}

criterion_group!(benches, bench_traversal, bench_load);
criterion_main!(benches);

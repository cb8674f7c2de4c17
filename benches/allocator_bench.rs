//! Pool allocator benchmark.
//!
//! Compares search-style allocation churn (allocate a beam, free most of it,
//! refill) through the slab and arena pools against plain `Box` allocation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sio_core::memory::{ArenaAllocator, Handle, Link, LinkStore, Linked, SlabAllocator};

#[derive(Default)]
struct Hyp {
    link: Link,
    state: i32,
    score: f32,
}

impl Linked for Hyp {
    fn link(&self) -> &Link {
        &self.link
    }

    fn link_mut(&mut self) -> &mut Link {
        &mut self.link
    }
}

const FRAMES: usize = 50;

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("Beam Churn");

    for beam in [64usize, 512, 4096] {
        group.bench_with_input(BenchmarkId::new("Box", beam), &beam, |b, &beam| {
            b.iter(|| {
                let mut live: Vec<Box<Hyp>> = Vec::with_capacity(beam);
                for frame in 0..FRAMES {
                    while live.len() < beam {
                        live.push(Box::new(Hyp {
                            link: Link::new(),
                            state: frame as i32,
                            score: 0.0,
                        }));
                    }
                    live.truncate(beam / 4);
                }
                black_box(live.len());
            });
        });

        group.bench_with_input(BenchmarkId::new("Arena", beam), &beam, |b, &beam| {
            let mut pool = ArenaAllocator::new(4096).unwrap();
            b.iter(|| {
                let mut live: Vec<Handle> = Vec::with_capacity(beam);
                for frame in 0..FRAMES {
                    while live.len() < beam {
                        live.push(pool.alloc(Hyp {
                            link: Link::new(),
                            state: frame as i32,
                            score: 0.0,
                        }));
                    }
                    for h in live.drain(beam / 4..) {
                        pool.free(h);
                    }
                }
                black_box(live.len());
                pool.clear();
            });
        });

        group.bench_with_input(BenchmarkId::new("Slab", beam), &beam, |b, &beam| {
            let mut pool: SlabAllocator<Hyp> = SlabAllocator::with_cache_size(4096, 1).unwrap();
            b.iter(|| {
                let mut live: Vec<Handle> = Vec::with_capacity(beam);
                for frame in 0..FRAMES {
                    while live.len() < beam {
                        let h = pool.alloc();
                        pool.get_mut(h)[0].state = frame as i32;
                        live.push(h);
                    }
                    for h in live.drain(beam / 4..) {
                        pool.free(h);
                    }
                }
                black_box(live.len());
                pool.clear();
            });
        });
    }

    group.finish();
}

fn bench_linked_beam(c: &mut Criterion) {
    let mut group = c.benchmark_group("Linked Beam");

    group.bench_function("Arena Insert And Walk", |b| {
        let mut pool = ArenaAllocator::new(4096).unwrap();
        b.iter(|| {
            let head = pool.alloc(Hyp::default());
            let mut tail = head;
            for i in 0..1024 {
                let h = pool.alloc(Hyp {
                    link: Link::new(),
                    state: i,
                    score: i as f32,
                });
                pool.insert_after(h, tail);
                tail = h;
            }
            let total: f32 = pool.iter_from(head).map(|h| pool.get(h).score).sum();
            black_box(total);
            pool.clear();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_churn, bench_linked_beam);
criterion_main!(benches);

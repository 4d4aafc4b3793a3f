// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_hvvh::{Extent, HvvhTree, Indexable, ObjectIndex, Parameters};

fn gen_grid_rects(n: usize, cell: f64) -> Vec<Extent> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            out.push(Extent::world(x0, y0, x0 + cell, y0 + cell));
        }
    }
    out
}

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_random_rects(count: usize, world: f64, max_side: f64) -> Vec<Extent> {
    let mut out = Vec::with_capacity(count);
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    for _ in 0..count {
        let x0 = rng.next_f64() * world;
        let y0 = rng.next_f64() * world;
        let w = 1.0 + rng.next_f64() * max_side;
        let h = 1.0 + rng.next_f64() * max_side;
        out.push(Extent::world(x0, y0, x0 + w, y0 + h));
    }
    out
}

/// Long horizontal bars: most of them straddle the vertical split lines and land in cut trees.
fn gen_bars(count: usize, width: f64) -> Vec<Extent> {
    let mut out = Vec::with_capacity(count);
    let mut rng = Rng::new(0xBADC_F00D_1234_5678);
    for i in 0..count {
        let x0 = rng.next_f64() * width * 0.25;
        let y0 = i as f64 * 3.0;
        out.push(Extent::world(x0, y0, x0 + width * 0.75, y0 + 2.0));
    }
    out
}

fn build(rects: &[Extent], params: Parameters) -> (HvvhTree<Extent>, Vec<Indexable<Extent>>) {
    let mut tree = HvvhTree::new(params);
    let items = rects.iter().map(|r| tree.add(*r).unwrap()).collect();
    (tree, items)
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("hvvh_insert");
    for &n in &[32usize, 64, 128] {
        let rects = gen_grid_rects(n, 10.0);
        group.throughput(Throughput::Elements((n * n) as u64));
        for load in [2usize, 8] {
            let params = Parameters::default()
                .with_max_node_load(load)
                .with_max_cut_node_load(load);
            group.bench_function(format!("grid_n{}_load{}", n, load), |b| {
                b.iter_batched(
                    || HvvhTree::<Extent>::new(params),
                    |mut tree| {
                        for r in &rects {
                            let _ = tree.add(*r);
                        }
                        black_box(tree.stats());
                    },
                    BatchSize::SmallInput,
                )
            });
        }
    }
    let bars = gen_bars(4096, 2000.0);
    group.throughput(Throughput::Elements(bars.len() as u64));
    group.bench_function("straddling_bars", |b| {
        b.iter_batched(
            HvvhTree::<Extent>::default,
            |mut tree| {
                for r in &bars {
                    let _ = tree.add(*r);
                }
                black_box(tree.stats());
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("hvvh_query");
    let rects = gen_random_rects(16_384, 2000.0, 40.0);
    let queries = gen_random_rects(256, 2000.0, 200.0);
    let (tree, items) = build(&rects, Parameters::default().with_max_node_load(8));
    group.throughput(Throughput::Elements(queries.len() as u64));
    group.bench_function("tree_random_16k", |b| {
        b.iter(|| {
            let mut hits = 0;
            for q in &queries {
                hits += tree.query_region(q).map_or(0, |v| v.len());
            }
            black_box(hits)
        })
    });
    group.bench_function("scan_random_16k", |b| {
        b.iter(|| {
            let mut hits = 0;
            for q in &queries {
                hits += items.iter().filter(|i| i.overlaps(q)).count();
            }
            black_box(hits)
        })
    });

    let bars = gen_bars(4096, 2000.0);
    let (bar_tree, _) = build(&bars, Parameters::default());
    group.bench_function("tree_straddling_bars", |b| {
        b.iter(|| {
            let mut hits = 0;
            for q in &queries {
                hits += bar_tree.query_region(q).map_or(0, |v| v.len());
            }
            black_box(hits)
        })
    });
    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("hvvh_churn");
    let rects = gen_random_rects(8192, 2000.0, 40.0);
    group.throughput(Throughput::Elements(rects.len() as u64));
    group.bench_function("remove_half_readd", |b| {
        b.iter_batched(
            || build(&rects, Parameters::default()),
            |(mut tree, items)| {
                for item in items.iter().step_by(2) {
                    let _ = tree.remove_indexable(item);
                }
                for item in items.iter().step_by(2) {
                    let _ = tree.add_indexable(item.clone());
                }
                black_box(tree.stats());
            },
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_insert, bench_query, bench_churn);
criterion_main!(benches);

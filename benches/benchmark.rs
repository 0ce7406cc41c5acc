//! Performance benchmarks for maf-compare
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use maf_compare::core::pairs::{walk_block_counting_pairs, ChooseTwoTable};
use maf_compare::core::sample::PairSampler;
use maf_compare::core::PinchThreadSet;
use maf_compare::formats::maf::MafReader;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeSet, HashSet};
use std::io::BufReader;

/// A dense synthetic block: `rows` full rows over `cols` columns
fn dense_block(rows: usize, cols: usize) -> maf_compare::formats::maf::MafBlock {
    let mut text = String::from("a\n");
    let row: String = "ACGT".chars().cycle().take(cols).collect();
    for i in 0..rows {
        text.push_str(&format!("s sp{:03} 0 {} + {} {}\n", i, cols, cols, row));
    }
    MafReader::new(BufReader::new(text.as_bytes()))
        .next_block()
        .unwrap()
        .unwrap()
}

fn legit(rows: usize) -> HashSet<String> {
    (0..rows).map(|i| format!("sp{:03}", i)).collect()
}

fn bench_pair_counting(c: &mut Criterion) {
    let mut group = c.benchmark_group("pair_counting");
    for rows in [10usize, 50, 200] {
        let block = dense_block(rows, 500);
        let names = legit(rows);
        let table = ChooseTwoTable::new();
        group.throughput(Throughput::Elements((rows * 500) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| walk_block_counting_pairs(black_box(&block), &names, &table))
        });
    }
    group.finish();
}

fn bench_column_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_sampling");
    for rows in [10usize, 100, 1000] {
        let block = dense_block(rows, 20);
        let names = legit(rows);
        let table = ChooseTwoTable::new();
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(42);
                let mut sampler = PairSampler::new(0.001, &table, &mut rng);
                let mut pairs = BTreeSet::new();
                sampler.sample_block(black_box(&block), &names, &mut pairs);
                pairs
            })
        });
    }
    group.finish();
}

fn bench_pinching(c: &mut Criterion) {
    c.bench_function("pinch_10k", |b| {
        b.iter(|| {
            let mut ts = PinchThreadSet::new();
            let x = ts.add_thread("x", 100_000);
            let y = ts.add_thread("y", 100_000);
            for i in 0..10_000u64 {
                ts.pinch(x, y, i * 10, i * 10 + 5, 5, i % 2 == 0);
            }
            ts.join_trivial_boundaries();
            black_box(ts.segment_count())
        })
    });
}

criterion_group!(
    benches,
    bench_pair_counting,
    bench_column_sampling,
    bench_pinching
);
criterion_main!(benches);

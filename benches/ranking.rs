//! Ranking benchmarks for Scout.
//!
//! Run with: cargo bench
//!
//! The rank function runs once per candidate per keystroke, so it has to
//! stay cheap across a few hundred candidates.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scout::ranking::{rank, Query};

fn candidate_names() -> Vec<String> {
    let first = ["John", "Joan", "Bjorn", "Alice", "Maria", "Smith", "Oliver"];
    let last = ["Smith", "Johnson", "Miller", "Garcia", "Jones", "Brown"];
    let mut names = Vec::new();
    for f in first {
        for l in last {
            names.push(format!("{f} {l}"));
        }
    }
    names
}

fn bench_rank(c: &mut Criterion) {
    let names = candidate_names();
    let mut group = c.benchmark_group("rank");

    let queries = [
        ("exact", "john smith"),
        ("prefix", "jo"),
        ("token_prefix", "jo sm"),
        ("substring", "ohn"),
        ("excluded", "zzz"),
    ];

    for (label, raw) in queries {
        let query = Query::new(raw);
        group.bench_with_input(BenchmarkId::from_parameter(label), &query, |b, query| {
            b.iter(|| {
                for name in &names {
                    black_box(rank(black_box(name), query));
                }
            })
        });
    }

    group.finish();
}

fn bench_query_normalization(c: &mut Criterion) {
    c.bench_function("query_new", |b| {
        b.iter(|| black_box(Query::new(black_box("  JoHn   SmItH "))))
    });
}

criterion_group!(benches, bench_rank, bench_query_normalization);
criterion_main!(benches);

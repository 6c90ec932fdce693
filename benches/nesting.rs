use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use csv_user_import::ingestion::prepare_user;
use csv_user_import::processing::{build_nested_object, AgeDistribution};
use csv_user_import::types::FlatRow;

fn wide_row(extra_columns: usize) -> FlatRow {
    let mut row: FlatRow = [
        ("name.firstName", "Ann"),
        ("name.lastName", "Lee"),
        ("age", "42"),
        ("address.city", "Lund"),
        ("address.line1", "Main St 1"),
        ("address.geo.lat", "55.70"),
        ("address.geo.lon", "13.19"),
    ]
    .into_iter()
    .collect();
    for i in 0..extra_columns {
        row.insert(format!("meta.group{}.field{}", i % 8, i), format!("value-{i}"));
    }
    row
}

fn bench_nesting(c: &mut Criterion) {
    let mut group = c.benchmark_group("nesting");
    for extra in [0usize, 16, 128] {
        let row = wide_row(extra);
        group.bench_with_input(BenchmarkId::new("build_nested_object", extra), &row, |b, row| {
            b.iter(|| build_nested_object(black_box(row)))
        });
        group.bench_with_input(BenchmarkId::new("prepare_user", extra), &row, |b, row| {
            b.iter(|| prepare_user(black_box(row)))
        });
    }
    group.finish();
}

fn bench_distribution(c: &mut Criterion) {
    let ages: Vec<Option<i64>> = (0..100_000).map(|i| Some(i % 95)).collect();
    c.bench_function("age_distribution_100k", |b| {
        b.iter(|| AgeDistribution::from_ages(black_box(&ages)))
    });
}

criterion_group!(benches, bench_nesting, bench_distribution);
criterion_main!(benches);

//! In-memory query engine benchmarks over pre-decoded rows.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dotdb_bench::generate_rows;
use dotdb_core::query::distinct;
use dotdb_core::{Direction, Filter, GroupBy, OrderBy, Query};

/// Benchmark filtering with and without pagination.
fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");

    for count in [100, 1000, 10_000] {
        let rows = generate_rows(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("range", count), &rows, |b, rows| {
            let query = Query::new().filter(Filter::new().between("amount", 1000, 5000));
            b.iter(|| black_box(query.run(black_box(rows.clone()))));
        });

        group.bench_with_input(BenchmarkId::new("like", count), &rows, |b, rows| {
            let query = Query::new().filter(Filter::new().like("customer", "%-4_").unwrap());
            b.iter(|| black_box(query.run(black_box(rows.clone()))));
        });
    }

    group.finish();
}

/// Benchmark sorting and paging.
fn bench_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("order");

    for count in [100, 1000, 10_000] {
        let rows = generate_rows(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &rows, |b, rows| {
            let query = Query::new()
                .order_by(OrderBy::parse("status").unwrap().then("amount", Direction::Asc))
                .offset(10)
                .limit(20);
            b.iter(|| black_box(query.run_counted(black_box(rows.clone()))));
        });
    }

    group.finish();
}

/// Benchmark grouping and de-duplication.
fn bench_group(c: &mut Criterion) {
    let mut group = c.benchmark_group("group");

    for count in [1000, 10_000] {
        let rows = generate_rows(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("group_by", count), &rows, |b, rows| {
            let spec = GroupBy::new(["status"]);
            b.iter(|| black_box(dotdb_core::query::group_by(black_box(rows.clone()), &spec)));
        });

        group.bench_with_input(BenchmarkId::new("distinct", count), &rows, |b, rows| {
            b.iter(|| black_box(distinct(black_box(rows.clone()))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filter, bench_order, bench_group);
criterion_main!(benches);

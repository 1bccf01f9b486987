//! Database operation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dotdb_bench::{memory_db, orders_schema, populated_db, random_order, SECRET};
use dotdb_core::{Config, Database, Filter, Query};
use serde_json::json;

/// Benchmark path writes and reads.
fn bench_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("path");
    let db = memory_db();

    group.bench_function("set", |b| {
        b.iter(|| db.set(black_box("settings.theme"), json!("dark")).unwrap());
    });
    group.bench_function("get", |b| {
        b.iter(|| black_box(db.get(black_box("settings.theme")).unwrap()));
    });
    group.bench_function("increment", |b| {
        b.iter(|| black_box(db.increment(black_box("counters.hits")).unwrap()));
    });

    group.finish();
}

/// Benchmark validated row inserts.
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    let db = memory_db();
    db.create_table("orders", orders_schema()).unwrap();
    let row = random_order();

    group.bench_function("single", |b| {
        b.iter(|| black_box(db.insert("orders", black_box(&row)).unwrap()));
    });

    group.finish();
}

/// Benchmark a full table query, which decodes every row.
fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_query");

    for count in [100, 1000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let db = populated_db(count);
            let query = Query::new().filter(Filter::new().eq("status", "paid"));
            b.iter(|| black_box(db.query("orders", &query).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark saving to disk after each mutation.
fn bench_auto_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("auto_save");

    for count in [10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let dir = tempfile::tempdir().unwrap();
            let db = Database::open(dir.path().join("bench.json"), Config::new(SECRET)).unwrap();
            db.create_table("orders", orders_schema()).unwrap();
            for _ in 0..count {
                db.insert("orders", &random_order()).unwrap();
            }
            b.iter(|| db.set("last", black_box(json!(1))).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_paths, bench_insert, bench_query, bench_auto_save);
criterion_main!(benches);

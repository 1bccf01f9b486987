//! Value codec and format codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dotdb_bench::{generate_rows, SECRET};
use dotdb_codec::{codec_for, Document, Format};
use dotdb_core::ValueCodec;
use serde_json::{json, Value};

/// Create a nested value of roughly `width^depth` leaves.
fn nested_value(depth: usize, width: usize) -> Value {
    if depth == 0 {
        Value::String("leaf".into())
    } else {
        let children: serde_json::Map<String, Value> = (0..width)
            .map(|i| (format!("key_{i}"), nested_value(depth - 1, width)))
            .collect();
        Value::Object(children)
    }
}

/// Benchmark sealing single values.
fn bench_seal(c: &mut Criterion) {
    let codec = ValueCodec::from_secret(SECRET, false).unwrap();
    let mut group = c.benchmark_group("seal");

    group.bench_function("integer", |b| {
        let value = json!(42);
        b.iter(|| black_box(codec.encode(black_box(&value)).unwrap()));
    });

    for size in [16, 256, 4096] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("text", size), &size, |b, &size| {
            let value = Value::String("x".repeat(size));
            b.iter(|| black_box(codec.encode(black_box(&value)).unwrap()));
        });
    }

    group.bench_function("object_3x3", |b| {
        let value = nested_value(3, 3);
        b.iter(|| black_box(codec.encode(black_box(&value)).unwrap()));
    });

    group.finish();
}

/// Benchmark opening sealed values.
fn bench_open(c: &mut Criterion) {
    let codec = ValueCodec::from_secret(SECRET, true).unwrap();
    let mut group = c.benchmark_group("open");

    for size in [16, 256, 4096] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("text", size), &size, |b, &size| {
            let sealed = codec.encode(&Value::String("x".repeat(size))).unwrap();
            b.iter(|| black_box(codec.decode(black_box(&sealed)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark whole-document format codecs.
fn bench_formats(c: &mut Criterion) {
    let mut group = c.benchmark_group("format");
    let mut document = Document::new();
    for (i, row) in generate_rows(1000).into_iter().enumerate() {
        document.insert(format!("entry_{i}"), Value::Object(row));
    }

    for format in [Format::Json, Format::Yaml] {
        let codec = codec_for(format, true);
        let text = codec.encode(&document).unwrap();
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_function(BenchmarkId::new("encode", format), |b| {
            b.iter(|| black_box(codec.encode(black_box(&document)).unwrap()));
        });
        group.bench_function(BenchmarkId::new("decode", format), |b| {
            b.iter(|| black_box(codec.decode(black_box(&text)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_seal, bench_open, bench_formats);
criterion_main!(benches);

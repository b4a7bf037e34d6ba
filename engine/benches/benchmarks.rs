//! Performance benchmarks for dataset-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dataset_engine::filter::{any, not, regexp};
use dataset_engine::{
    build_commit, parse_query, slice_diff, Filters, Query, Record, RecordSet, ScriptedTransport,
    Value,
};
use serde_json::json;

fn tagged_record(id: i64, tags: usize) -> Record {
    let tags: Vec<String> = (0..tags).map(|i| format!("tag_{}", i)).collect();
    Record::from_fields(
        serde_json::from_value(json!({
            "object_id": id,
            "hostname": format!("host{}.local", id),
            "memory": 4096,
            "tags": tags,
        }))
        .unwrap(),
    )
}

fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");

    group.bench_function("single_literal", |b| {
        b.iter(|| parse_query(black_box("hostname=web01.local")))
    });

    group.bench_function("nested_calls", |b| {
        b.iter(|| {
            parse_query(black_box(
                "hostname=not(any(regexp(^db), regexp(^cache))) state=online num_cpu=greaterthan(4)",
            ))
        })
    });

    for terms in [1, 10, 50].iter() {
        let text: String = (0..*terms)
            .map(|i| format!("attr_{}=any(a, b, regexp(^x{}))", i, i))
            .collect::<Vec<_>>()
            .join(" ");

        group.bench_with_input(BenchmarkId::new("terms", terms), &text, |b, text| {
            b.iter(|| parse_query(black_box(text)))
        });
    }

    group.finish();
}

fn bench_changes(c: &mut Criterion) {
    let mut group = c.benchmark_group("changes");

    for size in [10, 100, 1000].iter() {
        let old: Vec<Value> = (0..*size).map(|i| Value::from(format!("tag_{}", i))).collect();
        let new: Vec<Value> = (0..*size)
            .map(|i| Value::from(format!("tag_{}", i + size / 2)))
            .collect();

        group.bench_with_input(BenchmarkId::new("slice_diff", size), size, |b, _| {
            b.iter(|| slice_diff(black_box(&old), black_box(&new)))
        });

        let mut record = tagged_record(1, *size);
        let mut tags = record.get_multi("tags");
        tags.delete("tag_0");
        tags.add(["fresh"]);
        record.set("tags", tags).unwrap();

        group.bench_with_input(BenchmarkId::new("serialize_changes", size), size, |b, _| {
            b.iter(|| black_box(&record).serialize_changes())
        });
    }

    group.finish();
}

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit");

    for size in [10, 100, 500].iter() {
        let mut records: RecordSet = (0..*size as i64).map(|id| tagged_record(id + 1, 5)).collect();
        records.set("memory", 8192).unwrap();

        group.bench_with_input(BenchmarkId::new("build_commit", size), size, |b, _| {
            b.iter(|| build_commit(black_box(&records)).unwrap())
        });
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    for size in [10, 100, 1000].iter() {
        let results: Vec<_> = (0..*size)
            .map(|i| json!({"object_id": i, "hostname": format!("host{}.local", i), "tags": ["a", "b"]}))
            .collect();
        let reply = json!({"status": "success", "result": results});

        group.bench_with_input(BenchmarkId::new("load", size), &reply, |b, reply| {
            b.iter(|| {
                let transport = ScriptedTransport::new().reply(reply.clone());
                let mut query = Query::new(
                    Filters::new()
                        .with("hostname", not(regexp("^test")))
                        .with("tags", any(["a", "b"])),
                );
                query.count(&transport)
            })
        });
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    let filters = Filters::new()
        .with("hostname", not(any([regexp("^db"), regexp("^cache")])))
        .with("state", "online");

    group.bench_function("filters_to_json", |b| {
        b.iter(|| serde_json::to_string(black_box(&filters)))
    });

    let mut query = Query::new(filters.clone());
    query.add_attributes(["memory", "tags"]);
    let request = query.request();

    group.bench_function("query_request_to_json", |b| {
        b.iter(|| serde_json::to_string(black_box(&request)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parser,
    bench_changes,
    bench_commit,
    bench_query,
    bench_serialization
);
criterion_main!(benches);

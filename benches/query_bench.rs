//! Benchmarks for query operations
//!
//! Run with: cargo bench

use std::fmt::Write;

use content_query_sdk::{EvalValue, MemoryRepository, QuerySession};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

/// Content tree with `sections` sections of `per_section` articles each
fn sample_tree(sections: usize, per_section: usize) -> String {
    let mut yaml = String::from("documents:\n  - id: 1\n    name: Home\n    type: homePage\n    children:\n");
    let mut id = 2;
    for s in 0..sections {
        let _ = writeln!(yaml, "      - id: {}\n        name: Section {}\n        type: section\n        children:", id, s);
        id += 1;
        for a in 0..per_section {
            let _ = writeln!(
                yaml,
                "          - {{ id: {}, name: Article {}, type: article, properties: {{ priority: \"{}\", category: c{} }} }}",
                id,
                a,
                (a * 7) % 11,
                a % 4
            );
            id += 1;
        }
    }
    yaml
}

fn session(sections: usize, per_section: usize) -> QuerySession {
    let repo = MemoryRepository::from_yaml_str(&sample_tree(sections, per_section))
        .expect("generated tree is valid");
    QuerySession::from_memory(repo).build()
}

fn bench_compile(c: &mut Criterion) {
    let session = session(1, 1);
    let mut group = c.benchmark_group("compile");
    for text in [
        "Visible",
        "Level > 2 && category == @0",
        "iif(priority > 5, Name.ToUpper(), Parent.Name) == \"X\"",
    ] {
        group.bench_with_input(BenchmarkId::new("predicate", text.len()), text, |b, text| {
            b.iter(|| session.compile_predicate(black_box(text), &[EvalValue::from("c1")]))
        });
    }
    group.finish();
}

fn bench_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("traversal");
    for sections in [5, 20] {
        let session = session(sections, 50);
        let home = session.node_by_id(1);
        group.throughput(Throughput::Elements((sections * 51) as u64));
        group.bench_with_input(BenchmarkId::new("descendants", sections), &home, |b, home| {
            b.iter(|| black_box(home.descendants().len()))
        });
    }
    group.finish();
}

fn bench_collection_ops(c: &mut Criterion) {
    let session = session(10, 100);
    let articles = session.node_by_id(1).descendants_of_type("article");
    let mut group = c.benchmark_group("collection");
    group.throughput(Throughput::Elements(articles.len() as u64));

    group.bench_function("filter", |b| {
        b.iter(|| articles.filter("category == @0 && priority > 3", &[EvalValue::from("c1")]))
    });
    group.bench_function("order_by", |b| {
        b.iter(|| {
            articles
                .order_by("priority desc, Name", &[])
                .and_then(|ordered| ordered.into_collection())
        })
    });
    group.bench_function("group_by", |b| b.iter(|| articles.group_by("category", &[])));
    group.bench_function("sum", |b| b.iter(|| articles.sum("priority", &[])));
    group.finish();
}

criterion_group!(benches, bench_compile, bench_traversal, bench_collection_ops);
criterion_main!(benches);

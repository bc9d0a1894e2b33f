//! Parser performance benchmarks.
//!
//! Run with: cargo bench -p glint-parser

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use glint_parser::parse_source;

/// Generate a synthetic script with N function bindings.
fn generate_script(num_functions: usize) -> String {
    let mut lines = vec![
        "open System".to_string(),
        "open System.Text".to_string(),
        String::new(),
    ];

    let ops = ["+", "-", "*"];
    for i in 0..num_functions {
        let op = ops[i % ops.len()];
        lines.push(format!("let compute{i} (a: int) b ="));
        lines.push(format!("    let scaled = a {op} {i}"));
        lines.push("    if scaled > b then".to_string());
        lines.push(format!("        [scaled; b; {i}] |> List.sum"));
        lines.push("    else".to_string());
        lines.push(format!(
            "        String.Concat(\"value \", b.ToString()).Length + {i}"
        ));
        lines.push(String::new());
    }
    lines.push("printfn \"%d\" (compute0 1 2)".to_string());

    lines.join("\n")
}

fn bench_parse_small(c: &mut Criterion) {
    let script = generate_script(10);

    let mut group = c.benchmark_group("parse_small");
    group.throughput(Throughput::Bytes(script.len() as u64));
    group.bench_function("10_functions", |b| {
        b.iter(|| parse_source(black_box(&script)));
    });
    group.finish();
}

fn bench_parse_with_errors(c: &mut Criterion) {
    // Every function loses its closing parenthesis and trails a member dot.
    let script = generate_script(100)
        .replace(".ToString())", ".ToString(")
        .replace("List.sum", "List.");

    let mut group = c.benchmark_group("parse_recovery");
    group.throughput(Throughput::Bytes(script.len() as u64));
    group.bench_function("100_broken_functions", |b| {
        b.iter(|| parse_source(black_box(&script)));
    });
    group.finish();
}

fn bench_parse_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_scaling");

    for size in [10, 50, 100, 500, 1000] {
        let script = generate_script(size);
        group.throughput(Throughput::Bytes(script.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &script, |b, script| {
            b.iter(|| parse_source(black_box(script)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_small,
    bench_parse_with_errors,
    bench_parse_scaling
);
criterion_main!(benches);

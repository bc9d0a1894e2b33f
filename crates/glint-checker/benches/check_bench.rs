//! Checker performance benchmarks.
//!
//! Run with: cargo bench -p glint-checker

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::path::Path;
use std::sync::Arc;

use glint_checker::check;
use glint_parser::{parse, UntypedTree};
use glint_project::{resolve, CompilationContext};

/// Generate a script with N functions exercising overloads, pipes and
/// member access.
fn generate_script(num_functions: usize) -> String {
    let mut lines = vec!["#r \"System.Text\"".to_string(), "open System.Text".to_string()];
    for i in 0..num_functions {
        lines.push(format!("let compute{i} (a: int) b ="));
        lines.push(format!("    let scaled = a * {i} + b"));
        lines.push("    let sb = StringBuilder()".to_string());
        lines.push("    sb.Append(scaled).Append(\" items\") |> ignore".to_string());
        lines.push(format!(
            "    [scaled; b; {i}] |> List.map (fun x -> x + 1) |> List.sum"
        ));
        lines.push(String::new());
    }
    lines.push("printfn \"%d\" (compute0 1 2)".to_string());
    lines.join("\n")
}

fn prepare(source: &str) -> (Arc<UntypedTree>, Arc<CompilationContext>) {
    let path = Path::new("bench.glx");
    let context = resolve(path, source);
    let tree = parse(path, source, &context.parse_options());
    (Arc::new(tree), Arc::new(context))
}

fn bench_check_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_scaling");

    for size in [10, 100, 500] {
        let script = generate_script(size);
        let (tree, context) = prepare(&script);
        group.throughput(Throughput::Bytes(script.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| check(black_box(Arc::clone(&tree)), Arc::clone(&context)));
        });
    }

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let script = generate_script(100);
    let (tree, context) = prepare(&script);
    let result = check(tree, context);
    let offset = script.find("sb.Append").unwrap_or(0) + 3;

    c.bench_function("symbol_at", |b| {
        b.iter(|| result.symbol_at(black_box(offset)));
    });
    c.bench_function("visible_at", |b| {
        b.iter(|| result.visible_at(black_box(offset)));
    });
}

criterion_group!(benches, bench_check_scaling, bench_queries);
criterion_main!(benches);

//! Benchmarks for tokenizing and parsing proto sources.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use prototree::parser::{self, lexer};

// ============================================================================
// Source Generation
// ============================================================================

/// A proto source with `n` messages, one enum, and an rpc per message.
fn generate_source(n: usize) -> String {
    let mut src = String::from("syntax = \"proto3\";\npackage bench.pkg;\n\n");
    src.push_str("enum Level {\n  LOW = 0;\n  MID = 1;\n  HIGH = 2;\n}\n\n");
    for i in 0..n {
        src.push_str(&format!("// Message number {}.\n", i));
        src.push_str(&format!("message Msg{} {{\n", i));
        src.push_str("  string name = 1;\n");
        src.push_str("  repeated int64 values = 2;\n");
        src.push_str("  map<string, uint32> counts = 3;\n");
        src.push_str("  Level level = 4;\n");
        src.push_str("  bool enabled = 5;\n");
        if i > 0 {
            src.push_str(&format!("  Msg{} previous = 6;\n", i - 1));
        }
        src.push_str("}\n\n");
    }
    src.push_str("service Bench {\n");
    for i in 0..n {
        src.push_str(&format!("  rpc Call{} (Msg{}) returns (stream Msg{}) {{}}\n", i, i, i));
    }
    src.push_str("}\n");
    src
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    for n in [10usize, 100] {
        let src = generate_source(n);
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &src, |b, src| {
            b.iter(|| lexer::tokenize(black_box(src)).unwrap().len())
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for n in [10usize, 100] {
        let src = generate_source(n);
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &src, |b, src| {
            b.iter(|| parser::parse_from_str(black_box(src)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_parse);
criterion_main!(benches);

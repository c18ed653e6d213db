//! SwLens introspection engine benchmarks
//!
//! Run with: cargo bench -p swlens-bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use swlens_bench::{generate_caches, generate_manifest, generate_worker};
use swlens_inspect::build_inventory;
use swlens_script::ScriptParser;
use url::Url;

fn script_analysis_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("script_analysis");
    let base = Url::parse("https://example.com/sw.js").unwrap();

    // Small worker
    let small = "self.addEventListener('install', () => {});\nself.onfetch = (e) => {};";
    group.throughput(Throughput::Bytes(small.len() as u64));
    group.bench_with_input(BenchmarkId::new("analyze", "small"), small, |b, source| {
        let mut parser = ScriptParser::new().unwrap();
        b.iter(|| parser.analyze(source, &base))
    });

    // Medium worker (100 registrations)
    let medium = generate_worker(100);
    group.throughput(Throughput::Bytes(medium.len() as u64));
    group.bench_with_input(BenchmarkId::new("analyze", "medium"), &medium, |b, source| {
        let mut parser = ScriptParser::new().unwrap();
        b.iter(|| parser.analyze(source, &base))
    });

    // Large worker (1000 registrations)
    let large = generate_worker(1000);
    group.throughput(Throughput::Bytes(large.len() as u64));
    group.bench_with_input(BenchmarkId::new("analyze", "large"), &large, |b, source| {
        let mut parser = ScriptParser::new().unwrap();
        b.iter(|| parser.analyze(source, &base))
    });

    // Combined root-plus-imports event pass
    let combined = format!("{}\n{}", generate_worker(100), generate_worker(100));
    group.throughput(Throughput::Bytes(combined.len() as u64));
    group.bench_with_input(
        BenchmarkId::new("extract_events", "combined"),
        &combined,
        |b, source| {
            let mut parser = ScriptParser::new().unwrap();
            b.iter(|| parser.extract_events(source))
        },
    );

    group.finish();
}

fn manifest_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("manifest_normalize");
    let base = Url::parse("https://example.com/manifest.json").unwrap();

    // Typical manifest (4 icons)
    let small = generate_manifest(4);
    group.throughput(Throughput::Bytes(small.len() as u64));
    group.bench_with_input(BenchmarkId::new("normalize", "small"), &small, |b, body| {
        b.iter(|| swlens_manifest::normalize(&base, body))
    });

    // Icon-heavy manifest (100 icons)
    let large = generate_manifest(100);
    group.throughput(Throughput::Bytes(large.len() as u64));
    group.bench_with_input(BenchmarkId::new("normalize", "large"), &large, |b, body| {
        b.iter(|| swlens_manifest::normalize(&base, body))
    });

    group.finish();
}

fn cache_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_inventory");

    for entries in [50, 500] {
        let caches = generate_caches(entries);
        group.bench_with_input(
            BenchmarkId::new("build", entries),
            &caches,
            |b, caches| b.iter(|| build_inventory(caches.clone())),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    script_analysis_benchmarks,
    manifest_benchmarks,
    cache_benchmarks,
);

criterion_main!(benches);

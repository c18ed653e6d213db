//! # SwLens Bench
//!
//! Performance benchmarking library for the SwLens introspection engine.
//!
//! ## Features
//!
//! - Script analysis benchmarks (event and import extraction)
//! - Combined-source event extraction benchmarks
//! - Manifest normalization benchmarks
//! - Cache inventory benchmarks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use swlens_bench::Benchmark;
//!
//! let bench = Benchmark::new();
//! let suite = bench.run_all()?;
//! suite.print_summary();
//! ```

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;
use url::Url;

use swlens_inspect::{build_inventory, CachedRequest, CachedResponse, NamedCache, StoredPair};
use swlens_script::ScriptParser;

/// Benchmark errors.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Benchmark failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single benchmark result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Name of the benchmark.
    pub name: String,
    /// Number of iterations.
    pub iterations: u64,
    /// Total time in nanoseconds.
    pub total_ns: u64,
    /// Mean time per iteration in nanoseconds.
    pub mean_ns: u64,
    /// Standard deviation in nanoseconds.
    pub std_dev_ns: u64,
    /// Minimum time in nanoseconds.
    pub min_ns: u64,
    /// Maximum time in nanoseconds.
    pub max_ns: u64,
    /// Throughput in operations per second.
    pub ops_per_sec: f64,
}

impl BenchmarkResult {
    /// Create a new result from sample times.
    pub fn from_samples(name: impl Into<String>, samples: &[Duration]) -> Self {
        let name = name.into();
        let iterations = samples.len() as u64;

        let times_ns: Vec<u64> = samples.iter().map(|d| d.as_nanos() as u64).collect();
        let total_ns: u64 = times_ns.iter().sum();
        let mean_ns = total_ns / iterations.max(1);
        let min_ns = *times_ns.iter().min().unwrap_or(&0);
        let max_ns = *times_ns.iter().max().unwrap_or(&0);

        let variance: f64 = times_ns
            .iter()
            .map(|&t| {
                let diff = t as f64 - mean_ns as f64;
                diff * diff
            })
            .sum::<f64>()
            / iterations.max(1) as f64;
        let std_dev_ns = variance.sqrt() as u64;

        let ops_per_sec = if mean_ns > 0 {
            1_000_000_000.0 / mean_ns as f64
        } else {
            0.0
        };

        Self {
            name,
            iterations,
            total_ns,
            mean_ns,
            std_dev_ns,
            min_ns,
            max_ns,
            ops_per_sec,
        }
    }

    /// Format the mean time as a human-readable string.
    pub fn format_mean(&self) -> String {
        format_duration(self.mean_ns)
    }

    /// Print a summary line.
    pub fn print_line(&self) {
        println!(
            "{:40} {:>12} {:>12} {:>12}/s",
            self.name,
            self.format_mean(),
            format!("±{}", format_duration(self.std_dev_ns)),
            format_ops(self.ops_per_sec),
        );
    }
}

/// Format nanoseconds as human-readable duration.
fn format_duration(ns: u64) -> String {
    if ns >= 1_000_000_000 {
        format!("{:.2} s", ns as f64 / 1_000_000_000.0)
    } else if ns >= 1_000_000 {
        format!("{:.2} ms", ns as f64 / 1_000_000.0)
    } else if ns >= 1_000 {
        format!("{:.2} µs", ns as f64 / 1_000.0)
    } else {
        format!("{} ns", ns)
    }
}

/// Format operations per second.
fn format_ops(ops: f64) -> String {
    if ops >= 1_000_000.0 {
        format!("{:.2}M", ops / 1_000_000.0)
    } else if ops >= 1_000.0 {
        format!("{:.2}K", ops / 1_000.0)
    } else {
        format!("{:.2}", ops)
    }
}

/// Collection of benchmark results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSuite {
    /// Suite name.
    pub name: String,
    /// Individual results.
    pub results: Vec<BenchmarkResult>,
    /// Total time.
    pub total_time: Duration,
}

impl BenchmarkSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            results: Vec::new(),
            total_time: Duration::ZERO,
        }
    }

    pub fn add(&mut self, result: BenchmarkResult) {
        self.results.push(result);
    }

    /// Print summary of all results.
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(80));
        println!("Benchmark Suite: {}", self.name);
        println!("{}", "=".repeat(80));
        println!(
            "{:40} {:>12} {:>12} {:>12}",
            "Name", "Mean", "StdDev", "Throughput"
        );
        println!("{}", "-".repeat(80));

        for result in &self.results {
            result.print_line();
        }

        println!("{}", "-".repeat(80));
        println!("Total time: {:?}", self.total_time);
        println!();
    }

    /// Save results to JSON file.
    pub fn save_json(&self, path: &str) -> Result<(), BenchError> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| BenchError::Failed(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Benchmark runner.
pub struct Benchmark {
    /// Number of warmup iterations.
    pub warmup: u64,
    /// Number of measured iterations.
    pub iterations: u64,
}

impl Benchmark {
    pub fn new() -> Self {
        Self {
            warmup: 10,
            iterations: 100,
        }
    }

    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_warmup(mut self, warmup: u64) -> Self {
        self.warmup = warmup;
        self
    }

    /// Run a benchmark function.
    pub fn run<F>(&self, name: &str, mut f: F) -> BenchmarkResult
    where
        F: FnMut(),
    {
        debug!(
            name,
            warmup = self.warmup,
            iterations = self.iterations,
            "Running benchmark"
        );

        for _ in 0..self.warmup {
            f();
        }

        let mut samples = Vec::with_capacity(self.iterations as usize);
        for _ in 0..self.iterations {
            let start = Instant::now();
            f();
            samples.push(start.elapsed());
        }

        BenchmarkResult::from_samples(name, &samples)
    }

    /// Run all standard benchmarks.
    pub fn run_all(&self) -> Result<BenchmarkSuite, BenchError> {
        let start = Instant::now();
        let mut suite = BenchmarkSuite::new("SwLens Engine");

        suite.add(self.bench_analyze_small()?);
        suite.add(self.bench_analyze_medium()?);
        suite.add(self.bench_analyze_large()?);
        suite.add(self.bench_extract_events_combined()?);

        suite.add(self.bench_manifest_small()?);
        suite.add(self.bench_manifest_large()?);

        suite.add(self.bench_cache_inventory());

        suite.total_time = start.elapsed();
        Ok(suite)
    }

    fn bench_analyze_small(&self) -> Result<BenchmarkResult, BenchError> {
        let source = "self.addEventListener('install', () => {});";
        let base = worker_url()?;
        let mut parser = script_parser()?;
        Ok(self.run("script/analyze/small", || {
            let _ = parser.analyze(source, &base);
        }))
    }

    fn bench_analyze_medium(&self) -> Result<BenchmarkResult, BenchError> {
        let source = generate_worker(100);
        let base = worker_url()?;
        let mut parser = script_parser()?;
        Ok(
            self.run(&format!("script/analyze/medium ({} bytes)", source.len()), || {
                let _ = parser.analyze(&source, &base);
            }),
        )
    }

    fn bench_analyze_large(&self) -> Result<BenchmarkResult, BenchError> {
        let source = generate_worker(1000);
        let base = worker_url()?;
        let mut parser = script_parser()?;
        Ok(
            self.run(&format!("script/analyze/large ({} bytes)", source.len()), || {
                let _ = parser.analyze(&source, &base);
            }),
        )
    }

    fn bench_extract_events_combined(&self) -> Result<BenchmarkResult, BenchError> {
        // Root plus a handful of flattened imports, the merged-pass shape.
        let combined = format!(
            "{}\n{}\n{}",
            generate_worker(50),
            generate_worker(50),
            generate_worker(50)
        );
        let mut parser = script_parser()?;
        Ok(self.run(
            &format!("script/events/combined ({} bytes)", combined.len()),
            || {
                let _ = parser.extract_events(&combined);
            },
        ))
    }

    fn bench_manifest_small(&self) -> Result<BenchmarkResult, BenchError> {
        let body = generate_manifest(4);
        let base = manifest_url()?;
        Ok(self.run("manifest/normalize/small", || {
            let _ = swlens_manifest::normalize(&base, &body);
        }))
    }

    fn bench_manifest_large(&self) -> Result<BenchmarkResult, BenchError> {
        let body = generate_manifest(100);
        let base = manifest_url()?;
        Ok(self.run(
            &format!("manifest/normalize/large ({} bytes)", body.len()),
            || {
                let _ = swlens_manifest::normalize(&base, &body);
            },
        ))
    }

    fn bench_cache_inventory(&self) -> BenchmarkResult {
        let caches = generate_caches(500);
        self.run("cache/inventory (500 entries)", || {
            let _ = build_inventory(caches.clone());
        })
    }
}

impl Default for Benchmark {
    fn default() -> Self {
        Self::new()
    }
}

fn script_parser() -> Result<ScriptParser, BenchError> {
    ScriptParser::new().map_err(|e| BenchError::Failed(e.to_string()))
}

fn worker_url() -> Result<Url, BenchError> {
    Url::parse("https://example.com/sw.js").map_err(|e| BenchError::Failed(e.to_string()))
}

fn manifest_url() -> Result<Url, BenchError> {
    Url::parse("https://example.com/manifest.json").map_err(|e| BenchError::Failed(e.to_string()))
}

/// Generate a worker script with n listener registrations and two imports.
pub fn generate_worker(n: usize) -> String {
    let mut source = String::from("importScripts('util.js', 'push.js');\n");
    for i in 0..n {
        source.push_str(&format!(
            "self.addEventListener('custom-{}', (event) => {{ handle(event); }});\n",
            i
        ));
    }
    source.push_str("self.onfetch = (event) => {};\n");
    source
}

/// Generate a manifest body with n icons.
pub fn generate_manifest(n: usize) -> String {
    let mut icons = Vec::with_capacity(n);
    for i in 0..n {
        let size = 16 * (i + 1);
        icons.push(format!(
            "{{\"src\": \"icons/icon-{}.png\", \"sizes\": \"{}x{}\", \"type\": \"image/png\"}}",
            i, size, size
        ));
    }
    format!(
        "{{\"name\": \"Bench App\", \"start_url\": \"/\", \"theme_color\": \"#222222\", \"icons\": [{}]}}",
        icons.join(", ")
    )
}

/// Generate one cache with n entries cycling through common content types.
pub fn generate_caches(n: usize) -> Vec<NamedCache> {
    const TYPES: &[&str] = &[
        "text/css",
        "application/javascript",
        "image/png",
        "text/html",
        "application/json",
    ];
    let entries = (0..n)
        .map(|i| StoredPair {
            request: CachedRequest {
                method: "GET".to_string(),
                url: format!("/asset-{}", i),
            },
            response: CachedResponse {
                response_type: "basic".to_string(),
                content_type: Some(format!("{}; charset=utf-8", TYPES[i % TYPES.len()])),
            },
        })
        .collect();
    vec![NamedCache {
        name: "bench-cache".to_string(),
        entries,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benchmark_result() {
        let samples = vec![
            Duration::from_micros(100),
            Duration::from_micros(120),
            Duration::from_micros(90),
        ];
        let result = BenchmarkResult::from_samples("test", &samples);
        assert_eq!(result.iterations, 3);
        assert!(result.mean_ns > 0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(500), "500 ns");
        assert_eq!(format_duration(1_500), "1.50 µs");
        assert_eq!(format_duration(1_500_000), "1.50 ms");
        assert_eq!(format_duration(1_500_000_000), "1.50 s");
    }

    #[test]
    fn test_generate_worker() {
        let source = generate_worker(5);
        assert!(source.contains("custom-0"));
        assert!(source.contains("custom-4"));
        assert!(source.starts_with("importScripts"));
    }

    #[test]
    fn test_generate_manifest_parses() {
        let body = generate_manifest(3);
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["icons"].as_array().unwrap().len(), 3);
    }
}

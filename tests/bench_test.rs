//! Benchmark tests for critical operations
//!
//! Run with: cargo test --release -- --ignored --nocapture bench

use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;

use chrono::Utc;
use qr_studio::analytics::summarize;
use qr_studio::auth::Owner;
use qr_studio::database::{init_db, QrStore};
use qr_studio::registry::ShortLinkRegistry;
use qr_studio::render::{QrRenderer, RenderStyle, Renderer};

/// Benchmark helper to measure execution time
fn benchmark<F>(name: &str, iterations: usize, mut f: F)
where
    F: FnMut(),
{
    let start = Instant::now();

    for _ in 0..iterations {
        f();
    }

    let duration = start.elapsed();
    let avg_ms = duration.as_millis() as f64 / iterations as f64;
    let ops_per_sec = (iterations as f64 / duration.as_secs_f64()) as u64;

    println!("  {} ({} iterations)", name, iterations);
    println!("    Total time: {:?}", duration);
    println!("    Avg time: {:.3}ms", avg_ms);
    println!("    Throughput: {} ops/sec\n", ops_per_sec);
}

fn bench_registry() -> (ShortLinkRegistry, NamedTempFile) {
    let temp_db = NamedTempFile::new().unwrap();
    let db = init_db(temp_db.path().to_str().unwrap()).unwrap();
    let registry = ShortLinkRegistry::new(
        QrStore::new(Arc::new(db)),
        Arc::new(QrRenderer),
        "http://localhost:3000",
    );
    (registry, temp_db)
}

#[test]
#[ignore] // Run explicitly with: cargo test bench --release -- --ignored --nocapture
fn bench_render() {
    println!("\n=== Benchmark: Render ===\n");

    let style = RenderStyle {
        size: 400,
        ..Default::default()
    };
    let mut png = Vec::new();

    benchmark("Render PNG", 200, || {
        png = QrRenderer.render_image("https://example.com/bench", &style).unwrap();
    });

    benchmark("Wrap PDF", 200, || {
        QrRenderer.wrap_in_document(&png).unwrap();
    });
}

#[test]
#[ignore]
fn bench_register_and_scan() {
    println!("\n=== Benchmark: Register & Scan ===\n");

    let (registry, _temp_db) = bench_registry();
    let owner = Owner("bench_user".to_string());

    let mut short_id = String::new();
    benchmark("Register owned QR", 500, || {
        let registration = registry
            .register("https://example.com/bench", Some(&owner), "Bench")
            .unwrap();
        short_id = registration.record.unwrap().short_id;
    });

    benchmark("Resolve (scan)", 2000, || {
        registry.resolve(&short_id).unwrap();
    });

    let records = registry.list(&owner).unwrap();
    let start = Instant::now();
    let stats = summarize(records, Utc::now());
    println!(
        "  Summarize {} records / {} scans: {:?}\n",
        stats.total_qrs,
        stats.total_scans,
        start.elapsed()
    );
}

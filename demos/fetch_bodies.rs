//! Memoized Page Fetching
//!
//! Simulates fetching a list of URLs, each requested twice, through both
//! memoizing caches: first one request at a time, then all at once. Repeated
//! URLs are served from the cache and concurrent requests for the same URL
//! share one fetch.
//!
//! Run with: RUST_LOG=memo_rs=debug cargo run --example fetch_bodies

use memo_rs::metrics::CacheMetrics;
use memo_rs::{Memo, MemoServer, Memoize};
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const INCOMING_URLS: [&str; 8] = [
    "https://go.dev",
    "https://pkg.go.dev",
    "https://go.dev/play",
    "http://gopl.io",
    "https://go.dev",
    "https://pkg.go.dev",
    "https://go.dev/play",
    "http://gopl.io",
];

/// Stand-in for an HTTP GET: latency proportional to the URL, then a body.
fn http_get_body(url: &String) -> Result<Vec<u8>, String> {
    if url.ends_with(".invalid") {
        return Err(format!("lookup {}: no such host", url));
    }
    thread::sleep(Duration::from_millis(40 + 10 * url.len() as u64));
    Ok(format!("<html><body>{}</body></html>", url).into_bytes())
}

fn sequential<M: Memoize<String, Vec<u8>, String>>(memo: &M) {
    for url in INCOMING_URLS {
        let start = Instant::now();
        match memo.get(&url.to_string()) {
            Ok(body) => println!("{}, {:?}, {} bytes", url, start.elapsed(), body.len()),
            Err(err) => println!("{}, {:?}, error: {}", url, start.elapsed(), err),
        }
    }
}

fn concurrent<M: Memoize<String, Vec<u8>, String> + Sync>(memo: &M) {
    thread::scope(|s| {
        for url in INCOMING_URLS {
            s.spawn(move || {
                let start = Instant::now();
                match memo.get(&url.to_string()) {
                    Ok(body) => println!("{}, {:?}, {} bytes", url, start.elapsed(), body.len()),
                    Err(err) => println!("{}, {:?}, error: {}", url, start.elapsed(), err),
                }
            });
        }
    });
}

fn print_metrics(cache: &dyn CacheMetrics) {
    println!("{} metrics:", cache.algorithm_name());
    for (name, value) in cache.metrics() {
        println!("  {:<20} {:.2}", name, value);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Memo, sequential ===");
    let memo = Memo::new(http_get_body);
    sequential(&memo);
    print_metrics(&memo);

    println!("\n=== Memo, concurrent ===");
    let memo = Memo::new(http_get_body);
    concurrent(&memo);
    print_metrics(&memo);

    println!("\n=== MemoServer, concurrent ===");
    let server = match MemoServer::new(http_get_body) {
        Ok(server) => server,
        Err(err) => {
            eprintln!("failed to start memo server: {}", err);
            return;
        }
    };
    concurrent(&server);
    print_metrics(&server);

    server.close();
    let late = server.get("https://go.dev");
    println!("after close: {:?}", late.map(|body| body.len()));
}

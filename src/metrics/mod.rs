//! Memo Metrics System
//!
//! Provides request accounting for memoizing caches using BTreeMap-based
//! metrics reporting. Both cache designs embed a [`CoreMemoMetrics`] and
//! implement the common [`CacheMetrics`] trait.
//!
//! # Why atomics?
//!
//! Memoizing caches are read concurrently from many threads and record a
//! request on every `get()`. The counters are plain `AtomicU64`s updated with
//! `Relaxed` ordering so recording never takes a lock and never extends the
//! admission step. A snapshot taken while requests are in flight may
//! therefore be slightly inconsistent across counters.
//!
//! # Why BTreeMap over HashMap?
//!
//! BTreeMap gives deterministic ordering of metric names, which keeps
//! reports and test assertions reproducible.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by every memoizing cache
#[derive(Debug, Default)]
pub struct CoreMemoMetrics {
    /// Total number of admitted requests (gets)
    requests: AtomicU64,

    /// Requests that found an existing entry, pending or completed
    cache_hits: AtomicU64,

    /// Computations launched. Equals the number of misses, since each miss
    /// launches exactly one computation.
    computations: AtomicU64,

    /// Computations that completed with an error or a panic
    failed_computations: AtomicU64,
}

impl CoreMemoMetrics {
    /// Creates a zeroed set of counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request that found an existing entry
    pub fn record_hit(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a request that created an entry and launched its computation
    pub fn record_miss(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.computations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a computation that finished with an error or a panic
    pub fn record_failure(&self) {
        self.failed_computations.fetch_add(1, Ordering::Relaxed);
    }

    /// Total admitted requests
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Requests served by an existing entry
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Computations launched
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }

    /// Computations that failed
    pub fn failed_computations(&self) -> u64 {
        self.failed_computations.load(Ordering::Relaxed)
    }

    /// Calculates the hit rate
    ///
    /// # Returns
    /// A value between 0.0 and 1.0, or 0.0 if no requests have been made
    pub fn hit_rate(&self) -> f64 {
        let requests = self.requests();
        if requests > 0 {
            self.cache_hits() as f64 / requests as f64
        } else {
            0.0
        }
    }

    /// Calculates the miss rate
    ///
    /// # Returns
    /// A value between 0.0 and 1.0, or 0.0 if no requests have been made
    pub fn miss_rate(&self) -> f64 {
        let requests = self.requests();
        if requests > 0 {
            requests.saturating_sub(self.cache_hits()) as f64 / requests as f64
        } else {
            0.0
        }
    }

    /// Convert the counters to a BTreeMap for reporting
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let requests = self.requests();
        let cache_hits = self.cache_hits();

        let mut metrics = BTreeMap::new();
        metrics.insert("cache_hits".to_string(), cache_hits as f64);
        metrics.insert(
            "cache_misses".to_string(),
            requests.saturating_sub(cache_hits) as f64,
        );
        metrics.insert("computations".to_string(), self.computations() as f64);
        metrics.insert(
            "failed_computations".to_string(),
            self.failed_computations() as f64,
        );
        metrics.insert("requests".to_string(), requests as f64);
        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("miss_rate".to_string(), self.miss_rate());
        metrics
    }
}

/// Trait that all memoizing caches implement for metrics reporting
///
/// Uses BTreeMap to ensure deterministic ordering of metrics.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Name of the serialization strategy (e.g., "Memo", "MemoServer")
    fn algorithm_name(&self) -> &'static str;
}

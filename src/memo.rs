//! Lock-Striped Memoizing Cache
//!
//! A thread-safe memoizing cache that guards only the lookup-or-create step.
//! The computation for a key runs on the thread of the first caller to ask
//! for it, after every guard has been released; later callers for the same
//! key find the pending [`Entry`] and wait on it.
//!
//! # How It Works
//!
//! The entries map is partitioned across independent segments, each with its
//! own lock. A request locks exactly one segment for the duration of a single
//! hash lookup (plus one insert on a miss), then unlocks it before computing
//! or waiting.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                              Memo                                    │
//! │                                                                      │
//! │  hash(key) % N  ──▶  Segment Selection                               │
//! │                                                                      │
//! │  ┌──────────────┐ ┌──────────────┐     ┌──────────────┐              │
//! │  │  Segment 0   │ │  Segment 1   │ ... │  Segment N-1 │              │
//! │  │   [Mutex]    │ │   [Mutex]    │     │   [Mutex]    │              │
//! │  │ key ─▶ Entry │ │ key ─▶ Entry │     │ key ─▶ Entry │              │
//! │  └──────────────┘ └──────────────┘     └──────────────┘              │
//! └──────────────────────────────────────────────────────────────────────┘
//!
//!  get(key):  lock segment ─▶ hit?  ── yes ─▶ clone Arc<Entry> ─▶ unlock ─▶ wait()
//!                                    └─ no ──▶ insert pending Entry ─▶ unlock
//!                                              ─▶ compute ─▶ complete() ─▶ wait()
//! ```
//!
//! The miss check and the insertion of the pending entry happen under the same
//! guard. Releasing the guard in between would let two callers both observe a
//! miss and both run the computation.
//!
//! # Failure Handling
//!
//! - Errors returned by the computation are stored and replayed to every
//!   caller of that key as [`MemoError::Computation`]. They are never retried.
//! - A panicking computation completes its entry with [`MemoError::Panicked`]
//!   so that waiters are released, then the panic continues on the computing
//!   caller's thread.
//!
//! # Example
//!
//! ```rust
//! use memo_rs::Memo;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let memo = Arc::new(Memo::new(|url: &String| -> Result<usize, String> {
//!     Ok(url.len())
//! }));
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let memo = Arc::clone(&memo);
//!         thread::spawn(move || memo.get("https://golang.org"))
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     assert_eq!(handle.join().unwrap(), Ok(18));
//! }
//! assert_eq!(memo.len(), 1);
//! ```

use crate::config::MemoConfig;
use crate::entry::{Entry, Outcome};
use crate::error::MemoError;
use crate::metrics::{CacheMetrics, CoreMemoMetrics};
use crate::Memoize;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace};

#[cfg(feature = "hashbrown")]
use hashbrown::{DefaultHashBuilder, HashMap};

#[cfg(not(feature = "hashbrown"))]
use std::collections::{hash_map::RandomState as DefaultHashBuilder, HashMap};

type Segment<K, V, E, S> = HashMap<K, Arc<Entry<K, V, E>>, S>;

/// A thread-safe memoizing cache with a lock-striped entries map.
///
/// # Type Parameters
///
/// - `K`: Key type. Must implement `Hash + Eq + Clone`.
/// - `V`: Value type. Must implement `Clone` to be handed out by [`get`](Self::get).
/// - `E`: Error type of the computation. Must implement `Clone` for the same reason.
/// - `F`: The computation function, `Fn(&K) -> Result<V, E>`.
/// - `S`: Hash builder type. Defaults to `DefaultHashBuilder`.
///
/// Sharing across threads (`Arc<Memo<..>>` or scoped borrows) requires the
/// usual `Send + Sync` bounds on `K`, `V`, `E`, `F` and `S`.
pub struct Memo<K, V, E, F, S = DefaultHashBuilder> {
    segments: Box<[Mutex<Segment<K, V, E, S>>]>,
    hash_builder: S,
    func: F,
    metrics: CoreMemoMetrics,
}

impl<K, V, E, F> Memo<K, V, E, F, DefaultHashBuilder>
where
    K: Hash + Eq + Clone,
    F: Fn(&K) -> Result<V, E>,
{
    /// Creates a memoizing cache for `func` with the default configuration.
    pub fn new(func: F) -> Self {
        Self::init(MemoConfig::default(), func, None)
    }

    /// Creates a memoizing cache from a configuration with an optional hasher.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration specifying the number of segments
    /// * `func` - The computation to memoize
    /// * `hasher` - Optional custom hash builder. If `None`, uses `DefaultHashBuilder`
    pub fn init(config: MemoConfig, func: F, hasher: Option<DefaultHashBuilder>) -> Self {
        Self::init_with_hasher(config, func, hasher.unwrap_or_default())
    }
}

impl<K, V, E, F, S> Memo<K, V, E, F, S>
where
    K: Hash + Eq + Clone,
    F: Fn(&K) -> Result<V, E>,
    S: BuildHasher + Clone,
{
    /// Creates a memoizing cache with a custom hash builder.
    ///
    /// The hash builder is cloned into every segment and also used to pick
    /// the segment for a key.
    pub fn init_with_hasher(config: MemoConfig, func: F, hash_builder: S) -> Self {
        let segment_count = config.segments.max(1);
        let segments: Vec<_> = (0..segment_count)
            .map(|_| Mutex::new(HashMap::with_hasher(hash_builder.clone())))
            .collect();

        Self {
            segments: segments.into_boxed_slice(),
            hash_builder,
            func,
            metrics: CoreMemoMetrics::new(),
        }
    }

    #[inline]
    fn segment_index<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        (self.hash_builder.hash_one(key) as usize) % self.segments.len()
    }

    /// Returns the memoized result for `key`, computing it at most once.
    ///
    /// Blocks until the result for this key is available. If another caller
    /// is already computing it, waits for that computation instead of
    /// starting a new one. Never blocks on computations for other keys.
    ///
    /// # Panics
    ///
    /// Resumes the panic of the computation function if this call is the one
    /// that ran it. Other callers of the same key receive
    /// [`MemoError::Panicked`] instead.
    pub fn get<Q>(&self, key: &Q) -> Outcome<V, E>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + ToOwned<Owned = K>,
        V: Clone,
        E: Clone,
    {
        let (entry, admitted) = self.admit(key);
        if admitted {
            self.compute(&entry);
        }
        entry.wait().clone()
    }

    /// Lookup-or-create under the segment guard.
    ///
    /// Returns the entry and whether this call created it (and therefore owns
    /// its computation).
    fn admit<Q>(&self, key: &Q) -> (Arc<Entry<K, V, E>>, bool)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + ToOwned<Owned = K>,
    {
        let idx = self.segment_index(key);
        let mut segment = self.segments[idx].lock();

        if let Some(entry) = segment.get(key) {
            self.metrics.record_hit();
            trace!(segment = idx, ready = entry.is_ready(), "memo hit");
            return (Arc::clone(entry), false);
        }

        let entry = Arc::new(Entry::new(key.to_owned()));
        segment.insert(key.to_owned(), Arc::clone(&entry));
        self.metrics.record_miss();
        (entry, true)
    }

    fn compute(&self, entry: &Entry<K, V, E>) {
        debug!("memo miss, running computation");
        match panic::catch_unwind(AssertUnwindSafe(|| (self.func)(entry.key()))) {
            Ok(Ok(value)) => entry.complete(Ok(value)),
            Ok(Err(err)) => {
                self.metrics.record_failure();
                debug!("computation failed, caching error");
                entry.complete(Err(MemoError::Computation(err)));
            }
            Err(payload) => {
                self.metrics.record_failure();
                debug!("computation panicked, releasing waiters");
                entry.complete(Err(MemoError::Panicked));
                panic::resume_unwind(payload);
            }
        }
    }

    /// Returns the completed result for `key` without blocking.
    ///
    /// Returns `None` if the key was never requested or its computation is
    /// still running. Never starts a computation and is not counted as a
    /// request.
    pub fn peek<Q>(&self, key: &Q) -> Option<Outcome<V, E>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
        E: Clone,
    {
        let idx = self.segment_index(key);
        let entry = self.segments[idx].lock().get(key).map(Arc::clone)?;
        entry.try_get().cloned()
    }

    /// Returns `true` if `key` has an entry, pending or completed.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let idx = self.segment_index(key);
        self.segments[idx].lock().contains_key(key)
    }

    /// Returns the total number of entries across all segments.
    ///
    /// Note: This acquires a lock on each segment sequentially, so the
    /// returned value may be slightly stale in high-concurrency scenarios.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.lock().len()).sum()
    }

    /// Returns `true` if no key has been requested yet.
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.lock().is_empty())
    }

    /// Returns the number of segments in the cache.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the live request counters.
    pub fn core_metrics(&self) -> &CoreMemoMetrics {
        &self.metrics
    }
}

impl<K, V, E, F, S> Memoize<K, V, E> for Memo<K, V, E, F, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    E: Clone,
    F: Fn(&K) -> Result<V, E>,
    S: BuildHasher + Clone,
{
    fn get(&self, key: &K) -> Outcome<V, E> {
        Memo::get(self, key)
    }
}

impl<K, V, E, F, S> CacheMetrics for Memo<K, V, E, F, S> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.metrics.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "Memo"
    }
}

impl<K, V, E, F, S> fmt::Debug for Memo<K, V, E, F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: usize = self.segments.iter().map(|s| s.lock().len()).sum();
        f.debug_struct("Memo")
            .field("segments", &self.segments.len())
            .field("entries", &entries)
            .field("requests", &self.metrics.requests())
            .finish()
    }
}

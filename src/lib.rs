#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Design Selection Guide
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                  Which Memoizing Cache Should I Use?                         │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │                                                                              │
//! │  ┌──────────────────────┐                                                    │
//! │  │ Need to shut the     │──Yes──▶ ┌──────────────┐                           │
//! │  │ cache down and reject│         │  MemoServer  │  gatekeeper thread,       │
//! │  │ late requests?       │         └──────────────┘  one thread per compute   │
//! │  └──────────┬───────────┘                                                    │
//! │            No                                                                │
//! │             ▼                                                                │
//! │  ┌──────────────────────┐                                                    │
//! │  │ Borrowed closure or  │──Yes──▶ ┌──────────────┐                           │
//! │  │ compute on caller's  │         │     Memo     │  lock-striped map,        │
//! │  │ own thread?          │         └──────────────┘  no extra threads         │
//! │  └──────────────────────┘                                                    │
//! │                                                                              │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Reference
//!
//! | Type | Serialization | Computation runs on | Close |
//! |------|---------------|---------------------|-------|
//! | [`Memo`] | Per-segment `Mutex` around lookup-or-create | First caller's thread | No |
//! | [`MemoServer`] | Single gatekeeper thread over a channel | Spawned thread per key | Yes |
//!
//! Both guarantee that the computation for a key runs at most once, that
//! every caller of a key observes the same outcome, and that distinct keys
//! never wait on each other's computations.
//!
//! ## Code Examples
//!
//! ### Memo
//!
//! ```rust
//! use memo_rs::Memo;
//! use core::sync::atomic::{AtomicUsize, Ordering};
//!
//! let calls = AtomicUsize::new(0);
//! let memo = Memo::new(|key: &String| -> Result<String, String> {
//!     calls.fetch_add(1, Ordering::SeqCst);
//!     Ok(format!("{}-body", key.to_uppercase()))
//! });
//!
//! assert_eq!(memo.get("a"), Ok("A-body".to_string()));
//! assert_eq!(memo.get("a"), Ok("A-body".to_string()));
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! ```
//!
//! ### MemoServer
//!
//! ```rust
//! use memo_rs::{MemoError, MemoServer};
//!
//! let server = MemoServer::new(|n: &u64| -> Result<u64, String> {
//!     if *n == 0 {
//!         Err("zero".to_string())
//!     } else {
//!         Ok(n * n)
//!     }
//! })
//! .unwrap();
//!
//! assert_eq!(server.get(&4), Ok(16));
//! // Errors are cached and replayed, never retried
//! assert_eq!(server.get(&0), Err(MemoError::Computation("zero".to_string())));
//!
//! server.close();
//! assert_eq!(server.get(&5), Err(MemoError::Closed));
//! ```
//!
//! ### Writing code against either design
//!
//! ```rust
//! use memo_rs::{Memo, Memoize};
//!
//! fn total_len<M: Memoize<String, usize, ()>>(memo: &M, urls: &[&str]) -> usize {
//!     urls.iter()
//!         .map(|url| memo.get(&url.to_string()).unwrap_or(0))
//!         .sum()
//! }
//!
//! let memo = Memo::new(|url: &String| Ok::<_, ()>(url.len()));
//! assert_eq!(total_len(&memo, &["a", "bb", "a"]), 4);
//! ```
//!
//! ## Modules
//!
//! - [`entry`]: The pending-or-completed slot for one key
//! - [`memo`]: Lock-striped guarded-map memoizing cache
//! - [`server`]: Gatekeeper-thread memoizing cache with shutdown
//! - [`error`]: Error type shared by both caches
//! - [`config`]: Configuration structures
//! - [`metrics`]: Request counters and metrics reporting

/// Single cache slot holding one key's eventual outcome.
pub mod entry;

/// Error type returned by memoizing caches.
pub mod error;

/// Cache configuration structures.
///
/// Provides configuration structures for both memoizing cache designs.
pub mod config;

/// Memo metrics system.
///
/// Lock-free request counters and BTreeMap-based reporting shared by both
/// cache designs.
pub mod metrics;

/// Lock-striped memoizing cache.
///
/// Guards only the lookup-or-create step with a per-segment mutex and runs
/// each computation on the thread of its first caller.
pub mod memo;

/// Gatekeeper-thread memoizing cache.
///
/// Funnels every lookup-or-create decision through one thread that owns the
/// entries map, and runs each computation on a thread of its own.
pub mod server;

pub use entry::{Entry, Outcome};
pub use error::MemoError;
pub use memo::Memo;
pub use server::MemoServer;

/// The common contract of a memoizing cache.
///
/// Implemented by [`Memo`] and [`MemoServer`], so callers (and test
/// harnesses) can be written once against either design.
pub trait Memoize<K, V, E> {
    /// Returns the memoized result for `key`, computing it at most once.
    ///
    /// Blocks until the result for this key is available. Computation errors
    /// are returned as [`MemoError::Computation`] to every caller of the key
    /// and are never retried.
    fn get(&self, key: &K) -> Outcome<V, E>;
}

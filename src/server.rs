//! Gatekeeper Memoizing Cache
//!
//! A memoizing cache whose entries map is owned by a single gatekeeper
//! thread. Callers never touch the map: they send a request over a channel,
//! the gatekeeper performs the lookup-or-create step and replies with the
//! key's [`Entry`], and the caller waits on that entry on its own thread.
//!
//! # How It Works
//!
//! ```text
//!   caller ──(key, reply)──▶ ┌──────────────────────────────┐
//!   caller ──(key, reply)──▶ │   gatekeeper thread          │
//!   caller ──(key, reply)──▶ │   HashMap<K, Arc<Entry>>     │
//!                            │                              │
//!                            │  hit  ─▶ reply(existing)     │
//!                            │  miss ─▶ insert pending      │──spawn──▶ compute thread
//!                            │          reply(new)          │           f(key)
//!                            └──────────────────────────────┘           complete()
//!
//!   caller ◀── Arc<Entry> ── reply;  caller.wait()  (outside the gatekeeper)
//! ```
//!
//! The gatekeeper handles one request at a time but each request is O(1):
//! it never waits for a computation. Every computation runs on a thread of
//! its own, so distinct keys compute in parallel while all admission
//! decisions stay serialized through one owner of the map. No lock guards
//! the map at all.
//!
//! # Lifecycle
//!
//! [`MemoServer::close`] drops the request channel. The gatekeeper answers
//! any request that was already queued, then exits. Computations that were
//! admitted keep running and deliver to their waiters. New requests fail
//! with [`MemoError::Closed`]. Dropping the server closes it.
//!
//! # Example
//!
//! ```rust
//! use memo_rs::{MemoError, MemoServer};
//!
//! let server = MemoServer::new(|url: &String| -> Result<String, String> {
//!     Ok(format!("<html>{}</html>", url))
//! })
//! .unwrap();
//!
//! assert_eq!(server.get("https://go.dev").unwrap(), "<html>https://go.dev</html>");
//!
//! server.close();
//! assert_eq!(server.get("https://go.dev"), Err(MemoError::Closed));
//! ```

use crate::config::ServerConfig;
use crate::entry::{Entry, Outcome};
use crate::error::MemoError;
use crate::metrics::{CacheMetrics, CoreMemoMetrics};
use crate::Memoize;
use core::borrow::Borrow;
use core::fmt;
use core::hash::Hash;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace};

#[cfg(feature = "hashbrown")]
use hashbrown::{hash_map::Entry as MapEntry, HashMap};

#[cfg(not(feature = "hashbrown"))]
use std::collections::{hash_map::Entry as MapEntry, HashMap};

/// A lookup-or-create request for the gatekeeper.
struct Request<K, V, E> {
    key: K,
    reply: Sender<Arc<Entry<K, V, E>>>,
}

/// State owned by the gatekeeper thread.
struct Gatekeeper<K, V, E, F> {
    requests: Receiver<Request<K, V, E>>,
    func: Arc<F>,
    metrics: Arc<CoreMemoMetrics>,
    config: ServerConfig,
}

impl<K, V, E, F> Gatekeeper<K, V, E, F>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: Fn(&K) -> Result<V, E> + Send + Sync + 'static,
{
    fn run(self) {
        let mut entries: HashMap<K, Arc<Entry<K, V, E>>> = HashMap::new();

        // Drains queued requests even after every sender is gone.
        for Request { key, reply } in self.requests.iter() {
            let entry = match entries.entry(key) {
                MapEntry::Occupied(occupied) => {
                    let entry = Arc::clone(occupied.get());
                    self.metrics.record_hit();
                    trace!(name = %self.config.name, ready = entry.is_ready(), "memo hit");
                    entry
                }
                MapEntry::Vacant(vacant) => {
                    let entry = Arc::new(Entry::new(vacant.key().clone()));
                    vacant.insert(Arc::clone(&entry));
                    self.metrics.record_miss();
                    self.launch(Arc::clone(&entry));
                    entry
                }
            };
            // A requester that went away does not undo admission.
            let _ = reply.send(entry);
        }

        debug!(
            name = %self.config.name,
            entries = entries.len(),
            "gatekeeper stopped"
        );
    }

    /// Starts the computation for a freshly admitted entry on its own thread.
    fn launch(&self, entry: Arc<Entry<K, V, E>>) {
        let func = Arc::clone(&self.func);
        let metrics = Arc::clone(&self.metrics);
        let task = Arc::clone(&entry);

        let mut builder = thread::Builder::new().name(self.config.compute_thread_name());
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        debug!(name = %self.config.name, "memo miss, launching computation");
        let spawned = builder.spawn(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| func(task.key()))) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(MemoError::Computation(err)),
                Err(_) => Err(MemoError::Panicked),
            };
            if outcome.is_err() {
                metrics.record_failure();
                debug!("computation failed, caching error");
            }
            task.complete(outcome);
        });

        if let Err(err) = spawned {
            self.metrics.record_failure();
            error!(name = %self.config.name, %err, "failed to spawn computation thread");
            entry.complete(Err(MemoError::Spawn(err.to_string())));
        }
    }
}

/// A memoizing cache that serializes admission through a gatekeeper thread.
///
/// # Type Parameters
///
/// - `K`: Key type. Must implement `Hash + Eq + Clone + Send + Sync`.
/// - `V`: Value type. Must implement `Send + Sync`, and `Clone` for [`get`](Self::get).
/// - `E`: Error type of the computation, with the same bounds as `V`.
///
/// The computation function is fixed at construction and must be
/// `Send + Sync + 'static`, since it runs on threads the server spawns.
pub struct MemoServer<K, V, E> {
    requests: RwLock<Option<Sender<Request<K, V, E>>>>,
    gatekeeper: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<CoreMemoMetrics>,
    name: String,
}

impl<K, V, E> MemoServer<K, V, E>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Starts a server for `func` with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MemoError::Spawn`] if the gatekeeper thread cannot be started.
    pub fn new<F>(func: F) -> Result<Self, MemoError<E>>
    where
        F: Fn(&K) -> Result<V, E> + Send + Sync + 'static,
    {
        Self::init(ServerConfig::default(), func)
    }

    /// Starts a server for `func` from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MemoError::Spawn`] if the gatekeeper thread cannot be started,
    /// including when `config.name` is not a valid thread name.
    pub fn init<F>(config: ServerConfig, func: F) -> Result<Self, MemoError<E>>
    where
        F: Fn(&K) -> Result<V, E> + Send + Sync + 'static,
    {
        // Thread names are C strings; std panics on an interior NUL.
        if config.name.contains('\0') {
            return Err(MemoError::Spawn(format!(
                "thread name {:?} contains a NUL byte",
                config.name
            )));
        }

        let (requests_tx, requests_rx) = channel::unbounded();
        let metrics = Arc::new(CoreMemoMetrics::new());
        let name = config.name.clone();

        let gatekeeper = Gatekeeper {
            requests: requests_rx,
            func: Arc::new(func),
            metrics: Arc::clone(&metrics),
            config: config.clone(),
        };
        let handle = thread::Builder::new()
            .name(config.gatekeeper_thread_name())
            .spawn(move || gatekeeper.run())
            .map_err(|err| MemoError::Spawn(err.to_string()))?;
        debug!(name = %name, "gatekeeper started");

        Ok(Self {
            requests: RwLock::new(Some(requests_tx)),
            gatekeeper: Mutex::new(Some(handle)),
            metrics,
            name,
        })
    }

    /// Returns the memoized result for `key`, computing it at most once.
    ///
    /// Blocks until the result for this key is available. Never blocks on
    /// computations for other keys.
    ///
    /// # Errors
    ///
    /// - [`MemoError::Closed`] if the server was closed before this request
    ///   reached the gatekeeper. No computation is started.
    /// - The cached [`MemoError::Computation`], [`MemoError::Panicked`] or
    ///   [`MemoError::Spawn`] outcome of the key otherwise.
    pub fn get<Q>(&self, key: &Q) -> Outcome<V, E>
    where
        K: Borrow<Q>,
        Q: ?Sized + ToOwned<Owned = K>,
        V: Clone,
        E: Clone,
    {
        let (reply_tx, reply_rx) = channel::bounded(1);
        {
            let guard = self.requests.read();
            let Some(requests) = guard.as_ref() else {
                return Err(MemoError::Closed);
            };
            let request = Request {
                key: key.to_owned(),
                reply: reply_tx,
            };
            requests.send(request).map_err(|_| MemoError::Closed)?;
        }

        let entry = reply_rx.recv().map_err(|_| MemoError::Closed)?;
        entry.wait().clone()
    }
}

impl<K, V, E> MemoServer<K, V, E> {
    /// Shuts down the gatekeeper.
    ///
    /// Requests queued before this call are still answered, and computations
    /// already admitted still deliver to their waiters. Later calls to
    /// [`get`](Self::get) return [`MemoError::Closed`]. Calling `close` again
    /// is a no-op.
    pub fn close(&self) {
        let Some(requests) = self.requests.write().take() else {
            return;
        };
        drop(requests);
        debug!(name = %self.name, "closing memo server");

        if let Some(handle) = self.gatekeeper.lock().take() {
            if handle.join().is_err() {
                error!(name = %self.name, "gatekeeper thread panicked");
            }
        }
    }

    /// Returns `true` once the server no longer admits requests.
    ///
    /// That is the case after [`close`](Self::close), and also if the
    /// gatekeeper thread died (for example from a panicking `Hash` impl of
    /// the key type).
    pub fn is_closed(&self) -> bool {
        if self.requests.read().is_none() {
            return true;
        }
        self.gatekeeper
            .lock()
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }

    /// Returns the live request counters.
    pub fn core_metrics(&self) -> &CoreMemoMetrics {
        &self.metrics
    }
}

impl<K, V, E> Drop for MemoServer<K, V, E> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<K, V, E> Memoize<K, V, E> for MemoServer<K, V, E>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Outcome<V, E> {
        MemoServer::get(self, key)
    }
}

impl<K, V, E> CacheMetrics for MemoServer<K, V, E> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.metrics.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "MemoServer"
    }
}

impl<K, V, E> fmt::Debug for MemoServer<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoServer")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .field("requests", &self.metrics.requests())
            .finish()
    }
}

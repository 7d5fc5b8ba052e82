//! Memo Entry Type
//!
//! This module provides [`Entry`], the slot that tracks one key's pending or
//! completed result. Both [`Memo`](crate::Memo) and
//! [`MemoServer`](crate::MemoServer) hand out `Arc<Entry<K, V, E>>` from their
//! admission step and let callers wait on it outside of any lock.
//!
//! # Lifecycle
//!
//! ```text
//!   Entry::new(key)          complete(outcome)           wait() / try_get()
//!  ┌───────────────┐        ┌──────────────────┐        ┌────────────────────┐
//!  │    Pending    │ ─────▶ │  outcome stored  │ ─────▶ │  Ready (immutable) │
//!  │ signal unset  │        │  signal fired    │        │  any # of readers  │
//!  └───────────────┘        └──────────────────┘        └────────────────────┘
//! ```
//!
//! The outcome lives in a write-once cell. Completion stores the outcome
//! first and then notifies sleeping waiters under the entry's mutex; waiters
//! re-check the cell while holding that mutex, so a notification can never be
//! missed. Once the cell is set, readers take the lock-free fast path.
//!
//! # Invariants
//!
//! - The outcome is written exactly once. A second [`Entry::complete`] panics:
//!   it means admission handed the same key to two computations.
//! - Every call to [`Entry::wait`] returns a reference to the same outcome.

use crate::error::MemoError;
use core::fmt;
use parking_lot::{Condvar, Mutex};
use std::sync::OnceLock;

/// Outcome stored in an entry: the computed value or the error to replay.
pub type Outcome<V, E> = Result<V, MemoError<E>>;

/// One key's eventual result together with a signal observers can wait on.
///
/// # Examples
///
/// ```
/// use memo_rs::Entry;
/// use std::sync::Arc;
/// use std::thread;
///
/// let entry: Arc<Entry<&str, String, ()>> = Arc::new(Entry::new("a"));
/// assert!(!entry.is_ready());
///
/// let writer = Arc::clone(&entry);
/// let handle = thread::spawn(move || writer.complete(Ok("A-body".to_string())));
///
/// assert_eq!(entry.wait().as_deref(), Ok("A-body"));
/// handle.join().unwrap();
/// ```
pub struct Entry<K, V, E> {
    key: K,
    outcome: OnceLock<Outcome<V, E>>,
    lock: Mutex<()>,
    ready: Condvar,
}

impl<K, V, E> Entry<K, V, E> {
    /// Creates a pending entry for `key`.
    pub fn new(key: K) -> Self {
        Self {
            key,
            outcome: OnceLock::new(),
            lock: Mutex::new(()),
            ready: Condvar::new(),
        }
    }

    /// Returns the key this entry was created for.
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns `true` once the outcome has been stored.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Returns the outcome without blocking, or `None` while still pending.
    #[inline]
    pub fn try_get(&self) -> Option<&Outcome<V, E>> {
        self.outcome.get()
    }

    /// Stores the outcome and wakes every waiter.
    ///
    /// # Panics
    ///
    /// Panics if the entry was already completed. Only the task that won
    /// admission for the key may complete its entry, so a second completion
    /// means the serialization discipline is broken.
    pub fn complete(&self, outcome: Outcome<V, E>) {
        if self.outcome.set(outcome).is_err() {
            panic!("memo entry completed twice");
        }
        let _guard = self.lock.lock();
        self.ready.notify_all();
    }

    /// Blocks until the entry is completed and returns its outcome.
    ///
    /// Returns immediately if the entry is already ready. There is no
    /// timeout: if the computation never finishes, neither does this call.
    pub fn wait(&self) -> &Outcome<V, E> {
        if let Some(outcome) = self.outcome.get() {
            return outcome;
        }
        let mut guard = self.lock.lock();
        loop {
            if let Some(outcome) = self.outcome.get() {
                return outcome;
            }
            self.ready.wait(&mut guard);
        }
    }
}

impl<K: fmt::Debug, V, E> fmt::Debug for Entry<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_new_entry_is_pending() {
        let entry: Entry<&str, i32, ()> = Entry::new("k");
        assert_eq!(*entry.key(), "k");
        assert!(!entry.is_ready());
        assert!(entry.try_get().is_none());
    }

    #[test]
    fn test_wait_after_complete_does_not_block() {
        let entry: Entry<&str, i32, &str> = Entry::new("k");
        entry.complete(Ok(7));
        assert!(entry.is_ready());
        assert_eq!(entry.wait(), &Ok(7));
        assert_eq!(entry.wait(), &Ok(7));
        assert_eq!(entry.try_get(), Some(&Ok(7)));
    }

    #[test]
    fn test_error_outcome_is_kept() {
        let entry: Entry<&str, i32, &str> = Entry::new("k");
        entry.complete(Err(MemoError::Computation("bad gateway")));
        assert_eq!(entry.wait(), &Err(MemoError::Computation("bad gateway")));
    }

    #[test]
    fn test_many_waiters_observe_same_outcome() {
        let entry: Arc<Entry<u32, String, ()>> = Arc::new(Entry::new(1));

        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let entry = Arc::clone(&entry);
                thread::spawn(move || entry.wait().clone())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        entry.complete(Ok("one".to_string()));

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), Ok("one".to_string()));
        }
    }

    #[test]
    fn test_waiters_arriving_before_and_after_completion() {
        let entry: Arc<Entry<u32, u32, ()>> = Arc::new(Entry::new(1));

        let early = {
            let entry = Arc::clone(&entry);
            thread::spawn(move || entry.wait().clone())
        };
        entry.complete(Ok(42));
        let late = {
            let entry = Arc::clone(&entry);
            thread::spawn(move || entry.wait().clone())
        };

        assert_eq!(early.join().unwrap(), Ok(42));
        assert_eq!(late.join().unwrap(), Ok(42));
    }

    #[test]
    #[should_panic(expected = "memo entry completed twice")]
    fn test_double_complete_panics() {
        let entry: Entry<&str, i32, ()> = Entry::new("k");
        entry.complete(Ok(1));
        entry.complete(Ok(2));
    }

    #[test]
    fn test_debug_shows_readiness() {
        let entry: Entry<&str, i32, ()> = Entry::new("k");
        assert_eq!(format!("{:?}", entry), "Entry { key: \"k\", ready: false }");
    }
}

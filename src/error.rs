//! Memo Error Types
//!
//! Every outcome a caller of [`Memo::get`](crate::Memo::get) or
//! [`MemoServer::get`](crate::MemoServer::get) can observe besides a value.
//!
//! `Computation` and `Panicked` are stored in the entry and replayed to every
//! caller of the same key for the life of the cache. `Closed` is never stored.

use thiserror::Error;

/// Error returned by a memoizing cache.
///
/// `E` is the error type of the computation function. When `E` is `Clone`,
/// so is `MemoError<E>`, which is what allows a single failure to be handed to
/// any number of waiting callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoError<E> {
    /// The computation function returned an error for this key.
    #[error("computation failed: {0}")]
    Computation(E),
    /// The cache was closed before the request was admitted.
    #[error("cache closed")]
    Closed,
    /// The computation function panicked for this key.
    #[error("computation panicked")]
    Panicked,
    /// A gatekeeper or computation thread could not be spawned.
    #[error("failed to spawn thread: {0}")]
    Spawn(String),
}

impl<E> MemoError<E> {
    /// Returns the computation error, if this is one.
    pub fn computation(&self) -> Option<&E> {
        match self {
            MemoError::Computation(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` if the request was rejected because the cache is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, MemoError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err: MemoError<String> = MemoError::Computation("404 not found".to_string());
        assert_eq!(err.to_string(), "computation failed: 404 not found");
        assert_eq!(MemoError::<String>::Closed.to_string(), "cache closed");
        assert_eq!(
            MemoError::<String>::Spawn("out of threads".to_string()).to_string(),
            "failed to spawn thread: out of threads"
        );
    }

    #[test]
    fn test_accessors() {
        let err: MemoError<&str> = MemoError::Computation("boom");
        assert_eq!(err.computation(), Some(&"boom"));
        assert!(!err.is_closed());

        let closed: MemoError<&str> = MemoError::Closed;
        assert_eq!(closed.computation(), None);
        assert!(closed.is_closed());
    }
}

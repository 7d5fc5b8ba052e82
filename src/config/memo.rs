//! Configuration for the lock-striped [`Memo`](crate::Memo).
//!
//! # Examples
//!
//! ```
//! use memo_rs::config::MemoConfig;
//! use memo_rs::Memo;
//!
//! // Default segment count, based on available parallelism
//! let config = MemoConfig::new();
//! let memo = Memo::init(config, |n: &u64| Ok::<_, ()>(n * 2), None);
//!
//! // A single segment serializes admission of every key behind one guard
//! let config = MemoConfig::new().with_segments(1);
//! let memo = Memo::init(config, |n: &u64| Ok::<_, ()>(n * 2), None);
//! assert_eq!(memo.segment_count(), 1);
//! ```

use core::fmt;

/// Returns the default number of segments based on available parallelism.
pub fn default_segment_count() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(16)
        .clamp(4, 64)
}

/// Configuration for a [`Memo`](crate::Memo).
///
/// # Fields
///
/// - `segments`: Number of independently locked shards of the entries map.
///   Only the lookup-or-create step takes a segment guard, so more segments
///   mean less contention between unrelated keys during admission. It has no
///   effect on how computations themselves run.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MemoConfig {
    /// Number of segments for sharding (clamped to at least 1 at init)
    pub segments: usize,
}

impl MemoConfig {
    /// Creates a configuration with the default segment count.
    #[must_use]
    pub fn new() -> Self {
        Self {
            segments: default_segment_count(),
        }
    }

    /// Sets the number of segments.
    ///
    /// # Panics
    ///
    /// Panics if `segments` is 0.
    #[must_use]
    pub fn with_segments(mut self, segments: usize) -> Self {
        assert!(segments > 0, "segments must be > 0");
        self.segments = segments;
        self
    }
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoConfig")
            .field("segments", &self.segments)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_segment_count_is_clamped() {
        let segments = default_segment_count();
        assert!((4..=64).contains(&segments));
        assert_eq!(MemoConfig::default().segments, segments);
    }

    #[test]
    fn test_with_segments() {
        let config = MemoConfig::new().with_segments(32);
        assert_eq!(config.segments, 32);
    }

    #[test]
    #[should_panic(expected = "segments must be > 0")]
    fn test_zero_segments_rejected() {
        let _ = MemoConfig::new().with_segments(0);
    }
}

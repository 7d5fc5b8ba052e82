//! Configuration for the gatekeeper-based [`MemoServer`](crate::MemoServer).
//!
//! # Examples
//!
//! ```
//! use memo_rs::config::ServerConfig;
//!
//! let config = ServerConfig::new("http-bodies").with_stack_size(256 * 1024);
//! assert_eq!(config.gatekeeper_thread_name(), "http-bodies-gatekeeper");
//! assert_eq!(config.compute_thread_name(), "http-bodies-compute");
//! ```

use core::fmt;

/// Configuration for a [`MemoServer`](crate::MemoServer).
///
/// # Fields
///
/// - `name`: Prefix for the names of the gatekeeper thread and of every
///   computation thread. Also attached to log events.
/// - `stack_size`: Stack size for computation threads. `None` uses the
///   platform default. The gatekeeper always uses the default.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Thread name prefix
    pub name: String,
    /// Optional stack size in bytes for computation threads
    pub stack_size: Option<usize>,
}

impl ServerConfig {
    /// Creates a configuration with the given name and default stack size.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stack_size: None,
        }
    }

    /// Sets the stack size of computation threads.
    #[must_use]
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Name of the gatekeeper thread.
    pub fn gatekeeper_thread_name(&self) -> String {
        format!("{}-gatekeeper", self.name)
    }

    /// Name of each computation thread.
    pub fn compute_thread_name(&self) -> String {
        format!("{}-compute", self.name)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("memo")
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("name", &self.name)
            .field("stack_size", &self.stack_size)
            .finish()
    }
}

//! Memo Configuration Module
//!
//! This module provides configuration structures for both memoizing cache
//! designs. Each cache type has its own dedicated configuration struct with
//! public fields and a few `with_*` builder methods.
//!
//! | Config | Cache | Description |
//! |--------|-------|-------------|
//! | `MemoConfig` | [`Memo`](crate::Memo) | Lock-striped guarded map |
//! | `ServerConfig` | [`MemoServer`](crate::MemoServer) | Single-threaded gatekeeper |
//!
//! Neither config has a capacity: memoizing caches never evict, so every
//! completed result is retained for the life of the cache.
//!
//! # Examples
//!
//! ```
//! use memo_rs::config::{MemoConfig, ServerConfig};
//!
//! let memo_config = MemoConfig { segments: 8 };
//! let server_config = ServerConfig {
//!     name: "fetch".to_string(),
//!     stack_size: None,
//! };
//! assert_eq!(memo_config.segments, 8);
//! assert_eq!(server_config.name, "fetch");
//! ```

pub mod memo;
pub mod server;

pub use memo::{default_segment_count, MemoConfig};
pub use server::ServerConfig;

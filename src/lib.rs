//! # cache-facade
//!
//! A typed, serialization-aware cache layer over Redis.
//!
//! ## Features
//!
//! - **Typed Access:** `get::<T>` / `set` for any `serde` type
//! - **Plain-Text Storage:** strings and numbers stored raw, structures as JSON
//! - **Expiry:** optional TTL in seconds on every write
//! - **Cache-Aside Helpers:** `remember` (with TTL) and `forever` (no expiry)
//! - **Predictable Failures:** reads fail open, writes fail closed
//! - **Any Topology:** single node, unix socket, or cluster via the `redis` crate
//!
//! ## Quick Start
//!
//! ```ignore
//! use cache_facade::{Cache, Source};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     name: String,
//! }
//!
//! let cache = Cache::connect(6379).await?;
//!
//! // 1. Plain writes and reads
//! cache.set("user:1", &User { name: "John Doe".into() }, None).await?;
//! let user: Option<User> = cache.get("user:1").await;
//!
//! // 2. Compute on miss, keep for an hour
//! let user: User = cache
//!     .remember("user:2", 3600, Source::future(|| async {
//!         User { name: "Jane Doe".into() }
//!     }))
//!     .await?;
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod observability;
pub mod serialization;
pub mod source;

// Re-exports for convenience
pub use backend::{KeyValueStore, RedisStore};
pub use cache::Cache;
pub use config::{ClusterNode, ClusterOptions, ConnectionOptions, ConnectionSpec};
pub use error::{Error, Result};
pub use events::{EventPayload, ListenerId, StoreEvent};
pub use source::Source;

#[cfg(feature = "inmemory")]
pub use backend::InMemoryStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Key-value store clients the cache facade can drive.
//!
//! [`KeyValueStore`] is the command surface the facade needs from an
//! external client. Connection handling, reconnects and cluster routing are
//! the implementation's business.

use crate::error::Result;
use crate::events::EventEmitter;
use std::future::Future;

#[cfg(feature = "inmemory")]
pub mod inmemory;
pub mod redis;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryStore;
pub use self::redis::RedisStore;

/// Confirmation token returned by successful writes and flushes.
pub const OK: &str = "OK";

/// Primitive commands of a remote key-value store.
///
/// Values travel as text; encoding is done by the facade. Implementations
/// report command failures as `Error::Backend`.
pub trait KeyValueStore: Send + Sync + 'static {
    /// `GET key`. `Ok(None)` when the key does not exist.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// `SET key value`, overwriting any value and TTL. Returns the
    /// confirmation token.
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<String>> + Send;

    /// `SETEX key ttl value`. TTL validation is left to the store.
    fn set_ex(
        &self,
        key: &str,
        ttl_secs: u64,
        value: String,
    ) -> impl Future<Output = Result<String>> + Send;

    /// `DEL key`. Returns the number of keys removed.
    fn del(&self, key: &str) -> impl Future<Output = Result<u64>> + Send;

    /// `EXISTS key`. Returns the number of matching keys.
    fn exists(&self, key: &str) -> impl Future<Output = Result<u64>> + Send;

    /// `FLUSHALL`. Removes every key in every logical database the client
    /// reaches.
    fn flush_all(&self) -> impl Future<Output = Result<String>> + Send;

    /// `PING`.
    fn ping(&self) -> impl Future<Output = Result<String>> + Send;

    /// Lifecycle event registry of this client.
    fn events(&self) -> &EventEmitter;
}

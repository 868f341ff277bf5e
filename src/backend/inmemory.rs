//! In-process key-value store.
//!
//! Mirrors the Redis command semantics the facade relies on, including
//! per-key expiry, so the facade can be exercised without a server. Time is
//! measured with `tokio::time::Instant`, which lets tests pause and advance
//! the clock.
//!
//! Expired keys are dropped when read, and every [`SWEEP_INTERVAL`] writes
//! a sweep removes the ones nobody reads again.

use super::{KeyValueStore, OK};
use crate::error::{Error, Result};
use crate::events::{EventEmitter, StoreEvent};
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Number of writes between sweeps of expired keys.
pub const SWEEP_INTERVAL: u64 = 64;

#[derive(Clone, Debug)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Thread-safe in-memory store.
///
/// Clones share the same data, listeners and fault switches.
///
/// # Example
///
/// ```
/// # use cache_facade::backend::{InMemoryStore, KeyValueStore};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> cache_facade::error::Result<()> {
/// let store = InMemoryStore::new();
/// store.set_ex("session", 60, "abc".to_string()).await?;
/// assert_eq!(store.exists("session").await?, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryStore {
    data: Arc<DashMap<String, StoredValue>>,
    failing: Arc<DashSet<String>>,
    writes: Arc<AtomicU64>,
    events: Arc<EventEmitter>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let store = InMemoryStore {
            data: Arc::new(DashMap::new()),
            failing: Arc::new(DashSet::new()),
            writes: Arc::new(AtomicU64::new(0)),
            events: Arc::new(EventEmitter::new()),
        };
        store.events.emit(StoreEvent::Connect, None);
        store.events.emit(StoreEvent::Ready, None);
        debug!("✓ In-memory store initialized");
        store
    }

    /// Make every subsequent `command` (e.g. `"GET"`, `"SETEX"`) fail until
    /// [`InMemoryStore::recover`] is called.
    pub fn fail_on(&self, command: &str) {
        self.failing.insert(command.to_ascii_uppercase());
    }

    /// Clear all injected failures.
    pub fn recover(&self) {
        self.failing.clear();
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.data
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining time to live of `key`, `None` if the key is missing or has
    /// no expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.data
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Drop every expired key. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.data.len();
        self.data.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.data.len());
        if removed > 0 {
            debug!("InMemory swept {} expired keys", removed);
        }
        removed
    }

    fn insert(&self, key: &str, entry: StoredValue) {
        self.data.insert(key.to_string(), entry);
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.purge_expired();
        }
    }

    fn check(&self, command: &str) -> Result<()> {
        if self.failing.contains(command) {
            let message = format!("injected failure for {}", command);
            self.events.emit(StoreEvent::Error, Some(message.clone()));
            return Err(Error::backend(command, message));
        }
        Ok(())
    }

    /// Look up a live entry, dropping it if it has expired.
    fn live(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let value = self.data.get(key).map(|entry| entry.clone())?;
        if value.is_expired(now) {
            self.data.remove_if(key, |_, entry| entry.is_expired(now));
            return None;
        }
        Some(value.value)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check("GET")?;
        let value = self.live(key);
        debug!(
            "✓ InMemory GET {} -> {}",
            key,
            if value.is_some() { "HIT" } else { "MISS" }
        );
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<String> {
        self.check("SET")?;
        self.insert(
            key,
            StoredValue {
                value,
                expires_at: None,
            },
        );
        debug!("✓ InMemory SET {}", key);
        Ok(OK.to_string())
    }

    async fn set_ex(&self, key: &str, ttl_secs: u64, value: String) -> Result<String> {
        self.check("SETEX")?;
        if ttl_secs == 0 {
            // Same rejection Redis gives for a zero expiry.
            return Err(Error::backend("SETEX", "invalid expire time in 'setex' command"));
        }
        self.insert(
            key,
            StoredValue {
                value,
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        debug!("✓ InMemory SETEX {} (TTL: {}s)", key, ttl_secs);
        Ok(OK.to_string())
    }

    async fn del(&self, key: &str) -> Result<u64> {
        self.check("DEL")?;
        let now = Instant::now();
        let removed = match self.data.remove(key) {
            Some((_, entry)) if !entry.is_expired(now) => 1,
            _ => 0,
        };
        debug!("✓ InMemory DEL {} ({} removed)", key, removed);
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<u64> {
        self.check("EXISTS")?;
        Ok(u64::from(self.live(key).is_some()))
    }

    async fn flush_all(&self) -> Result<String> {
        self.check("FLUSHALL")?;
        self.data.clear();
        warn!("⚠ InMemory FLUSHALL executed - all keys removed!");
        self.events
            .emit(StoreEvent::Warning, Some("FLUSHALL executed".to_string()));
        Ok(OK.to_string())
    }

    async fn ping(&self) -> Result<String> {
        self.check("PING")?;
        Ok("PONG".to_string())
    }

    fn events(&self) -> &EventEmitter {
        &self.events
    }
}

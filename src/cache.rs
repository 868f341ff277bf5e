//! Cache facade - typed entry point over a key-value store.

use crate::backend::{KeyValueStore, RedisStore, OK};
use crate::config::{ClusterNode, ClusterOptions, ConnectionSpec};
use crate::error::{Error, Result};
use crate::events::{EventPayload, ListenerId, StoreEvent};
use crate::observability::{CacheMetrics, NoOpMetrics};
use crate::serialization::{deserialize_value, serialize_value};
use crate::source::Source;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Key reported to metrics for operations that span the whole store.
const ALL_KEYS: &str = "*";

/// Typed cache over a remote key-value store.
///
/// Reads decode stored text into the requested type, writes encode values
/// (see [`crate::serialization`]). Failure handling differs per operation:
///
/// | Operation | On failure |
/// |---|---|
/// | `get` | logged, returns `None` |
/// | `set`, `delete` | logged, returns `Error::Operation` |
/// | `flush` | logged, returns `"OK"` |
/// | `exists` | store error returned as is |
///
/// No operation retries; reconnects belong to the store client.
///
/// # Example
///
/// ```no_run
/// use cache_facade::{Cache, Source};
/// use cache_facade::config::ConnectionSpec;
///
/// # async fn example() -> cache_facade::Result<()> {
/// let cache = Cache::connect(ConnectionSpec::Port(6379)).await?;
///
/// cache.set("greeting", "hello", Some(60)).await?;
/// let greeting: Option<String> = cache.get("greeting").await;
///
/// let total: u64 = cache
///     .remember("stats:total", 300, Source::with(|| 42))
///     .await?;
/// # let _ = (greeting, total);
/// # Ok(())
/// # }
/// ```
pub struct Cache<S: KeyValueStore = RedisStore> {
    store: Arc<S>,
    metrics: Arc<dyn CacheMetrics>,
}

impl<S: KeyValueStore> Clone for Cache<S> {
    fn clone(&self) -> Self {
        Cache {
            store: self.store.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl Cache<RedisStore> {
    /// Connect to a single Redis node and wrap the new client.
    ///
    /// Accepts anything convertible into a [`ConnectionSpec`]: a port, a
    /// [`crate::config::ConnectionOptions`], or a `ConnectionSpec` directly.
    ///
    /// # Errors
    /// - `Error::Config` if the connection settings are invalid
    /// - `Error::Backend` if the server cannot be reached
    pub async fn connect(spec: impl Into<ConnectionSpec>) -> Result<Self> {
        let store = RedisStore::connect(spec.into()).await?;
        Ok(Self::from_store(store))
    }

    /// Connect to `127.0.0.1:6379`.
    ///
    /// # Errors
    /// Same as [`Cache::connect`].
    pub async fn localhost() -> Result<Self> {
        Self::connect(ConnectionSpec::Default).await
    }

    /// Connect to a Redis cluster and wrap the new client.
    ///
    /// # Errors
    /// - `Error::Config` for an empty node list or invalid settings
    /// - `Error::Backend` if no seed node can be reached
    pub async fn cluster(nodes: Vec<ClusterNode>, options: ClusterOptions) -> Result<Self> {
        let store = RedisStore::cluster(nodes, options).await?;
        Ok(Self::from_store(store))
    }
}

impl<S: KeyValueStore> Cache<S> {
    /// Wrap a store owned by this cache.
    pub fn from_store(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    /// Wrap a store shared with the caller. No new connection is opened.
    pub fn from_shared(store: Arc<S>) -> Self {
        Cache {
            store,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Read `key` and decode it as `T`.
    ///
    /// Returns `None` when the key is absent. Store failures, an empty key
    /// and values that do not decode as `T` are logged and also yield
    /// `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let timer = Instant::now();

        match self.try_get(key).await {
            Ok(Some(value)) => {
                self.metrics.record_hit(key, timer.elapsed());
                Some(value)
            }
            Ok(None) => {
                self.metrics.record_miss(key, timer.elapsed());
                None
            }
            Err(e) => {
                self.metrics.record_miss(key, timer.elapsed());
                self.handle_error("get", key, e, Some(None)).ok().flatten()
            }
        }
    }

    /// Store `value` under `key`, with an expiry of `ttl` seconds if given.
    ///
    /// Overwrites any previous value and expiry. Returns the store's
    /// confirmation token (`"OK"`).
    ///
    /// # Errors
    /// Returns `Error::Operation` if the value cannot be encoded, the key is
    /// empty, or the store rejects the write (including a TTL the store
    /// considers invalid, such as `0`).
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
    ) -> Result<String> {
        match serialize_value(value) {
            Ok(encoded) => self.write(key, encoded, ttl).await,
            Err(e) => self.handle_error("set", key, e, None),
        }
    }

    /// Return the cached value for `key`, or resolve `source`, store the
    /// result for `ttl` seconds and return it.
    ///
    /// `source` is not touched on a hit. Concurrent callers missing the same
    /// key each resolve their own source; the last write wins.
    ///
    /// # Errors
    /// Returns `Error::Operation` if storing the resolved value fails.
    pub async fn remember<T>(&self, key: &str, ttl: u64, source: Source<T>) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send,
    {
        self.populate(key, Some(ttl), source).await
    }

    /// Like [`Cache::remember`], but the stored value never expires.
    ///
    /// # Errors
    /// Returns `Error::Operation` if storing the resolved value fails.
    pub async fn forever<T>(&self, key: &str, source: Source<T>) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send,
    {
        self.populate(key, None, source).await
    }

    /// Remove `key`. Returns the number of keys removed (0 or 1).
    ///
    /// # Errors
    /// Returns `Error::Operation` if the key is empty or the store fails.
    pub async fn delete(&self, key: &str) -> Result<u64> {
        match self.try_delete(key).await {
            Ok(removed) => Ok(removed),
            Err(e) => self.handle_error("delete", key, e, None),
        }
    }

    /// Remove every key the underlying client can reach.
    ///
    /// Irreversible and global: on a shared server this clears data written
    /// by every other application too. A failed flush is logged and still
    /// reported as `"OK"`.
    pub async fn flush(&self) -> String {
        match self.store.flush_all().await {
            Ok(reply) => {
                info!("✓ Cache flushed");
                reply
            }
            Err(e) => self
                .handle_error("flush", ALL_KEYS, e, Some(OK.to_string()))
                .unwrap_or_else(|_| OK.to_string()),
        }
    }

    /// Whether `key` currently exists.
    ///
    /// # Errors
    /// Store failures are returned unwrapped (`Error::Backend`), and an empty
    /// key yields `Error::Validation`.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.store.exists(key).await? > 0)
    }

    /// Ping the store. Returns `false` instead of an error.
    pub async fn health_check(&self) -> bool {
        match self.store.ping().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Cache health check failed: {}", e);
                false
            }
        }
    }

    /// Subscribe to a store lifecycle event.
    pub fn on<F>(&self, event: StoreEvent, listener: F) -> ListenerId
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        self.store.events().on(event, listener)
    }

    /// Subscribe to the next occurrence of a store lifecycle event.
    pub fn once<F>(&self, event: StoreEvent, listener: F) -> ListenerId
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        self.store.events().once(event, listener)
    }

    /// Unsubscribe a listener. Returns `false` if it was not registered.
    pub fn off(&self, event: StoreEvent, listener: ListenerId) -> bool {
        self.store.events().off(event, listener)
    }

    /// Underlying store client (for advanced use).
    pub fn client(&self) -> &S {
        &self.store
    }

    /// Shared handle to the underlying store client.
    pub fn shared_client(&self) -> Arc<S> {
        self.store.clone()
    }

    async fn populate<T>(&self, key: &str, ttl: Option<u64>, source: Source<T>) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send,
    {
        if let Some(cached) = self.get::<T>(key).await {
            debug!("✓ Cache hit for {}, source not resolved", key);
            return Ok(cached);
        }

        debug!("Cache miss for {}, resolving source", key);
        let value = source.resolve().await;

        let encoded = match serialize_value(&value) {
            Ok(encoded) => encoded,
            Err(e) => return self.handle_error("set", key, e, None),
        };
        self.write(key, encoded, ttl).await?;

        Ok(value)
    }

    async fn write(&self, key: &str, encoded: String, ttl: Option<u64>) -> Result<String> {
        match self.try_write(key, encoded, ttl).await {
            Ok(reply) => Ok(reply),
            Err(e) => self.handle_error("set", key, e, None),
        }
    }

    async fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        validate_key(key)?;
        match self.store.get(key).await? {
            Some(raw) => deserialize_value(&raw).map(Some),
            None => Ok(None),
        }
    }

    async fn try_write(&self, key: &str, encoded: String, ttl: Option<u64>) -> Result<String> {
        validate_key(key)?;
        match ttl {
            Some(secs) => self.store.set_ex(key, secs, encoded).await,
            None => self.store.set(key, encoded).await,
        }
    }

    async fn try_delete(&self, key: &str) -> Result<u64> {
        validate_key(key)?;
        self.store.del(key).await
    }

    /// Log a failed operation, then fail open with `fallback` or fail closed
    /// with `Error::Operation`.
    fn handle_error<T>(
        &self,
        operation: &str,
        key: &str,
        error: Error,
        fallback: Option<T>,
    ) -> Result<T> {
        let message = format!("Cache {} operation failed: {}", operation, error);
        error!("{}", message);
        self.metrics.record_error(key, &message);

        match fallback {
            Some(value) => Ok(value),
            None => Err(Error::Operation {
                operation: operation.to_string(),
                message,
                source: Box::new(error),
            }),
        }
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::Validation("Cache key must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use crate::backend::InMemoryStore;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        tags: Vec<String>,
    }

    fn cache() -> (Cache<InMemoryStore>, InMemoryStore) {
        let store = InMemoryStore::new();
        (Cache::from_store(store.clone()), store)
    }

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let (cache, _) = cache();
        assert_eq!(cache.get::<String>("missing").await, None);
    }

    #[tokio::test]
    async fn test_set_writes_encoded_text() {
        let (cache, store) = cache();
        let profile = Profile {
            name: "John Doe".to_string(),
            tags: vec!["admin".to_string()],
        };

        assert_eq!(cache.set("profile:1", &profile, None).await.unwrap(), "OK");
        assert_eq!(cache.set("name", "plain", None).await.unwrap(), "OK");

        let raw = store.get("name").await.unwrap();
        assert_eq!(raw.as_deref(), Some("plain"));
        assert_eq!(cache.get::<Profile>("profile:1").await, Some(profile));
    }

    #[tokio::test]
    async fn test_get_fails_open() {
        let (cache, store) = cache();
        cache.set("k", &1, None).await.unwrap();
        store.fail_on("GET");

        assert_eq!(cache.get::<i32>("k").await, None);
    }

    #[tokio::test]
    async fn test_get_with_wrong_type_is_none() {
        let (cache, _) = cache();
        cache.set("k", "not a profile", None).await.unwrap();
        assert_eq!(cache.get::<Profile>("k").await, None);
    }

    #[tokio::test]
    async fn test_set_fails_closed() {
        let (cache, store) = cache();
        store.fail_on("SET");

        let err = cache.set("k", &1, None).await.unwrap_err();
        assert_eq!(err.operation(), Some("set"));
        assert_eq!(
            err.to_string(),
            "Cache set operation failed: SET failed: injected failure for SET"
        );
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let (cache, _) = cache();
        assert_eq!(cache.get::<String>("").await, None);
        assert!(matches!(
            cache.set("", "v", None).await,
            Err(Error::Operation { .. })
        ));
        assert!(matches!(cache.exists("").await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_fails_closed() {
        let (cache, store) = cache();
        store.fail_on("DEL");
        let err = cache.delete("k").await.unwrap_err();
        assert_eq!(err.operation(), Some("delete"));
    }

    #[tokio::test]
    async fn test_flush_fails_open() {
        let (cache, store) = cache();
        cache.set("k", "v", None).await.unwrap();
        store.fail_on("FLUSHALL");

        assert_eq!(cache.flush().await, "OK");
        // Nothing was actually cleared.
        assert!(cache.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_error_is_not_wrapped() {
        let (cache, store) = cache();
        store.fail_on("EXISTS");

        let err = cache.exists("k").await.unwrap_err();
        assert!(matches!(err, Error::Backend { .. }));
        assert!(err.operation().is_none());
    }

    #[tokio::test]
    async fn test_remember_invokes_source_once() {
        let (cache, _) = cache();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let counter = calls.clone();
            let value: String = cache
                .remember(
                    "greeting",
                    60,
                    Source::with(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        "hello".to_string()
                    }),
                )
                .await
                .unwrap();
            assert_eq!(value, "hello");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remember_propagates_write_failure() {
        let (cache, store) = cache();
        store.fail_on("SETEX");

        let result = cache.remember("k", 60, Source::value(5)).await;
        assert!(matches!(result, Err(Error::Operation { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remember_and_forever_ttl() {
        let (cache, store) = cache();

        cache.remember("short", 30, Source::value(1)).await.unwrap();
        cache.forever("long", Source::value(2)).await.unwrap();

        assert_eq!(store.ttl("short"), Some(Duration::from_secs(30)));
        assert_eq!(store.ttl("long"), None);
        assert_eq!(store.exists("long").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_events_are_forwarded() {
        let (cache, store) = cache();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let id = cache.on(StoreEvent::Error, move |payload| {
            sink.lock().unwrap().push(payload.message.clone());
        });
        let sink = seen.clone();
        cache.once(StoreEvent::Warning, move |payload| {
            sink.lock().unwrap().push(payload.message.clone());
        });

        store.fail_on("GET");
        let _ = cache.get::<String>("k").await;
        store.recover();
        cache.flush().await;
        cache.flush().await;

        assert!(cache.off(StoreEvent::Error, id));
        store.fail_on("GET");
        let _ = cache.get::<String>("k").await;

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                Some("injected failure for GET".to_string()),
                Some("FLUSHALL executed".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_custom_metrics() {
        #[derive(Default)]
        struct Counting {
            hits: AtomicUsize,
            misses: AtomicUsize,
            errors: AtomicUsize,
        }

        impl CacheMetrics for Counting {
            fn record_hit(&self, _key: &str, _duration: Duration) {
                self.hits.fetch_add(1, Ordering::SeqCst);
            }

            fn record_miss(&self, _key: &str, _duration: Duration) {
                self.misses.fetch_add(1, Ordering::SeqCst);
            }

            fn record_error(&self, _key: &str, _error: &str) {
                self.errors.fetch_add(1, Ordering::SeqCst);
            }
        }

        let metrics = Arc::new(Counting::default());
        let store = InMemoryStore::new();
        let cache = Cache::from_store(store.clone()).with_metrics(metrics.clone());

        cache.get::<i32>("k").await;
        cache.set("k", &1, None).await.unwrap();
        cache.get::<i32>("k").await;
        store.fail_on("GET");
        cache.get::<i32>("k").await;

        assert_eq!(metrics.hits.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.misses.load(Ordering::SeqCst), 2);
        assert_eq!(metrics.errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shared_client() {
        let store = Arc::new(InMemoryStore::new());
        let cache = Cache::from_shared(store.clone());

        cache.set("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(Arc::ptr_eq(&cache.shared_client(), &store));
        assert!(cache.health_check().await);
    }
}

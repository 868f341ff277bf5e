//! Redis store backed by the `redis` crate.

use super::KeyValueStore;
use crate::config::{ClusterNode, ClusterOptions, ConnectionSpec, DEFAULT_HOST, DEFAULT_PORT};
use crate::error::{Error, Result};
use crate::events::{EventEmitter, StoreEvent};
use ::redis::aio::ConnectionManager;
use ::redis::cluster::ClusterClientBuilder;
use ::redis::cluster_async::ClusterConnection;
use ::redis::cluster_read_routing::RandomReplicaStrategy;
use ::redis::{Client, Cmd, FromRedisValue};
use std::sync::Arc;

#[derive(Clone)]
enum Connection {
    Single(ConnectionManager),
    Cluster(ClusterConnection),
}

/// Redis client for a single node or a cluster.
///
/// Single-node connections use a [`ConnectionManager`], which multiplexes
/// commands over one connection and reconnects on its own. Cluster
/// connections route each command to the owning shard. Cloning is cheap and
/// clones share the connection and the event listeners.
///
/// # Example
///
/// ```no_run
/// # use cache_facade::backend::{KeyValueStore, RedisStore};
/// # use cache_facade::config::ConnectionSpec;
/// # use cache_facade::error::Result;
/// # async fn example() -> Result<()> {
/// let store = RedisStore::connect(ConnectionSpec::Port(6379)).await?;
/// store.set("greeting", "hello".to_string()).await?;
/// assert_eq!(store.get("greeting").await?.as_deref(), Some("hello"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisStore {
    connection: Connection,
    events: Arc<EventEmitter>,
}

impl RedisStore {
    /// Connect to a single node.
    ///
    /// # Errors
    /// - `Error::Config` if the connection settings are invalid
    /// - `Error::Backend` if the initial connection cannot be established
    pub async fn connect(spec: ConnectionSpec) -> Result<Self> {
        let client = Client::open(spec.connection_info()?)
            .map_err(|e| Error::Config(format!("Invalid Redis connection settings: {}", e)))?;

        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::backend("CONNECT", e.to_string()))?;

        info!("✓ Redis store connected ({})", describe(&spec));
        Ok(Self::from_manager(manager))
    }

    /// Connect to a cluster through the given seed nodes.
    ///
    /// # Errors
    /// - `Error::Config` for an empty node list or invalid node settings
    /// - `Error::Backend` if no seed node can be reached
    pub async fn cluster(nodes: Vec<ClusterNode>, options: ClusterOptions) -> Result<Self> {
        let addrs = options.node_addrs(&nodes)?;

        let mut builder = ClusterClientBuilder::new(addrs);
        if let Some(username) = &options.username {
            builder = builder.username(username);
        }
        if let Some(password) = &options.password {
            builder = builder.password(password);
        }
        if options.read_from_replicas {
            builder = builder.read_routing_strategy(RandomReplicaStrategy);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Invalid Redis cluster settings: {}", e)))?;

        let connection = client
            .get_async_connection()
            .await
            .map_err(|e| Error::backend("CONNECT", e.to_string()))?;

        info!(
            "✓ Redis cluster connected ({} seed nodes, replicas: {})",
            nodes.len(),
            options.read_from_replicas
        );
        Ok(Self::from_cluster_connection(connection))
    }

    /// Wrap an already established single-node connection.
    pub fn from_manager(manager: ConnectionManager) -> Self {
        Self::with_connection(Connection::Single(manager))
    }

    /// Wrap an already established cluster connection.
    pub fn from_cluster_connection(connection: ClusterConnection) -> Self {
        Self::with_connection(Connection::Cluster(connection))
    }

    /// Close this handle. Emits `close` and `end`.
    ///
    /// The underlying connection is dropped once every clone is gone.
    pub fn quit(self) {
        self.events.emit(StoreEvent::Close, None);
        self.events.emit(StoreEvent::End, None);
        debug!("Redis store handle closed");
    }

    fn with_connection(connection: Connection) -> Self {
        let store = RedisStore {
            connection,
            events: Arc::new(EventEmitter::new()),
        };
        store.events.emit(StoreEvent::Connect, None);
        store.events.emit(StoreEvent::Ready, None);
        store
    }

    async fn run<T>(&self, command: &'static str, cmd: Cmd) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        let result = match &self.connection {
            Connection::Single(conn) => {
                let mut conn = conn.clone();
                cmd.query_async(&mut conn).await
            }
            Connection::Cluster(conn) => {
                let mut conn = conn.clone();
                cmd.query_async(&mut conn).await
            }
        };

        result.map_err(|e| {
            let message = e.to_string();
            self.events.emit(StoreEvent::Error, Some(message.clone()));
            Error::backend(command, message)
        })
    }
}

impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut cmd = ::redis::cmd("GET");
        cmd.arg(key);
        let value: Option<String> = self.run("GET", cmd).await?;
        debug!(
            "✓ Redis GET {} -> {}",
            key,
            if value.is_some() { "HIT" } else { "MISS" }
        );
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<String> {
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(key).arg(value);
        let reply: String = self.run("SET", cmd).await?;
        debug!("✓ Redis SET {}", key);
        Ok(reply)
    }

    async fn set_ex(&self, key: &str, ttl_secs: u64, value: String) -> Result<String> {
        let mut cmd = ::redis::cmd("SETEX");
        cmd.arg(key).arg(ttl_secs).arg(value);
        let reply: String = self.run("SETEX", cmd).await?;
        debug!("✓ Redis SETEX {} (TTL: {}s)", key, ttl_secs);
        Ok(reply)
    }

    async fn del(&self, key: &str) -> Result<u64> {
        let mut cmd = ::redis::cmd("DEL");
        cmd.arg(key);
        let removed: u64 = self.run("DEL", cmd).await?;
        debug!("✓ Redis DEL {} ({} removed)", key, removed);
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<u64> {
        let mut cmd = ::redis::cmd("EXISTS");
        cmd.arg(key);
        self.run("EXISTS", cmd).await
    }

    async fn flush_all(&self) -> Result<String> {
        let reply: String = self.run("FLUSHALL", ::redis::cmd("FLUSHALL")).await?;
        warn!("⚠ Redis FLUSHALL executed - all keys removed!");
        self.events
            .emit(StoreEvent::Warning, Some("FLUSHALL executed".to_string()));
        Ok(reply)
    }

    async fn ping(&self) -> Result<String> {
        self.run("PING", ::redis::cmd("PING")).await
    }

    fn events(&self) -> &EventEmitter {
        &self.events
    }
}

/// Log-safe description of a connection target (no credentials).
fn describe(spec: &ConnectionSpec) -> String {
    match spec {
        ConnectionSpec::Default => format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT),
        ConnectionSpec::Port(port) => format!("{}:{}", DEFAULT_HOST, port),
        ConnectionSpec::HostPort { host, port } => format!("{}:{}", host, port),
        ConnectionSpec::Path(path) => format!("unix:{}", path),
        ConnectionSpec::Url(_) => "connection url".to_string(),
        ConnectionSpec::Options(options) => {
            format!("{}:{} db {}", options.host, options.port, options.db)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_config_error() {
        let result = RedisStore::connect(ConnectionSpec::Url("not a url".to_string())).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_empty_socket_path_is_config_error() {
        let result = RedisStore::connect(ConnectionSpec::Path(String::new())).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_cluster_without_nodes_is_config_error() {
        let result = RedisStore::cluster(Vec::new(), ClusterOptions::default()).await;
        assert!(matches!(result, Err(Error::Config(_))));

        let result = RedisStore::cluster(
            vec![ClusterNode::new("", 7000)],
            ClusterOptions::default(),
        )
        .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_describe_hides_credentials() {
        let spec = ConnectionSpec::Options(crate::config::ConnectionOptions {
            password: Some("secret".to_string()),
            ..Default::default()
        });
        let text = describe(&spec);
        assert!(!text.contains("secret"));
        assert_eq!(text, "127.0.0.1:6379 db 0");

        let url = ConnectionSpec::Url("redis://:secret@host/".to_string());
        assert!(!describe(&url).contains("secret"));
    }
}

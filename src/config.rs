//! Connection configuration for the Redis-backed store.
//!
//! Settings are turned into the `redis` crate's typed [`ConnectionInfo`] and
//! [`ConnectionAddr`], so paths and credentials never pass through a URL.
//! Only [`ConnectionSpec::Url`] is parsed as a connection string.

use crate::error::{Error, Result};
use ::redis::{ConnectionAddr, ConnectionInfo, IntoConnectionInfo, RedisConnectionInfo};
use std::env;
use std::path::PathBuf;

/// Default Redis host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default Redis port.
pub const DEFAULT_PORT: u16 = 6379;

/// How to reach a single Redis node.
///
/// # Example
///
/// ```
/// use cache_facade::config::ConnectionSpec;
/// use redis::ConnectionAddr;
///
/// let spec = ConnectionSpec::HostPort {
///     host: "cache.internal".to_string(),
///     port: 6380,
/// };
/// let info = spec.connection_info().unwrap();
/// assert_eq!(
///     info.addr(),
///     &ConnectionAddr::Tcp("cache.internal".to_string(), 6380)
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnectionSpec {
    /// `127.0.0.1:6379`.
    #[default]
    Default,
    /// Localhost on the given port.
    Port(u16),
    HostPort {
        host: String,
        port: u16,
    },
    /// Unix domain socket path, used as given.
    Path(String),
    /// Connection string handed to the client untouched.
    Url(String),
    Options(ConnectionOptions),
}

impl ConnectionSpec {
    /// Build the connection settings understood by the `redis` client.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an empty host or socket path, or a URL
    /// the client cannot parse.
    pub fn connection_info(&self) -> Result<ConnectionInfo> {
        match self {
            ConnectionSpec::Default => ConnectionOptions::default().connection_info(),
            ConnectionSpec::Port(port) => ConnectionOptions {
                port: *port,
                ..Default::default()
            }
            .connection_info(),
            ConnectionSpec::HostPort { host, port } => ConnectionOptions {
                host: host.clone(),
                port: *port,
                ..Default::default()
            }
            .connection_info(),
            ConnectionSpec::Path(path) => {
                if path.is_empty() {
                    return Err(Error::Config("Socket path must not be empty".to_string()));
                }
                into_info(ConnectionAddr::Unix(PathBuf::from(path)))
            }
            ConnectionSpec::Url(url) => into_info(url.as_str()),
            ConnectionSpec::Options(options) => options.connection_info(),
        }
    }
}

impl From<ConnectionOptions> for ConnectionSpec {
    fn from(options: ConnectionOptions) -> Self {
        ConnectionSpec::Options(options)
    }
}

impl From<u16> for ConnectionSpec {
    fn from(port: u16) -> Self {
        ConnectionSpec::Port(port)
    }
}

/// Structured connection options for a single node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Logical database index.
    pub db: i64,
    /// Connect over TLS. Requires a TLS-enabled `redis` build.
    pub tls: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        ConnectionOptions {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            db: 0,
            tls: false,
        }
    }
}

impl ConnectionOptions {
    /// Load options from the environment.
    ///
    /// # Environment Variables
    /// - `REDIS_HOST` (default: `127.0.0.1`)
    /// - `REDIS_PORT` (default: `6379`)
    /// - `REDIS_USERNAME`, `REDIS_PASSWORD` (default: unset)
    /// - `REDIS_DB` (default: `0`)
    /// - `REDIS_TLS`, `true`/`1` to enable (default: off)
    ///
    /// Unparsable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        ConnectionOptions {
            host: env::var("REDIS_HOST")
                .ok()
                .filter(|h| !h.is_empty())
                .unwrap_or(defaults.host),
            port: env::var("REDIS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            username: env::var("REDIS_USERNAME").ok().filter(|v| !v.is_empty()),
            password: env::var("REDIS_PASSWORD").ok().filter(|v| !v.is_empty()),
            db: env::var("REDIS_DB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.db),
            tls: env::var("REDIS_TLS")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.tls),
        }
    }

    /// Build the address plus credentials and database index.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the host is empty.
    pub fn connection_info(&self) -> Result<ConnectionInfo> {
        let addr = node_addr(&self.host, self.port, self.tls)?;

        let mut settings = RedisConnectionInfo::default().set_db(self.db);
        if let Some(username) = &self.username {
            settings = settings.set_username(username);
        }
        if let Some(password) = &self.password {
            settings = settings.set_password(password);
        }

        Ok(into_info(addr)?.set_redis_settings(settings))
    }
}

/// One seed node of a Redis cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterNode {
    pub host: String,
    pub port: u16,
}

impl ClusterNode {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ClusterNode {
            host: host.into(),
            port,
        }
    }
}

/// Options shared by every node of a cluster connection.
///
/// Credentials are applied by the cluster client builder, not per node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterOptions {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Route read-only commands to a random replica.
    pub read_from_replicas: bool,
    /// Connect to nodes over TLS.
    pub tls: bool,
}

impl ClusterOptions {
    /// One address per seed node.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an empty node list or an empty host.
    pub fn node_addrs(&self, nodes: &[ClusterNode]) -> Result<Vec<ConnectionAddr>> {
        if nodes.is_empty() {
            return Err(Error::Config("No cluster nodes specified".to_string()));
        }

        nodes
            .iter()
            .map(|node| node_addr(&node.host, node.port, self.tls))
            .collect()
    }
}

fn node_addr(host: &str, port: u16, tls: bool) -> Result<ConnectionAddr> {
    if host.is_empty() {
        return Err(Error::Config("Host must not be empty".to_string()));
    }

    Ok(if tls {
        ConnectionAddr::TcpTls {
            host: host.to_string(),
            port,
            insecure: false,
            tls_params: None,
        }
    } else {
        ConnectionAddr::Tcp(host.to_string(), port)
    })
}

fn into_info(target: impl IntoConnectionInfo) -> Result<ConnectionInfo> {
    target
        .into_connection_info()
        .map_err(|e| Error::Config(format!("Invalid Redis connection settings: {}", e)))
}

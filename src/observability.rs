//! Metrics hooks for cache operations.

use std::time::Duration;

/// Receives hit/miss/error notifications from the facade.
///
/// Implement this to forward cache statistics to Prometheus, StatsD or any
/// other sink. Every method defaults to a no-op.
pub trait CacheMetrics: Send + Sync {
    /// A `get` found a value.
    fn record_hit(&self, _key: &str, _duration: Duration) {}

    /// A `get` found nothing (or failed open).
    fn record_miss(&self, _key: &str, _duration: Duration) {}

    /// An operation failed, whether or not the failure was swallowed.
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// Metrics sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {}

//! Value sources for the cache-aside helpers.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;

/// Where `remember` and `forever` get a value from on a cache miss.
///
/// The source is consumed only on a miss; a hit drops it unused.
///
/// # Example
///
/// ```
/// use cache_facade::Source;
///
/// let literal = Source::value(42);
/// let computed = Source::with(|| 6 * 7);
/// let fetched = Source::future(|| async { 42 });
/// # let _ = (literal, computed, fetched);
/// ```
pub enum Source<T> {
    /// A value that is already known.
    Literal(T),
    /// Computed synchronously when needed.
    Producer(Box<dyn FnOnce() -> T + Send>),
    /// Computed asynchronously when needed.
    AsyncProducer(Box<dyn FnOnce() -> BoxFuture<'static, T> + Send>),
}

impl<T> Source<T> {
    pub fn value(value: T) -> Self {
        Source::Literal(value)
    }

    pub fn with<F>(producer: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Source::Producer(Box::new(producer))
    }

    pub fn future<F, Fut>(producer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Source::AsyncProducer(Box::new(move || Box::pin(producer())))
    }

    /// Produce the value, running the producer if there is one.
    pub async fn resolve(self) -> T {
        match self {
            Source::Literal(value) => value,
            Source::Producer(producer) => producer(),
            Source::AsyncProducer(producer) => producer().await,
        }
    }
}

impl<T> From<T> for Source<T> {
    fn from(value: T) -> Self {
        Source::Literal(value)
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Source::Literal(_) => "Literal",
            Source::Producer(_) => "Producer",
            Source::AsyncProducer(_) => "AsyncProducer",
        };
        f.debug_tuple("Source").field(&kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_literal() {
        assert_eq!(Source::value("cached").resolve().await, "cached");
        assert_eq!(Source::from(7).resolve().await, 7);
    }

    #[tokio::test]
    async fn test_producer_runs_on_resolve() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let source = Source::with(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "computed".to_string()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.resolve().await, "computed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_producer() {
        let source = Source::future(|| async {
            tokio::task::yield_now().await;
            vec![1, 2, 3]
        });
        assert_eq!(format!("{:?}", source), "Source(\"AsyncProducer\")");
        assert_eq!(source.resolve().await, vec![1, 2, 3]);
    }
}

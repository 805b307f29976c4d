//! Memoized asynchronous computations.
//!
//! # Data Flow
//! ```text
//! matcher asks for a value
//!     → Resolvable::resolve_chunks(request, env, into_step)
//!     → cache.rs (one shared computation per key)
//!     → settled already?  → chunks now, no continuation
//!     → still running?    → no chunks yet + continuation
//! ```
//!
//! # Design Decisions
//! - The cache lives in an `Env` owned by a `Router`, never in a global
//! - Superseded callers simply drop their continuation; the computation
//!   stays in the cache and a later request picks it up where it left off
//! - Failed computations are evicted so the next request retries

pub mod cache;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

use crate::error::ResolveError;
use crate::routing::request::NaviRequest;
use crate::routing::step::Step;

pub use cache::ResolvableCache;
use cache::ErasedValue;

/// Environment handed to every matcher evaluation.
#[derive(Debug, Clone)]
pub struct Env {
    cache: Arc<ResolvableCache>,
}

impl Env {
    pub fn new(cache: Arc<ResolvableCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ResolvableCache {
        &self.cache
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new(Arc::new(ResolvableCache::default()))
    }
}

type Compute<T> =
    Arc<dyn Fn(NaviRequest) -> BoxFuture<'static, Result<T, ResolveError>> + Send + Sync>;
type KeyFn = Arc<dyn Fn(&NaviRequest) -> String + Send + Sync>;

/// A deferred computation memoized by request-derived key.
pub struct Resolvable<T> {
    id: Arc<str>,
    compute: Compute<T>,
    key: Option<KeyFn>,
}

impl<T> Clone for Resolvable<T> {
    fn clone(&self) -> Self {
        Self {
            id: Arc::clone(&self.id),
            compute: Arc::clone(&self.compute),
            key: self.key.clone(),
        }
    }
}

impl<T> fmt::Debug for Resolvable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolvable").field("id", &self.id).finish()
    }
}

impl<T> Resolvable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap `compute`. `id` namespaces the cache keys of this resolvable.
    pub fn new<F, Fut>(id: impl Into<String>, compute: F) -> Self
    where
        F: Fn(NaviRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ResolveError>> + Send + 'static,
    {
        Self {
            id: Arc::from(id.into()),
            compute: Arc::new(move |request| compute(request).boxed()),
            key: None,
        }
    }

    /// Derive the memoization key from the request with `key`.
    ///
    /// By default the key is the matched url plus the query string, so
    /// requests differing in params or query never share a value.
    pub fn keyed_by<K>(mut self, key: K) -> Self
    where
        K: Fn(&NaviRequest) -> String + Send + Sync + 'static,
    {
        self.key = Some(Arc::new(key));
        self
    }

    /// Apply `key` unless a key function was already chosen.
    pub(crate) fn or_keyed_by<K>(self, key: K) -> Self
    where
        K: Fn(&NaviRequest) -> String + Send + Sync + 'static,
    {
        if self.key.is_some() {
            self
        } else {
            self.keyed_by(key)
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Cache key for `request`.
    pub fn key(&self, request: &NaviRequest) -> String {
        let input = match &self.key {
            Some(key) => key(request),
            None => format!("{}{}", request.matched_url(), request.search()),
        };
        format!("{}|{}", self.id, input)
    }

    /// Resolve into a step: chunks available now plus a continuation.
    ///
    /// `into_step` turns the settled value into chunks. It runs immediately
    /// when the value is already available, otherwise inside the continuation.
    pub fn resolve_chunks<F>(&self, request: &NaviRequest, env: &Env, into_step: F) -> Step
    where
        F: FnOnce(Result<T, ResolveError>) -> Step + Send + 'static,
    {
        let key = self.key(request);
        let (id, resolution) = env.cache().get_or_start(&key, || {
            tracing::trace!(key = %key, "Starting resolution");
            (self.compute)(request.clone())
                .map(|result| result.map(|value| Arc::new(value) as ErasedValue))
                .boxed()
        });

        if let Some(result) = resolution.clone().now_or_never() {
            return into_step(Self::settled(env, &key, id, result));
        }

        let env = env.clone();
        Step::pending(
            Vec::new(),
            async move {
                let result = resolution.await;
                into_step(Self::settled(&env, &key, id, result))
            }
            .boxed(),
        )
    }

    /// Await the value directly, sharing the cached computation.
    pub async fn resolve(&self, request: &NaviRequest, env: &Env) -> Result<T, ResolveError> {
        let key = self.key(request);
        let (id, resolution) = env.cache().get_or_start(&key, || {
            (self.compute)(request.clone())
                .map(|result| result.map(|value| Arc::new(value) as ErasedValue))
                .boxed()
        });
        Self::settled(env, &key, id, resolution.await)
    }

    fn settled(
        env: &Env,
        key: &str,
        id: u64,
        result: Result<ErasedValue, ResolveError>,
    ) -> Result<T, ResolveError> {
        let value = result.and_then(|value| {
            value
                .downcast_ref::<T>()
                .cloned()
                .ok_or_else(|| ResolveError::new(format!("cached value for {key} has another type")))
        });
        if value.is_err() {
            env.cache().evict_failed(key, id);
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::chunk::{Chunk, ChunkKind};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn data_step(request: &NaviRequest) -> impl FnOnce(Result<Value, ResolveError>) -> Step {
        let request = request.clone();
        move |result| match result {
            Ok(value) => Step::done(vec![Chunk::new(
                &request,
                ChunkKind::Data { value, replace: false },
            )]),
            Err(_) => Step::empty(),
        }
    }

    #[test]
    fn test_ready_value_is_available_without_waiting() {
        let env = Env::default();
        let resolvable = Resolvable::new("ready", |_req| async { Ok(json!({"n": 1})) });
        let request = NaviRequest::parse("/", Value::Null);

        let step = resolvable.resolve_chunks(&request, &env, data_step(&request));
        assert!(!step.is_pending());
        assert_eq!(step.chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let env = Env::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let counter = Arc::clone(&calls);
        let wait = Arc::clone(&gate);
        let resolvable = Resolvable::new("gated", move |_req| {
            counter.fetch_add(1, Ordering::SeqCst);
            let wait = Arc::clone(&wait);
            async move {
                wait.notified().await;
                Ok(json!("loaded"))
            }
        });

        let request = NaviRequest::parse("/page", Value::Null);
        let first = resolvable.resolve_chunks(&request, &env, data_step(&request));
        let second = resolvable.resolve_chunks(&request, &env, data_step(&request));
        assert!(first.is_pending());
        assert!(second.is_pending());

        gate.notify_one();
        let (a, b) = tokio::join!(first.settle(), second.settle());
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_evicted() {
        let env = Env::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let resolvable: Resolvable<Value> = Resolvable::new("flaky", move |_req| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(ResolveError::new("backend down")) }
        });
        let request = NaviRequest::parse("/", Value::Null);

        assert!(resolvable.resolve(&request, &env).await.is_err());
        assert!(resolvable.resolve(&request, &env).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(env.cache().is_empty());
    }

    #[test]
    fn test_default_key_includes_query() {
        let resolvable = Resolvable::new("search", |_req| async { Ok(0u32) });
        let request = NaviRequest::parse("/?q=rust", Value::Null);
        assert_eq!(resolvable.key(&request), "search|/?q=rust");
        assert_eq!(
            resolvable.key(&NaviRequest::parse("/", Value::Null)),
            "search|/"
        );
    }

    #[test]
    fn test_custom_key() {
        let resolvable = Resolvable::new("module", |_req| async { Ok(0u32) })
            .keyed_by(|req| req.matched_url());
        let request = NaviRequest::parse("/?q=rust", Value::Null);
        assert_eq!(resolvable.key(&request), "module|/");

        let kept = resolvable.or_keyed_by(|_req| "ignored".to_string());
        assert_eq!(kept.key(&request), "module|/");
    }

    #[tokio::test]
    async fn test_distinct_queries_compute_separately() {
        let env = Env::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let resolvable = Resolvable::new("search", move |req: NaviRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(json!(req.query.get("q").cloned())) }
        });

        let a = NaviRequest::parse("/search?q=a", Value::Null);
        let b = NaviRequest::parse("/search?q=b", Value::Null);
        assert_eq!(resolvable.resolve(&a, &env).await.unwrap(), json!("a"));
        assert_eq!(resolvable.resolve(&b, &env).await.unwrap(), json!("b"));
        assert_eq!(resolvable.resolve(&a, &env).await.unwrap(), json!("a"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

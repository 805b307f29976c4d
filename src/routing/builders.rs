//! Terminal matcher builders.
//!
//! Thin producers of the chunk model: fixed chunks, request-derived chunks,
//! and chunks backed by a `Resolvable` (lazy data, lazy views, code-split
//! matchers).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};

use crate::error::{ResolveError, RouteError};
use crate::resolvable::{Env, Resolvable};
use crate::routing::chunk::{Chunk, ChunkKind, HeadTag};
use crate::routing::matcher::{leaf_paths, Matcher, Producer};
use crate::routing::request::{resolve_target, Method, NaviRequest};
use crate::routing::step::Step;

/// Emits the same chunk kinds for every request.
#[derive(Debug, Clone)]
pub struct Fixed(pub Vec<ChunkKind>);

impl Producer for Fixed {
    fn produce(&self, request: &NaviRequest, _env: &Env) -> Step {
        Step::done(
            self.0
                .iter()
                .map(|kind| Chunk::new(request, kind.clone()))
                .collect(),
        )
    }
}

type ChunkFn = Arc<dyn Fn(&NaviRequest) -> Vec<ChunkKind> + Send + Sync>;

/// Emits chunks computed synchronously from the request.
#[derive(Clone)]
pub struct FnProducer {
    name: &'static str,
    f: ChunkFn,
}

impl FnProducer {
    pub fn new<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&NaviRequest) -> Vec<ChunkKind> + Send + Sync + 'static,
    {
        Self {
            name,
            f: Arc::new(f),
        }
    }
}

impl fmt::Debug for FnProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnProducer").field(&self.name).finish()
    }
}

impl Producer for FnProducer {
    fn produce(&self, request: &NaviRequest, _env: &Env) -> Step {
        Step::done(
            (self.f)(request)
                .into_iter()
                .map(|kind| Chunk::new(request, kind))
                .collect(),
        )
    }
}

/// Redirect relative to the matched url.
#[derive(Debug, Clone)]
struct Redirect {
    to: String,
}

impl Producer for Redirect {
    fn produce(&self, request: &NaviRequest, _env: &Env) -> Step {
        let to = resolve_target(&request.matched_url(), &self.to);
        Step::done(vec![Chunk::new(request, ChunkKind::Redirect { to })])
    }
}

/// Chunks produced from a resolved value.
struct Resolved<T> {
    resolvable: Resolvable<T>,
    into_kind: fn(T) -> ChunkKind,
}

impl<T> fmt::Debug for Resolved<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resolved").field(&self.resolvable).finish()
    }
}

impl<T> Producer for Resolved<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn produce(&self, request: &NaviRequest, env: &Env) -> Step {
        if request.method == Method::Head {
            return Step::empty();
        }
        let into_kind = self.into_kind;
        let owner = request.clone();
        self.resolvable
            .resolve_chunks(request, env, move |result| match result {
                Ok(value) => Step::done(vec![Chunk::new(&owner, into_kind(value))]),
                Err(err) => resolution_failed(&owner, err),
            })
    }
}

/// A matcher loaded asynchronously, then evaluated in place.
struct Lazy {
    resolvable: Resolvable<Matcher>,
}

impl fmt::Debug for Lazy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Lazy").field(&self.resolvable).finish()
    }
}

impl Producer for Lazy {
    fn produce(&self, request: &NaviRequest, env: &Env) -> Step {
        let owner = request.clone();
        let scope = env.clone();
        self.resolvable
            .resolve_chunks(request, env, move |result| match result {
                Ok(matcher) if owner.path.is_empty() || matcher.accepts_nested() => {
                    matcher.evaluate(&owner, &scope)
                }
                Ok(_) => Step::done(vec![Chunk::error(
                    &owner,
                    RouteError::NotFound {
                        url: owner.pathname(),
                    },
                )]),
                Err(err) => resolution_failed(&owner, err),
            })
    }

    fn accepts_nested(&self) -> bool {
        true
    }

    fn enumerate(&self, request: &NaviRequest, env: &Env) -> BoxFuture<'static, Vec<String>> {
        let resolvable = self.resolvable.clone();
        let request = request.clone();
        let env = env.clone();
        async move {
            match resolvable.resolve(&request, &env).await {
                Ok(matcher) => matcher.enumerate(&request, &env).await,
                Err(err) => {
                    tracing::warn!(url = %request.pathname(), error = %err, "Lazy matcher failed during crawl");
                    leaf_paths(&request)
                }
            }
        }
        .boxed()
    }
}

fn resolution_failed(request: &NaviRequest, err: ResolveError) -> Step {
    tracing::debug!(url = %request.pathname(), error = %err, "Resolution failed");
    Step::done(vec![Chunk::error(
        request,
        RouteError::Resolution {
            url: request.pathname(),
            message: err.to_string(),
        },
    )])
}

pub fn title(title: impl Into<String>) -> Matcher {
    Matcher::terminal(Fixed(vec![ChunkKind::Title {
        title: title.into(),
    }]))
}

pub fn status(status: u16) -> Matcher {
    Matcher::terminal(Fixed(vec![ChunkKind::Status { status }]))
}

pub fn view(view: impl Into<String>) -> Matcher {
    Matcher::terminal(Fixed(vec![ChunkKind::View { view: view.into() }]))
}

pub fn context(value: Map<String, Value>) -> Matcher {
    Matcher::terminal(Fixed(vec![ChunkKind::Context { value }]))
}

pub fn headers<K, V>(headers: impl IntoIterator<Item = (K, V)>) -> Matcher
where
    K: Into<String>,
    V: Into<String>,
{
    let headers: BTreeMap<String, String> = headers
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    Matcher::terminal(Fixed(vec![ChunkKind::Headers { headers }]))
}

pub fn head(tags: Vec<HeadTag>) -> Matcher {
    Matcher::terminal(Fixed(vec![ChunkKind::Head { tags }]))
}

/// Data shallow-merged over data from enclosing matchers.
pub fn data(value: Value) -> Matcher {
    Matcher::terminal(Fixed(vec![ChunkKind::Data {
        value,
        replace: false,
    }]))
}

/// Data replacing whatever enclosing matchers contributed.
pub fn replace_data(value: Value) -> Matcher {
    Matcher::terminal(Fixed(vec![ChunkKind::Data {
        value,
        replace: true,
    }]))
}

/// Redirect to `to`, resolved against the matched url when relative.
pub fn redirect(to: impl Into<String>) -> Matcher {
    Matcher::terminal(Redirect { to: to.into() })
}

/// Fail with an explicit status.
pub fn error(status: u16, message: impl Into<String>) -> Matcher {
    Matcher::terminal(Fixed(vec![ChunkKind::Error {
        error: RouteError::Custom {
            status,
            message: message.into(),
        },
    }]))
}

/// Data fetched through `resolvable`; skipped for `Method::Head`.
pub fn lazy_data(resolvable: Resolvable<Value>) -> Matcher {
    Matcher::terminal(Resolved {
        resolvable,
        into_kind: |value| ChunkKind::Data {
            value,
            replace: false,
        },
    })
}

/// View reference loaded through `resolvable`; skipped for `Method::Head`.
pub fn lazy_view(resolvable: Resolvable<String>) -> Matcher {
    Matcher::terminal(Resolved {
        resolvable,
        into_kind: |view| ChunkKind::View { view },
    })
}

/// A matcher loaded through `resolvable` and evaluated once available.
///
/// Unless `resolvable` sets its own key, the loaded tree is memoized by
/// mount point only, so every path and query below it shares one load.
pub fn lazy(resolvable: Resolvable<Matcher>) -> Matcher {
    Matcher::terminal(Lazy {
        resolvable: resolvable.or_keyed_by(NaviRequest::matched_url),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::mount::Mount;
    use serde_json::json;

    fn request(url: &str) -> NaviRequest {
        NaviRequest::parse(url, Value::Null)
    }

    #[test]
    fn test_relative_redirect() {
        let mount = Matcher::mount(Mount::new([("/old", redirect("../new"))]));
        let step = mount.evaluate(&request("/old"), &Env::default());
        assert_eq!(
            step.chunks[0].kind,
            ChunkKind::Redirect { to: "/new".into() }
        );
    }

    #[test]
    fn test_lazy_data_skipped_for_head() {
        let matcher = lazy_data(Resolvable::new("data", |_req| async { Ok(json!(1)) }));
        let req = request("/").with_method(Method::Head);
        let step = matcher.evaluate(&req, &Env::default());
        assert!(step.chunks.is_empty());
        assert!(!step.is_pending());
    }

    #[tokio::test]
    async fn test_lazy_matcher_evaluates_loaded_tree() {
        let loaded = Resolvable::new("docs", |_req| async {
            tokio::task::yield_now().await;
            Ok(Matcher::mount(Mount::new([
                ("/", title("Docs")),
                ("/intro", title("Intro")),
            ])))
        });
        let root = Matcher::mount(Mount::new([("/docs", lazy(loaded))]));
        let env = Env::default();

        let step = root.evaluate(&request("/docs/intro"), &env);
        assert!(step.is_pending());
        let chunks = step.settle().await;
        assert_eq!(chunks[0].kind, ChunkKind::Title { title: "Intro".into() });

        // Loaded module is cached, second visit is synchronous
        let step = root.evaluate(&request("/docs"), &env);
        assert!(!step.is_pending());
        assert_eq!(step.chunks[0].kind, ChunkKind::Title { title: "Docs".into() });

        // Keyed by mount point, so a query below it reuses the load
        let step = root.evaluate(&request("/docs/intro?tab=2"), &env);
        assert!(!step.is_pending());

        let mut paths = root.enumerate(&request("/"), &env).await;
        paths.sort();
        assert_eq!(paths, vec!["/docs", "/docs/intro"]);
    }

    #[tokio::test]
    async fn test_lazy_data_failure_becomes_error_chunk() {
        let failing: Resolvable<Value> =
            Resolvable::new("broken", |_req| async { Err("timeout".into()) });
        let step = lazy_data(failing).evaluate(&request("/"), &Env::default());
        let chunks = step.settle().await;
        match &chunks[0].kind {
            ChunkKind::Error { error } => assert_eq!(error.status(), 500),
            other => panic!("expected error chunk, got {other:?}"),
        }
    }
}

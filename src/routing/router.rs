//! Route resolution and crawling.
//!
//! # Responsibilities
//! - Bind a root matcher to a resolvable cache and a reducer
//! - Resolve one location to a settled `Route`
//! - Crawl every statically reachable path into a `SiteMap`
//!
//! # Design Decisions
//! - Immutable after construction; share it behind an `Arc`
//! - `resolve` never fails: problems come back as `Route`s of type Error
//! - A crawl isolates per-path failures, only a redirect cycle aborts it

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::error::{RouteError, RouterError, RouterResult};
use crate::observability::metrics;
use crate::resolvable::{Env, ResolvableCache};
use crate::route::reducer::{self, default_route_reducer, RouteReducer};
use crate::route::{Route, RouteMap, RouteType, SiteMap};
use crate::routing::chunk::Chunk;
use crate::routing::matcher::Matcher;
use crate::routing::request::{is_external, normalize_path, Method, NaviRequest};
use crate::routing::step::Step;

/// Router-level settings.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Path the whole tree is mounted below.
    pub basename: String,
    /// Maximum number of memoized resolvable computations.
    pub cache_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            basename: "/".to_string(),
            cache_capacity: 256,
        }
    }
}

pub struct Router {
    root: Matcher,
    env: Env,
    config: RouterConfig,
    reducer: RouteReducer,
}

impl Router {
    pub fn new(root: Matcher) -> Self {
        Self::with_config(root, RouterConfig::default())
    }

    pub fn with_config(root: Matcher, config: RouterConfig) -> Self {
        let config = RouterConfig {
            basename: normalize_path(&config.basename),
            ..config
        };
        let cache = Arc::new(ResolvableCache::new(config.cache_capacity));
        Self {
            root,
            env: Env::new(cache),
            config,
            reducer: default_route_reducer,
        }
    }

    /// Replace the function folding chunks into routes.
    pub fn with_reducer(mut self, reducer: RouteReducer) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn request(&self, url: &str, context: Value) -> NaviRequest {
        NaviRequest::parse(url, context)
    }

    /// Begin evaluating `request` against the root matcher.
    pub fn start(&self, request: &NaviRequest) -> Step {
        match request.rebase(&self.config.basename) {
            Some(rebased) => self.root.evaluate(&rebased, &self.env),
            None => {
                tracing::debug!(
                    url = %request.pathname(),
                    basename = %self.config.basename,
                    "Request outside basename"
                );
                Step::done(vec![Chunk::error(
                    request,
                    RouteError::NotFound {
                        url: request.pathname(),
                    },
                )])
            }
        }
    }

    /// Fold the chunks of `step` into a snapshot for `url`.
    pub fn snapshot(&self, url: &str, step: &Step) -> Route {
        reducer::snapshot(self.reducer, url, step.chunks.clone(), step.is_pending())
    }

    /// Resolve `url` until the route settles.
    pub async fn resolve(&self, url: &str, context: Value) -> Route {
        self.resolve_request(self.request(url, context)).await
    }

    pub async fn resolve_request(&self, request: NaviRequest) -> Route {
        let started = Instant::now();
        let url = request.pathname();
        let chunks = self.start(&request).settle().await;
        let route = reducer::snapshot(self.reducer, &url, chunks, false);
        metrics::record_resolution(route.route_type, started);
        route
    }

    /// Resolve every path reachable from `roots`.
    pub async fn crawl<S: AsRef<str>>(&self, roots: &[S]) -> RouterResult<SiteMap> {
        self.crawl_with(roots, Method::Get).await
    }

    /// Crawl without fetching lazy data or views.
    pub async fn route_map<S: AsRef<str>>(&self, roots: &[S]) -> RouterResult<RouteMap> {
        let site_map = self.crawl_with(roots, Method::Head).await?;
        Ok(RouteMap::from(&site_map))
    }

    async fn crawl_with<S: AsRef<str>>(&self, roots: &[S], method: Method) -> RouterResult<SiteMap> {
        let started = Instant::now();
        tracing::info!(roots = roots.len(), ?method, "Crawl started");

        let mut queue = VecDeque::new();
        let mut seen = BTreeSet::new();
        for root in roots {
            for path in self.enumerate(root.as_ref(), method).await {
                if seen.insert(path.clone()) {
                    queue.push_back(path);
                }
            }
        }

        let mut site_map = SiteMap::default();
        while let Some(path) = queue.pop_front() {
            if site_map.routes.contains_key(&path) {
                continue;
            }
            let route = self.crawl_path(&path, method).await;
            site_map.routes.insert(path.clone(), route.clone());
            if route.route_type == RouteType::Redirect {
                let destination = self.follow_redirects(&path, route, method, &mut site_map.routes).await?;
                site_map.redirects.insert(path, destination);
            }
        }

        tracing::info!(
            paths = site_map.routes.len(),
            redirects = site_map.redirects.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Crawl finished"
        );
        Ok(site_map)
    }

    /// Paths below `root`; the root itself when nothing can be enumerated.
    async fn enumerate(&self, root: &str, method: Method) -> Vec<String> {
        let request = self.request(root, Value::Null).with_method(method);
        let paths = match request.rebase(&self.config.basename) {
            Some(rebased) => self.root.enumerate(&rebased, &self.env).await,
            None => Vec::new(),
        };
        if paths.is_empty() {
            vec![request.pathname()]
        } else {
            paths
        }
    }

    async fn crawl_path(&self, path: &str, method: Method) -> Route {
        metrics::record_crawled_path();
        let request = self.request(path, Value::Null).with_method(method);
        let route = self.resolve_request(request).await;
        if route.route_type == RouteType::Error {
            tracing::warn!(path, status = route.status, "Crawled path settled on an error");
        }
        route
    }

    /// Follow internal redirects from `source`, returning the final target.
    async fn follow_redirects(
        &self,
        source: &str,
        mut route: Route,
        method: Method,
        routes: &mut BTreeMap<String, Route>,
    ) -> RouterResult<String> {
        let mut chain = vec![source.to_string()];
        while let Some(target) = route.redirect_to.clone() {
            if is_external(&target) {
                return Ok(target);
            }
            let target = self.request(&target, Value::Null).pathname();
            if chain.contains(&target) {
                chain.push(target);
                tracing::error!(chain = ?chain, "Redirect cycle detected during crawl");
                return Err(RouterError::CrawlCycle(chain));
            }
            chain.push(target.clone());

            route = match routes.get(&target) {
                Some(known) => known.clone(),
                None => {
                    let resolved = self.crawl_path(&target, method).await;
                    routes.insert(target.clone(), resolved.clone());
                    resolved
                }
            };
            if route.route_type != RouteType::Redirect {
                return Ok(target);
            }
        }
        Ok(chain.last().cloned().unwrap_or_default())
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish()
    }
}

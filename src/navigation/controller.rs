//! Live navigation controller.
//!
//! # Responsibilities
//! - Track the current location and ambient context
//! - Start a resolution per location and fold its steps into snapshots
//! - Publish snapshots to subscribers, dropping those of superseded resolutions
//! - Follow internal redirects up to a configured limit
//!
//! # Design Decisions
//! - Every resolution gets a generation number; a snapshot is delivered only
//!   while its generation is still the current one
//! - The first snapshot of a location is published before `goto` returns
//! - A superseded resolution keeps running in the background so the
//!   resolvables it started still land in the cache

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::RouteError;
use crate::navigation::observable::{Publisher, Subscription};
use crate::navigation::state::NavigationState;
use crate::observability::metrics;
use crate::route::{Route, RouteType};
use crate::routing::chunk::Chunk;
use crate::routing::request::{is_external, NaviRequest};
use crate::routing::router::Router;
use crate::routing::step::{Continuation, Step};

/// Navigation behaviour settings.
#[derive(Debug, Clone)]
pub struct NavigationConfig {
    /// Start resolving internal redirect targets automatically.
    pub follow_redirects: bool,
    /// Redirect hops followed per `goto` before giving up.
    pub max_redirects: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            max_redirects: 8,
        }
    }
}

struct Shared {
    router: Arc<Router>,
    config: NavigationConfig,
    generation: AtomicU64,
    disposed: AtomicBool,
    context: ArcSwap<Value>,
    location: Mutex<Option<String>>,
    task: Mutex<Option<JoinHandle<()>>>,
    state: watch::Sender<NavigationState>,
    routes: Publisher<Route>,
}

/// Binds a changing location to a stream of route snapshots.
///
/// Resolutions that suspend are driven on the ambient Tokio runtime. Without
/// one, a suspended resolution settles immediately on an error route.
pub struct Navigation {
    shared: Arc<Shared>,
}

impl Navigation {
    /// A navigation that has not requested any location yet.
    pub fn new(router: Arc<Router>, context: Value, config: NavigationConfig) -> Self {
        let (state, _) = watch::channel(NavigationState::NotStarted);
        Self {
            shared: Arc::new(Shared {
                router,
                config,
                generation: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
                context: ArcSwap::from_pointee(context),
                location: Mutex::new(None),
                task: Mutex::new(None),
                state,
                routes: Publisher::new(),
            }),
        }
    }

    /// A navigation already resolving `url`.
    pub fn open(router: Arc<Router>, url: &str, context: Value, config: NavigationConfig) -> Self {
        let navigation = Self::new(router, context, config);
        navigation.goto(url);
        navigation
    }

    /// Move to `url`. Does nothing when `url` is already the current location.
    pub fn goto(&self, url: &str) {
        if self.is_disposed() {
            tracing::warn!(url, "goto on a disposed navigation");
            return;
        }
        let location = canonical(url);
        if self.location().as_deref() == Some(location.as_str()) {
            tracing::debug!(location = %location, "Location already current");
            return;
        }
        self.shared.start(location, 0);
    }

    /// Resolve the current location again.
    ///
    /// Memoized resolvables are reused; clear the router's cache first to refetch.
    pub fn refresh(&self) {
        if self.is_disposed() {
            return;
        }
        if let Some(location) = self.location() {
            self.shared.start(location, 0);
        }
    }

    /// Replace the ambient context and resolve the current location with it.
    pub fn set_context(&self, context: Value) {
        self.shared.context.store(Arc::new(context));
        self.refresh();
    }

    pub fn context(&self) -> Arc<Value> {
        self.shared.context.load_full()
    }

    /// Current location as path plus query.
    pub fn location(&self) -> Option<String> {
        lock(&self.shared.location).clone()
    }

    pub fn current_route(&self) -> Option<Arc<Route>> {
        self.shared.routes.current()
    }

    pub fn state(&self) -> NavigationState {
        *self.shared.state.borrow()
    }

    /// Receive every snapshot, starting with the current one.
    pub fn subscribe(&self, callback: impl Fn(&Route) + Send + Sync + 'static) -> Subscription {
        self.shared.routes.subscribe(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.routes.subscriber_count()
    }

    /// Wait until the current location settles, then return its route.
    ///
    /// Returns `None` once the navigation is disposed.
    pub async fn steady(&self) -> Option<Arc<Route>> {
        let mut states = self.shared.state.subscribe();
        let shared = Arc::clone(&self.shared);
        let settled = states
            .wait_for(|state| state.is_settled() || shared.disposed.load(Ordering::SeqCst))
            .await
            .is_ok();
        if !settled || self.is_disposed() {
            return None;
        }
        self.current_route()
    }

    /// Stop delivering snapshots and release every subscriber.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = lock(&self.shared.task).take() {
            task.abort();
        }
        self.shared.routes.clear();
        self.shared.state.send_modify(|_| {});
        tracing::debug!(location = ?self.location(), "Navigation disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }
}

impl Drop for Navigation {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Navigation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigation")
            .field("location", &self.location())
            .field("state", &self.state())
            .field("generation", &self.shared.generation.load(Ordering::SeqCst))
            .finish()
    }
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        !self.disposed.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }

    fn start(self: &Arc<Self>, location: String, redirects: usize) {
        let generation = {
            let mut current = lock(&self.location);
            *current = Some(location.clone());
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        // The previous task is detached, not aborted
        lock(&self.task).take();
        self.transition(NavigationState::Busy);

        let request = self
            .router
            .request(&location, self.context.load().as_ref().clone());
        let url = request.pathname();
        let step = self.router.start(&request);
        let route = self.router.snapshot(&url, &step);
        tracing::debug!(url = %url, generation, pending = step.is_pending(), "Navigation started");

        let Step { chunks, next } = step;
        match next {
            None => {
                self.emit(generation, route.clone());
                self.settle(generation, route, redirects);
            }
            Some(next) => match Handle::try_current() {
                Ok(handle) => {
                    self.emit(generation, route);
                    let task = handle.spawn(Arc::clone(self).drive(generation, url, next, redirects));
                    let mut slot = lock(&self.task);
                    if self.is_current(generation) {
                        *slot = Some(task);
                    }
                }
                Err(err) => {
                    tracing::error!(url = %url, error = %err, "No runtime to drive a pending resolution");
                    let route = self.unresolvable(&request, &url, chunks, &err.to_string());
                    self.emit(generation, route.clone());
                    self.settle(generation, route, redirects);
                }
            },
        }
    }

    /// Terminal error route for a resolution that cannot be driven.
    fn unresolvable(&self, request: &NaviRequest, url: &str, mut chunks: Vec<Chunk>, reason: &str) -> Route {
        chunks.push(Chunk::error(
            request,
            RouteError::Resolution {
                url: url.to_string(),
                message: reason.to_string(),
            },
        ));
        self.router.snapshot(url, &Step::done(chunks))
    }

    async fn drive(self: Arc<Self>, generation: u64, url: String, mut next: Continuation, redirects: usize) {
        loop {
            let step = next.await;
            if !self.is_current(generation) {
                metrics::record_superseded_snapshot();
                tracing::debug!(url = %url, generation, "Resolution superseded, finishing in background");
                step.settle().await;
                return;
            }

            let route = self.router.snapshot(&url, &step);
            match step.next {
                Some(more) => {
                    self.emit(generation, route);
                    next = more;
                }
                None => {
                    self.emit(generation, route.clone());
                    self.settle(generation, route, redirects);
                    return;
                }
            }
        }
    }

    fn emit(self: &Arc<Self>, generation: u64, route: Route) {
        let gate = Arc::clone(self);
        self.routes.publish_with(move || {
            if gate.is_current(generation) {
                Some(route)
            } else {
                metrics::record_superseded_snapshot();
                tracing::debug!(url = %route.url, generation, "Dropping superseded snapshot");
                None
            }
        });
    }

    /// Handle the terminal route of `generation`.
    fn settle(self: &Arc<Self>, generation: u64, route: Route, redirects: usize) {
        if route.route_type == RouteType::Redirect && self.config.follow_redirects {
            if let Some(target) = route.redirect_to.as_deref().filter(|t| !is_external(t)) {
                if redirects < self.config.max_redirects {
                    if self.is_current(generation) {
                        tracing::debug!(from = %route.url, to = %target, "Following redirect");
                        self.start(canonical(target), redirects + 1);
                    }
                    return;
                }
                tracing::warn!(
                    url = %route.url,
                    max_redirects = self.config.max_redirects,
                    "Redirect limit reached"
                );
            }
        }

        let _location = lock(&self.location);
        if !self.is_current(generation) {
            return;
        }
        tracing::info!(
            url = %route.url,
            route_type = route.route_type.as_str(),
            status = route.status,
            "Navigation settled"
        );
        self.transition(NavigationState::settled_on(&route));
    }

    fn transition(&self, next: NavigationState) {
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            tracing::debug!(from = ?state, to = ?next, "Navigation state changed");
            *state = next;
            true
        });
    }
}

/// Path plus query, the form locations are compared in.
fn canonical(url: &str) -> String {
    let request = NaviRequest::parse(url, Value::Null);
    format!("{}{}", request.pathname(), request.search())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

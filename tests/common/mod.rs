//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::Notify;

use navigator::{Navigation, Resolvable, Route, RouteType, Subscription};

/// A latch that resolvables can wait on until the test opens it.
#[derive(Default)]
pub struct Gate {
    open: AtomicBool,
    notify: Notify,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.open.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

/// A resolvable yielding `value` once `gate` opens, counting invocations.
pub fn gated_value(id: &str, value: Value, gate: Arc<Gate>, calls: Arc<AtomicUsize>) -> Resolvable<Value> {
    Resolvable::new(id, move |_req| {
        let gate = Arc::clone(&gate);
        let value = value.clone();
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            gate.wait().await;
            Ok(value)
        }
    })
}

/// Collects every snapshot a navigation delivers.
#[derive(Clone, Default)]
pub struct Recorder {
    routes: Arc<Mutex<Vec<Route>>>,
}

impl Recorder {
    pub fn attach(&self, navigation: &Navigation) -> Subscription {
        let routes = Arc::clone(&self.routes);
        navigation.subscribe(move |route| routes.lock().unwrap().push(route.clone()))
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }

    pub fn types(&self) -> Vec<RouteType> {
        self.routes().iter().map(|r| r.route_type).collect()
    }

    pub fn urls(&self) -> Vec<String> {
        self.routes().iter().map(|r| r.url.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.lock().unwrap().len()
    }
}

/// Let spawned navigation tasks run until they block.
pub async fn run_pending_tasks() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

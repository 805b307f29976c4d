//! Latest-value publisher with callback subscribers.
//!
//! # Invariants
//! 1. A new subscriber immediately receives the current value, if any.
//! 2. Values reach every subscriber in publication order, in registration order.
//! 3. Registration and its replay go through the same queue as publications,
//!    so a replayed value is never newer than the next delivered one.
//! 4. Callbacks never run while an internal lock is held, so a callback may
//!    publish or subscribe again; such work is done once it returns.
//! 5. Dropping a [`Subscription`] removes its callback before the next delivery.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use arc_swap::ArcSwapOption;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Deferred<T> = Box<dyn FnOnce() -> Option<T> + Send>;

enum Delivery<T> {
    Publish(Deferred<T>),
    Subscribe {
        id: u64,
        callback: Callback<T>,
        active: Arc<AtomicBool>,
    },
}

struct Subscribers<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

struct Inner<T> {
    current: ArcSwapOption<T>,
    subscribers: Mutex<Subscribers<T>>,
    queue: Mutex<VecDeque<Delivery<T>>>,
    delivering: AtomicBool,
}

/// Holds the latest value and pushes every new one to subscribers.
pub struct Publisher<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Publisher<T>
where
    T: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                current: ArcSwapOption::empty(),
                subscribers: Mutex::new(Subscribers {
                    next_id: 0,
                    entries: Vec::new(),
                }),
                queue: Mutex::new(VecDeque::new()),
                delivering: AtomicBool::new(false),
            }),
        }
    }

    pub fn current(&self) -> Option<Arc<T>> {
        self.inner.current.load_full()
    }

    pub fn publish(&self, value: T) {
        self.publish_with(move || Some(value));
    }

    /// Queue a value that is only produced at delivery time.
    ///
    /// `produce` runs right before delivery; returning `None` drops the value.
    pub fn publish_with(&self, produce: impl FnOnce() -> Option<T> + Send + 'static) {
        lock(&self.inner.queue).push_back(Delivery::Publish(Box::new(produce)));
        self.inner.drain();
    }

    /// Register `callback`, replaying the current value to it first.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut subscribers = lock(&self.inner.subscribers);
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            id
        };
        let active = Arc::new(AtomicBool::new(true));
        lock(&self.inner.queue).push_back(Delivery::Subscribe {
            id,
            callback: Arc::new(callback),
            active: Arc::clone(&active),
        });
        self.inner.drain();

        let inner: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            release: Some(Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    let mut subscribers = lock(&inner.subscribers);
                    active.store(false, Ordering::Release);
                    subscribers.entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).entries.len()
    }

    /// Drop every subscriber callback.
    pub fn clear(&self) {
        lock(&self.inner.subscribers).entries.clear();
    }
}

impl<T> Inner<T> {
    fn drain(&self) {
        loop {
            if self.delivering.swap(true, Ordering::AcqRel) {
                // Another caller up the stack (or on another thread) is delivering
                return;
            }
            loop {
                let next = lock(&self.queue).pop_front();
                let produce = match next {
                    None => break,
                    Some(Delivery::Publish(produce)) => produce,
                    Some(Delivery::Subscribe {
                        id,
                        callback,
                        active,
                    }) => {
                        self.register(id, callback, &active);
                        continue;
                    }
                };
                let Some(value) = produce() else { continue };
                let value = Arc::new(value);
                self.current.store(Some(Arc::clone(&value)));

                let callbacks: Vec<Callback<T>> = lock(&self.subscribers)
                    .entries
                    .iter()
                    .map(|(_, callback)| Arc::clone(callback))
                    .collect();
                for callback in callbacks {
                    callback(&value);
                }
            }
            self.delivering.store(false, Ordering::Release);

            if lock(&self.queue).is_empty() {
                return;
            }
        }
    }

    fn register(&self, id: u64, callback: Callback<T>, active: &AtomicBool) {
        {
            let mut subscribers = lock(&self.subscribers);
            if !active.load(Ordering::Acquire) {
                return;
            }
            subscribers.entries.push((id, Arc::clone(&callback)));
        }
        if let Some(current) = self.current.load_full() {
            callback(&current);
        }
    }
}

impl<T> Default for Publisher<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("subscribers", &lock(&self.inner.subscribers).entries.len())
            .finish()
    }
}

/// Registration handle; the callback is removed on drop or `unsubscribe`.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

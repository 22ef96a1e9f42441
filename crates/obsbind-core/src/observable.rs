#![forbid(unsafe_code)]

//! Shared, version-tracked values and RAII subscriptions.
//!
//! [`Observable<T>`] wraps a value in `Rc<RefCell<..>>` and notifies registered
//! callbacks when it changes. The engine publishes its
//! [`CombinedState`](crate::CombinedState) through one, and it doubles as a
//! [`PushProducer`](crate::PushProducer) source.
//!
//! [`Subscription`] is the universal unsubscribe handle returned by every
//! subscribe entry point in this crate.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per `set` that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op (no version bump,
//!    no notifications).
//! 4. `Subscription::unsubscribe` is idempotent; dropping the handle
//!    unsubscribes.
//! 5. Callbacks may subscribe, unsubscribe, or `set` re-entrantly; a callback
//!    removed mid-notification still sees the notification in progress.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle that detaches a callback when unsubscribed or dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Create a subscription that runs `teardown` exactly once.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self { teardown: None }
    }

    /// Run the teardown if it has not run yet.
    pub fn unsubscribe(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }

    /// Whether the teardown has already run (or never existed).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.teardown.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Observable<T>
// ---------------------------------------------------------------------------

type Callback<T> = Rc<dyn Fn(&T)>;

struct ObservableInner<T> {
    value: T,
    version: u64,
    next_id: u64,
    subscribers: Vec<(u64, Callback<T>)>,
}

/// A shared value with change notification.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable holding `value`, at version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone out the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value.
    ///
    /// # Panics
    ///
    /// Panics if `f` calls [`set`](Self::set) on the same observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        let callbacks = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
            snapshot_callbacks(&inner.subscribers)
        };
        self.notify(&callbacks);
    }

    /// Mutate the value in place, notifying subscribers if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }

    /// Number of changes applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Register `callback` for future changes. The current value is not
    /// delivered.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push((id, Rc::new(callback)));
            id
        };
        let weak: Weak<RefCell<ObservableInner<T>>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().subscribers.retain(|(sid, _)| *sid != id);
            }
        })
    }

    fn notify(&self, callbacks: &[Callback<T>]) {
        let value = self.get();
        for callback in callbacks {
            callback(&value);
        }
    }
}

fn snapshot_callbacks<T>(subscribers: &[(u64, Callback<T>)]) -> Vec<Callback<T>> {
    subscribers.iter().map(|(_, cb)| Rc::clone(cb)).collect()
}

impl<T: Clone + PartialEq + Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

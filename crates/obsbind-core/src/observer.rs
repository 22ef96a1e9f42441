#![forbid(unsafe_code)]

//! The three-channel callback contract handed to every source.

use std::fmt;
use std::rc::Rc;

use crate::error::EmissionError;

/// Receiver of a source's `next` / `error` / `complete` notifications.
///
/// Methods take `&self`: observers are shared (`Rc`) between the subscriber
/// and the producer, so any state they keep lives behind `Cell`/`RefCell`.
pub trait Observer<V> {
    fn next(&self, value: V);
    fn error(&self, error: EmissionError);
    fn complete(&self);
}

/// Observer handle as stored by producers.
pub type SharedObserver<V> = Rc<dyn Observer<V>>;

/// An [`Observer`] assembled from closures.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use obsbind_core::{FnObserver, Observer};
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// let observer = FnObserver::new(move |v: i32| sink.borrow_mut().push(v));
/// observer.next(1);
/// observer.next(2);
/// assert_eq!(*seen.borrow(), vec![1, 2]);
/// ```
pub struct FnObserver<V> {
    next: Box<dyn Fn(V)>,
    error: Box<dyn Fn(EmissionError)>,
    complete: Box<dyn Fn()>,
}

impl<V: 'static> FnObserver<V> {
    /// Observer that forwards values to `next` and ignores the other channels.
    pub fn new(next: impl Fn(V) + 'static) -> Self {
        Self {
            next: Box::new(next),
            error: Box::new(|_| {}),
            complete: Box::new(|| {}),
        }
    }

    #[must_use]
    pub fn on_error(mut self, error: impl Fn(EmissionError) + 'static) -> Self {
        self.error = Box::new(error);
        self
    }

    #[must_use]
    pub fn on_complete(mut self, complete: impl Fn() + 'static) -> Self {
        self.complete = Box::new(complete);
        self
    }

    /// Box into a [`SharedObserver`].
    #[must_use]
    pub fn shared(self) -> SharedObserver<V> {
        Rc::new(self)
    }
}

impl<V> Observer<V> for FnObserver<V> {
    fn next(&self, value: V) {
        (self.next)(value);
    }

    fn error(&self, error: EmissionError) {
        (self.error)(error);
    }

    fn complete(&self) {
        (self.complete)();
    }
}

impl<V> fmt::Debug for FnObserver<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnObserver").finish_non_exhaustive()
    }
}

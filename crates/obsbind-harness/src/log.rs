#![forbid(unsafe_code)]

//! Recording observer.

use std::cell::RefCell;
use std::rc::Rc;

use obsbind_core::{EmissionError, Observer, SharedObserver};

/// One notification seen by an [`EventLog`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event<V> {
    Next(V),
    Error(EmissionError),
    Complete,
}

struct Sink<V> {
    events: Rc<RefCell<Vec<Event<V>>>>,
}

impl<V> Observer<V> for Sink<V> {
    fn next(&self, value: V) {
        self.events.borrow_mut().push(Event::Next(value));
    }

    fn error(&self, error: EmissionError) {
        self.events.borrow_mut().push(Event::Error(error));
    }

    fn complete(&self) {
        self.events.borrow_mut().push(Event::Complete);
    }
}

/// Shared list of notifications; clones share the list.
#[derive(Debug)]
pub struct EventLog<V> {
    events: Rc<RefCell<Vec<Event<V>>>>,
}

impl<V> Clone for EventLog<V> {
    fn clone(&self) -> Self {
        Self {
            events: Rc::clone(&self.events),
        }
    }
}

impl<V> Default for EventLog<V> {
    fn default() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<V: Clone + 'static> EventLog<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An observer appending to this log.
    #[must_use]
    pub fn observer(&self) -> SharedObserver<V> {
        Rc::new(Sink {
            events: Rc::clone(&self.events),
        })
    }

    #[must_use]
    pub fn events(&self) -> Vec<Event<V>> {
        self.events.borrow().clone()
    }

    /// Only the `next` payloads, in order.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Next(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.events.borrow().iter().any(|e| matches!(e, Event::Complete))
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

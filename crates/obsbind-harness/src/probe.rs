#![forbid(unsafe_code)]

//! Counting push producer.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use obsbind_core::{EmissionError, PushProducer, SharedObserver, Source, Subscription};

struct Attached<V> {
    observer: SharedObserver<V>,
    open: Rc<Cell<bool>>,
}

struct ProbeInner<V> {
    name: String,
    leaky: bool,
    subscribes: Cell<usize>,
    unsubscribes: Cell<usize>,
    attached: RefCell<Vec<Attached<V>>>,
}

/// Push producer that records how it is used.
///
/// Every `subscribe` and every teardown is counted. A normal probe stops
/// delivering to an observer once its subscription is torn down; a
/// [`leaky`](ProbeProducer::leaky) probe keeps delivering to every observer
/// it has ever seen.
pub struct ProbeProducer<V> {
    inner: Rc<ProbeInner<V>>,
}

impl<V> Clone for ProbeProducer<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: Clone + 'static> ProbeProducer<V> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), false)
    }

    /// A probe that ignores teardown when delivering.
    #[must_use]
    pub fn leaky(name: impl Into<String>) -> Self {
        Self::build(name.into(), true)
    }

    fn build(name: String, leaky: bool) -> Self {
        Self {
            inner: Rc::new(ProbeInner {
                name,
                leaky,
                subscribes: Cell::new(0),
                unsubscribes: Cell::new(0),
                attached: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn emit(&self, value: V) {
        for observer in self.targets() {
            observer.next(value.clone());
        }
    }

    pub fn fail(&self, error: EmissionError) {
        for observer in self.targets() {
            observer.error(error.clone());
        }
    }

    pub fn finish(&self) {
        for observer in self.targets() {
            observer.complete();
        }
    }

    /// A [`Source`] over this probe.
    #[must_use]
    pub fn source(&self) -> Source<V> {
        Source::producer(self.clone())
    }

    #[must_use]
    pub fn subscribe_count(&self) -> usize {
        self.inner.subscribes.get()
    }

    #[must_use]
    pub fn unsubscribe_count(&self) -> usize {
        self.inner.unsubscribes.get()
    }

    /// Subscriptions not yet torn down.
    #[must_use]
    pub fn active(&self) -> usize {
        self.inner
            .attached
            .borrow()
            .iter()
            .filter(|a| a.open.get())
            .count()
    }

    fn targets(&self) -> Vec<SharedObserver<V>> {
        let leaky = self.inner.leaky;
        self.inner
            .attached
            .borrow()
            .iter()
            .filter(|a| leaky || a.open.get())
            .map(|a| Rc::clone(&a.observer))
            .collect()
    }
}

impl<V: Clone + 'static> PushProducer<V> for ProbeProducer<V> {
    fn subscribe(&self, observer: SharedObserver<V>) -> Subscription {
        let inner = &self.inner;
        inner.subscribes.set(inner.subscribes.get() + 1);
        tracing::trace!(message = "probe.subscribe", probe = %inner.name);
        let open = Rc::new(Cell::new(true));
        inner.attached.borrow_mut().push(Attached {
            observer,
            open: Rc::clone(&open),
        });
        let inner = Rc::clone(inner);
        Subscription::new(move || {
            open.set(false);
            inner.unsubscribes.set(inner.unsubscribes.get() + 1);
            tracing::trace!(message = "probe.unsubscribe", probe = %inner.name);
        })
    }
}

impl<V: Clone + 'static> From<ProbeProducer<V>> for Source<V> {
    fn from(probe: ProbeProducer<V>) -> Self {
        Source::producer(probe)
    }
}

impl<V> fmt::Debug for ProbeProducer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeProducer")
            .field("name", &self.inner.name)
            .field("leaky", &self.inner.leaky)
            .field("subscribes", &self.inner.subscribes.get())
            .field("unsubscribes", &self.inner.unsubscribes.get())
            .finish()
    }
}

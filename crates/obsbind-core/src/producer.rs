#![forbid(unsafe_code)]

//! Push producers and the built-in implementations.
//!
//! A [`PushProducer`] accepts an observer and returns a [`Subscription`]; an
//! [`IntoProducer`] ("convertible") yields one on demand. The adapter in
//! [`crate::adapter`] is the only code that needs to tell the two apart.
//!
//! Built-ins:
//!
//! - [`Subject`]: hand-driven multicast producer.
//! - [`just`]: one synchronous value, then completion.
//! - [`failing`]: one synchronous error.
//! - [`defer`]: a convertible wrapping a closure.
//! - [`Observable`]: current value on subscribe, then every change.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::EmissionError;
use crate::observable::{Observable, Subscription};
use crate::observer::SharedObserver;

/// A producer that pushes values to subscribed observers.
pub trait PushProducer<V> {
    /// Attach `observer`. Notifications may arrive before this returns.
    fn subscribe(&self, observer: SharedObserver<V>) -> Subscription;
}

/// An object that can be converted into a push producer.
pub trait IntoProducer<V> {
    fn to_producer(&self) -> Rc<dyn PushProducer<V>>;
}

impl<V, P: PushProducer<V> + ?Sized> PushProducer<V> for Rc<P> {
    fn subscribe(&self, observer: SharedObserver<V>) -> Subscription {
        (**self).subscribe(observer)
    }
}

// ---------------------------------------------------------------------------
// Subject
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Terminal {
    Completed,
    Failed(EmissionError),
}

struct SubjectInner<V> {
    next_id: u64,
    observers: Vec<(u64, SharedObserver<V>)>,
    terminal: Option<Terminal>,
}

/// Multicast producer driven by hand.
///
/// After [`fail`](Subject::fail) or [`finish`](Subject::finish) the subject is
/// terminated: further emissions are ignored and late subscribers receive the
/// terminal notification immediately.
pub struct Subject<V> {
    inner: Rc<RefCell<SubjectInner<V>>>,
}

impl<V> Clone for Subject<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: Clone + 'static> Subject<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SubjectInner {
                next_id: 0,
                observers: Vec::new(),
                terminal: None,
            })),
        }
    }

    /// Push `value` to every current observer.
    pub fn emit(&self, value: V) {
        let Some(observers) = self.live_observers() else {
            return;
        };
        for observer in observers {
            observer.next(value.clone());
        }
    }

    /// Terminate with an error.
    pub fn fail(&self, error: EmissionError) {
        self.terminate(Terminal::Failed(error));
    }

    /// Terminate with completion.
    pub fn finish(&self) {
        self.terminate(Terminal::Completed);
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.inner.borrow().terminal.is_some()
    }

    fn live_observers(&self) -> Option<Vec<SharedObserver<V>>> {
        let inner = self.inner.borrow();
        if inner.terminal.is_some() {
            return None;
        }
        Some(inner.observers.iter().map(|(_, o)| Rc::clone(o)).collect())
    }

    fn terminate(&self, terminal: Terminal) {
        let observers = {
            let mut inner = self.inner.borrow_mut();
            if inner.terminal.is_some() {
                return;
            }
            inner.terminal = Some(terminal.clone());
            std::mem::take(&mut inner.observers)
        };
        for (_, observer) in observers {
            deliver_terminal(&*observer, &terminal);
        }
    }
}

fn deliver_terminal<V>(observer: &dyn crate::observer::Observer<V>, terminal: &Terminal) {
    match terminal {
        Terminal::Completed => observer.complete(),
        Terminal::Failed(error) => observer.error(error.clone()),
    }
}

impl<V: Clone + 'static> Default for Subject<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + 'static> PushProducer<V> for Subject<V> {
    fn subscribe(&self, observer: SharedObserver<V>) -> Subscription {
        let terminal = self.inner.borrow().terminal.clone();
        if let Some(terminal) = terminal {
            deliver_terminal(&*observer, &terminal);
            return Subscription::empty();
        }
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.push((id, observer));
            id
        };
        let weak: Weak<RefCell<SubjectInner<V>>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().observers.retain(|(oid, _)| *oid != id);
            }
        })
    }
}

impl<V> fmt::Debug for Subject<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Subject")
            .field("observers", &inner.observers.len())
            .field("terminated", &inner.terminal.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// just / failing / defer
// ---------------------------------------------------------------------------

/// Producer returned by [`just`].
#[derive(Debug, Clone)]
pub struct Just<V>(V);

/// A producer that emits `value` synchronously on subscribe, then completes.
pub fn just<V: Clone>(value: V) -> Just<V> {
    Just(value)
}

impl<V: Clone> PushProducer<V> for Just<V> {
    fn subscribe(&self, observer: SharedObserver<V>) -> Subscription {
        observer.next(self.0.clone());
        observer.complete();
        Subscription::empty()
    }
}

/// Producer returned by [`failing`].
#[derive(Debug, Clone)]
pub struct Failing(EmissionError);

/// A producer that reports `error` synchronously on subscribe.
pub fn failing(error: EmissionError) -> Failing {
    Failing(error)
}

impl<V> PushProducer<V> for Failing {
    fn subscribe(&self, observer: SharedObserver<V>) -> Subscription {
        observer.error(self.0.clone());
        Subscription::empty()
    }
}

/// Convertible returned by [`defer`].
pub struct Defer<V> {
    make: Box<dyn Fn() -> Rc<dyn PushProducer<V>>>,
}

/// A convertible source: `make` runs on every conversion.
pub fn defer<V, P>(make: impl Fn() -> P + 'static) -> Defer<V>
where
    P: PushProducer<V> + 'static,
{
    Defer {
        make: Box::new(move || Rc::new(make()) as Rc<dyn PushProducer<V>>),
    }
}

impl<V> IntoProducer<V> for Defer<V> {
    fn to_producer(&self) -> Rc<dyn PushProducer<V>> {
        (self.make)()
    }
}

impl<V> fmt::Debug for Defer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defer").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Observable as a producer
// ---------------------------------------------------------------------------

impl<T: Clone + PartialEq + 'static> PushProducer<T> for Observable<T> {
    fn subscribe(&self, observer: SharedObserver<T>) -> Subscription {
        observer.next(self.get());
        Observable::subscribe(self, move |v| observer.next(v.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::FnObserver;
    use std::cell::Cell;

    fn recorder<V: Clone + 'static>() -> (SharedObserver<V>, Rc<RefCell<Vec<String>>>)
    where
        V: fmt::Debug,
    {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (n, e, c) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
        let observer = FnObserver::new(move |v: V| n.borrow_mut().push(format!("next {v:?}")))
            .on_error(move |err| e.borrow_mut().push(format!("error {err}")))
            .on_complete(move || c.borrow_mut().push("complete".into()))
            .shared();
        (observer, log)
    }

    #[test]
    fn subject_multicasts() {
        let subject = Subject::new();
        let (a, log_a) = recorder::<i32>();
        let (b, log_b) = recorder::<i32>();
        let _sa = subject.subscribe(a);
        let _sb = subject.subscribe(b);

        subject.emit(1);
        subject.emit(2);
        assert_eq!(*log_a.borrow(), vec!["next 1", "next 2"]);
        assert_eq!(*log_b.borrow(), vec!["next 1", "next 2"]);
    }

    #[test]
    fn subject_unsubscribe_detaches() {
        let subject = Subject::new();
        let (a, log) = recorder::<i32>();
        let mut sub = subject.subscribe(a);
        assert_eq!(subject.observer_count(), 1);
        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(subject.observer_count(), 0);
        subject.emit(1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn subject_terminal_is_sticky() {
        let subject = Subject::new();
        let (a, log) = recorder::<i32>();
        let _sub = subject.subscribe(a);
        subject.fail(EmissionError::msg("down"));
        subject.emit(3);
        subject.finish();
        assert_eq!(*log.borrow(), vec!["error down"]);
        assert!(subject.is_terminated());

        let (late, late_log) = recorder::<i32>();
        let sub = subject.subscribe(late);
        assert!(sub.is_closed());
        assert_eq!(*late_log.borrow(), vec!["error down"]);
    }

    #[test]
    fn observer_unsubscribing_sibling_mid_emit() {
        // The sibling still sees the emission in progress, but not the next.
        let subject = Subject::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let s = Rc::clone(&slot);
        let killer = FnObserver::new(move |_: i32| {
            if let Some(mut sub) = s.borrow_mut().take() {
                sub.unsubscribe();
            }
        })
        .shared();
        let (victim, log) = recorder::<i32>();

        let _k = subject.subscribe(killer);
        *slot.borrow_mut() = Some(subject.subscribe(victim));

        subject.emit(1);
        subject.emit(2);
        assert_eq!(*log.borrow(), vec!["next 1"]);
    }

    #[test]
    fn just_is_synchronous() {
        let (obs, log) = recorder::<&'static str>();
        let sub = just("x").subscribe(obs);
        assert!(sub.is_closed());
        assert_eq!(*log.borrow(), vec![r#"next "x""#, "complete"]);
    }

    #[test]
    fn failing_reports_error() {
        let (obs, log) = recorder::<i32>();
        let _sub = failing(EmissionError::msg("nope")).subscribe(obs);
        assert_eq!(*log.borrow(), vec!["error nope"]);
    }

    #[test]
    fn defer_builds_fresh_producer() {
        let built = Rc::new(Cell::new(0));
        let b = Rc::clone(&built);
        let convertible = defer(move || {
            b.set(b.get() + 1);
            just(7)
        });
        let (obs, log) = recorder::<i32>();
        let _sub = convertible.to_producer().subscribe(obs);
        let _ = convertible.to_producer();
        assert_eq!(built.get(), 2);
        assert_eq!(*log.borrow(), vec!["next 7", "complete"]);
    }

    #[test]
    fn observable_replays_current_then_changes() {
        let obs = Observable::new(1);
        let (o, log) = recorder::<i32>();
        let sub = PushProducer::subscribe(&obs, o);
        obs.set(2);
        obs.set(2);
        drop(sub);
        obs.set(3);
        assert_eq!(*log.borrow(), vec!["next 1", "next 2"]);
    }
}

#![forbid(unsafe_code)]

//! Source shapes, capability probing, and the per-generation source map.
//!
//! A [`Source`] is a handle to any object implementing [`SourceShape`]: a set
//! of capability probes that each default to "not supported". Resolution
//! ([`Source::resolve`]) asks the probes in a fixed order and takes the first
//! hit:
//!
//! 1. reactive record ([`ReactiveRecord`])
//! 2. reactive query ([`ReactiveQuery`])
//! 3. convertible ([`IntoProducer`])
//! 4. push producer ([`PushProducer`])
//!
//! An object that answers none of them is rejected with
//! [`SourceProtocolError`]; there is no catch-all.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::SourceProtocolError;
use crate::observable::{Observable, Subscription};
use crate::producer::{IntoProducer, PushProducer, Subject};

/// Change notification delivered by a [`ReactiveRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordChange {
    /// The record's fields changed; it should be re-read.
    Updated,
    /// The record was deleted; no further notifications follow.
    Deleted,
}

/// A stateful domain object that re-emits itself on every change.
pub trait ReactiveRecord<V> {
    /// The value to emit for the record in its current state.
    fn current(&self) -> V;

    /// Register for change notifications.
    fn on_change(&self, listener: Box<dyn Fn(RecordChange)>) -> Subscription;
}

/// A live query that emits a fresh result snapshot on every change and never
/// completes on its own.
pub trait ReactiveQuery<V> {
    /// Register for snapshots. Implementations decide whether the current
    /// snapshot is delivered synchronously.
    fn observe(&self, listener: Box<dyn Fn(V)>) -> Subscription;
}

/// Capability probes for an object used as a source.
///
/// Implement only the probes your object supports; the rest default to
/// `None`. An object may support several capabilities; resolution picks the
/// first one in the documented order.
pub trait SourceShape<V> {
    /// Human-readable label, used in errors and logs.
    fn describe(&self) -> Cow<'static, str>;

    fn as_record(&self) -> Option<Rc<dyn ReactiveRecord<V>>> {
        None
    }

    fn as_query(&self) -> Option<Rc<dyn ReactiveQuery<V>>> {
        None
    }

    fn as_convertible(&self) -> Option<&dyn IntoProducer<V>> {
        None
    }

    fn as_producer(&self) -> Option<&dyn PushProducer<V>> {
        None
    }
}

/// The capability a source resolved to.
pub enum Resolved<'a, V> {
    Record(Rc<dyn ReactiveRecord<V>>),
    Query(Rc<dyn ReactiveQuery<V>>),
    Convertible(&'a dyn IntoProducer<V>),
    Producer(&'a dyn PushProducer<V>),
}

impl<V> Resolved<'_, V> {
    /// Short name of the resolved capability.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Record(_) => "record",
            Self::Query(_) => "query",
            Self::Convertible(_) => "convertible",
            Self::Producer(_) => "producer",
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in shape wrappers
// ---------------------------------------------------------------------------

fn short_type_name<T: ?Sized>() -> Cow<'static, str> {
    let mut name = std::any::type_name::<T>();
    while let Some(inner) = name
        .strip_prefix("alloc::rc::Rc<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        name = inner;
    }
    let base = name.split('<').next().unwrap_or(name);
    Cow::Borrowed(base.rsplit("::").next().unwrap_or(base))
}

struct RecordShape<R>(Rc<R>);

impl<V, R: ReactiveRecord<V> + 'static> SourceShape<V> for RecordShape<R> {
    fn describe(&self) -> Cow<'static, str> {
        short_type_name::<R>()
    }

    fn as_record(&self) -> Option<Rc<dyn ReactiveRecord<V>>> {
        Some(Rc::clone(&self.0) as Rc<dyn ReactiveRecord<V>>)
    }
}

struct QueryShape<Q>(Rc<Q>);

impl<V, Q: ReactiveQuery<V> + 'static> SourceShape<V> for QueryShape<Q> {
    fn describe(&self) -> Cow<'static, str> {
        short_type_name::<Q>()
    }

    fn as_query(&self) -> Option<Rc<dyn ReactiveQuery<V>>> {
        Some(Rc::clone(&self.0) as Rc<dyn ReactiveQuery<V>>)
    }
}

struct ConvertibleShape<C>(C);

impl<V, C: IntoProducer<V>> SourceShape<V> for ConvertibleShape<C> {
    fn describe(&self) -> Cow<'static, str> {
        short_type_name::<C>()
    }

    fn as_convertible(&self) -> Option<&dyn IntoProducer<V>> {
        Some(&self.0)
    }
}

struct ProducerShape<P>(P);

impl<V, P: PushProducer<V>> SourceShape<V> for ProducerShape<P> {
    fn describe(&self) -> Cow<'static, str> {
        short_type_name::<P>()
    }

    fn as_producer(&self) -> Option<&dyn PushProducer<V>> {
        Some(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// A cheaply clonable handle to one source.
pub struct Source<V> {
    shape: Rc<dyn SourceShape<V>>,
}

impl<V> Clone for Source<V> {
    fn clone(&self) -> Self {
        Self {
            shape: Rc::clone(&self.shape),
        }
    }
}

impl<V: 'static> Source<V> {
    /// A reactive record.
    pub fn record<R: ReactiveRecord<V> + 'static>(record: Rc<R>) -> Self {
        Self::from_shape(RecordShape(record))
    }

    /// A reactive query.
    pub fn query<Q: ReactiveQuery<V> + 'static>(query: Rc<Q>) -> Self {
        Self::from_shape(QueryShape(query))
    }

    /// A convertible: `to_producer()` is called once per subscription.
    pub fn convertible<C: IntoProducer<V> + 'static>(convertible: C) -> Self {
        Self::from_shape(ConvertibleShape(convertible))
    }

    /// A push producer. Pass an `Rc` (or a handle type such as [`Subject`])
    /// to keep driving the producer from outside.
    pub fn producer<P: PushProducer<V> + 'static>(producer: P) -> Self {
        Self::from_shape(ProducerShape(producer))
    }

    /// Any object implementing the capability probes directly.
    pub fn from_shape<S: SourceShape<V> + 'static>(shape: S) -> Self {
        Self {
            shape: Rc::new(shape),
        }
    }

    /// Shared form of [`from_shape`](Self::from_shape).
    pub fn from_rc(shape: Rc<dyn SourceShape<V>>) -> Self {
        Self { shape }
    }

    /// Resolve to the first supported capability.
    pub fn resolve(&self) -> Result<Resolved<'_, V>, SourceProtocolError> {
        if let Some(record) = self.shape.as_record() {
            return Ok(Resolved::Record(record));
        }
        if let Some(query) = self.shape.as_query() {
            return Ok(Resolved::Query(query));
        }
        if let Some(convertible) = self.shape.as_convertible() {
            return Ok(Resolved::Convertible(convertible));
        }
        if let Some(producer) = self.shape.as_producer() {
            return Ok(Resolved::Producer(producer));
        }
        Err(SourceProtocolError::new(self.describe()))
    }

    #[must_use]
    pub fn describe(&self) -> Cow<'static, str> {
        self.shape.describe()
    }
}

impl<V> fmt::Debug for Source<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Source").field(&self.shape.describe()).finish()
    }
}

impl<V: Clone + 'static> From<Subject<V>> for Source<V> {
    fn from(subject: Subject<V>) -> Self {
        Self::producer(subject)
    }
}

impl<T: Clone + PartialEq + 'static> From<Observable<T>> for Source<T> {
    fn from(observable: Observable<T>) -> Self {
        Self::producer(observable)
    }
}

// ---------------------------------------------------------------------------
// SourceMap
// ---------------------------------------------------------------------------

/// Insertion-ordered mapping from unique names to sources.
///
/// Subscription order follows insertion order. Inserting an existing name
/// replaces its source in place.
pub struct SourceMap<V> {
    entries: IndexMap<String, Source<V>>,
}

impl<V> Clone for SourceMap<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<V> Default for SourceMap<V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<V> SourceMap<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, source: impl Into<Source<V>>) -> Self {
        self.insert(name, source);
        self
    }

    /// Insert or replace; returns the previous source under `name`.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        source: impl Into<Source<V>>,
    ) -> Option<Source<V>> {
        self.entries.insert(name.into(), source.into())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Source<V>> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Source<V>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<V, K: Into<String>> FromIterator<(K, Source<V>)> for SourceMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, Source<V>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, s)| (k.into(), s)).collect(),
        }
    }
}

impl<V> fmt::Debug for SourceMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::just;

    struct Opaque;

    impl SourceShape<i32> for Opaque {
        fn describe(&self) -> Cow<'static, str> {
            Cow::Borrowed("Opaque")
        }
    }

    /// Answers both the record and producer probes.
    struct Both;

    impl ReactiveRecord<i32> for Both {
        fn current(&self) -> i32 {
            1
        }

        fn on_change(&self, _listener: Box<dyn Fn(RecordChange)>) -> Subscription {
            Subscription::empty()
        }
    }

    impl PushProducer<i32> for Both {
        fn subscribe(&self, _observer: crate::observer::SharedObserver<i32>) -> Subscription {
            Subscription::empty()
        }
    }

    struct BothShape(Rc<Both>);

    impl SourceShape<i32> for BothShape {
        fn describe(&self) -> Cow<'static, str> {
            Cow::Borrowed("Both")
        }

        fn as_record(&self) -> Option<Rc<dyn ReactiveRecord<i32>>> {
            Some(Rc::clone(&self.0) as Rc<dyn ReactiveRecord<i32>>)
        }

        fn as_producer(&self) -> Option<&dyn PushProducer<i32>> {
            Some(&*self.0)
        }
    }

    #[test]
    fn unrecognized_shape_is_an_error() {
        let source = Source::from_shape(Opaque);
        let err = source.resolve().err().map(|e| e.shape);
        assert_eq!(err.as_deref(), Some("Opaque"));
    }

    #[test]
    fn record_probe_wins_over_producer() {
        let source = Source::from_shape(BothShape(Rc::new(Both)));
        let kind = source.resolve().map(|r| r.kind());
        assert_eq!(kind, Ok("record"));
    }

    #[test]
    fn builtin_wrappers_resolve() {
        let producer: Source<i32> = Source::producer(just(1));
        assert_eq!(producer.resolve().map(|r| r.kind()), Ok("producer"));

        let convertible: Source<i32> = Source::convertible(crate::producer::defer(|| just(1)));
        assert_eq!(convertible.resolve().map(|r| r.kind()), Ok("convertible"));

        let subject: Source<i32> = Subject::new().into();
        assert_eq!(subject.resolve().map(|r| r.kind()), Ok("producer"));
        assert_eq!(subject.describe(), "Subject");
    }

    #[test]
    fn source_map_preserves_insertion_order() {
        let map = SourceMap::new()
            .with("z", Source::producer(just(1)))
            .with("a", Source::producer(just(2)))
            .with("m", Source::producer(just(3)));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn source_map_insert_replaces() {
        let mut map: SourceMap<i32> = SourceMap::new();
        assert!(map.insert("a", Source::producer(just(1))).is_none());
        assert!(map.insert("a", Source::producer(just(2))).is_some());
        assert_eq!(map.len(), 1);
        assert!(map.get("a").is_some());
        assert!(map.get("b").is_none());
    }

    #[test]
    fn source_map_from_iter() {
        let map: SourceMap<i32> = [("x", Source::producer(just(1)))].into_iter().collect();
        assert!(!map.is_empty());
        assert_eq!(format!("{map:?}"), r#"{"x": Source("Just")}"#);
    }
}

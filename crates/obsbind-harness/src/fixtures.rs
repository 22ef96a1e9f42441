#![forbid(unsafe_code)]

//! In-memory reactive record and query.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use obsbind_core::{ReactiveQuery, ReactiveRecord, RecordChange, Source, Subscription, Value};

type Listener<A> = Rc<dyn Fn(A)>;

struct Listeners<A> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Listener<A>)>>,
}

impl<A: Copy + 'static> Listeners<A> {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            next_id: Cell::new(0),
            entries: RefCell::new(Vec::new()),
        })
    }

    fn add(self: &Rc<Self>, listener: Listener<A>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push((id, listener));
        let weak: Weak<Self> = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(this) = weak.upgrade() {
                this.entries.borrow_mut().retain(|(lid, _)| *lid != id);
            }
        })
    }

    fn fire(&self, arg: A) {
        let snapshot: Vec<Listener<A>> =
            self.entries.borrow().iter().map(|(_, l)| Rc::clone(l)).collect();
        for listener in snapshot {
            listener(arg);
        }
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

// ---------------------------------------------------------------------------
// TestRecord
// ---------------------------------------------------------------------------

struct RecordInner {
    id: String,
    fields: RefCell<BTreeMap<String, Value>>,
    deleted: Cell<bool>,
    listeners: Rc<Listeners<RecordChange>>,
}

/// A record that emits its fields (plus `id`) as a [`Value::Map`].
#[derive(Clone)]
pub struct TestRecord {
    inner: Rc<RecordInner>,
}

impl TestRecord {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RecordInner {
                id: id.into(),
                fields: RefCell::new(BTreeMap::new()),
                deleted: Cell::new(false),
                listeners: Listeners::new(),
            }),
        }
    }

    /// Builder-style field setter; does not notify.
    #[must_use]
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner
            .fields
            .borrow_mut()
            .insert(name.into(), value.into());
        self
    }

    /// Change a field and notify `Updated`.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        if self.inner.deleted.get() {
            return;
        }
        self.inner
            .fields
            .borrow_mut()
            .insert(name.into(), value.into());
        self.inner.listeners.fire(RecordChange::Updated);
    }

    /// Mark deleted and notify `Deleted`. Later changes are ignored.
    pub fn delete(&self) {
        if self.inner.deleted.replace(true) {
            return;
        }
        self.inner.listeners.fire(RecordChange::Deleted);
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    #[must_use]
    pub fn source(&self) -> Source<Value> {
        Source::record(Rc::new(self.clone()))
    }
}

impl ReactiveRecord<Value> for TestRecord {
    fn current(&self) -> Value {
        let mut fields = self.inner.fields.borrow().clone();
        fields.insert("id".to_string(), Value::from(self.inner.id.as_str()));
        Value::from(fields)
    }

    fn on_change(&self, listener: Box<dyn Fn(RecordChange)>) -> Subscription {
        self.inner.listeners.add(Rc::from(listener))
    }
}

impl fmt::Debug for TestRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRecord")
            .field("id", &self.inner.id)
            .field("deleted", &self.inner.deleted.get())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// TestQuery
// ---------------------------------------------------------------------------

struct QueryInner {
    rows: RefCell<Vec<Value>>,
    listeners: Rc<Listeners<()>>,
}

/// A live query over a row list. Observing delivers the current snapshot
/// synchronously, then a fresh [`Value::List`] after every change.
#[derive(Clone)]
pub struct TestQuery {
    inner: Rc<QueryInner>,
}

impl TestQuery {
    #[must_use]
    pub fn new(rows: impl IntoIterator<Item = Value>) -> Self {
        Self {
            inner: Rc::new(QueryInner {
                rows: RefCell::new(rows.into_iter().collect()),
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn push(&self, row: impl Into<Value>) {
        self.inner.rows.borrow_mut().push(row.into());
        self.inner.listeners.fire(());
    }

    pub fn clear(&self) {
        self.inner.rows.borrow_mut().clear();
        self.inner.listeners.fire(());
    }

    #[must_use]
    pub fn snapshot(&self) -> Value {
        Value::list(self.inner.rows.borrow().iter().cloned())
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.listeners.len()
    }

    #[must_use]
    pub fn source(&self) -> Source<Value> {
        Source::query(Rc::new(self.clone()))
    }
}

impl ReactiveQuery<Value> for TestQuery {
    fn observe(&self, listener: Box<dyn Fn(Value)>) -> Subscription {
        listener(self.snapshot());
        let weak = Rc::downgrade(&self.inner);
        self.inner.listeners.add(Rc::new(move |()| {
            if let Some(inner) = weak.upgrade() {
                listener(TestQuery { inner }.snapshot());
            }
        }))
    }
}

impl fmt::Debug for TestQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestQuery")
            .field("rows", &self.inner.rows.borrow().len())
            .finish_non_exhaustive()
    }
}

#![forbid(unsafe_code)]

//! A manual clock for delayed emissions.
//!
//! Tasks scheduled on a [`TickQueue`] run only when the test advances the
//! clock, in due-tick order and, within a tick, in scheduling order. A task
//! may schedule further tasks; those due within the advanced window run in
//! the same call.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use obsbind_core::{PushProducer, SharedObserver, Source, Subscription};

struct Task {
    due: u64,
    seq: u64,
    cancelled: Rc<Cell<bool>>,
    run: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct QueueInner {
    now: u64,
    seq: u64,
    tasks: Vec<Task>,
}

/// Deterministic scheduler; clones share the queue.
#[derive(Clone, Default)]
pub struct TickQueue {
    inner: Rc<RefCell<QueueInner>>,
}

impl TickQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once `after` ticks have passed. The returned handle cancels
    /// it.
    pub fn schedule(&self, after: u64, task: impl FnOnce() + 'static) -> Subscription {
        let cancelled = Rc::new(Cell::new(false));
        {
            let mut inner = self.inner.borrow_mut();
            let seq = inner.seq;
            inner.seq += 1;
            let due = inner.now + after;
            inner.tasks.push(Task {
                due,
                seq,
                cancelled: Rc::clone(&cancelled),
                run: Box::new(task),
            });
        }
        Subscription::new(move || cancelled.set(true))
    }

    /// Advance the clock by `ticks`, running every task that falls due.
    /// Returns the number of tasks run.
    pub fn advance(&self, ticks: u64) -> usize {
        let target = self.now() + ticks;
        let mut ran = 0;
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                inner.tasks.retain(|t| !t.cancelled.get());
                let due = inner
                    .tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(i, _)| i);
                match due {
                    Some(i) => {
                        let task = inner.tasks.remove(i);
                        inner.now = inner.now.max(task.due);
                        Some(task)
                    }
                    None => {
                        inner.now = target;
                        None
                    }
                }
            };
            let Some(task) = next else {
                break;
            };
            tracing::trace!(message = "tick.run", due = task.due, seq = task.seq);
            (task.run)();
            ran += 1;
        }
        ran
    }

    /// Advance until nothing is scheduled.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Some(due) = self.next_due() {
            ran += self.advance(due.saturating_sub(self.now()));
        }
        ran
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        self.inner.borrow().now
    }

    /// Scheduled tasks that have not been cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner
            .borrow()
            .tasks
            .iter()
            .filter(|t| !t.cancelled.get())
            .count()
    }

    fn next_due(&self) -> Option<u64> {
        self.inner
            .borrow()
            .tasks
            .iter()
            .filter(|t| !t.cancelled.get())
            .map(|t| t.due)
            .min()
    }

    /// A producer that emits `value` `after` ticks past each subscribe.
    #[must_use]
    pub fn delayed<V: Clone + 'static>(&self, value: V, after: u64) -> Delayed<V> {
        Delayed {
            queue: self.clone(),
            value,
            after,
            complete: false,
        }
    }
}

impl fmt::Debug for TickQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickQueue")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Producer returned by [`TickQueue::delayed`].
#[derive(Debug, Clone)]
pub struct Delayed<V> {
    queue: TickQueue,
    value: V,
    after: u64,
    complete: bool,
}

impl<V: Clone + 'static> Delayed<V> {
    /// Also complete right after the emission.
    #[must_use]
    pub fn then_complete(mut self) -> Self {
        self.complete = true;
        self
    }

    #[must_use]
    pub fn source(&self) -> Source<V> {
        Source::producer(self.clone())
    }
}

impl<V: Clone + 'static> PushProducer<V> for Delayed<V> {
    fn subscribe(&self, observer: SharedObserver<V>) -> Subscription {
        let value = self.value.clone();
        let complete = self.complete;
        self.queue.schedule(self.after, move || {
            observer.next(value);
            if complete {
                observer.complete();
            }
        })
    }
}

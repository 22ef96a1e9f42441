#![forbid(unsafe_code)]

//! Combination engine: one live generation of subscriptions at a time.
//!
//! [`CombineEngine::start`] opens one subscription per entry of a
//! [`SourceMap`], in insertion order, and folds their emissions into a
//! [`CombinedState`]:
//!
//! ```text
//!   start ──► Loading ──(every key emitted once)──► Ready ──(emission)──► Ready
//!     │          │                                    │
//!     │          └──────────(any error)───────────────┴──► Errored
//!     └─(empty map)──► Ready({})
//! ```
//!
//! Each generation owns a context object holding its liveness flag, the
//! accumulated values, and the subscription handles. Every per-key observer
//! captures that context when it is created. Retiring a generation clears
//! the flag before any handle is released, so a producer that keeps calling
//! after cancellation can never reach the published state: the flag, not the
//! unsubscribe, decides.
//!
//! Errors cancel every sibling subscription of the generation and publish
//! `Errored`. A completing source only stops its own key. An error raised
//! while `start` is still subscribing is published only after the handle
//! of the source being subscribed has been released too.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::adapter;
use crate::error::{EmissionError, SourceProtocolError};
use crate::observable::{Observable, Subscription};
use crate::observer::{Observer, SharedObserver};
use crate::source::SourceMap;
use crate::state::CombinedState;

/// Lifetime counters for one engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub generations_started: u64,
    pub subscriptions_opened: u64,
    pub subscriptions_closed: u64,
    pub emissions_accepted: u64,
    /// Notifications that arrived after their generation was retired.
    pub stale_dropped: u64,
    pub completions: u64,
    pub errors: u64,
}

type SharedStats = Rc<Cell<EngineStats>>;

fn bump(stats: &SharedStats, f: impl FnOnce(&mut EngineStats)) {
    let mut s = stats.get();
    f(&mut s);
    stats.set(s);
}

// ---------------------------------------------------------------------------
// Generation context
// ---------------------------------------------------------------------------

struct GenerationCx<V> {
    generation: u64,
    label: Rc<str>,
    live: Cell<bool>,
    /// Set while `start` is still opening subscriptions.
    subscribing: Cell<bool>,
    deferred: RefCell<Option<EmissionError>>,
    expected: usize,
    values: RefCell<BTreeMap<String, V>>,
    subscriptions: RefCell<Vec<Subscription>>,
    state: Observable<CombinedState<V>>,
    stats: SharedStats,
}

impl<V> GenerationCx<V> {
    /// Clear the liveness flag and release every handle. Idempotent.
    fn cancel(&self) {
        self.live.set(false);
        let handles = mem::take(&mut *self.subscriptions.borrow_mut());
        if !handles.is_empty() {
            let closed = handles.len() as u64;
            bump(&self.stats, |s| s.subscriptions_closed += closed);
        }
        // Released outside the borrow: a teardown may re-enter the engine.
        drop(handles);
        self.values.borrow_mut().clear();
    }

    fn drop_stale(&self, key: &str, channel: &'static str) {
        bump(&self.stats, |s| s.stale_dropped += 1);
        tracing::debug!(
            message = "emission.stale",
            label = %self.label,
            generation = self.generation,
            key,
            channel
        );
    }
}

/// Observer handed to the adapter for one key of one generation.
struct KeyObserver<V> {
    cx: Rc<GenerationCx<V>>,
    key: String,
}

impl<V: Clone + 'static> Observer<V> for KeyObserver<V> {
    fn next(&self, value: V) {
        let cx = &self.cx;
        if !cx.live.get() {
            cx.drop_stale(&self.key, "next");
            return;
        }
        bump(&cx.stats, |s| s.emissions_accepted += 1);
        tracing::trace!(
            message = "emission.accept",
            label = %cx.label,
            generation = cx.generation,
            key = %self.key
        );
        let snapshot = {
            let mut values = cx.values.borrow_mut();
            values.insert(self.key.clone(), value);
            (values.len() == cx.expected).then(|| Rc::new(values.clone()))
        };
        if let Some(snapshot) = snapshot {
            cx.state.set(CombinedState::Ready(snapshot));
        }
    }

    fn error(&self, error: EmissionError) {
        let cx = &self.cx;
        if !cx.live.get() {
            cx.drop_stale(&self.key, "error");
            return;
        }
        bump(&cx.stats, |s| s.errors += 1);
        tracing::warn!(
            message = "emission.error",
            label = %cx.label,
            generation = cx.generation,
            key = %self.key,
            error = %error
        );
        cx.cancel();
        if cx.subscribing.get() {
            *cx.deferred.borrow_mut() = Some(error);
        } else {
            cx.state.set(CombinedState::Errored(error));
        }
    }

    fn complete(&self) {
        let cx = &self.cx;
        if !cx.live.get() {
            cx.drop_stale(&self.key, "complete");
            return;
        }
        bump(&cx.stats, |s| s.completions += 1);
        tracing::trace!(
            message = "source.complete",
            label = %cx.label,
            generation = cx.generation,
            key = %self.key
        );
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns the live generation and publishes its [`CombinedState`].
///
/// Dropping the engine tears the live generation down.
pub struct CombineEngine<V> {
    label: Rc<str>,
    state: Observable<CombinedState<V>>,
    current: Option<Rc<GenerationCx<V>>>,
    generation: u64,
    stats: SharedStats,
}

impl<V: Clone + 'static> CombineEngine<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_label("binding")
    }

    /// An engine whose log events carry `label`.
    #[must_use]
    pub fn with_label(label: impl Into<Rc<str>>) -> Self {
        Self {
            label: label.into(),
            state: Observable::new(CombinedState::Loading),
            current: None,
            generation: 0,
            stats: Rc::new(Cell::new(EngineStats::default())),
        }
    }

    /// Retire the live generation and subscribe to every entry of `sources`.
    ///
    /// The state is reset to `Loading` first; an empty map goes straight to
    /// `Ready({})` without subscribing. Sources that emit synchronously may
    /// move the state to `Ready` or `Errored` before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`SourceProtocolError`] (carrying the offending key) if an
    /// entry has no recognized shape. Subscriptions already opened for this
    /// generation are cancelled and the state stays `Loading`.
    pub fn start(&mut self, sources: &SourceMap<V>) -> Result<(), SourceProtocolError> {
        self.retire();
        self.generation += 1;
        bump(&self.stats, |s| s.generations_started += 1);
        let keys: Vec<&str> = sources.keys().collect();
        tracing::debug!(
            message = "generation.start",
            label = %self.label,
            generation = self.generation,
            keys = ?keys
        );

        if sources.is_empty() {
            self.state.set(CombinedState::Ready(Rc::new(BTreeMap::new())));
            return Ok(());
        }
        self.state.set(CombinedState::Loading);

        let cx = Rc::new(GenerationCx {
            generation: self.generation,
            label: Rc::clone(&self.label),
            live: Cell::new(true),
            subscribing: Cell::new(true),
            deferred: RefCell::new(None),
            expected: sources.len(),
            values: RefCell::new(BTreeMap::new()),
            subscriptions: RefCell::new(Vec::with_capacity(sources.len())),
            state: self.state.clone(),
            stats: Rc::clone(&self.stats),
        });
        self.current = Some(Rc::clone(&cx));

        for (key, source) in sources.iter() {
            let observer: SharedObserver<V> = Rc::new(KeyObserver {
                cx: Rc::clone(&cx),
                key: key.to_owned(),
            });
            match adapter::subscribe(source, observer) {
                Ok(mut subscription) => {
                    bump(&self.stats, |s| s.subscriptions_opened += 1);
                    tracing::trace!(
                        message = "subscription.open",
                        label = %self.label,
                        generation = self.generation,
                        key
                    );
                    if !cx.live.get() {
                        // The source errored synchronously: the generation is over.
                        subscription.unsubscribe();
                        bump(&self.stats, |s| s.subscriptions_closed += 1);
                        break;
                    }
                    cx.subscriptions.borrow_mut().push(subscription);
                }
                Err(err) => {
                    cx.subscribing.set(false);
                    let err = err.with_key(key);
                    tracing::error!(
                        message = "source.protocol_error",
                        label = %self.label,
                        generation = self.generation,
                        key,
                        error = %err
                    );
                    self.retire();
                    return Err(err);
                }
            }
        }
        cx.subscribing.set(false);
        let deferred = cx.deferred.borrow_mut().take();
        if let Some(error) = deferred {
            self.state.set(CombinedState::Errored(error));
        }
        Ok(())
    }

    /// Latest published state.
    #[must_use]
    pub fn state(&self) -> CombinedState<V> {
        self.state.get()
    }

    /// Call `callback` on every state change.
    pub fn observe(&self, callback: impl Fn(&CombinedState<V>) + 'static) -> Subscription {
        self.state.subscribe(callback)
    }

    /// A shared handle to the published state. Reading it never touches
    /// the engine, so it stays usable from inside a state callback.
    #[must_use]
    pub fn state_handle(&self) -> Observable<CombinedState<V>> {
        self.state.clone()
    }

    /// Number of state changes published so far.
    #[must_use]
    pub fn state_version(&self) -> u64 {
        self.state.version()
    }

    /// Retire the live generation and publish `Loading` without subscribing.
    pub fn reset(&mut self) {
        self.retire();
        self.state.set(CombinedState::Loading);
    }
}

impl<V> CombineEngine<V> {
    /// Cancel the live generation, if any. The published state is left as is.
    pub fn retire(&mut self) {
        if let Some(cx) = self.current.take() {
            tracing::debug!(
                message = "generation.retire",
                label = %self.label,
                generation = cx.generation
            );
            cx.cancel();
        }
    }

    /// Tear down: cancel the live generation. No state transition follows.
    pub fn dispose(&mut self) {
        if self.current.is_some() {
            tracing::debug!(
                message = "binding.teardown",
                label = %self.label,
                generation = self.generation
            );
        }
        self.retire();
    }

    /// Number of generations started.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a generation is live and still accepting emissions.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.current.as_ref().is_some_and(|cx| cx.live.get())
    }

    /// Handles held by the live generation.
    #[must_use]
    pub fn live_subscriptions(&self) -> usize {
        self.current
            .as_ref()
            .map_or(0, |cx| cx.subscriptions.borrow().len())
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats.get()
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<V: Clone + 'static> Default for CombineEngine<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Drop for CombineEngine<V> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<V> fmt::Debug for CombineEngine<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombineEngine")
            .field("label", &self.label)
            .field("generation", &self.generation)
            .field("live", &self.is_live())
            .field("subscriptions", &self.live_subscriptions())
            .finish()
    }
}

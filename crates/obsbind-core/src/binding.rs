#![forbid(unsafe_code)]

//! `combine`: trigger tracking plus the engine, behind a render/commit API.
//!
//! Hosts with a render phase and a commit phase call [`Binding::prepare`]
//! while rendering and [`Binding::commit`] once the render is committed, so
//! subscriptions are only ever opened for inputs that actually made it to
//! the screen. Hosts without that split call [`Binding::combine`], which does
//! both.
//!
//! ```
//! use obsbind_core::{Binding, Props, SourceMap, Subject, Value};
//!
//! let user = Subject::new();
//! let mut binding = Binding::new(["id"]);
//! let props = Props::new().with("id", 1);
//!
//! let state = binding
//!     .combine(&props, |_| SourceMap::new().with("user", user.clone()))
//!     .unwrap();
//! assert!(state.is_loading());
//!
//! user.emit(Value::from("ada"));
//! assert_eq!(binding.state().get("user"), Some(&Value::from("ada")));
//! ```

use std::fmt;

use crate::config::BindingConfig;
use crate::engine::{CombineEngine, EngineStats};
use crate::error::SourceProtocolError;
use crate::observable::{Observable, Subscription};
use crate::props::Props;
use crate::source::SourceMap;
use crate::state::CombinedState;
use crate::trigger::{Decision, TriggerTracker, WatchList};
use crate::value::{Identity, Value};

/// One caller's binding to a generation-scoped set of sources.
///
/// The source-map factory runs once per generation, on the evaluation that
/// starts it. Dropping the binding tears down its subscriptions.
pub struct Binding<V = Value> {
    tracker: TriggerTracker<V>,
    engine: CombineEngine<V>,
    pending: Option<SourceMap<V>>,
    poisoned: Option<SourceProtocolError>,
}

impl<V: Identity + Clone + 'static> Binding<V> {
    #[must_use]
    pub fn new(watch: impl Into<WatchList>) -> Self {
        let config = BindingConfig::never();
        Self::with_parts(watch.into(), config.label_or_default())
    }

    #[must_use]
    pub fn from_config(config: &BindingConfig) -> Self {
        Self::with_parts(config.watch_list(), config.label_or_default())
    }

    fn with_parts(watch: WatchList, label: &str) -> Self {
        Self {
            tracker: TriggerTracker::new(watch),
            engine: CombineEngine::with_label(label),
            pending: None,
            poisoned: None,
        }
    }

    /// Render phase. Decides the generation from `props`; on a new one the
    /// outgoing generation is cancelled, the state resets to `Loading`, and
    /// `factory` computes the source map to subscribe at commit.
    pub fn prepare<F>(&mut self, props: &Props<V>, factory: F) -> Decision
    where
        F: FnOnce(&Props<V>) -> SourceMap<V>,
    {
        let decision = self.tracker.evaluate(props);
        if decision.is_new() {
            self.begin(factory(props));
        }
        decision
    }

    /// Render phase keyed by an explicit ordered list instead of watched
    /// props. `sources` is used only when a new generation starts.
    pub fn prepare_keyed(
        &mut self,
        reset_on: impl IntoIterator<Item = V>,
        sources: &SourceMap<V>,
    ) -> Decision {
        let decision = self.tracker.evaluate_key(reset_on);
        if decision.is_new() {
            self.begin(sources.clone());
        }
        decision
    }

    fn begin(&mut self, sources: SourceMap<V>) {
        self.engine.reset();
        self.poisoned = None;
        self.pending = Some(sources);
    }

    /// Commit phase. Opens the subscriptions of a freshly prepared
    /// generation; a no-op when nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns the [`SourceProtocolError`] of the current generation, on this
    /// call and on every later one until a new generation starts.
    pub fn commit(&mut self) -> Result<(), SourceProtocolError> {
        if let Some(err) = &self.poisoned {
            return Err(err.clone());
        }
        let Some(sources) = self.pending.take() else {
            return Ok(());
        };
        self.engine.start(&sources).map_err(|err| {
            self.poisoned = Some(err.clone());
            err
        })
    }

    /// [`prepare`](Self::prepare) then [`commit`](Self::commit); returns the
    /// latest state.
    ///
    /// # Errors
    ///
    /// See [`commit`](Self::commit). Emission errors are never returned here;
    /// they arrive as [`CombinedState::Errored`].
    pub fn combine<F>(
        &mut self,
        props: &Props<V>,
        factory: F,
    ) -> Result<CombinedState<V>, SourceProtocolError>
    where
        F: FnOnce(&Props<V>) -> SourceMap<V>,
    {
        self.prepare(props, factory);
        self.commit()?;
        Ok(self.state())
    }

    /// Keyed form of [`combine`](Self::combine).
    ///
    /// # Errors
    ///
    /// See [`commit`](Self::commit).
    pub fn combine_keyed(
        &mut self,
        reset_on: impl IntoIterator<Item = V>,
        sources: &SourceMap<V>,
    ) -> Result<CombinedState<V>, SourceProtocolError> {
        self.prepare_keyed(reset_on, sources);
        self.commit()?;
        Ok(self.state())
    }

    #[must_use]
    pub fn state(&self) -> CombinedState<V> {
        self.engine.state()
    }

    /// Shared handle to the published state, valid for the binding's life.
    #[must_use]
    pub fn state_handle(&self) -> Observable<CombinedState<V>> {
        self.engine.state_handle()
    }

    /// Call `callback` on every state change, e.g. to schedule a re-render.
    pub fn observe(&self, callback: impl Fn(&CombinedState<V>) + 'static) -> Subscription {
        self.engine.observe(callback)
    }

    /// Generations decided so far, committed or not.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.tracker.generation()
    }

    /// Whether a prepared generation is waiting for [`commit`](Self::commit).
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn live_subscriptions(&self) -> usize {
        self.engine.live_subscriptions()
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    #[must_use]
    pub fn watch(&self) -> &WatchList {
        self.tracker.watch()
    }

    /// Tear down in place. The next evaluation starts a fresh generation, as
    /// if the host had mounted the binding again.
    pub fn unmount(&mut self) {
        self.pending = None;
        self.poisoned = None;
        self.engine.dispose();
        self.tracker.reset();
    }

    /// Tear down. Equivalent to dropping the binding.
    pub fn dispose(mut self) {
        self.pending = None;
        self.engine.dispose();
    }
}

impl<V> fmt::Debug for Binding<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("engine", &self.engine)
            .field("pending", &self.pending.is_some())
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}

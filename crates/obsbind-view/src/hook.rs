#![forbid(unsafe_code)]

//! Stateful-hook form: `combine` for use inside a component body.
//!
//! Unlike the decorator and render-prop forms, the hook never turns an
//! emission error into a failed render; the caller inspects
//! [`CombinedState::Errored`] and decides.

use obsbind_core::{
    Binding, BindingConfig, CombinedState, Decision, EngineStats, Identity, Props,
    SourceMap, SourceProtocolError, Subscription, Value, WatchList,
};

/// Hook state returned by [`use_observables`]. Keep it across renders.
pub struct UseObservables<V = Value> {
    binding: Binding<V>,
    factory: Box<dyn Fn(&Props<V>) -> SourceMap<V>>,
}

/// Create the hook state.
pub fn use_observables<V, F>(watch: impl Into<WatchList>, factory: F) -> UseObservables<V>
where
    V: Identity + Clone + 'static,
    F: Fn(&Props<V>) -> SourceMap<V> + 'static,
{
    UseObservables {
        binding: Binding::new(watch),
        factory: Box::new(factory),
    }
}

impl<V: Identity + Clone + 'static> UseObservables<V> {
    /// Replace the binding with one built from `config`. The config's
    /// `watch` replaces the one given to [`use_observables`].
    #[must_use]
    pub fn with_config(mut self, config: &BindingConfig) -> Self {
        self.binding = Binding::from_config(config);
        self
    }

    /// Evaluate against `props` and return the latest state.
    ///
    /// # Errors
    ///
    /// Only [`SourceProtocolError`]; emission errors come back as
    /// [`CombinedState::Errored`].
    pub fn combine(&mut self, props: &Props<V>) -> Result<CombinedState<V>, SourceProtocolError> {
        let factory = &self.factory;
        self.binding.combine(props, |p| factory(p))
    }

    /// Render-phase half of [`combine`](Self::combine).
    pub fn prepare(&mut self, props: &Props<V>) -> Decision {
        let factory = &self.factory;
        self.binding.prepare(props, |p| factory(p))
    }

    /// Effect-phase half of [`combine`](Self::combine).
    ///
    /// # Errors
    ///
    /// See [`Binding::commit`].
    pub fn commit(&mut self) -> Result<(), SourceProtocolError> {
        self.binding.commit()
    }

    #[must_use]
    pub fn state(&self) -> CombinedState<V> {
        self.binding.state()
    }

    pub fn observe(&self, callback: impl Fn(&CombinedState<V>) + 'static) -> Subscription {
        self.binding.observe(callback)
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.binding.stats()
    }

    pub fn unmount(&mut self) {
        self.binding.unmount();
    }
}

impl<V> std::fmt::Debug for UseObservables<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UseObservables")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obsbind_core::{EmissionError, Subject};

    #[test]
    fn returns_errors_as_state() {
        let source: Subject<Value> = Subject::new();
        let s = source.clone();
        let mut hook = use_observables(WatchList::Never, move |_| {
            SourceMap::new().with("s", s.clone())
        });
        let first = hook.combine(&Props::new());
        assert!(first.is_ok_and(|state| state.is_loading()));

        source.fail(EmissionError::msg("x"));
        let state = hook.combine(&Props::new());
        assert!(state.is_ok_and(|s| s.error().is_some() && s.data().is_none()));
    }

    #[test]
    fn split_phases() {
        let source: Subject<Value> = Subject::new();
        let s = source.clone();
        let mut hook = use_observables(["id"], move |_| SourceMap::new().with("s", s.clone()));
        assert_eq!(hook.prepare(&Props::new().with("id", 1)), Decision::New);
        assert_eq!(source.observer_count(), 0);
        assert!(hook.commit().is_ok());
        assert_eq!(source.observer_count(), 1);
        assert_eq!(hook.stats().generations_started, 1);
    }

    #[test]
    fn config_watch_replaces_initial_watch() {
        let source: Subject<Value> = Subject::new();
        let s = source.clone();
        let mut hook = use_observables(["id"], move |_| SourceMap::new().with("s", s.clone()))
            .with_config(&BindingConfig::watching(["page"]));

        let _ = hook.combine(&Props::new().with("id", 1).with("page", 1));
        let _ = hook.combine(&Props::new().with("id", 2).with("page", 1));
        assert_eq!(hook.stats().generations_started, 1);

        let _ = hook.combine(&Props::new().with("id", 2).with("page", 2));
        assert_eq!(hook.stats().generations_started, 2);
        assert_eq!(source.observer_count(), 1);
    }
}

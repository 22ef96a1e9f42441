#![forbid(unsafe_code)]

//! Render-prop form: sources supplied directly, data handed to `children`.

use std::cell::RefCell;
use std::fmt;

use obsbind_core::{
    Binding, BindingConfig, CombinedState, Data, Identity, Observable, SourceMap, Subscription,
    Value,
};

use crate::RenderResult;
use crate::error::RenderError;

/// Props of [`ObservablesRender::render`].
pub struct ObservablesProps<V, F> {
    /// A change in any position starts a new generation.
    pub reset_on: Vec<V>,
    /// Used only when a new generation starts.
    pub observables: SourceMap<V>,
    pub children: F,
}

/// Render-prop component. Keep one instance per mounted position: it owns
/// the binding.
pub struct ObservablesRender<V = Value> {
    binding: RefCell<Binding<V>>,
    state: Observable<CombinedState<V>>,
}

impl<V: Identity + Clone + 'static> ObservablesRender<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&BindingConfig::never().with_label("observables"))
    }

    /// Only `label` is read; generations follow `reset_on`.
    #[must_use]
    pub fn from_config(config: &BindingConfig) -> Self {
        let binding = Binding::from_config(config);
        Self {
            state: binding.state_handle(),
            binding: RefCell::new(binding),
        }
    }

    /// `Ok(None)` while loading, `Err` once a source fails, otherwise
    /// whatever `children` renders from the combined data.
    pub fn render<F, O>(&self, props: ObservablesProps<V, F>) -> RenderResult<O>
    where
        F: FnOnce(&Data<V>) -> O,
    {
        let ObservablesProps {
            reset_on,
            observables,
            children,
        } = props;
        let state = self
            .binding
            .borrow_mut()
            .combine_keyed(reset_on, &observables)?;
        match state {
            CombinedState::Loading => Ok(None),
            CombinedState::Errored(err) => Err(RenderError::Emission(err)),
            CombinedState::Ready(data) => Ok(Some(children(&data))),
        }
    }

    /// Safe to call from an [`on_change`](Self::on_change) callback, even
    /// one fired while `render` is subscribing.
    pub fn state(&self) -> CombinedState<V> {
        self.state.get()
    }

    pub fn on_change(&self, callback: impl Fn(&CombinedState<V>) + 'static) -> Subscription {
        self.state.subscribe(callback)
    }

    pub fn unmount(&self) {
        self.binding.borrow_mut().unmount();
    }
}

impl<V: Identity + Clone + 'static> Default for ObservablesRender<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for ObservablesRender<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservablesRender")
            .field("binding", &self.binding)
            .finish()
    }
}

#![forbid(unsafe_code)]

//! Decorator form: wrap a component so it renders with combined data.
//!
//! ```
//! use obsbind_core::{Props, SourceMap, Subject, Value};
//! use obsbind_view::{Component, component, with_observables};
//!
//! let title = Subject::new();
//! let source = title.clone();
//! let header = with_observables(["id"], move |_props: &Props| {
//!     SourceMap::new().with("title", source.clone())
//! })
//! .wrap(component("Header", |props: &Props| {
//!     props.get("title").and_then(Value::as_str).map(str::to_owned)
//! }));
//!
//! let props = Props::new().with("id", 1);
//! assert_eq!(header.render(&props), Ok(None));
//!
//! title.emit(Value::from("Inbox"));
//! assert_eq!(header.render(&props), Ok(Some(Some("Inbox".to_owned()))));
//! assert_eq!(header.display_name(), "withObservables[id](Header)");
//! ```

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use obsbind_core::{
    Binding, BindingConfig, CombinedState, Identity, Observable, Props, SourceMap, Subscription,
    Value, WatchList,
};

use crate::RenderResult;
use crate::component::{Component, Statics};
use crate::error::RenderError;

type Factory<V> = Rc<dyn Fn(&Props<V>) -> SourceMap<V>>;

/// Decorator returned by [`with_observables`]; apply it with
/// [`wrap`](ObservablesDecorator::wrap).
pub struct ObservablesDecorator<V = Value> {
    config: BindingConfig,
    watch: WatchList,
    factory: Factory<V>,
}

/// Start a decorator watching `watch` and computing each generation's
/// sources with `factory`.
pub fn with_observables<V, F>(watch: impl Into<WatchList>, factory: F) -> ObservablesDecorator<V>
where
    F: Fn(&Props<V>) -> SourceMap<V> + 'static,
{
    ObservablesDecorator {
        config: BindingConfig::never(),
        watch: watch.into(),
        factory: Rc::new(factory),
    }
}

impl<V: Identity + Clone + 'static> ObservablesDecorator<V> {
    /// Decorator configured from a [`BindingConfig`]; its `watch` replaces
    /// the one given to [`with_observables`].
    #[must_use]
    pub fn with_config(mut self, config: BindingConfig) -> Self {
        self.watch = config.watch_list();
        self.config = config;
        self
    }

    /// Wrap `inner`. Each wrapped component owns its own binding, so one
    /// decorator can wrap several components.
    pub fn wrap<C: Component<V>>(&self, inner: C) -> WithObservables<V, C> {
        let config = BindingConfig {
            watch: match &self.watch {
                WatchList::Never => None,
                WatchList::Keys(keys) => Some(keys.clone()),
            },
            label: Some(
                self.config
                    .label
                    .clone()
                    .unwrap_or_else(|| inner.display_name().into_owned()),
            ),
        };
        let binding = Binding::from_config(&config);
        WithObservables {
            state: binding.state_handle(),
            watch: binding.watch().clone(),
            binding: RefCell::new(binding),
            factory: Rc::clone(&self.factory),
            inner,
        }
    }
}

/// A component wrapped by [`with_observables`].
///
/// Renders nothing while loading, fails the render pass on a source error,
/// and otherwise renders the inner component with its props merged with the
/// combined data (data wins on name collisions).
///
/// [`state`](Self::state), [`on_change`](Self::on_change) and
/// [`display_name`](Component::display_name) may be called from a state
/// callback fired in the middle of a render.
pub struct WithObservables<V, C> {
    binding: RefCell<Binding<V>>,
    state: Observable<CombinedState<V>>,
    watch: WatchList,
    factory: Factory<V>,
    inner: C,
}

impl<V: Identity + Clone + 'static, C: Component<V>> WithObservables<V, C> {
    /// The wrapped component.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Latest combined state, without rendering.
    pub fn state(&self) -> CombinedState<V> {
        self.state.get()
    }

    /// Call `callback` whenever the combined state changes, so the host can
    /// schedule a re-render.
    pub fn on_change(&self, callback: impl Fn(&CombinedState<V>) + 'static) -> Subscription {
        self.state.subscribe(callback)
    }

    /// Tear the subscriptions down; the next render mounts afresh.
    pub fn unmount(&self) {
        self.binding.borrow_mut().unmount();
    }
}

impl<V: Identity + Clone + 'static, C: Component<V>> Component<V> for WithObservables<V, C> {
    type Output = RenderResult<C::Output>;

    fn render(&self, props: &Props<V>) -> Self::Output {
        let state = self
            .binding
            .borrow_mut()
            .combine(props, |p| (self.factory)(p))?;
        match state {
            CombinedState::Loading => Ok(None),
            CombinedState::Errored(err) => Err(RenderError::Emission(err)),
            CombinedState::Ready(data) => Ok(Some(self.inner.render(&props.merged(&data)))),
        }
    }

    fn display_name(&self) -> Cow<'static, str> {
        let keys = self.watch.names().join(",");
        Cow::Owned(format!(
            "withObservables[{keys}]({})",
            self.inner.display_name()
        ))
    }

    fn statics(&self) -> Statics {
        self.inner.statics()
    }
}

impl<V, C> fmt::Debug for WithObservables<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithObservables")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

#![forbid(unsafe_code)]

//! The component seam: what a host runtime renders.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use obsbind_core::{Props, Value};

/// Non-standard attributes a component carries alongside its render
/// function. Decorators expose the inner component's statics unchanged.
pub type Statics = BTreeMap<String, Value>;

/// A renderable unit driven by named props.
pub trait Component<V = Value> {
    type Output;

    fn render(&self, props: &Props<V>) -> Self::Output;

    /// Name used in diagnostics and by decorators to build their own name.
    fn display_name(&self) -> Cow<'static, str>;

    fn statics(&self) -> Statics {
        Statics::new()
    }
}

/// A [`Component`] built from a closure; see [`component`].
pub struct FnComponent<V, O> {
    name: Cow<'static, str>,
    statics: Statics,
    render: Box<dyn Fn(&Props<V>) -> O>,
}

/// Build a component from a name and a render closure.
pub fn component<V, O>(
    name: impl Into<Cow<'static, str>>,
    render: impl Fn(&Props<V>) -> O + 'static,
) -> FnComponent<V, O> {
    FnComponent {
        name: name.into(),
        statics: Statics::new(),
        render: Box::new(render),
    }
}

impl<V, O> FnComponent<V, O> {
    /// Attach a static attribute.
    #[must_use]
    pub fn with_static(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.statics.insert(name.into(), value.into());
        self
    }
}

impl<V, O> Component<V> for FnComponent<V, O> {
    type Output = O;

    fn render(&self, props: &Props<V>) -> O {
        (self.render)(props)
    }

    fn display_name(&self) -> Cow<'static, str> {
        self.name.clone()
    }

    fn statics(&self) -> Statics {
        self.statics.clone()
    }
}

impl<V, O> fmt::Debug for FnComponent<V, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnComponent")
            .field("name", &self.name)
            .field("statics", &self.statics)
            .finish_non_exhaustive()
    }
}

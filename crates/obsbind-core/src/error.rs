#![forbid(unsafe_code)]

//! Error kinds.
//!
//! Two kinds are kept apart on purpose because they recover differently:
//!
//! - [`SourceProtocolError`]: a source matched none of the supported shapes.
//!   This is a caller bug, returned synchronously from the subscribe path and
//!   never routed through an observer.
//! - [`EmissionError`]: a source's own error channel fired. It is captured into
//!   [`CombinedState::Errored`](crate::CombinedState::Errored) and handed back
//!   as data.

use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// A source exposed none of the recognized shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized source shape `{shape}`{}", key_suffix(.key))]
pub struct SourceProtocolError {
    /// Name of the offending entry in the source map, once known.
    pub key: Option<String>,
    /// Description of the source, from [`SourceShape::describe`](crate::SourceShape::describe).
    pub shape: String,
}

fn key_suffix(key: &Option<String>) -> String {
    key.as_deref()
        .map(|k| format!(" for key `{k}`"))
        .unwrap_or_default()
}

impl SourceProtocolError {
    #[must_use]
    pub fn new(shape: impl Into<String>) -> Self {
        Self {
            key: None,
            shape: shape.into(),
        }
    }

    /// Attach the source-map key the failing source was registered under.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

/// An error emitted by a source after subscription.
///
/// Cheap to clone; clones share the underlying error. Equality is identity:
/// two `EmissionError`s are equal only if they came from the same emission.
#[derive(Clone)]
pub struct EmissionError {
    inner: Rc<dyn StdError + 'static>,
}

impl EmissionError {
    /// Wrap an arbitrary error.
    pub fn new<E: StdError + 'static>(error: E) -> Self {
        Self {
            inner: Rc::new(error),
        }
    }

    /// Build an error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Whether `self` and `other` share the same underlying error.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.inner), Rc::as_ptr(&other.inner))
    }

    /// Downcast to the concrete error type passed to [`EmissionError::new`].
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }
}

impl PartialEq for EmissionError {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Display for EmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl fmt::Debug for EmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EmissionError")
            .field(&format_args!("{}", self.inner))
            .finish()
    }
}

impl StdError for EmissionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

/// Failure to load a [`BindingConfig`](crate::BindingConfig) from text.
#[cfg(feature = "policy-config")]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

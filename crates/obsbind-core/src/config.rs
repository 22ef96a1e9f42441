#![forbid(unsafe_code)]

//! Binding configuration.
//!
//! With the `policy-config` feature a [`BindingConfig`] can be loaded from a
//! TOML or JSON document:
//!
//! ```toml
//! watch = ["id", "filter"]
//! label = "inbox"
//! ```
//!
//! A missing `watch` means "never resubscribe"; `watch = []` watches nothing,
//! which behaves the same.

#[cfg(feature = "policy-config")]
use crate::error::ConfigError;
use crate::trigger::WatchList;

const DEFAULT_LABEL: &str = "binding";

/// How a [`Binding`](crate::Binding) decides generations, and what it logs as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct BindingConfig {
    /// Input names whose change starts a new generation. `None` pins the
    /// binding to its first generation.
    pub watch: Option<Vec<String>>,
    /// Label attached to log events.
    pub label: Option<String>,
}

impl BindingConfig {
    /// Never resubscribe.
    #[must_use]
    pub fn never() -> Self {
        Self::default()
    }

    /// Resubscribe when any of `keys` changes.
    pub fn watching<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            watch: Some(keys.into_iter().map(Into::into).collect()),
            label: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn watch_list(&self) -> WatchList {
        WatchList::from(self.watch.clone())
    }

    #[must_use]
    pub fn label_or_default(&self) -> &str {
        self.label.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    /// Parse from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] on malformed input or unknown fields.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] on malformed input or unknown fields.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}

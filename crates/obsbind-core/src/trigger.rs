#![forbid(unsafe_code)]

//! Trigger-key tracking: is this evaluation still the same generation?
//!
//! The tracker remembers the ordered list of watched input values from the
//! last generation start. An evaluation produces the current list and
//! compares it position by position with [`Identity`]: equal length and every
//! element identical means [`Decision::Same`]. Nothing is compared deeply.
//!
//! A watched name missing from the props reads as "absent", which is
//! identical only to another absent value.
//!
//! [`WatchList::Never`] pins the binding to its first generation: every
//! evaluation after the first is `Same`, whatever the props do. An empty
//! `WatchList::Keys` behaves the same way because its key is always `[]`.

use crate::props::Props;
use crate::value::Identity;

/// Which inputs drive resubscription.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WatchList {
    /// Compute the source map once and never resubscribe.
    #[default]
    Never,
    /// Resubscribe when any of these inputs changes identity.
    Keys(Vec<String>),
}

impl WatchList {
    /// Watch the given input names, in order.
    pub fn keys<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keys(names.into_iter().map(Into::into).collect())
    }

    /// The watched names; empty for [`WatchList::Never`].
    #[must_use]
    pub fn names(&self) -> &[String] {
        match self {
            Self::Never => &[],
            Self::Keys(keys) => keys,
        }
    }
}

impl From<Option<Vec<String>>> for WatchList {
    fn from(watch: Option<Vec<String>>) -> Self {
        watch.map_or(Self::Never, Self::Keys)
    }
}

impl From<Vec<String>> for WatchList {
    fn from(keys: Vec<String>) -> Self {
        Self::Keys(keys)
    }
}

impl From<&[&str]> for WatchList {
    fn from(keys: &[&str]) -> Self {
        Self::keys(keys.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for WatchList {
    fn from(keys: [&str; N]) -> Self {
        Self::keys(keys)
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Start a new generation: cancel and resubscribe.
    New,
    /// Keep the live generation.
    Same,
}

impl Decision {
    #[must_use]
    pub fn is_new(self) -> bool {
        self == Self::New
    }
}

/// Positional identity over two key lists.
pub fn keys_identical<V: Identity>(a: &[Option<V>], b: &[Option<V>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.identical(y))
}

/// Remembers the last generation key and decides on each evaluation.
#[derive(Debug, Clone)]
pub struct TriggerTracker<V> {
    watch: WatchList,
    last: Option<Vec<Option<V>>>,
    generation: u64,
}

impl<V: Identity + Clone> TriggerTracker<V> {
    #[must_use]
    pub fn new(watch: impl Into<WatchList>) -> Self {
        Self {
            watch: watch.into(),
            last: None,
            generation: 0,
        }
    }

    #[must_use]
    pub fn watch(&self) -> &WatchList {
        &self.watch
    }

    /// Number of generations started so far. Zero before the first
    /// evaluation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The key the live generation was started with.
    #[must_use]
    pub fn current_key(&self) -> Option<&[Option<V>]> {
        self.last.as_deref()
    }

    /// Decide from the watched entries of `props`.
    pub fn evaluate(&mut self, props: &Props<V>) -> Decision {
        let key = match &self.watch {
            WatchList::Never if self.last.is_some() => return Decision::Same,
            WatchList::Never => Vec::new(),
            WatchList::Keys(names) => names.iter().map(|name| props.get(name).cloned()).collect(),
        };
        self.decide(key)
    }

    /// Decide from an explicit ordered key, ignoring the watch list.
    pub fn evaluate_key(&mut self, key: impl IntoIterator<Item = V>) -> Decision {
        self.decide(key.into_iter().map(Some).collect())
    }

    /// Forget the last key; the next evaluation starts a new generation.
    pub fn reset(&mut self) {
        self.last = None;
    }

    fn decide(&mut self, key: Vec<Option<V>>) -> Decision {
        if let Some(last) = &self.last
            && keys_identical(last, &key)
        {
            return Decision::Same;
        }
        self.last = Some(key);
        self.generation += 1;
        Decision::New
    }
}

#![forbid(unsafe_code)]

//! Caller inputs, keyed by name.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::value::Value;

/// Named inputs passed to a binding on every evaluation.
///
/// The trigger-key tracker reads watched entries from here; the decorator
/// merges combined data over it.
#[derive(Debug, Clone, PartialEq)]
pub struct Props<V = Value> {
    entries: BTreeMap<String, V>,
}

impl<V> Default for Props<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> Props<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<V>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<V>) -> Option<V> {
        self.entries.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<V> {
        self.entries.remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, V> {
        self.entries.iter()
    }
}

impl<V: Clone> Props<V> {
    /// These props with every entry of `data` laid over them. On a name
    /// collision the `data` entry wins.
    #[must_use]
    pub fn merged(&self, data: &BTreeMap<String, V>) -> Self {
        let mut entries = self.entries.clone();
        for (name, value) in data {
            entries.insert(name.clone(), value.clone());
        }
        Self { entries }
    }
}

impl<V, K: Into<String>> FromIterator<(K, V)> for Props<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<'a, V> IntoIterator for &'a Props<V> {
    type Item = (&'a String, &'a V);
    type IntoIter = btree_map::Iter<'a, String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<V> From<BTreeMap<String, V>> for Props<V> {
    fn from(entries: BTreeMap<String, V>) -> Self {
        Self { entries }
    }
}

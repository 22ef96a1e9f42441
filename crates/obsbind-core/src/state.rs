#![forbid(unsafe_code)]

//! The tri-state result of a binding.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::EmissionError;
use crate::value::Value;

/// Immutable snapshot of the combined values, one entry per source key.
///
/// A new snapshot is published only when an emission is accepted, so two
/// reads without an intervening emission return the same `Rc`.
pub type Data<V = Value> = Rc<BTreeMap<String, V>>;

/// Which of the three states holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Loading,
    Ready,
    Errored,
}

/// `{isLoading, data, error}` as a sum type: exactly one state holds, and
/// `data` and `error` can never both be present.
#[derive(Clone)]
pub enum CombinedState<V = Value> {
    /// At least one source has not emitted yet in this generation.
    Loading,
    /// Every source has emitted at least once.
    Ready(Data<V>),
    /// A source reported an error; the generation is over.
    Errored(EmissionError),
}

impl<V> CombinedState<V> {
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::Loading => Status::Loading,
            Self::Ready(_) => Status::Ready,
            Self::Errored(_) => Status::Errored,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    #[must_use]
    pub fn data(&self) -> Option<&Data<V>> {
        match self {
            Self::Ready(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&EmissionError> {
        match self {
            Self::Errored(error) => Some(error),
            _ => None,
        }
    }

    /// Look up one key of the ready snapshot.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.data().and_then(|data| data.get(key))
    }
}

impl<V> Default for CombinedState<V> {
    fn default() -> Self {
        Self::Loading
    }
}

/// Identity comparison: two `Ready` states are equal only if they share the
/// same snapshot, two `Errored` states only if they carry the same error.
impl<V> PartialEq for CombinedState<V> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Loading, Self::Loading) => true,
            (Self::Ready(a), Self::Ready(b)) => Rc::ptr_eq(a, b),
            (Self::Errored(a), Self::Errored(b)) => a.same(b),
            _ => false,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for CombinedState<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str("Loading"),
            Self::Ready(data) => f.debug_tuple("Ready").field(&**data).finish(),
            Self::Errored(error) => f.debug_tuple("Errored").field(error).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, i32)]) -> Data<i32> {
        Rc::new(pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect())
    }

    #[test]
    fn fields_are_mutually_exclusive() {
        let loading: CombinedState<i32> = CombinedState::Loading;
        assert!(loading.is_loading());
        assert!(loading.data().is_none() && loading.error().is_none());

        let ready = CombinedState::Ready(snapshot(&[("a", 1)]));
        assert!(!ready.is_loading());
        assert_eq!(ready.get("a"), Some(&1));
        assert!(ready.error().is_none());

        let errored: CombinedState<i32> = CombinedState::Errored(EmissionError::msg("x"));
        assert!(!errored.is_loading());
        assert!(errored.data().is_none());
        assert_eq!(errored.status(), Status::Errored);
    }

    #[test]
    fn ready_equality_is_snapshot_identity() {
        let data = snapshot(&[("a", 1)]);
        let a = CombinedState::Ready(Rc::clone(&data));
        let b = CombinedState::Ready(Rc::clone(&data));
        let c = CombinedState::Ready(snapshot(&[("a", 1)]));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn debug_shows_values() {
        let ready = CombinedState::Ready(snapshot(&[("a", 1), ("b", 2)]));
        assert_eq!(format!("{ready:?}"), r#"Ready({"a": 1, "b": 2})"#);
        assert_eq!(format!("{:?}", CombinedState::<i32>::Loading), "Loading");
    }
}

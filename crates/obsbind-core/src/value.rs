#![forbid(unsafe_code)]

//! Dynamic values and the identity comparison used for trigger keys.
//!
//! [`Value`] is the default payload type for props and emissions. Scalars are
//! stored inline; composites are reference counted so cloning a value (and
//! publishing snapshots that contain it) never deep-copies.
//!
//! # Identity vs. equality
//!
//! Two notions of sameness exist:
//!
//! - [`Identity::identical`] decides whether a watched input changed. Scalars
//!   and strings compare by value; `List`, `Map` and `Object` compare by
//!   pointer, so a freshly built map with equal contents is a *different*
//!   input.
//! - `PartialEq` is structural and exists for assertions and for the
//!   no-op rule of [`Observable::set`](crate::Observable::set).
//!
//! Floats follow SameValueZero: `NaN` is identical to `NaN`, and `0.0` is
//! identical to `-0.0`.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Sameness test for generation keys. Must be reflexive.
pub trait Identity {
    /// Whether `self` and `other` denote the same input.
    fn identical(&self, other: &Self) -> bool;
}

macro_rules! identity_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identity for $ty {
                fn identical(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

identity_by_eq!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, String, str,
);

impl Identity for f64 {
    fn identical(&self, other: &Self) -> bool {
        same_value_zero(*self, *other)
    }
}

impl Identity for f32 {
    fn identical(&self, other: &Self) -> bool {
        same_value_zero(f64::from(*self), f64::from(*other))
    }
}

impl<T: Identity + ?Sized> Identity for &T {
    fn identical(&self, other: &Self) -> bool {
        (**self).identical(*other)
    }
}

impl<T: ?Sized> Identity for Rc<T> {
    fn identical(&self, other: &Self) -> bool {
        rc_addr_eq(self, other)
    }
}

impl<T: Identity> Identity for Option<T> {
    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.identical(b),
            _ => false,
        }
    }
}

fn same_value_zero(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Pointer comparison that ignores fat-pointer metadata (vtables differ
/// across codegen units for the same object).
fn rc_addr_eq<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// A dynamically-typed value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent / null.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Immutable string, compared by content.
    Str(Rc<str>),
    /// Immutable list, identified by allocation.
    List(Rc<[Value]>),
    /// Immutable map, identified by allocation.
    Map(Rc<BTreeMap<String, Value>>),
    /// Opaque host object (a record, a handle, a callback table...).
    Object(Rc<dyn Any>),
}

impl Value {
    /// Wrap an arbitrary object.
    #[must_use]
    pub fn object<T: Any>(object: T) -> Self {
        Self::Object(Rc::new(object))
    }

    /// Wrap an already shared object without re-allocating.
    #[must_use]
    pub fn from_rc<T: Any>(object: Rc<T>) -> Self {
        Self::Object(object)
    }

    /// Build a map value from `(name, value)` pairs.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Map(Rc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Build a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(items.into_iter().collect())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(&**s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(&**items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(map) => Some(&**map),
            _ => None,
        }
    }

    /// Look up a field of a `Map` value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(name))
    }

    /// Downcast an `Object` value to a concrete type.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Object(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }
}

impl Identity for Value {
    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => same_value_zero(*a, *b),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => rc_addr_eq(a, b),
            (Self::Map(a), Self::Map(b)) => rc_addr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => rc_addr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => rc_addr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "{b:?}"),
            Self::Int(i) => write!(f, "{i:?}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => write!(f, "{:?}", &**s),
            Self::List(items) => f.debug_list().entries(items.iter()).finish(),
            Self::Map(map) => f.debug_map().entries(map.iter()).finish(),
            Self::Object(obj) => write!(f, "Object({:p})", Rc::as_ptr(obj)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(Rc::from(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(Rc::from(v))
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Map(Rc::new(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_identical_by_value() {
        assert!(Value::from(3).identical(&Value::from(3)));
        assert!(!Value::from(3).identical(&Value::from(4)));
        assert!(Value::from("id-1").identical(&Value::from(String::from("id-1"))));
        assert!(Value::Null.identical(&Value::Null));
        assert!(!Value::Null.identical(&Value::from(false)));
    }

    #[test]
    fn int_and_float_are_distinct_inputs() {
        assert!(!Value::from(1).identical(&Value::from(1.0)));
    }

    #[test]
    fn floats_use_same_value_zero() {
        assert!(Value::from(f64::NAN).identical(&Value::from(f64::NAN)));
        assert!(Value::from(0.0).identical(&Value::from(-0.0)));
        assert!(f64::NAN.identical(&f64::NAN));
    }

    #[test]
    fn composites_identical_by_pointer() {
        let a = Value::map([("x", Value::from(1))]);
        let b = Value::map([("x", Value::from(1))]);
        assert!(a.identical(&a.clone()));
        assert!(!a.identical(&b));
        // Structural equality still holds.
        assert_eq!(a, b);
    }

    #[test]
    fn objects_identical_by_pointer() {
        let shared = Rc::new(42_u32);
        let a = Value::from_rc(Rc::clone(&shared));
        let b = Value::from_rc(shared);
        let c = Value::object(42_u32);
        assert!(a.identical(&b));
        assert!(!a.identical(&c));
        assert_eq!(a.downcast_ref::<u32>(), Some(&42));
        assert_eq!(a.downcast_ref::<i64>(), None);
    }

    #[test]
    fn option_identity() {
        assert!(None::<i64>.identical(&None));
        assert!(Some(1_i64).identical(&Some(1)));
        assert!(!Some(1_i64).identical(&None));
    }

    #[test]
    fn rc_identity_ignores_contents() {
        let a = Rc::new(String::from("same"));
        let b = Rc::new(String::from("same"));
        assert!(a.identical(&Rc::clone(&a)));
        assert!(!a.identical(&b));
    }

    #[test]
    fn accessors() {
        let v = Value::map([("name", Value::from("ada")), ("age", Value::from(36))]);
        assert_eq!(v.field("name").and_then(Value::as_str), Some("ada"));
        assert_eq!(v.field("age").and_then(Value::as_i64), Some(36));
        assert_eq!(v.field("age").and_then(Value::as_f64), Some(36.0));
        assert!(v.field("missing").is_none());
        assert_eq!(v.kind(), "map");
        assert_eq!(Value::from(Some("x")), Value::from("x"));
        assert!(Value::from(None::<i64>).is_null());
    }

    #[test]
    fn debug_format() {
        let v = Value::list([Value::from(1), Value::from("a"), Value::Null]);
        assert_eq!(format!("{v:?}"), r#"[1, "a", Null]"#);
    }
}

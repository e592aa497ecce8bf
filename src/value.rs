//! The dynamic source side of a binding: [`Value`], [`Map`] and [`Native`].

use std::{
    any::{Any, TypeId},
    fmt,
    sync::Arc,
    time::{Duration, SystemTime},
};

use facet::Facet;
use facet_core::Shape;
use facet_reflect::{Partial, ReflectError};
use indexmap::IndexMap;
use time::OffsetDateTime;

use crate::{Dyn, shape::same_type};

/// A loosely-typed value, as produced by decoding JSON, form data, query
/// strings or headers, or assembled by hand.
///
/// A `Value` is itself a valid destination: binding into it stores the
/// source as-is.
#[derive(Debug, Clone, Default, PartialEq, Facet)]
#[repr(u8)]
pub enum Value {
    /// Absent or null. Binding a null value never writes anything.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer that does not fit in `i64`, or was produced unsigned.
    Uint(u64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// An ordered sequence of values.
    Seq(#[facet(opaque)] Vec<Value>),
    /// An associative container.
    Map(Map),
    /// Any other Rust value, carried as-is.
    Native(Native),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "map",
            Value::Native(native) => native.type_name(),
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Wraps any cloneable Rust value as a [`Value::Native`]. Such natives
    /// only feed the scalar coercions.
    pub fn native<T: Any + Clone + Send + Sync>(value: T) -> Self {
        Value::Native(Native::new(value))
    }

    /// Wraps a [`Facet`] value as a [`Value::Native`] that is assigned
    /// verbatim to destinations of the same type, and that empty
    /// [`Dyn`] slots store as its concrete type.
    pub fn typed_native<T>(value: T) -> Self
    where
        T: Facet<'static> + Clone + fmt::Debug + Send + Sync + 'static,
    {
        Value::Native(Native::typed(value))
    }

    /// Returns the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the sequence payload, if any.
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the map payload, if any.
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the native payload, if any.
    pub fn as_native(&self) -> Option<&Native> {
        match self {
            Value::Native(native) => Some(native),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Native(native) => write!(f, "<{}>", native.type_name()),
        }
    }
}

/// An insertion-ordered associative container of dynamic values, keyed by
/// string.
///
/// Lookups are hashed; iteration follows insertion order. Inserting an
/// existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Facet)]
pub struct Map {
    #[facet(opaque)]
    entries: IndexMap<String, Value>,
}

impl Map {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Inserts an entry, replacing the value of an equal key. Returns the
    /// previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Looks up the entry for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Looks up the entry for `key`, mutably.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Returns `true` if the map has an entry for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes the entry for `key`, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    /// Iterates over the keys in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.entries.keys()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Map::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Map {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl IntoIterator for Map {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Map {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// An opaque Rust value carried inside a [`Value`].
///
/// The scalar coercions understand a few well-known natives (`Duration`,
/// `SystemTime`, `OffsetDateTime`, strings, `char`). Natives built with
/// [`Native::typed`] are also assigned verbatim to a destination of their
/// own type.
#[derive(Clone, Facet)]
pub struct Native {
    #[facet(opaque)]
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    #[facet(opaque)]
    typed: Option<TypedOps>,
}

/// How a typed native writes itself into a destination.
#[derive(Clone, Copy)]
struct TypedOps {
    shape: &'static Shape,
    assign: fn(&dyn Any, &mut Partial<'static>) -> Result<(), ReflectError>,
    hold: fn(&dyn Any) -> Option<Dyn>,
}

impl Native {
    /// Wraps `value`.
    pub fn new<T: Any + Clone + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
            typed: None,
        }
    }

    /// Wraps a [`Facet`] value, making it assignable to destinations of
    /// type `T`.
    pub fn typed<T>(value: T) -> Self
    where
        T: Facet<'static> + Clone + fmt::Debug + Send + Sync + 'static,
    {
        Self {
            typed: Some(TypedOps {
                shape: T::SHAPE,
                assign: assign_cloned::<T>,
                hold: hold_cloned::<T>,
            }),
            ..Self::new(value)
        }
    }

    /// Full type name of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// `TypeId` of the wrapped value.
    pub fn type_id(&self) -> TypeId {
        (*self.value).type_id()
    }

    /// The reflected shape of a typed native.
    pub fn shape(&self) -> Option<&'static Shape> {
        self.typed.map(|ops| ops.shape)
    }

    /// Returns `true` if the wrapped value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Borrows the wrapped value as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Writes a clone of a typed native into the current frame of `partial`
    /// when the frame has the native's own type. Returns `false` otherwise.
    pub(crate) fn assign_to(&self, partial: &mut Partial<'static>) -> Result<bool, ReflectError> {
        match self.typed {
            Some(ops) if same_type(ops.shape, partial.shape()) => {
                (ops.assign)(&*self.value, partial)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// A [`Dyn`] holding a clone of a typed native.
    pub(crate) fn to_dyn(&self) -> Option<Dyn> {
        self.typed.and_then(|ops| (ops.hold)(&*self.value))
    }
}

fn assign_cloned<T: Facet<'static> + Clone + 'static>(
    src: &dyn Any,
    partial: &mut Partial<'static>,
) -> Result<(), ReflectError> {
    if let Some(value) = src.downcast_ref::<T>() {
        partial.set(value.clone())?;
    }
    Ok(())
}

fn hold_cloned<T>(src: &dyn Any) -> Option<Dyn>
where
    T: Facet<'static> + Clone + fmt::Debug + Send + Sync + 'static,
{
    src.downcast_ref::<T>().map(|value| Dyn::new(value.clone()))
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Native").field(&self.type_name).finish()
    }
}

/// Two natives are equal when they share the same allocation.
impl PartialEq for Native {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

macro_rules! impl_from_int {
    ($variant:ident as $wide:ty: $($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value as $wide)
                }
            }
        )*
    };
}

impl_from_int!(Int as i64: i8, i16, i32, i64, isize);
impl_from_int!(Uint as u64: u8, u16, u32, u64, usize);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Map(value)
    }
}

impl From<Native> for Value {
    fn from(value: Native) -> Self {
        Value::Native(value)
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Self {
        Value::native(value)
    }
}

impl From<SystemTime> for Value {
    fn from(value: SystemTime) -> Self {
        Value::native(value)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(value: OffsetDateTime) -> Self {
        Value::native(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Seq(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().collect())
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Uint(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Seq(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(object) => Value::Map(
                object
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

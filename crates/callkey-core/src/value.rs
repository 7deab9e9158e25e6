//! Raw argument values: the typed boundary of the key function
//!
//! Callers describe the arguments of a cached call as [`Value`]s. The set of
//! built-in shapes is closed; anything else enters through the [`Object`]
//! trait, whose optional capabilities (mapping, sequence, raw-bytes view,
//! stable encoding) decide how the normalizer and encoder treat it.
//!
//! The normalizer only ever borrows values.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ObjectError;

/// Result of a capability call on a caller-defined object
pub type ObjectResult<T> = std::result::Result<T, ObjectError>;

// ── Object capability trait ───────────────────────────────

/// A caller-defined argument type.
///
/// Every capability is optional. `None` means "this object does not have
/// that shape"; `Some(Err(_))` means the object has it but failed to produce
/// it, which propagates unchanged as an introspection error.
pub trait Object: fmt::Debug + Send + Sync {
    /// Runtime type name, used for raw views and error messages
    fn type_name(&self) -> &str;

    /// Whether the object is immutable and usable as-is in a key
    fn is_hashable(&self) -> bool {
        false
    }

    /// Mapping capability: the object's entries, in any order
    fn items(&self) -> Option<ObjectResult<Vec<(Value, Value)>>> {
        None
    }

    /// Sequence capability: the object's elements, in order
    fn elements(&self) -> Option<ObjectResult<Vec<Value>>> {
        None
    }

    /// Raw-bytes view capability: a contiguous copy of the contents
    fn raw_bytes(&self) -> Option<ObjectResult<Vec<u8>>> {
        None
    }

    /// Shape descriptor accompanying the raw-bytes view
    fn shape(&self) -> Option<Vec<usize>> {
        None
    }

    /// Deterministic bytes the encoder may write for this object when it is
    /// passed through unnormalized. Objects without one cannot be encoded.
    fn stable_encoding(&self) -> Option<Vec<u8>> {
        None
    }
}

// ── Value ─────────────────────────────────────────────────

/// A raw argument value supplied by the caller
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex { re: f64, im: f64 },
    Str(String),
    Bytes(Vec<u8>),
    /// Mutable ordered sequence; never hashable
    List(Vec<Value>),
    /// Immutable ordered sequence; hashable when every element is
    Tuple(Vec<Value>),
    /// Mutable mapping; never hashable
    Map(Mapping),
    Object(Arc<dyn Object>),
}

impl Value {
    /// Wrap a caller-defined object
    pub fn object<T: Object + 'static>(object: T) -> Self {
        Value::Object(Arc::new(object))
    }

    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn tuple<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::Tuple(items.into_iter().collect())
    }

    /// Get the type name for error messages and raw views
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Complex { .. } => "Complex",
            Value::Str(_) => "Str",
            Value::Bytes(_) => "Bytes",
            Value::List(_) => "List",
            Value::Tuple(_) => "Tuple",
            Value::Map(_) => "Map",
            Value::Object(obj) => obj.type_name(),
        }
    }

    /// Null or one of the scalar kinds that are canonical as they stand.
    /// Booleans are deliberately excluded.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Int(_)
                | Value::Float(_)
                | Value::Complex { .. }
                | Value::Str(_)
                | Value::Bytes(_)
        )
    }

    /// Whether the value can be used unchanged in a key
    pub fn is_hashable(&self) -> bool {
        match self {
            Value::Null
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Complex { .. }
            | Value::Str(_)
            | Value::Bytes(_) => true,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            Value::List(_) | Value::Map(_) => false,
            Value::Object(obj) => obj.is_hashable(),
        }
    }

    /// Convert from serde_json::Value
    ///
    /// Arrays become lists and objects become maps, in the order
    /// `serde_json` yields their entries.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(arr) => Value::List(arr.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (Value::Str(k.clone()), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Equality over the canonical form: floats compare by bits with every NaN
/// equal to every other, so `Value` is a lawful `Eq` and usable as a key.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_bits(*a) == float_bits(*b),
            (Value::Complex { re: ar, im: ai }, Value::Complex { re: br, im: bi }) => {
                float_bits(*ar) == float_bits(*br) && float_bits(*ai) == float_bits(*bi)
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => objects_equal(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(v) => float_bits(*v).hash(state),
            Value::Complex { re, im } => {
                float_bits(*re).hash(state);
                float_bits(*im).hash(state);
            }
            Value::Str(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::List(items) | Value::Tuple(items) => items.hash(state),
            // entry order is not part of equality
            Value::Map(map) => map.len().hash(state),
            Value::Object(obj) => {
                obj.type_name().hash(state);
                obj.stable_encoding().hash(state);
            }
        }
    }
}

/// Bit pattern of a float with every NaN payload collapsed to one
pub(crate) fn float_bits(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

/// Identity, or same type with identical stable encodings
fn objects_equal(a: &Arc<dyn Object>, b: &Arc<dyn Object>) -> bool {
    if std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)) {
        return true;
    }
    if a.type_name() != b.type_name() {
        return false;
    }
    match (a.stable_encoding(), b.stable_encoding()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Complex { re, im } => write!(f, "({}{:+}j)", re, im),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            Value::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Object(obj) => write!(f, "<{}>", obj.type_name()),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", v)?;
    }
    Ok(())
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Object + 'static> From<Arc<T>> for Value {
    fn from(obj: Arc<T>) -> Self {
        Value::Object(obj)
    }
}

// ── Mapping ───────────────────────────────────────────────

/// Insertion-ordered mapping with unique keys.
///
/// Order is kept only so that values passed through unnormalized are
/// written exactly as supplied; normalization sorts entries by key.
/// Equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    entries: IndexMap<Value, Value>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert an entry, replacing (in place) the value of an equal key
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> indexmap::map::Iter<'_, Value, Value> {
        self.entries.iter()
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = Mapping::with_capacity(iter.size_hint().0);
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<'a> IntoIterator for &'a Mapping {
    type Item = (&'a Value, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Mapping {
    type Item = (Value, Value);
    type IntoIter = indexmap::map::IntoIter<Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ── Buffer ────────────────────────────────────────────────

/// A numeric-array-like object exposing its contents as raw bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    type_name: String,
    data: Vec<u8>,
    shape: Option<Vec<usize>>,
}

impl Buffer {
    pub fn new(type_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            type_name: type_name.into(),
            data,
            shape: None,
        }
    }

    pub fn with_shape(mut self, shape: impl Into<Vec<usize>>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Object for Buffer {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn raw_bytes(&self) -> Option<ObjectResult<Vec<u8>>> {
        Some(Ok(self.data.clone()))
    }

    fn shape(&self) -> Option<Vec<usize>> {
        self.shape.clone()
    }

    fn stable_encoding(&self) -> Option<Vec<u8>> {
        let mut out = Vec::with_capacity(self.data.len() + 16);
        match &self.shape {
            Some(dims) => {
                out.push(1);
                out.extend_from_slice(&(dims.len() as u64).to_le_bytes());
                for dim in dims {
                    out.extend_from_slice(&(*dim as u64).to_le_bytes());
                }
            }
            None => out.push(0),
        }
        out.extend_from_slice(&self.data);
        Some(out)
    }
}

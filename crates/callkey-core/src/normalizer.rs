//! Canonical normalizer: freezes argument values into a comparison-stable form
//!
//! The normalizer converts arbitrarily nested, possibly mutable argument
//! values into a [`Frozen`] canonical form. This is the form the encoder
//! serializes into a cache key.
//!
//! # Pipeline
//!
//! `Value → normalize → Frozen → encoder → CacheKey`
//!
//! # Dispatch order
//!
//! Shapes overlap (a mapping object may also claim to be hashable), so the
//! checks run in a fixed order and the first match wins:
//!
//! 1. null and primitive scalars (before the depth check)
//! 2. depth budget exhausted → value passed through unchanged
//! 3. booleans, kept distinct from integers
//! 4. values that are already hashable
//! 5. mappings → key-sorted pairs
//! 6. sequences → tuples, order preserved
//! 7. raw-bytes views → `(type name, bytes, shape)`
//! 8. anything else → passed through unchanged
//!
//! # Guarantees
//!
//! - **Deterministic**: same input always produces the same form
//! - **Order-insensitive mappings**: key insertion order never matters
//! - **Bounded**: recursion stops after the depth budget

use std::cmp::Ordering;

use serde_json::json;
use tracing::trace;

use crate::value::{Mapping, Object, Value};
use crate::{Error, Result};

/// Recursion budget used by [`freeze`] and the default key function
pub const DEFAULT_DEPTH: usize = 10;

// ── Canonical form ─────────────────────────────────────────

/// A scalar that is canonical as it stands
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex { re: f64, im: f64 },
    Str(String),
    Bytes(Vec<u8>),
}

impl Scalar {
    /// Null or a primitive scalar. Booleans are not matched here.
    fn from_primitive(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Int(i) => Some(Scalar::Int(*i)),
            Value::Float(v) => Some(Scalar::Float(*v)),
            Value::Complex { re, im } => Some(Scalar::Complex { re: *re, im: *im }),
            Value::Str(s) => Some(Scalar::Str(s.clone())),
            Value::Bytes(b) => Some(Scalar::Bytes(b.clone())),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Null => serde_json::Value::Null,
            Scalar::Bool(b) => json!(b),
            Scalar::Int(i) => json!(i),
            Scalar::Float(v) => json!(v),
            Scalar::Complex { re, im } => json!({ "complex": [re, im] }),
            Scalar::Str(s) => json!(s),
            Scalar::Bytes(b) => json!({ "bytes": hex::encode(b) }),
        }
    }
}

/// Normalized raw-bytes view of a buffer-like object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawView {
    pub type_name: String,
    pub bytes: Vec<u8>,
    pub shape: Option<Vec<usize>>,
}

/// Canonical form of an argument value
#[derive(Debug, Clone, PartialEq)]
pub enum Frozen {
    /// Null, boolean or primitive scalar
    Primitive(Scalar),
    /// Normalized mapping: entries sorted by (unnormalized) key
    Pairs(Vec<(Value, Frozen)>),
    /// Normalized sequence
    Tuple(Vec<Frozen>),
    /// Normalized buffer-like object
    RawView(RawView),
    /// Value kept as supplied: already hashable, past the depth budget,
    /// or of no recognized shape
    Opaque(Value),
}

impl Frozen {
    /// Render the canonical form as JSON for inspection
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Frozen::Primitive(scalar) => scalar.to_json(),
            Frozen::Pairs(pairs) => json!({
                "pairs": pairs
                    .iter()
                    .map(|(k, v)| json!([value_to_json(k), v.to_json()]))
                    .collect::<Vec<_>>()
            }),
            Frozen::Tuple(items) => json!({
                "tuple": items.iter().map(Frozen::to_json).collect::<Vec<_>>()
            }),
            Frozen::RawView(view) => json!({
                "raw_view": {
                    "type": view.type_name,
                    "bytes": hex::encode(&view.bytes),
                    "shape": view.shape,
                }
            }),
            Frozen::Opaque(value) => json!({ "opaque": value_to_json(value) }),
        }
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(b) => json!(b),
        Value::List(items) => json!(items.iter().map(value_to_json).collect::<Vec<_>>()),
        Value::Tuple(items) => json!({
            "tuple": items.iter().map(value_to_json).collect::<Vec<_>>()
        }),
        Value::Map(map) => json!({
            "map": map
                .iter()
                .map(|(k, v)| json!([value_to_json(k), value_to_json(v)]))
                .collect::<Vec<_>>()
        }),
        Value::Object(obj) => json!({ "object": obj.type_name() }),
        scalar => Scalar::from_primitive(scalar)
            .map(|s| s.to_json())
            .unwrap_or(serde_json::Value::Null),
    }
}

// ── Public API ─────────────────────────────────────────────

/// Normalize a value with the default depth budget
pub fn freeze(value: &Value) -> Result<Frozen> {
    normalize(value, DEFAULT_DEPTH)
}

/// Normalize a value to canonical form
///
/// `depth` is the remaining recursion budget. At zero, any non-primitive
/// value is returned unchanged, even if it is unhashable.
///
/// # Errors
/// Returns `Introspection` if an object capability fails and
/// `UnorderableKeys` if a mapping's keys cannot be sorted.
pub fn normalize(value: &Value, depth: usize) -> Result<Frozen> {
    if let Some(scalar) = Scalar::from_primitive(value) {
        return Ok(Frozen::Primitive(scalar));
    }

    if depth == 0 {
        trace!(
            type_name = value.type_name(),
            "depth budget exhausted, passing value through"
        );
        return Ok(Frozen::Opaque(value.clone()));
    }

    if let Value::Bool(b) = value {
        return Ok(Frozen::Primitive(Scalar::Bool(*b)));
    }

    if value.is_hashable() {
        return Ok(Frozen::Opaque(value.clone()));
    }

    match value {
        Value::Map(map) => freeze_mapping(map.iter().map(|(k, v)| (k, v)), depth),
        Value::List(items) | Value::Tuple(items) => freeze_sequence(items, depth),
        Value::Object(obj) => normalize_object(obj.as_ref(), value, depth),
        _ => Ok(Frozen::Opaque(value.clone())),
    }
}

/// Normalize a positional argument list as if it were a tuple value
pub fn normalize_args(args: &[Value], depth: usize) -> Result<Frozen> {
    if depth == 0 || args.iter().all(Value::is_hashable) {
        return Ok(Frozen::Opaque(Value::Tuple(args.to_vec())));
    }
    freeze_sequence(args, depth)
}

/// Normalize keyword arguments as if they were a mapping value
pub fn normalize_kwargs(kwargs: &Mapping, depth: usize) -> Result<Frozen> {
    if depth == 0 {
        return Ok(Frozen::Opaque(Value::Map(kwargs.clone())));
    }
    freeze_mapping(kwargs.iter().map(|(k, v)| (k, v)), depth)
}

// ── Shape handlers ─────────────────────────────────────────

fn normalize_object(obj: &dyn Object, value: &Value, depth: usize) -> Result<Frozen> {
    let type_name = obj.type_name();

    if let Some(items) = obj.items() {
        let items = items.map_err(|e| Error::introspection(type_name, e))?;
        return freeze_mapping(items.iter().map(|(k, v)| (k, v)), depth);
    }

    if let Some(elements) = obj.elements() {
        let elements = elements.map_err(|e| Error::introspection(type_name, e))?;
        return freeze_sequence(&elements, depth);
    }

    if let Some(bytes) = obj.raw_bytes() {
        let bytes = bytes.map_err(|e| Error::introspection(type_name, e))?;
        return Ok(Frozen::RawView(RawView {
            type_name: type_name.to_string(),
            bytes,
            shape: obj.shape(),
        }));
    }

    trace!(type_name, "no recognized shape, keeping object opaque");
    Ok(Frozen::Opaque(value.clone()))
}

fn freeze_mapping<'a>(
    entries: impl Iterator<Item = (&'a Value, &'a Value)>,
    depth: usize,
) -> Result<Frozen> {
    let mut pairs = Vec::new();
    for (k, v) in entries {
        pairs.push((k.clone(), normalize(v, depth - 1)?));
    }

    // Sorting by kind first leaves every unorderable pair adjacent.
    pairs.sort_by(|(a, _), (b, _)| total_order(a, b));
    for window in pairs.windows(2) {
        compare_keys(&window[0].0, &window[1].0)?;
    }
    Ok(Frozen::Pairs(pairs))
}

fn freeze_sequence(items: &[Value], depth: usize) -> Result<Frozen> {
    items
        .iter()
        .map(|item| normalize(item, depth - 1))
        .collect::<Result<Vec<_>>>()
        .map(Frozen::Tuple)
}

// ── Key ordering ───────────────────────────────────────────

/// Natural ordering of mapping keys.
///
/// Booleans, integers and floats order numerically with one another; ties
/// between different kinds go bool < int < float. Strings order by code
/// point, byte strings lexicographically, tuples element-wise. Any other
/// combination (or a NaN) has no ordering.
fn compare_keys(a: &Value, b: &Value) -> Result<Ordering> {
    let ordering = match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Bytes(x), Value::Bytes(y)) => Some(x.cmp(y)),
        (Value::Tuple(x), Value::Tuple(y)) => return compare_tuples(x, y),
        _ => match (numeric_rank(a), numeric_rank(b)) {
            (Some(ra), Some(rb)) => compare_numbers(a, b).map(|o| o.then(ra.cmp(&rb))),
            _ => None,
        },
    };

    ordering.ok_or_else(|| Error::UnorderableKeys {
        left: a.type_name().to_string(),
        right: b.type_name().to_string(),
    })
}

fn compare_tuples(x: &[Value], y: &[Value]) -> Result<Ordering> {
    for (a, b) in x.iter().zip(y) {
        match compare_keys(a, b)? {
            Ordering::Equal => continue,
            other => return Ok(other),
        }
    }
    Ok(x.len().cmp(&y.len()))
}

/// Total order over all values, agreeing with `compare_keys` wherever the
/// latter succeeds. Kinds that cannot be compared at all order by kind.
fn total_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        (Value::Tuple(x), Value::Tuple(y)) => x
            .iter()
            .zip(y)
            .map(|(a, b)| total_order(a, b))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => match (numeric_rank(a), numeric_rank(b)) {
            (Some(ra), Some(rb)) => total_numbers(a, b).then(ra.cmp(&rb)),
            _ => kind_rank(a).cmp(&kind_rank(b)),
        },
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => 1,
        Value::Str(_) => 2,
        Value::Bytes(_) => 3,
        Value::Tuple(_) => 4,
        _ => 5,
    }
}

fn total_numbers(a: &Value, b: &Value) -> Ordering {
    match (as_integer(a), as_integer(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => match (as_float(a), as_float(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
    }
}

fn numeric_rank(value: &Value) -> Option<u8> {
    match value {
        Value::Bool(_) => Some(0),
        Value::Int(_) => Some(1),
        Value::Float(_) => Some(2),
        _ => None,
    }
}

fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (as_integer(a), as_integer(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => as_float(a)?.partial_cmp(&as_float(b)?),
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Int(i) => Some(*i),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(v) => Some(*v),
        other => as_integer(other).map(|i| i as f64),
    }
}

//! Key encoder: writes canonical forms with a versioned binary format
//!
//! # Pipeline
//!
//! `(args, kwargs) → normalize → (Frozen, Frozen) → serialize → CacheKey`
//!
//! # Format (version 1)
//!
//! ```text
//! key     := "CK" VERSION value
//! value   := TAG payload
//! len     := u64 little-endian
//! NULL    0x00
//! FALSE   0x01                 TRUE    0x02
//! INT     0x03 i64-le          FLOAT   0x04 f64-le
//! COMPLEX 0x05 f64-le f64-le
//! STR     0x06 len utf8        BYTES   0x07 len bytes
//! TUPLE   0x08 len value*      PAIRS   0x09 len (value value)*
//! RAWVIEW 0x0A str bytes shape
//! LIST    0x0B len value*      MAP     0x0C len (value value)*
//! OBJECT  0x0D str bytes
//! shape   := 0x00 | 0x01 len u64-le*
//! ```
//!
//! Keys produced under different format versions are never comparable.
//!
//! # Guarantees
//!
//! - **Deterministic**: the same canonical form always yields the same bytes
//! - **Tagged**: booleans, integers, strings and bytes never share an encoding
//! - **Explicit failure**: values that cannot be written are an error

use tracing::debug;

use crate::key::CacheKey;
use crate::normalizer::{
    normalize_args, normalize_kwargs, Frozen, RawView, Scalar, DEFAULT_DEPTH,
};
use crate::value::{float_bits, Mapping, Value};
use crate::{Error, Result};

/// Version byte written after the magic prefix
pub const FORMAT_VERSION: u8 = 1;

const MAGIC: &[u8; 2] = b"CK";

mod tag {
    pub const NULL: u8 = 0x00;
    pub const FALSE: u8 = 0x01;
    pub const TRUE: u8 = 0x02;
    pub const INT: u8 = 0x03;
    pub const FLOAT: u8 = 0x04;
    pub const COMPLEX: u8 = 0x05;
    pub const STR: u8 = 0x06;
    pub const BYTES: u8 = 0x07;
    pub const TUPLE: u8 = 0x08;
    pub const PAIRS: u8 = 0x09;
    pub const RAW_VIEW: u8 = 0x0A;
    pub const LIST: u8 = 0x0B;
    pub const MAP: u8 = 0x0C;
    pub const OBJECT: u8 = 0x0D;
}

// ── Public API ─────────────────────────────────────────────

/// Compute the cache key of a call with the default depth budget
///
/// # Errors
/// Returns `Serialization` if the normalized arguments still hold a value
/// the format cannot represent, plus any normalization error.
pub fn encode(args: &[Value], kwargs: &Mapping) -> Result<CacheKey> {
    encode_with_depth(args, kwargs, DEFAULT_DEPTH)
}

/// Compute the cache key of a call with an explicit depth budget
pub fn encode_with_depth(args: &[Value], kwargs: &Mapping, depth: usize) -> Result<CacheKey> {
    let positional = normalize_args(args, depth)?;
    let keyword = normalize_kwargs(kwargs, depth)?;
    let bytes = serialize_call(&positional, &keyword)?;
    debug!(
        args = args.len(),
        kwargs = kwargs.len(),
        len = bytes.len(),
        "encoded cache key"
    );
    Ok(CacheKey::from_bytes(bytes))
}

/// Serialize the normalized (positional, keyword) pair as one 2-tuple
pub fn serialize_call(positional: &Frozen, keyword: &Frozen) -> Result<Vec<u8>> {
    let mut out = header();
    out.push(tag::TUPLE);
    write_len(&mut out, 2);
    write_frozen(&mut out, positional)?;
    write_frozen(&mut out, keyword)?;
    Ok(out)
}

/// Serialize a single canonical form
pub fn serialize(frozen: &Frozen) -> Result<Vec<u8>> {
    let mut out = header();
    write_frozen(&mut out, frozen)?;
    Ok(out)
}

fn header() -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(MAGIC);
    out.push(FORMAT_VERSION);
    out
}

// ── Writers ────────────────────────────────────────────────

fn write_frozen(out: &mut Vec<u8>, frozen: &Frozen) -> Result<()> {
    match frozen {
        Frozen::Primitive(scalar) => write_scalar(out, scalar),
        Frozen::Pairs(pairs) => {
            out.push(tag::PAIRS);
            write_len(out, pairs.len());
            for (k, v) in pairs {
                write_value(out, k)?;
                write_frozen(out, v)?;
            }
        }
        Frozen::Tuple(items) => {
            out.push(tag::TUPLE);
            write_len(out, items.len());
            for item in items {
                write_frozen(out, item)?;
            }
        }
        Frozen::RawView(view) => write_raw_view(out, view),
        Frozen::Opaque(value) => write_value(out, value)?,
    }
    Ok(())
}

/// Write a value that was passed through unnormalized
fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Null => out.push(tag::NULL),
        Value::Bool(b) => write_bool(out, *b),
        Value::Int(i) => write_int(out, *i),
        Value::Float(v) => write_float(out, *v),
        Value::Complex { re, im } => write_complex(out, *re, *im),
        Value::Str(s) => write_str(out, s),
        Value::Bytes(b) => write_bytes(out, b),
        Value::List(items) => {
            out.push(tag::LIST);
            write_items(out, items)?;
        }
        Value::Tuple(items) => {
            out.push(tag::TUPLE);
            write_items(out, items)?;
        }
        Value::Map(map) => {
            out.push(tag::MAP);
            write_len(out, map.len());
            for (k, v) in map {
                write_value(out, k)?;
                write_value(out, v)?;
            }
        }
        Value::Object(obj) => {
            let encoding = obj.stable_encoding().ok_or_else(|| {
                Error::Serialization(format!(
                    "object of type {} has no stable encoding",
                    obj.type_name()
                ))
            })?;
            out.push(tag::OBJECT);
            write_str(out, obj.type_name());
            write_bytes(out, &encoding);
        }
    }
    Ok(())
}

fn write_items(out: &mut Vec<u8>, items: &[Value]) -> Result<()> {
    write_len(out, items.len());
    for item in items {
        write_value(out, item)?;
    }
    Ok(())
}

fn write_scalar(out: &mut Vec<u8>, scalar: &Scalar) {
    match scalar {
        Scalar::Null => out.push(tag::NULL),
        Scalar::Bool(b) => write_bool(out, *b),
        Scalar::Int(i) => write_int(out, *i),
        Scalar::Float(v) => write_float(out, *v),
        Scalar::Complex { re, im } => write_complex(out, *re, *im),
        Scalar::Str(s) => write_str(out, s),
        Scalar::Bytes(b) => write_bytes(out, b),
    }
}

fn write_raw_view(out: &mut Vec<u8>, view: &RawView) {
    out.push(tag::RAW_VIEW);
    write_str(out, &view.type_name);
    write_bytes(out, &view.bytes);
    match &view.shape {
        Some(dims) => {
            out.push(1);
            write_len(out, dims.len());
            for dim in dims {
                out.extend_from_slice(&(*dim as u64).to_le_bytes());
            }
        }
        None => out.push(0),
    }
}

// ── Helpers ────────────────────────────────────────────────

fn write_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u64).to_le_bytes());
}

fn write_bool(out: &mut Vec<u8>, b: bool) {
    out.push(if b { tag::TRUE } else { tag::FALSE });
}

fn write_int(out: &mut Vec<u8>, i: i64) {
    out.push(tag::INT);
    out.extend_from_slice(&i.to_le_bytes());
}

fn write_float(out: &mut Vec<u8>, v: f64) {
    out.push(tag::FLOAT);
    write_f64(out, v);
}

fn write_complex(out: &mut Vec<u8>, re: f64, im: f64) {
    out.push(tag::COMPLEX);
    write_f64(out, re);
    write_f64(out, im);
}

/// All NaN payloads share one encoding
fn write_f64(out: &mut Vec<u8>, v: f64) {
    out.extend_from_slice(&float_bits(v).to_le_bytes());
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    out.push(tag::STR);
    write_len(out, s.len());
    out.extend_from_slice(s.as_bytes());
}

fn write_bytes(out: &mut Vec<u8>, b: &[u8]) {
    out.push(tag::BYTES);
    write_len(out, b.len());
    out.extend_from_slice(b);
}

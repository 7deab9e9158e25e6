//! Cache keys and the key-function seam
//!
//! A [`CacheKey`] is the encoded byte string handed to a cache store. Stores
//! that want a fixed-width index can use [`CacheKey::digest`].

use std::fmt;

use sha2::{Digest, Sha256};

use crate::config::KeyConfig;
use crate::encoder::{encode_with_depth, FORMAT_VERSION};
use crate::normalizer::{normalize, normalize_args, normalize_kwargs, Frozen};
use crate::value::{Mapping, Value};
use crate::Result;

/// Deterministic key for one call's arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Vec<u8>);

impl CacheKey {
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> Self {
        CacheKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Format version the key was written with
    pub fn format_version(&self) -> u8 {
        self.0.get(2).copied().unwrap_or(FORMAT_VERSION)
    }

    /// Lowercase hex of the full key
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Lowercase hex SHA-256 of the key bytes (64 chars)
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.0);
        hex::encode(hasher.finalize())
    }
}

impl AsRef<[u8]> for CacheKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ── Key functions ──────────────────────────────────────────

/// Anything that can turn a call's arguments into a cache key.
///
/// Implemented by [`Keyer`] and by plain closures, so cache layers can take
/// a custom key function.
pub trait KeyFunction: Send + Sync {
    fn cache_key(&self, args: &[Value], kwargs: &Mapping) -> Result<CacheKey>;
}

impl<F> KeyFunction for F
where
    F: Fn(&[Value], &Mapping) -> Result<CacheKey> + Send + Sync,
{
    fn cache_key(&self, args: &[Value], kwargs: &Mapping) -> Result<CacheKey> {
        self(args, kwargs)
    }
}

/// Key function with an explicit configuration
#[derive(Debug, Clone, Default)]
pub struct Keyer {
    config: KeyConfig,
}

impl Keyer {
    /// # Errors
    /// Returns `Config` if the configuration is invalid.
    pub fn new(config: KeyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &KeyConfig {
        &self.config
    }

    /// Normalize one value with the configured depth budget
    pub fn freeze(&self, value: &Value) -> Result<Frozen> {
        normalize(value, self.config.max_depth)
    }

    /// Normalize a call's arguments without encoding them
    pub fn freeze_call(&self, args: &[Value], kwargs: &Mapping) -> Result<(Frozen, Frozen)> {
        Ok((
            normalize_args(args, self.config.max_depth)?,
            normalize_kwargs(kwargs, self.config.max_depth)?,
        ))
    }

    pub fn encode(&self, args: &[Value], kwargs: &Mapping) -> Result<CacheKey> {
        encode_with_depth(args, kwargs, self.config.max_depth)
    }

    /// SHA-256 hex digest of the call's key
    pub fn digest(&self, args: &[Value], kwargs: &Mapping) -> Result<String> {
        Ok(self.encode(args, kwargs)?.digest())
    }
}

impl KeyFunction for Keyer {
    fn cache_key(&self, args: &[Value], kwargs: &Mapping) -> Result<CacheKey> {
        self.encode(args, kwargs)
    }
}

/// Default cache key function
///
/// Normalizes `args` as a tuple and `kwargs` as a mapping with the default
/// depth budget, then encodes the pair.
///
/// # Errors
/// Returns `Serialization` if some argument cannot be encoded,
/// `Introspection` if an argument object fails, or `UnorderableKeys` if a
/// mapping's keys cannot be sorted.
pub fn default_cache_key(args: &[Value], kwargs: &Mapping) -> Result<CacheKey> {
    crate::encoder::encode(args, kwargs)
}

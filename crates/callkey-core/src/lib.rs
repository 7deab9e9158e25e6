//! callkey core: deterministic cache keys for call arguments
//!
//! Turns the positional and keyword arguments of a call into a byte-string
//! key such that logically equivalent calls (e.g. keyword mappings built in
//! a different order) share a key, while structurally different calls do not.
//!
//! # Architecture
//!
//! ```text
//! (args, kwargs) → Normalizer → Canonical Form (Frozen)
//!                                   ↓
//!                              Key Encoder → CacheKey (format v1)
//!                                   ↓
//!                              SHA-256 digest (optional fixed width)
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: same arguments always produce identical key bytes
//! - **Order-insensitive mappings**: key insertion order never matters
//! - **Bounded**: normalization stops at a fixed recursion depth
//! - **Stateless**: every call is pure and safe to run from any thread
//!
//! # Example
//!
//! ```
//! use callkey_core::{default_cache_key, Mapping, Value};
//!
//! let a: Mapping = [("x", 1), ("y", 2)].into_iter().collect();
//! let b: Mapping = [("y", 2), ("x", 1)].into_iter().collect();
//! let args = [Value::from("report")];
//!
//! assert_eq!(
//!     default_cache_key(&args, &a).unwrap(),
//!     default_cache_key(&args, &b).unwrap(),
//! );
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod key;
pub mod normalizer;
pub mod value;

pub use config::KeyConfig;
pub use encoder::FORMAT_VERSION;
pub use error::{Error, Result};
pub use key::{default_cache_key, CacheKey, KeyFunction, Keyer};
pub use normalizer::{freeze, normalize, Frozen, DEFAULT_DEPTH};
pub use value::{Buffer, Mapping, Object, Value};

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> (Vec<Value>, Mapping) {
        let args = vec![
            Value::list([Value::Map([("k", 1)].into_iter().collect())]),
            Value::Bool(true),
        ];
        let kwargs = [
            ("b", Value::tuple([2.into(), 3.into()])),
            ("a", Value::object(Buffer::new("ndarray", vec![1, 2]).with_shape([2]))),
        ]
        .into_iter()
        .collect();
        (args, kwargs)
    }

    #[test]
    fn test_values_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Value>();
        assert_send_sync::<Frozen>();
        assert_send_sync::<CacheKey>();
        assert_send_sync::<Keyer>();
    }

    #[test]
    fn test_concurrent_keys_agree() {
        let (args, kwargs) = call();
        let expected = default_cache_key(&args, &kwargs).unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| default_cache_key(&args, &kwargs).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_determinism_100_iterations() {
        let (args, kwargs) = call();
        let first = default_cache_key(&args, &kwargs).unwrap();
        for i in 0..100 {
            let result = default_cache_key(&args, &kwargs).unwrap();
            assert_eq!(first, result, "Non-determinism at iteration {}", i);
        }
    }
}

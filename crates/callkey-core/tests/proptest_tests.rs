//! Property-based tests for callkey

use callkey_core::{default_cache_key, freeze, Mapping, Value};
use proptest::prelude::*;

/// Leaf values that are valid in any position
fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e9..1.0e9f64).prop_map(Value::Float),
        "[a-z]{0,8}".prop_map(Value::Str),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

/// Arbitrary nested argument values with string-keyed mappings
fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Tuple),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Map(m.into_iter().collect())),
        ]
    })
}

fn entries() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map("[a-z]{1,6}", value(), 0..6)
        .prop_map(|m| m.into_iter().collect())
}

proptest! {
    /// Property: Same arguments always produce the same key
    #[test]
    fn key_is_deterministic(args in prop::collection::vec(value(), 0..4)) {
        let first = default_cache_key(&args, &Mapping::new()).unwrap();
        let second = default_cache_key(&args, &Mapping::new()).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Property: Keyword insertion order doesn't matter
    #[test]
    fn kwarg_order_is_irrelevant(pairs in entries()) {
        let forward: Mapping = pairs.iter().cloned().collect();
        let reversed: Mapping = pairs.iter().rev().cloned().collect();

        let a = default_cache_key(&[], &forward).unwrap();
        let b = default_cache_key(&[], &reversed).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Property: Nested mapping insertion order doesn't matter
    #[test]
    fn nested_mapping_order_is_irrelevant(pairs in entries()) {
        let forward = Value::list([Value::Map(pairs.iter().cloned().collect())]);
        let reversed = Value::list([Value::Map(pairs.iter().rev().cloned().collect())]);
        prop_assert_eq!(freeze(&forward).unwrap(), freeze(&reversed).unwrap());
    }

    /// Property: Reversing a list of distinct items changes the key
    #[test]
    fn list_order_matters(items in prop::collection::btree_set(any::<i64>(), 2..6)) {
        let forward: Vec<Value> = items.iter().copied().map(Value::Int).collect();
        let reversed: Vec<Value> = forward.iter().rev().cloned().collect();

        let a = default_cache_key(&[Value::List(forward)], &Mapping::new()).unwrap();
        let b = default_cache_key(&[Value::List(reversed)], &Mapping::new()).unwrap();
        prop_assert_ne!(a, b);
    }

    /// Property: Different integer arguments produce different keys
    #[test]
    fn different_ints_produce_different_keys(x in any::<i64>(), y in any::<i64>()) {
        prop_assume!(x != y);
        let a = default_cache_key(&[Value::Int(x)], &Mapping::new()).unwrap();
        let b = default_cache_key(&[Value::Int(y)], &Mapping::new()).unwrap();
        prop_assert_ne!(a, b);
    }
}

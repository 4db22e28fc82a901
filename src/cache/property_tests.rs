//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the structural invariants of the cache engine:
//! byte accounting, recency/map agreement, expiry-index membership, and the
//! byte budget.

use proptest::prelude::*;

use crate::cache::CacheStore;
use crate::value::{unix_nanos_now, ByteView};

// == Strategies ==
/// Generates cache keys from a small space so operations collide often.
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-d]{1,4}".prop_map(|s| s)
}

/// Generates values of varying size.
fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{0,32}".prop_map(|s| s)
}

/// A single cache operation.
#[derive(Debug, Clone)]
enum CacheOp {
    Add { key: String, value: String, ttl_nanos: Option<i64> },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy(), prop::option::of(-5i64..5_000_000_000)).prop_map(
            |(key, value, ttl_nanos)| CacheOp::Add {
                key,
                value,
                ttl_nanos,
            }
        ),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

fn apply(store: &mut CacheStore, op: CacheOp) {
    match op {
        CacheOp::Add { key, value, ttl_nanos } => {
            let view = match ttl_nanos {
                // Negative offsets produce already-dead entries.
                Some(offset) => ByteView::expiring(value.into_bytes(), unix_nanos_now() + offset),
                None => ByteView::new(value.into_bytes()),
            };
            store.add(key, view);
        }
        CacheOp::Get { key } => {
            let _ = store.get(&key);
        }
        CacheOp::Remove { key } => {
            let _ = store.remove(&key);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // After every operation the recency list, key map, expiry index and
    // byte accounting must agree, and the budget must hold.
    #[test]
    fn prop_structural_consistency(
        ops in prop::collection::vec(cache_op_strategy(), 1..80),
        max_bytes in prop_oneof![Just(0usize), Just(24usize), Just(256usize)],
    ) {
        let mut store = CacheStore::new(max_bytes);
        for op in ops {
            apply(&mut store, op);
            store.assert_consistent();
        }
    }

    // For any add sequence under a positive budget, the accounted bytes
    // never exceed it.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..100)
    ) {
        let max_bytes = 64;
        let mut store = CacheStore::new(max_bytes);

        for (key, value) in entries {
            store.add(key, ByteView::new(value.into_bytes()));
            prop_assert!(
                store.used_bytes() <= max_bytes,
                "accounted {} bytes with budget {}",
                store.used_bytes(),
                max_bytes
            );
        }
    }

    // Storing then retrieving a never-expiring value returns it unchanged.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        let mut store = CacheStore::new(0);

        store.add(key.clone(), ByteView::new(value.clone().into_bytes()));

        let retrieved = store.get(&key).unwrap();
        prop_assert_eq!(retrieved.as_bytes(), value.as_bytes());
    }

    // A removed key is gone.
    #[test]
    fn prop_remove_removes_entry(key in key_strategy(), value in value_strategy()) {
        let mut store = CacheStore::new(0);

        store.add(key.clone(), ByteView::new(value.into_bytes()));
        prop_assert!(store.remove(&key));
        prop_assert!(store.get(&key).is_none());
        store.assert_consistent();
    }

    // Overwriting a key leaves exactly one entry holding the newer value.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy(),
    ) {
        let mut store = CacheStore::new(0);

        store.add(key.clone(), ByteView::new(value1.into_bytes()));
        store.add(key.clone(), ByteView::new(value2.clone().into_bytes()));

        prop_assert_eq!(store.len(), 1);
        let got = store.get(&key).unwrap();
        prop_assert_eq!(got.as_bytes(), value2.as_bytes());
        store.assert_consistent();
    }

    // An entry whose deadline already passed is never returned.
    #[test]
    fn prop_dead_entries_stay_dead(key in key_strategy(), value in value_strategy()) {
        let mut store = CacheStore::new(0);

        store.add(
            key.clone(),
            ByteView::expiring(value.into_bytes(), unix_nanos_now() - 1),
        );

        prop_assert!(store.get(&key).is_none());
        prop_assert_eq!(store.len(), 0);
        store.assert_consistent();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Filling the cache with uniformly sized entries and then adding one
    // more evicts exactly the least recently used key.
    #[test]
    fn prop_lru_eviction_order(extra in 1usize..6) {
        // Four-byte keys and four-byte values, budget for four entries.
        let mut store = CacheStore::new(32);

        for i in 0..4 {
            store.add(format!("key{i}"), ByteView::new(format!("val{i}").into_bytes()));
        }

        // Touch key0 so key1 becomes the oldest.
        store.get("key0").unwrap();

        for i in 0..extra {
            store.add(format!("new{i}"), ByteView::new(format!("nvl{i}").into_bytes()));
            store.assert_consistent();
        }

        // key0 outlives key1 for any number of follow-up evictions that
        // leaves room for both.
        if extra <= 2 {
            prop_assert!(store.get("key0").is_some());
            prop_assert!(store.get("key1").is_none());
        }
    }
}

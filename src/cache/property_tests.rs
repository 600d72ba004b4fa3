//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check key determinism of the policy resolver and the
//! bookkeeping of the in-memory store.

use proptest::prelude::*;
use serde_json::{json, Value};

use crate::cache::{CachePolicy, CacheStore, MemoryMap, MemoryStore, Route};
use crate::models::RequestParams;

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_TTL: u64 = 300;

// == Strategies ==
/// Generates valid cache keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_/?=&]{1,64}".prop_map(|s| s)
}

/// Generates JSON values shaped like upstream results
fn value_strategy() -> impl Strategy<Value = Value> {
    ("[a-zA-Z0-9 ]{1,32}", 0u32..500).prop_map(|(title, chapters)| {
        json!({ "title": title, "chapters": chapters })
    })
}

/// Generates manga ids and search terms, including characters that need escaping
fn resource_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9 _/&=+-]{0,24}[a-zA-Z0-9]"
}

/// Percent-encodes every byte of `s`.
fn encode_all(s: &str) -> String {
    s.bytes().map(|b| format!("%{:02X}", b)).collect()
}

/// Encodes `s` the way browsers and scripts variously do.
fn encode_variant(s: &str, variant: u8) -> String {
    match variant % 3 {
        0 => urlencoding::encode(s).into_owned(),
        1 => urlencoding::encode(s).replace("%20", "+"),
        _ => encode_all(s),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Two requests for the same manga id map to one key regardless of
    // parameter order, encoding style or unrelated parameters.
    #[test]
    fn prop_key_determinism(
        id in resource_strategy(),
        page in 1u32..50,
        first in 0u8..3,
        second in 0u8..3,
        noise in "[a-z]{1,8}",
    ) {
        let policy = CachePolicy::new(60, 600);

        let raw_a = format!("id={}&page={}", encode_variant(&id, first), page);
        let raw_b = format!("_={}&page={}&id={}", noise, page, encode_variant(&id, second));

        let a = policy.resolve(Route::Info, &[], &RequestParams::from_query(Some(&raw_a)), None);
        let b = policy.resolve(Route::Info, &[], &RequestParams::from_query(Some(&raw_b)), None);

        prop_assert_eq!(a.key, b.key);
    }

    // Different resources never collide.
    #[test]
    fn prop_distinct_resources_distinct_keys(
        a in resource_strategy(),
        b in resource_strategy(),
    ) {
        prop_assume!(a != b);
        let policy = CachePolicy::new(60, 600);

        let ka = policy.resolve(Route::Search, &[("query", &a)], &RequestParams::default(), None);
        let kb = policy.resolve(Route::Search, &[("query", &b)], &RequestParams::default(), None);

        prop_assert_ne!(ka.key, kb.key);
    }

    // After any sequence of writes the map holds at most its capacity.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((valid_key_strategy(), value_strategy()), 1..200)
    ) {
        let max_entries = 50;
        let mut map = MemoryMap::new(max_entries);

        for (key, value) in entries {
            let _ = map.set(&key, value, TEST_TTL);
            prop_assert!(map.len() <= max_entries, "size {} exceeds {}", map.len(), max_entries);
        }
    }

    // The latest write for a key wins and leaves a single entry.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        first in value_strategy(),
        second in value_strategy(),
    ) {
        let mut map = MemoryMap::new(TEST_MAX_ENTRIES);
        map.set(&key, first, TEST_TTL).unwrap();
        map.set(&key, second.clone(), TEST_TTL).unwrap();

        prop_assert_eq!(map.get(&key), Some(second));
        prop_assert_eq!(map.len(), 1);
    }

    // Filling to capacity and adding one more key evicts the least recently used.
    #[test]
    fn prop_lru_eviction_order(
        initial_keys in prop::collection::hash_set(valid_key_strategy(), 2..10),
        new_key in valid_key_strategy(),
    ) {
        prop_assume!(!initial_keys.contains(&new_key));
        let keys: Vec<String> = initial_keys.into_iter().collect();
        let mut map = MemoryMap::new(keys.len());

        for key in &keys {
            map.set(key, json!(key), TEST_TTL).unwrap();
        }
        map.set(&new_key, json!("new"), TEST_TTL).unwrap();

        prop_assert_eq!(map.len(), keys.len());
        prop_assert!(map.get(&keys[0]).is_none(), "oldest key should be evicted");
        prop_assert!(map.get(&new_key).is_some());
        for key in keys.iter().skip(1) {
            prop_assert!(map.get(key).is_some(), "{} should survive", key);
        }
    }

    // Hit and miss counters match what the caller observed.
    #[test]
    fn prop_statistics_accuracy(
        writes in prop::collection::vec(valid_key_strategy(), 0..20),
        reads in prop::collection::vec(valid_key_strategy(), 1..40),
    ) {
        let store = MemoryStore::new(TEST_MAX_ENTRIES);
        let (hits, misses) = tokio_test::block_on(async {
            for key in &writes {
                store.set(key, json!(1), TEST_TTL).await.unwrap();
            }
            let mut hits = 0u64;
            let mut misses = 0u64;
            for key in &reads {
                match store.get(key).await.unwrap() {
                    Some(_) => hits += 1,
                    None => misses += 1,
                }
            }
            (hits, misses)
        });

        let stats = tokio_test::block_on(store.stats()).unwrap();
        prop_assert_eq!(stats.hits, hits);
        prop_assert_eq!(stats.misses, misses);
    }
}

//! Property-Based Tests for the Store Module

use proptest::prelude::*;
use std::collections::BTreeSet;

use crate::store::{glob_match, MemoryStore};

// == Strategies ==
fn segment_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_]{1,16}"
}

fn domain_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("shop_items"),
        Just("user_inventory"),
        Just("homepage"),
        Just("session"),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // A `<prefix>*` pattern matches exactly the keys that start with the prefix.
    #[test]
    fn prop_prefix_glob_matches_starts_with(prefix in segment_strategy(), key in segment_strategy()) {
        let pattern = format!("{}:*", prefix);
        let candidate = format!("{}:{}", key, prefix);
        prop_assert_eq!(
            glob_match(&pattern, &candidate),
            candidate.starts_with(&format!("{}:", prefix))
        );
        let own = format!("{}:{}", prefix, key);
        prop_assert!(glob_match(&pattern, &own));
    }

    // A pattern without wildcards only matches itself.
    #[test]
    fn prop_literal_glob_is_equality(a in segment_strategy(), b in segment_strategy()) {
        prop_assert_eq!(glob_match(&a, &b), a == b);
    }

    // KEYS with a domain pattern returns exactly the keys written in that domain.
    #[test]
    fn prop_keys_partition_by_domain(
        writes in prop::collection::vec((domain_strategy(), segment_strategy()), 1..30),
        target in domain_strategy(),
    ) {
        let store = MemoryStore::new(1000);
        let mut expected = BTreeSet::new();

        tokio_test::block_on(async {
            for (domain, subkey) in &writes {
                let key = format!("{}:{}", domain, subkey);
                store.set_ex(&key, "[]", 60).await.unwrap();
                if *domain == target {
                    expected.insert(key);
                }
            }
        });

        let found: BTreeSet<String> = tokio_test::block_on(store.keys(&format!("{}:*", target)))
            .unwrap()
            .into_iter()
            .collect();
        prop_assert_eq!(found, expected);
    }

    // N increments of a fresh counter end at N.
    #[test]
    fn prop_incr_counts_every_call(n in 1usize..50) {
        let store = MemoryStore::new(10);
        let last = tokio_test::block_on(async {
            let mut last = 0;
            for _ in 0..n {
                last = store.incr("rate_limit:prop").await.unwrap();
            }
            last
        });
        prop_assert_eq!(last, n as i64);
    }
}

//! Property-based tests for the alias index.
//!
//! - Every alias resolves exactly to the id it was first registered with
//! - Fuzzy scores stay within 0..=100, and 100 means an identical key

use anise_catalog::{AliasIndex, EXACT_SCORE, NameNormalizer};
use anise_model::{EntityId, EntityKind};
use proptest::prelude::*;
use std::collections::HashMap;

fn alias_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z炎骑士]{1,8}").unwrap()
}

fn entries_strategy() -> impl Strategy<Value = Vec<(String, u32)>> {
    prop::collection::vec((alias_strategy(), 1u32..20), 1..30)
}

fn build(entries: &[(String, u32)]) -> AliasIndex {
    let mut index = AliasIndex::new(NameNormalizer::new());
    for (alias, n) in entries {
        index.add(alias, &EntityId::new(EntityKind::Character, n.to_string()));
    }
    index
}

proptest! {
    #[test]
    fn registered_aliases_resolve_to_first_id(entries in entries_strategy()) {
        let index = build(&entries);
        let mut first: HashMap<&str, u32> = HashMap::new();
        for (alias, n) in &entries {
            first.entry(alias.as_str()).or_insert(*n);
        }
        for (alias, n) in first {
            let expected = EntityId::new(EntityKind::Character, n.to_string());
            prop_assert_eq!(index.resolve_exact(alias), Some(expected));
        }
    }

    #[test]
    fn fuzzy_score_is_bounded_and_exact_only_on_equality(
        entries in entries_strategy(),
        query in alias_strategy(),
    ) {
        let index = build(&entries);
        let m = index.resolve_fuzzy(&query).unwrap();
        prop_assert!(m.score <= EXACT_SCORE);
        prop_assert_eq!(m.score == EXACT_SCORE, m.alias == query);
    }

    #[test]
    fn registering_twice_is_a_no_op(entries in entries_strategy()) {
        let once = build(&entries);
        let mut doubled = entries.clone();
        doubled.extend(entries.iter().cloned());
        let twice = build(&doubled);
        prop_assert_eq!(once.len(), twice.len());
        for (alias, _) in &entries {
            prop_assert_eq!(once.resolve_exact(alias), twice.resolve_exact(alias));
        }
    }
}

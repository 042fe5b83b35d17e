// merge_property_tests.rs
// Property-based tests for stage ordering and payload merging

use pipewright_core::{merge, FieldList, Payload, PipelineError, StageBuilder, StageKind, StageRegistry};
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::collections::HashSet;

// ========== STRATEGIES ==========

fn field_name() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z]{0,8}".prop_map(|s| json!(s)),
        any::<bool>().prop_map(|b| json!(b)),
        Just(json!({"$exists": true})),
    ]
}

fn field_map() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::vec((field_name(), field_value()), 0..8)
        .prop_map(|pairs| pairs.into_iter().collect())
}

/// Ordered list with unique keys, as produced by the builder.
fn field_list() -> impl Strategy<Value = FieldList> {
    prop::collection::vec((field_name(), field_value()), 0..8).prop_map(|pairs| {
        let mut seen = HashSet::new();
        pairs
            .into_iter()
            .filter(|(k, _)| seen.insert(k.clone()))
            .collect()
    })
}

fn unique_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z0-9_]{1,10}", 1..20)
        .prop_map(|names| names.into_iter().collect())
}

// ========== ORDERING ==========

proptest! {
    #[test]
    fn prop_stages_emit_in_creation_order(names in unique_names()) {
        let mut builder = StageBuilder::new();
        for (i, name) in names.iter().enumerate() {
            builder.limit(name.clone(), i as u64).unwrap();
        }

        let stages = builder.registry().ordered_stages();
        let emitted: Vec<&str> = stages.iter().map(|s| s.name()).collect();
        let expected: Vec<&str> = names.iter().map(String::as_str).collect();
        prop_assert_eq!(emitted, expected);

        let pipeline = builder.build().to_json();
        for (i, doc) in pipeline.as_array().unwrap().iter().enumerate() {
            prop_assert_eq!(doc, &json!({"$limit": i as u64}));
        }
    }

    #[test]
    fn prop_priorities_are_dense(names in unique_names()) {
        let mut registry = StageRegistry::new();
        for name in &names {
            registry.create(name.clone(), StageKind::Filter, Payload::from(json!({}))).unwrap();
        }
        let priorities: Vec<u32> = registry.ordered_stages().iter().map(|s| s.priority()).collect();
        let expected: Vec<u32> = (0..names.len() as u32).collect();
        prop_assert_eq!(priorities, expected);
    }

    #[test]
    fn prop_append_never_reorders(names in unique_names(), target in any::<prop::sample::Index>(), extra in field_map()) {
        let mut builder = StageBuilder::new();
        for name in &names {
            builder.filter(name.clone(), json!({"seed": name})).unwrap();
        }
        let before: Vec<u32> = builder.registry().ordered_stages().iter().map(|s| s.priority()).collect();

        let name = target.get(&names);
        builder.append_stage(name, Value::Object(extra)).unwrap();

        let after: Vec<u32> = builder.registry().ordered_stages().iter().map(|s| s.priority()).collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(builder.registry().get(name).unwrap().kind(), &StageKind::Filter);
    }

    #[test]
    fn prop_duplicate_create_changes_nothing(first in field_map(), second in field_map()) {
        let mut builder = StageBuilder::new();
        builder.filter("a", Value::Object(first.clone())).unwrap();
        let before = builder.build();

        let err = builder.project("a", Value::Object(second)).unwrap_err();
        prop_assert!(matches!(err, PipelineError::DuplicateStageName(_)));
        prop_assert_eq!(builder.build(), before);

        // The rejected create must not use up a priority
        builder.limit("b", 1).unwrap();
        prop_assert_eq!(builder.registry().get("b").unwrap().priority(), 1);
    }
}

// ========== MERGE RULES ==========

proptest! {
    #[test]
    fn prop_field_map_merge_is_union_last_write_wins(a in field_map(), b in field_map()) {
        let merged = merge(&Payload::Fields(a.clone()), Payload::Fields(b.clone())).unwrap();
        let merged = match merged {
            Payload::Fields(map) => map,
            other => return Err(TestCaseError::fail(format!("unexpected {:?}", other))),
        };

        let keys: HashSet<&String> = a.keys().chain(b.keys()).collect();
        prop_assert_eq!(merged.len(), keys.len());
        for (k, v) in &merged {
            let expected = b.get(k).or_else(|| a.get(k)).unwrap();
            prop_assert_eq!(v, expected);
        }
    }

    #[test]
    fn prop_ordered_merge_keeps_positions(a in field_list(), b in field_list()) {
        let merged = match merge(&Payload::Ordered(a.clone()), Payload::Ordered(b.clone())).unwrap() {
            Payload::Ordered(list) => list,
            other => return Err(TestCaseError::fail(format!("unexpected {:?}", other))),
        };

        // Existing keys stay where they were
        for (i, (key, _)) in a.iter().enumerate() {
            prop_assert_eq!(&merged[i].0, key);
        }

        // New keys follow, in incoming order
        let existing: HashSet<&String> = a.iter().map(|(k, _)| k).collect();
        let tail: Vec<&String> = b.iter().map(|(k, _)| k).filter(|k| !existing.contains(k)).collect();
        let merged_tail: Vec<&String> = merged[a.len()..].iter().map(|(k, _)| k).collect();
        prop_assert_eq!(merged_tail, tail);

        // Incoming values win
        for (key, value) in &merged {
            let expected = b.iter().find(|(k, _)| k == key)
                .or_else(|| a.iter().find(|(k, _)| k == key))
                .map(|(_, v)| v)
                .unwrap();
            prop_assert_eq!(value, expected);
        }
    }

    #[test]
    fn prop_merging_with_itself_is_identity(a in field_list()) {
        let merged = merge(&Payload::Ordered(a.clone()), Payload::Ordered(a.clone())).unwrap();
        prop_assert_eq!(merged, Payload::Ordered(a));
    }

    #[test]
    fn prop_scalar_never_merges(s in field_value(), other in field_map()) {
        let scalar = Payload::Scalar(s.clone());
        let map = Payload::Fields(other);

        let into_scalar = merge(&scalar, map.clone()).unwrap_err();
        prop_assert!(matches!(into_scalar, PipelineError::UnmergeablePayload { .. }), "scalar target merged");
        let from_scalar = merge(&map, Payload::Scalar(s)).unwrap_err();
        prop_assert!(matches!(from_scalar, PipelineError::UnmergeablePayload { .. }), "scalar source merged");
    }

    #[test]
    fn prop_mixed_shapes_rejected(a in field_map(), b in field_list()) {
        let err = merge(&Payload::Fields(a.clone()), Payload::Ordered(b.clone())).unwrap_err();
        prop_assert!(matches!(err, PipelineError::IncompatiblePayloadShapes { .. }), "map <- list merged");
        let err = merge(&Payload::Ordered(b), Payload::Fields(a)).unwrap_err();
        prop_assert!(matches!(err, PipelineError::IncompatiblePayloadShapes { .. }), "list <- map merged");
    }

    #[test]
    fn prop_failed_append_leaves_stage_untouched(list in field_list(), map in field_map()) {
        let mut builder = StageBuilder::new();
        builder.add_stage("s", StageKind::Sort, Payload::Ordered(list.clone())).unwrap();
        prop_assert!(builder.append_stage("s", Value::Object(map)).is_err());
        prop_assert_eq!(builder.registry().get("s").unwrap().payload(), &Payload::Ordered(list));
    }
}

//! Property-based tests for query understanding.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Classification is total and deterministic
//! - Extracted limits are always positive
//! - Filter translation is idempotent and drops only unknown operators
//! - Comparison rankings put the best model first
//! - Sanitized parameters never carry credentials

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use modelscout::comparison::{ComparisonResults, compare_performance};
use modelscout::models::{ModelRecord, coerce_limit};
use modelscout::query::{classify_offline, extract_rules};
use modelscout::security::{BINARY_PLACEHOLDER, sanitize_parameters};
use modelscout::storage::{FilterOperator, translate, translate_map};
use modelscout::{Intent, ParameterBag};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

fn filter_key() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["architecture", "framework", "params", "accuracy", "task"])
        .prop_map(str::to_string)
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z]{1,8}".prop_map(Value::String),
        any::<bool>().prop_map(Value::Bool),
    ]
}

fn filter_value() -> impl Strategy<Value = Value> {
    let operator = prop::sample::select(vec![
        "$eq", "$ne", "gt", "$gte", "lt", "$lte", "in", "$nin", "contains", "$between", "approx",
    ]);
    let surface = prop::sample::select(vec![
        ">", "<", "=", "greater than", "less than", "after", "before", "since", "between",
    ]);
    prop_oneof![
        scalar(),
        prop::collection::vec(scalar(), 0..4).prop_map(Value::Array),
        prop::collection::btree_map(operator, scalar(), 1..3).prop_map(|ops| {
            Value::Object(
                ops.into_iter()
                    .map(|(op, v)| (op.to_string(), v))
                    .collect(),
            )
        }),
        (surface, scalar()).prop_map(|(op, v)| json!({"operator": op, "value": v})),
        Just(Value::Null),
    ]
}

fn filters() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(filter_key(), filter_value(), 0..5)
        .prop_map(|m| m.into_iter().collect())
}

fn scored_record(id: String, accuracy: f64) -> ModelRecord {
    let metadata = json!({"performance": {"accuracy": accuracy}});
    ModelRecord::from_metadata(
        id,
        metadata.as_object().unwrap(),
        &["performance".to_string()],
    )
}

proptest! {
    /// Property: every text gets exactly one intent, the same one every time.
    #[test]
    fn prop_classification_is_deterministic(text in "\\PC{0,80}") {
        let first = classify_offline(&text);
        let second = classify_offline(&text);
        prop_assert_eq!(first, second);
        prop_assert!(Intent::ALL.contains(&first.intent));
    }

    /// Property: extraction never yields a zero limit.
    #[test]
    fn prop_extracted_limit_is_positive(text in "\\PC{0,80}", n in 0usize..500) {
        for candidate in [text.clone(), format!("{text} top {n}"), format!("first {n} {text}")] {
            let bag = extract_rules(&candidate, Intent::Retrieval);
            if let Some(limit) = bag.limit() {
                prop_assert!(limit > 0);
            }
        }
    }

    /// Property: "top N" sets the limit to N for positive N.
    #[test]
    fn prop_top_n_sets_limit(n in 1usize..1_000) {
        let bag = extract_rules(&format!("show the top {n} models"), Intent::Retrieval);
        prop_assert_eq!(bag.limit(), Some(n));
    }

    /// Property: limit coercion rejects zero and non-numeric input.
    #[test]
    fn prop_coerce_limit_positive(n in any::<u32>(), s in "[a-z]{1,5}") {
        let coerced = coerce_limit(&json!(n));
        prop_assert_eq!(coerced, (n > 0).then_some(n as usize));
        prop_assert_eq!(coerce_limit(&json!(n.to_string())), coerced);
        prop_assert_eq!(coerce_limit(&json!(s)), None);
    }

    /// Property: translating an already translated filter changes nothing.
    #[test]
    fn prop_translation_is_idempotent(input in filters()) {
        let once = translate_map(&input);
        let twice = translate(Some(&once.to_value()));
        prop_assert_eq!(once, twice);
    }

    /// Property: translated filters only use backend operators and never
    /// keep logical alias names.
    #[test]
    fn prop_translation_output_is_canonical(input in filters()) {
        let translated = translate_map(&input);
        for (field, ops) in translated.iter() {
            prop_assert!(!["architecture", "framework", "params"].contains(&field));
            for op in ops.keys() {
                prop_assert_eq!(FilterOperator::parse(op.as_str()), Some(*op));
            }
        }
        prop_assert!(translated.len() <= input.len());
    }

    /// Property: the accuracy ranking is sorted and its best entry is the maximum.
    #[test]
    fn prop_accuracy_ranking_best_first(
        scores in prop::collection::btree_map("[a-z]{3,8}", 0.0f64..1.0, 2..6)
    ) {
        let records: Vec<ModelRecord> = scores
            .iter()
            .map(|(id, acc)| scored_record(id.clone(), *acc))
            .collect();
        let summary = compare_performance(&records);
        let performance = summary.available().unwrap();
        let accuracy = performance.accuracy.as_ref().unwrap();

        let max = scores.values().copied().fold(f64::MIN, f64::max);
        prop_assert!((accuracy.best.value - max).abs() < f64::EPSILON);
        prop_assert_eq!(accuracy.ranking.len(), scores.len());
        prop_assert!(accuracy.ranking.windows(2).all(|w| w[0].value >= w[1].value));

        let pairs = scores.len() * (scores.len() - 1);
        prop_assert_eq!(performance.relative_improvement.len(), pairs);
    }

    /// Property: every requested model appears in the results, found or not.
    #[test]
    fn prop_comparison_keeps_every_model(
        found in prop::collection::btree_set("[a-z]{3,8}", 0..4),
        missing in prop::collection::btree_set("[0-9]{3,6}", 0..4),
    ) {
        let mut records: Vec<ModelRecord> =
            found.iter().map(|id| scored_record(id.clone(), 0.5)).collect();
        records.extend(missing.iter().map(ModelRecord::not_found));
        let dimensions = vec!["performance".to_string(), "architecture".to_string()];

        let results = ComparisonResults::build(&records, &dimensions);
        prop_assert_eq!(results.models.len(), found.len() + missing.len());
        prop_assert_eq!(results.resolved_count(), found.len());
        for dimension in &dimensions {
            prop_assert_eq!(results.dimensions[dimension].len(), records.len());
        }
    }

    /// Property: credentials, raw text and bytes never survive sanitization,
    /// however deeply they sit inside objects and arrays.
    #[test]
    fn prop_sanitize_strips_credentials(
        name in "[a-z]{1,8}",
        value in "[a-z0-9]{0,12}",
        depth in 0usize..4,
    ) {
        let token_key = format!("{name}_token");
        let secret_key = format!("{name}_secret");
        let mut payload = json!({
            token_key.clone(): value,
            secret_key.clone(): value,
            "user_id": value,
            "raw_text": value,
            "image_data": [137, 80, 78, 71],
        });
        for level in 0..depth {
            payload = if level % 2 == 0 { json!([payload]) } else { json!({"inner": payload}) };
        }

        let mut bag = ParameterBag::new();
        bag.extra.insert(token_key.clone(), json!(value));
        bag.extra.insert(secret_key.clone(), json!(value));
        bag.extra.insert("user_id".to_string(), json!(value));
        bag.extra.insert("nested".to_string(), payload);

        let sanitized = sanitize_parameters(&bag);
        prop_assert!(!sanitized.contains_key(&token_key));
        prop_assert!(!sanitized.contains_key(&secret_key));
        prop_assert!(!sanitized.contains_key("user_id"));

        let mut nested = sanitized.get("nested").cloned().unwrap();
        for level in 0..depth {
            nested = if level % 2 == 0 { nested[0].clone() } else { nested["inner"].clone() };
        }
        prop_assert_eq!(nested, json!({"image_data": BINARY_PLACEHOLDER}));
    }
}

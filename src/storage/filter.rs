//! Filter translation.
//!
//! Turns the loosely-typed `filters` mapping of a parameter bag into a
//! [`BackendFilter`]: one set of operator constraints per metadata field, in
//! the `{"field": {"$op": value}}` shape vector databases expect.
//!
//! | Input | Output |
//! |-------|--------|
//! | `"field": scalar` | `{"field": {"$eq": scalar}}` |
//! | `"field": [a, b]` | `{"field": {"$in": [a, b]}}` |
//! | `"field": {"$gt": 5}` | unchanged, operators normalized |
//! | `"params": {"operator": "greater than", "value": 7}` | `{"model_dimensions.total_parameters": {"$gt": 7}}` |
//!
//! Unrecognized operators are dropped with a warning and counted in
//! `filter_operator_dropped_total`; translation itself never fails.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Operators understood by the vector database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FilterOperator {
    /// Equal.
    #[serde(rename = "$eq")]
    Eq,
    /// Not equal.
    #[serde(rename = "$ne")]
    Ne,
    /// Greater than.
    #[serde(rename = "$gt")]
    Gt,
    /// Greater than or equal.
    #[serde(rename = "$gte")]
    Gte,
    /// Less than.
    #[serde(rename = "$lt")]
    Lt,
    /// Less than or equal.
    #[serde(rename = "$lte")]
    Lte,
    /// Member of a list.
    #[serde(rename = "$in")]
    In,
    /// Not a member of a list.
    #[serde(rename = "$nin")]
    Nin,
    /// Substring (or element) containment.
    #[serde(rename = "$contains")]
    Contains,
}

impl FilterOperator {
    /// Returns the backend operator key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::In => "$in",
            Self::Nin => "$nin",
            Self::Contains => "$contains",
        }
    }

    /// Parses a backend key (`$gt`), a bare name (`gt`), a symbol (`>`) or
    /// a phrase as the extractor captures it (`greater than`, `after`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s
            .trim()
            .trim_start_matches('$')
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let op = match normalized.as_str() {
            "eq" | "=" | "==" | "equal" | "equals" | "equal to" | "is" | "on" => Self::Eq,
            "ne" | "!=" | "<>" | "not equal" | "not equal to" | "is not" => Self::Ne,
            "gt" | ">" | "greater than" | "more than" | "above" | "over" | "after" | "since" => {
                Self::Gt
            },
            "gte" | ">=" | "at least" => Self::Gte,
            "lt" | "<" | "less than" | "fewer than" | "below" | "under" | "before" => Self::Lt,
            "lte" | "<=" | "at most" => Self::Lte,
            "in" => Self::In,
            "nin" | "not in" => Self::Nin,
            "contains" | "like" => Self::Contains,
            _ => return None,
        };
        Some(op)
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical filter keys the extractor emits, mapped to catalog metadata paths.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("architecture", "architecture_type"),
    ("framework", "framework.name"),
    ("params", "model_dimensions.total_parameters"),
];

fn resolve_field(key: &str) -> &str {
    FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(key, |(_, path)| path)
}

/// Backend filter: field path to operator constraints, all of which must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BackendFilter {
    conditions: BTreeMap<String, BTreeMap<FilterOperator, Value>>,
}

impl BackendFilter {
    /// Creates an empty filter (matches everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint, replacing any previous value for the same field
    /// and operator.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, op: FilterOperator, value: Value) -> Self {
        self.insert(field, op, value);
        self
    }

    /// Adds a constraint in place.
    pub fn insert(&mut self, field: impl Into<String>, op: FilterOperator, value: Value) {
        self.conditions
            .entry(field.into())
            .or_default()
            .insert(op, value);
    }

    /// Returns true when there are no constraints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of constrained fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Iterates over `(field, constraints)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<FilterOperator, Value>)> {
        self.conditions
            .iter()
            .map(|(field, ops)| (field.as_str(), ops))
    }

    /// Returns the constraints for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&BTreeMap<FilterOperator, Value>> {
        self.conditions.get(field)
    }

    /// Serializes to `{"field": {"$op": value}}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// Translates an optional filter value. `None` or a non-mapping yields an
/// empty filter.
#[must_use]
pub fn translate(filters: Option<&Value>) -> BackendFilter {
    match filters {
        Some(Value::Object(map)) => translate_map(map),
        Some(Value::Null) | None => BackendFilter::new(),
        Some(other) => {
            tracing::warn!(filters = %other, "Filters are not a mapping, ignoring");
            BackendFilter::new()
        },
    }
}

/// Translates a filter mapping.
#[must_use]
pub fn translate_map(filters: &Map<String, Value>) -> BackendFilter {
    let mut out = BackendFilter::new();

    for (key, value) in filters {
        match value {
            Value::Null => {},
            Value::Array(items) => {
                out.insert(resolve_field(key), FilterOperator::In, Value::Array(items.clone()));
            },
            Value::Object(object) if object.contains_key("operator") => {
                translate_comparison(key, object, &mut out);
            },
            Value::Object(object) => {
                for (op, operand) in object {
                    match FilterOperator::parse(op) {
                        Some(op) => out.insert(resolve_field(key), op, operand.clone()),
                        None => dropped(key, op),
                    }
                }
            },
            scalar => out.insert(resolve_field(key), FilterOperator::Eq, scalar.clone()),
        }
    }

    out
}

/// `{operator, value[, field]}` as produced for parameter-count and date filters.
fn translate_comparison(key: &str, object: &Map<String, Value>, out: &mut BackendFilter) {
    let operator = object
        .get("operator")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let Some(value) = object.get("value").filter(|v| !v.is_null()) else {
        tracing::warn!(field = key, "Comparison filter without a value, ignoring");
        return;
    };
    let field = object
        .get("field")
        .and_then(Value::as_str)
        .unwrap_or_else(|| resolve_field(key));

    match FilterOperator::parse(operator) {
        Some(op) => out.insert(field, op, value.clone()),
        None => dropped(key, operator),
    }
}

fn dropped(field: &str, operator: &str) {
    metrics::counter!("filter_operator_dropped_total").increment(1);
    tracing::warn!(field, operator, "Dropping filter with unrecognized operator");
}

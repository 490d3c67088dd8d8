//! Parameter bag extracted from query text.
//!
//! The bag is a semi-structured record: well-known fields are typed, while
//! intent-specific or future keys land in [`ParameterBag::extra`]. A key that
//! was not extracted is absent (empty collection or `None`) and is skipped on
//! serialization; it is never emitted as `null`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::Deref;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    #[default]
    Descending,
}

impl SortOrder {
    /// Parses `asc`/`ascending`/`desc`/`descending`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Ascending),
            "desc" | "descending" => Some(Self::Descending),
            _ => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

/// Sort field and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to sort on.
    pub field: String,
    /// Direction; defaults to descending when the query does not say.
    pub order: SortOrder,
}

impl SortSpec {
    /// Creates a sort field and direction.
    #[must_use]
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// Requested image resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Parses `WIDTHxHEIGHT` (also accepts `×`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        let (w, h) = lower.split_once(['x', '×'])?;
        let width = w.trim().parse().ok()?;
        let height = h.trim().parse().ok()?;
        (width > 0 && height > 0).then_some(Self { width, height })
    }
}

/// Model identifiers in order of first mention, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModelIds(Vec<String>);

impl ModelIds {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends `id` unless it is already present. Returns true if added.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    /// Returns true when no model was mentioned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if `id` was mentioned.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|known| known == id)
    }

    /// Returns the identifiers as an owned list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl Deref for ModelIds {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for ModelIds {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut ids = Self::new();
        for id in iter {
            ids.insert(id);
        }
        ids
    }
}

impl<'a> IntoIterator for &'a ModelIds {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Structured parameters extracted from a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterBag {
    /// Mentioned model identifiers (lowercase, deduplicated, mention order).
    #[serde(skip_serializing_if = "ModelIds::is_empty")]
    pub model_ids: ModelIds,
    /// Metrics of interest, in order of first mention.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<String>,
    /// Field filters; values are scalars, lists, or `{operator, value}` objects.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub filters: Map<String, Value>,
    /// Result limit. Always positive when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    /// Sort field and direction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortSpec>,
    /// Comparison axes (comparison intent).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comparison_dimensions: Vec<String>,
    /// Whether the caller asked for a chart (comparison intent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualize: Option<bool>,
    /// Requested analyses (notebook intent).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub analysis_types: Vec<String>,
    /// Dataset name (notebook intent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    /// Compute resource hint (notebook intent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<String>,
    /// Style tags (image search intent).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub style_tags: Vec<String>,
    /// Prompt substring (image search intent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_terms: Option<String>,
    /// Exact resolution (image search intent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    /// Correlation id used for analytics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    /// Binary image input for image-to-image search. Never serialized.
    #[serde(skip)]
    pub image_data: Option<Vec<u8>>,
    /// Everything else.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ParameterBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the limit, if one was extracted.
    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns the limit or the handler default.
    #[must_use]
    pub fn limit_or(&self, default: usize) -> usize {
        self.limit.unwrap_or(default)
    }

    /// Sets the limit. Zero clears it so the handler default applies.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = (limit > 0).then_some(limit);
    }

    /// Sets the limit from an arbitrary JSON value.
    ///
    /// Anything other than a positive integer (or a string holding one)
    /// clears the limit.
    pub fn set_limit_value(&mut self, value: &Value) {
        self.limit = coerce_limit(value);
        if self.limit.is_none() && !value.is_null() {
            tracing::debug!(limit = %value, "Ignoring non-integer limit");
        }
    }

    /// Adds a model identifier (trimmed, lowercased).
    pub fn add_model_id(&mut self, id: &str) {
        let id = id.trim().to_lowercase();
        if !id.is_empty() {
            self.model_ids.insert(id);
        }
    }

    /// Returns true when nothing was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Serializes the bag to a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Builds a bag from loosely-typed JSON, such as an LLM extraction response.
    ///
    /// Total: wrongly-typed values for well-known keys are dropped, unknown
    /// keys are kept in [`ParameterBag::extra`]. A non-object input yields an
    /// empty bag.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        let mut bag = Self::default();
        let Value::Object(object) = value else {
            return bag;
        };

        for (key, value) in object {
            match key.as_str() {
                "model_ids" => {
                    for id in string_list(&value) {
                        bag.add_model_id(&id);
                    }
                },
                "metrics" => {
                    for metric in string_list(&value) {
                        let metric = metric.to_lowercase();
                        if !bag.metrics.contains(&metric) {
                            bag.metrics.push(metric);
                        }
                    }
                },
                "filters" => match value {
                    Value::Object(filters) => bag.filters = filters,
                    Value::Null => {},
                    other => {
                        tracing::warn!(filters = %other, "Filters are not a mapping, ignoring");
                    },
                },
                "limit" => bag.set_limit_value(&value),
                "sort_by" => bag.sort_by = sort_spec(&value),
                "comparison_dimensions" => bag.comparison_dimensions = string_list(&value),
                "visualize" => bag.visualize = value.as_bool(),
                "analysis_types" => bag.analysis_types = string_list(&value),
                "dataset" => bag.dataset = non_empty_string(&value),
                "resources" => bag.resources = non_empty_string(&value),
                "style_tags" => bag.style_tags = string_list(&value),
                "prompt_terms" => bag.prompt_terms = non_empty_string(&value),
                "resolution" => bag.resolution = resolution(&value),
                "query_id" => bag.query_id = non_empty_string(&value),
                _ if value.is_null() => {},
                _ => {
                    bag.extra.insert(key, value);
                },
            }
        }

        bag
    }
}

/// Coerces a JSON value into a positive integer limit.
#[must_use]
pub fn coerce_limit(value: &Value) -> Option<usize> {
    let n = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    usize::try_from(n).ok().filter(|n| *n > 0)
}

/// Reads a list of strings from an array, or a comma-separated string.
fn string_list(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };

    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty_string(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn sort_spec(value: &Value) -> Option<SortSpec> {
    match value {
        Value::String(field) if !field.trim().is_empty() => {
            Some(SortSpec::new(field.trim(), SortOrder::default()))
        },
        Value::Object(object) => {
            let field = object.get("field").and_then(non_empty_string)?;
            let order = object
                .get("order")
                .and_then(Value::as_str)
                .and_then(SortOrder::parse)
                .unwrap_or_default();
            Some(SortSpec::new(field, order))
        },
        _ => None,
    }
}

fn resolution(value: &Value) -> Option<Resolution> {
    match value {
        Value::String(s) => Resolution::parse(s),
        Value::Object(object) => {
            let width = object.get("width").and_then(coerce_limit)?;
            let height = object.get("height").and_then(coerce_limit)?;
            Some(Resolution {
                width: u32::try_from(width).ok()?,
                height: u32::try_from(height).ok()?,
            })
        },
        _ => None,
    }
}

//! Catalog model records.
//!
//! A [`ModelRecord`] is a read-only view over the metadata the vector store
//! returns for one model. Catalog values may be stored bare or wrapped as
//! `{"value": ...}`; [`resolve_path`] unwraps both forms.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resolves a dotted path (`model_dimensions.num_layers`) in catalog metadata.
///
/// Objects of the form `{"value": x}` along the way are unwrapped to `x`.
#[must_use]
pub fn resolve_path<'a>(metadata: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = unwrap_value(metadata.get(segments.next()?)?);
    for segment in segments {
        current = unwrap_value(current.as_object()?.get(segment)?);
    }
    (!current.is_null()).then_some(current)
}

fn unwrap_value(value: &Value) -> &Value {
    match value {
        Value::Object(object) if object.len() == 1 => object.get("value").unwrap_or(value),
        _ => value,
    }
}

fn as_f64(metadata: &Map<String, Value>, path: &str) -> Option<f64> {
    match resolve_path(metadata, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn as_u64(metadata: &Map<String, Value>, path: &str) -> Option<u64> {
    match resolve_path(metadata, path)? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_string(metadata: &Map<String, Value>, path: &str) -> Option<String> {
    match resolve_path(metadata, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Architecture slice of a model record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureView {
    /// Architecture family, `unknown` when the catalog has no string value.
    #[serde(rename = "type")]
    pub kind: String,
    /// Hidden dimension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_size: Option<u64>,
    /// Layer count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_layers: Option<u64>,
    /// Attention head count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_attention_heads: Option<u64>,
    /// Total parameter count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_parameters: Option<u64>,
}

/// Performance slice of a model record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceView {
    /// Accuracy, higher is better.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Loss, lower is better.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss: Option<f64>,
    /// Perplexity, lower is better.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perplexity: Option<f64>,
    /// Dataset the metrics were measured on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_dataset: Option<String>,
}

/// Training configuration slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingView {
    /// Batch size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u64>,
    /// Learning rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
    /// Optimizer name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<String>,
    /// Epoch count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epochs: Option<u64>,
    /// Wall-clock training time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_time_hours: Option<f64>,
    /// Hardware description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_used: Option<String>,
}

/// Training dataset slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetView {
    /// Dataset name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Dataset version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Sample count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_samples: Option<u64>,
}

/// Framework slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameworkView {
    /// Framework name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Framework version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Basic catalog metadata, always present on a found record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicView {
    /// Model version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Creation date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    /// Last modification date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<String>,
    /// Models this one derives from.
    #[serde(default)]
    pub predecessor_models: Vec<String>,
}

/// One model resolved from the catalog, or a not-found stub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Model identifier.
    pub model_id: String,
    /// Whether the catalog had a record.
    pub found: bool,
    /// Architecture view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<ArchitectureView>,
    /// Performance view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceView>,
    /// Training view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingView>,
    /// Dataset view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetView>,
    /// Framework view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<FrameworkView>,
    /// Basic metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic: Option<BasicView>,
}

impl ModelRecord {
    /// Creates a `{model_id, found: false}` stub.
    #[must_use]
    pub fn not_found(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Self::default()
        }
    }

    /// Builds a record from catalog metadata, populating only the requested
    /// dimensions that the metadata actually carries.
    #[must_use]
    pub fn from_metadata(
        model_id: impl Into<String>,
        metadata: &Map<String, Value>,
        dimensions: &[String],
    ) -> Self {
        let mut record = Self {
            model_id: model_id.into(),
            found: true,
            ..Self::default()
        };

        for dimension in dimensions {
            match dimension.as_str() {
                "architecture" if metadata.contains_key("architecture_type") => {
                    record.architecture = Some(ArchitectureView {
                        kind: as_string(metadata, "architecture_type")
                            .unwrap_or_else(|| "unknown".to_string()),
                        hidden_size: as_u64(metadata, "model_dimensions.hidden_size"),
                        num_layers: as_u64(metadata, "model_dimensions.num_layers"),
                        num_attention_heads: as_u64(
                            metadata,
                            "model_dimensions.num_attention_heads",
                        ),
                        total_parameters: as_u64(metadata, "model_dimensions.total_parameters"),
                    });
                },
                "performance" if metadata.contains_key("performance") => {
                    record.performance = Some(PerformanceView {
                        accuracy: as_f64(metadata, "performance.accuracy"),
                        loss: as_f64(metadata, "performance.loss"),
                        perplexity: as_f64(metadata, "performance.perplexity"),
                        eval_dataset: as_string(metadata, "performance.eval_dataset"),
                    });
                },
                "training" if metadata.contains_key("training_config") => {
                    record.training = Some(TrainingView {
                        batch_size: as_u64(metadata, "training_config.batch_size"),
                        learning_rate: as_f64(metadata, "training_config.learning_rate"),
                        optimizer: as_string(metadata, "training_config.optimizer"),
                        epochs: as_u64(metadata, "training_config.epochs"),
                        training_time_hours: as_f64(
                            metadata,
                            "training_config.training_time_hours",
                        ),
                        hardware_used: as_string(metadata, "training_config.hardware_used"),
                    });
                },
                "dataset" if metadata.contains_key("dataset") => {
                    record.dataset = Some(DatasetView {
                        name: as_string(metadata, "dataset.name"),
                        version: as_string(metadata, "dataset.version"),
                        num_samples: as_u64(metadata, "dataset.num_samples"),
                    });
                },
                "framework" if metadata.contains_key("framework") => {
                    record.framework = Some(FrameworkView {
                        name: as_string(metadata, "framework.name"),
                        version: as_string(metadata, "framework.version"),
                    });
                },
                _ => {},
            }
        }

        let predecessor_models = resolve_path(metadata, "predecessor_models")
            .and_then(Value::as_array)
            .map(|models| {
                models
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        record.basic = Some(BasicView {
            version: as_string(metadata, "version"),
            creation_date: as_string(metadata, "creation_date"),
            last_modified_date: as_string(metadata, "last_modified_date"),
            predecessor_models,
        });

        record
    }

    /// Returns the serialized slice for a dimension, `{}` when absent.
    #[must_use]
    pub fn dimension(&self, dimension: &str) -> Value {
        let value = match dimension {
            "architecture" => self.architecture.as_ref().map(serde_json::to_value),
            "performance" => self.performance.as_ref().map(serde_json::to_value),
            "training" => self.training.as_ref().map(serde_json::to_value),
            "dataset" => self.dataset.as_ref().map(serde_json::to_value),
            "framework" => self.framework.as_ref().map(serde_json::to_value),
            "basic" => self.basic.as_ref().map(serde_json::to_value),
            _ => None,
        };
        match value {
            Some(Ok(value)) => value,
            _ => Value::Object(Map::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog_entry() -> Map<String, Value> {
        json!({
            "model_id": "gpt-2",
            "architecture_type": {"value": "transformer"},
            "model_dimensions": {
                "hidden_size": {"value": 768},
                "num_layers": {"value": 12},
                "num_attention_heads": 12,
                "total_parameters": {"value": 124_000_000}
            },
            "performance": {
                "accuracy": {"value": 0.82},
                "loss": 2.1,
                "eval_dataset": {"value": "wikitext"}
            },
            "framework": {"name": "pytorch", "version": "2.1"},
            "version": "1.0",
            "predecessor_models": ["gpt"]
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_resolve_path_unwraps_values() {
        let meta = catalog_entry();
        assert_eq!(
            resolve_path(&meta, "architecture_type"),
            Some(&json!("transformer"))
        );
        assert_eq!(
            resolve_path(&meta, "model_dimensions.num_layers"),
            Some(&json!(12))
        );
        assert_eq!(resolve_path(&meta, "model_dimensions.missing"), None);
        assert_eq!(resolve_path(&meta, "version.major"), None);
    }

    #[test]
    fn test_from_metadata_requested_dimensions_only() {
        let meta = catalog_entry();
        let dims = vec!["architecture".to_string()];
        let record = ModelRecord::from_metadata("gpt-2", &meta, &dims);

        assert!(record.found);
        let arch = record.architecture.unwrap();
        assert_eq!(arch.kind, "transformer");
        assert_eq!(arch.hidden_size, Some(768));
        assert_eq!(arch.total_parameters, Some(124_000_000));
        assert!(record.performance.is_none());
        assert_eq!(record.basic.unwrap().predecessor_models, vec!["gpt"]);
    }

    #[test]
    fn test_from_metadata_performance() {
        let meta = catalog_entry();
        let dims = vec!["performance".to_string(), "framework".to_string()];
        let record = ModelRecord::from_metadata("gpt-2", &meta, &dims);

        let perf = record.performance.unwrap();
        assert_eq!(perf.accuracy, Some(0.82));
        assert_eq!(perf.loss, Some(2.1));
        assert_eq!(perf.perplexity, None);
        assert_eq!(perf.eval_dataset.as_deref(), Some("wikitext"));
        assert_eq!(record.framework.unwrap().name.as_deref(), Some("pytorch"));
    }

    #[test]
    fn test_dimension_missing_is_empty_object() {
        let record = ModelRecord::not_found("bert");
        assert!(!record.found);
        assert_eq!(record.dimension("performance"), json!({}));
        assert_eq!(record.dimension("nonsense"), json!({}));
    }

    #[test]
    fn test_not_found_serialization() {
        let value = serde_json::to_value(ModelRecord::not_found("bert")).unwrap();
        assert_eq!(value, json!({"model_id": "bert", "found": false}));
    }
}

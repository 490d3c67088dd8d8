//! Parameter extraction.
//!
//! The external service is asked first when configured; its answer is used
//! only if it contains a JSON object. Otherwise the rules in this module run:
//! the common sub-steps ([`rules`]) always, then the step for the intent.
//! A sub-step that finds nothing leaves its key out of the bag.

mod intent_specific;
mod rules;

pub use rules::{model_mentions, parse_quantity};

use crate::config::ClassifierConfig;
use crate::llm::{LlmProvider, extract_json_from_response};
use crate::models::{Intent, ParameterBag};
use crate::query::llm_tier::{LlmStage, run_with_timeout};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Rule-based extraction. Deterministic and total.
#[must_use]
pub fn extract_rules(text: &str, intent: Intent) -> ParameterBag {
    let mut bag = ParameterBag::new();

    bag.model_ids = rules::model_mentions(text);
    bag.metrics = rules::metrics(text);
    bag.filters = rules::filters(text);
    if let Some(limit) = rules::limit(text) {
        bag.set_limit(limit);
    }
    bag.sort_by = rules::sort(text);

    match intent {
        Intent::Comparison => intent_specific::comparison(text, &mut bag),
        Intent::Notebook => intent_specific::notebook(text, &mut bag),
        Intent::ImageSearch => intent_specific::image(text, &mut bag),
        Intent::Retrieval | Intent::Metadata | Intent::Unknown => {},
    }

    bag
}

/// Reads a parameter bag out of a service response.
///
/// Returns `None` unless the response holds a JSON object, possibly inside
/// a fenced code block.
#[must_use]
pub fn parse_llm_params(response: &str) -> Option<ParameterBag> {
    let json = extract_json_from_response(response);
    match serde_json::from_str::<Value>(json) {
        Ok(value @ Value::Object(_)) => Some(ParameterBag::from_json(value)),
        Ok(other) => {
            tracing::warn!(response = %other, "Parameter response is not a JSON object");
            None
        },
        Err(e) => {
            tracing::warn!(error = %e, "Could not parse parameter response as JSON");
            None
        },
    }
}

/// Tiered parameter extractor.
#[derive(Clone)]
pub struct ParameterExtractor {
    llm: Option<Arc<dyn LlmProvider>>,
    timeout: Duration,
}

impl ParameterExtractor {
    /// Creates a rule-based extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            llm: None,
            timeout: Duration::from_millis(2_000),
        }
    }

    /// Builds an extractor from configuration. The provider is used only when
    /// `use_llm` is set.
    #[must_use]
    pub fn from_config(config: &ClassifierConfig, provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self {
            llm: provider.filter(|_| config.use_llm),
            timeout: Duration::from_millis(config.llm_timeout_ms),
        }
    }

    /// Enables the external service.
    #[must_use]
    pub fn with_llm(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(provider);
        self
    }

    /// Sets the service timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extracts parameters for `text` classified as `intent`. Never fails.
    #[instrument(name = "query.extract", skip(self, text), fields(intent = %intent))]
    pub fn extract(&self, text: &str, intent: Intent) -> ParameterBag {
        if let Some(bag) = self.extract_llm(text) {
            tracing::debug!("Using service-extracted parameters");
            return bag;
        }
        extract_rules(text, intent)
    }

    fn extract_llm(&self, text: &str) -> Option<ParameterBag> {
        let provider = self.llm.as_ref()?;
        let response = run_with_timeout(provider, text, self.timeout, LlmStage::Params)?;
        parse_llm_params(&response)
    }
}

impl Default for ParameterExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParameterExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterExtractor")
            .field("llm", &self.llm.as_ref().map(|p| p.name()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use crate::models::{SortOrder, SortSpec};
    use serde_json::json;

    struct Canned(&'static str);

    impl LlmProvider for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_rules_common_fields() {
        let bag = extract_rules(
            "find top 3 transformer models sorted by accuracy with params > 1b",
            Intent::Retrieval,
        );
        assert!(bag.model_ids.contains("transformer"));
        assert_eq!(bag.metrics, vec!["accuracy"]);
        assert_eq!(bag.limit(), Some(3));
        assert_eq!(
            bag.sort_by,
            Some(SortSpec::new("accuracy", SortOrder::Descending))
        );
        assert_eq!(
            bag.filters.get("params"),
            Some(&json!({"operator": ">", "value": 1_000_000_000_u64}))
        );
        assert!(bag.comparison_dimensions.is_empty());
    }

    #[test]
    fn test_intent_specific_only_for_intent() {
        let text = "plot a comparison of gpt-2 and bert on accuracy";
        let as_comparison = extract_rules(text, Intent::Comparison);
        assert_eq!(as_comparison.comparison_dimensions, vec!["accuracy"]);
        assert_eq!(as_comparison.visualize, Some(true));

        let as_retrieval = extract_rules(text, Intent::Retrieval);
        assert!(as_retrieval.comparison_dimensions.is_empty());
        assert_eq!(as_retrieval.visualize, None);
    }

    #[test]
    fn test_absent_keys_are_omitted() {
        let bag = extract_rules("hello there", Intent::Unknown);
        assert!(bag.is_empty());
        assert_eq!(bag.to_value(), json!({}));
    }

    #[test]
    fn test_llm_json_used() {
        let extractor = ParameterExtractor::new().with_llm(Arc::new(Canned(
            "```json\n{\"model_ids\": [\"BERT\"], \"limit\": \"4\"}\n```",
        )));
        let bag = extractor.extract("compare gpt-2 and bert", Intent::Comparison);
        assert_eq!(bag.model_ids.len(), 1);
        assert!(bag.model_ids.contains("bert"));
        assert_eq!(bag.limit(), Some(4));
    }

    #[test]
    fn test_llm_garbage_falls_back_to_rules() {
        let extractor =
            ParameterExtractor::new().with_llm(Arc::new(Canned("sorry, I cannot help")));
        let bag = extractor.extract("compare gpt-2 and bert", Intent::Comparison);
        assert!(bag.model_ids.contains("gpt-2"));
        assert!(bag.model_ids.contains("bert"));
    }

    #[test]
    fn test_parse_llm_params_rejects_arrays() {
        assert!(parse_llm_params("[1, 2]").is_none());
        assert!(parse_llm_params("{\"metrics\": [\"loss\"]}").is_some());
    }
}

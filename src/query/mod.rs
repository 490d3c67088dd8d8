//! Query understanding.
//!
//! Raw text goes through the [`IntentClassifier`], then the
//! [`ParameterExtractor`] for the resulting intent, and comes out as a
//! [`ParsedQuery`]. Both stages are total: they degrade to rule-based
//! behavior when the external service is unavailable and never fail.

pub mod classifier;
pub mod extractor;
mod llm_tier;
pub mod nlp;
pub mod patterns;

pub use classifier::{Classification, IntentClassifier, TierOutcome, classify_offline};
pub use extractor::{ParameterExtractor, extract_rules, model_mentions};
pub use llm_tier::LlmStage;

use crate::config::ClassifierConfig;
use crate::llm::LlmProvider;
use crate::models::{Intent, ParsedQuery};
use std::sync::Arc;
use tracing::instrument;

/// Classifier and extractor bundled.
#[derive(Debug, Clone, Default)]
pub struct QueryParser {
    classifier: IntentClassifier,
    extractor: ParameterExtractor,
}

impl QueryParser {
    /// Creates a rule-based parser.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            classifier: IntentClassifier::new(),
            extractor: ParameterExtractor::new(),
        }
    }

    /// Builds a parser from configuration.
    #[must_use]
    pub fn from_config(config: &ClassifierConfig, provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self {
            classifier: IntentClassifier::from_config(config, provider.clone()),
            extractor: ParameterExtractor::from_config(config, provider),
        }
    }

    /// Enables the external service for both stages.
    #[must_use]
    pub fn with_llm(self, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            classifier: self.classifier.with_llm(Arc::clone(&provider)),
            extractor: self.extractor.with_llm(provider),
        }
    }

    /// Returns the classifier.
    #[must_use]
    pub const fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    /// Returns the extractor.
    #[must_use]
    pub const fn extractor(&self) -> &ParameterExtractor {
        &self.extractor
    }

    /// Classifies, extracts and preprocesses `text`.
    #[instrument(name = "query.parse", skip(self, text))]
    pub fn parse(&self, text: &str) -> ParsedQuery {
        let classification = self.classifier.classify(text);
        self.build(text, classification)
    }

    /// Like [`QueryParser::parse`] with the intent decided by the caller.
    pub fn parse_as(&self, text: &str, intent: Intent) -> ParsedQuery {
        self.build(
            text,
            Classification {
                intent,
                source: crate::models::DetectionSource::Default,
            },
        )
    }

    fn build(&self, text: &str, classification: Classification) -> ParsedQuery {
        let parameters = self.extractor.extract(text, classification.intent);
        let processed_text = nlp::preprocess(text);

        tracing::info!(
            intent = %classification.intent,
            source = %classification.source,
            model_ids = parameters.model_ids.len(),
            "Query parsed"
        );

        ParsedQuery {
            raw_text: text.to_string(),
            processed_text,
            intent: classification.intent,
            source: classification.source,
            parameters,
        }
    }
}

//! Intent classification.
//!
//! A chain of tiers, each a pure function from text to [`TierOutcome`]:
//!
//! | Tier | Source | Inconclusive when |
//! |------|--------|-------------------|
//! | External LLM | [`DetectionSource::Llm`] | disabled, failed, timed out or blank |
//! | Rule patterns | [`DetectionSource::Rules`] | no pattern and no model mention |
//! | Linguistic | [`DetectionSource::Linguistic`] | no verb/noun signal |
//!
//! When every tier is inconclusive the result is [`Intent::Unknown`].

mod linguistic;
mod llm;
mod rules;

pub use llm::parse_llm_intent;

use crate::config::ClassifierConfig;
use crate::llm::LlmProvider;
use crate::models::{DetectionSource, Intent};
use crate::query::llm_tier::{LlmStage, run_with_timeout};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Result of one classifier tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierOutcome {
    /// The tier decided.
    Resolved(Intent, DetectionSource),
    /// The tier has no opinion; try the next one.
    Inconclusive,
}

impl TierOutcome {
    /// Returns `self` if resolved, otherwise evaluates `next`.
    #[must_use]
    pub fn or_else(self, next: impl FnOnce() -> Self) -> Self {
        match self {
            Self::Resolved(..) => self,
            Self::Inconclusive => next(),
        }
    }
}

/// Final classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// The intent.
    pub intent: Intent,
    /// The tier that decided.
    pub source: DetectionSource,
}

/// Rule tier.
#[must_use]
pub fn classify_rules(text: &str) -> TierOutcome {
    rules::classify(text)
}

/// Linguistic tier.
#[must_use]
pub fn classify_linguistic(text: &str) -> TierOutcome {
    linguistic::classify(text)
}

/// Classifies without the external service: rules, then linguistics, then
/// [`Intent::Unknown`].
#[must_use]
pub fn classify_offline(text: &str) -> Classification {
    finish(classify_rules(text).or_else(|| classify_linguistic(text)))
}

fn finish(outcome: TierOutcome) -> Classification {
    match outcome {
        TierOutcome::Resolved(intent, source) => Classification { intent, source },
        TierOutcome::Inconclusive => Classification {
            intent: Intent::Unknown,
            source: DetectionSource::Default,
        },
    }
}

/// Tiered intent classifier.
#[derive(Clone)]
pub struct IntentClassifier {
    llm: Option<Arc<dyn LlmProvider>>,
    timeout: Duration,
}

impl IntentClassifier {
    /// Default LLM timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2_000);

    /// Creates a rule-based classifier.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            llm: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Builds a classifier from configuration. The provider is used only when
    /// `use_llm` is set.
    #[must_use]
    pub fn from_config(config: &ClassifierConfig, provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self {
            llm: provider.filter(|_| config.use_llm),
            timeout: Duration::from_millis(config.llm_timeout_ms),
        }
    }

    /// Enables the external LLM tier.
    #[must_use]
    pub fn with_llm(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(provider);
        self
    }

    /// Sets the LLM timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the configured provider, if any.
    #[must_use]
    pub fn provider(&self) -> Option<&Arc<dyn LlmProvider>> {
        self.llm.as_ref()
    }

    /// Returns the LLM timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Classifies `text`. Never fails.
    #[instrument(name = "query.classify", skip(self, text), fields(text_len = text.len()))]
    pub fn classify(&self, text: &str) -> Classification {
        let classification = finish(
            self.classify_llm(text)
                .or_else(|| classify_rules(text))
                .or_else(|| classify_linguistic(text)),
        );

        metrics::counter!(
            "intent_classification_total",
            "source" => classification.source.as_str(),
            "intent" => classification.intent.as_str()
        )
        .increment(1);
        tracing::debug!(
            intent = %classification.intent,
            source = %classification.source,
            "Classified query"
        );

        classification
    }

    /// Classifies `text`, returning only the intent.
    #[must_use]
    pub fn classify_intent(&self, text: &str) -> Intent {
        self.classify(text).intent
    }

    fn classify_llm(&self, text: &str) -> TierOutcome {
        self.llm
            .as_ref()
            .and_then(|provider| run_with_timeout(provider, text, self.timeout, LlmStage::Intent))
            .map_or(TierOutcome::Inconclusive, |response| parse_llm_intent(&response))
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("llm", &self.llm.as_ref().map(|p| p.name()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;

    struct Canned(&'static str);

    impl LlmProvider for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Down;

    impl LlmProvider for Down {
        fn name(&self) -> &'static str {
            "down"
        }

        fn complete(&self, _prompt: &str) -> Result<String> {
            Err(crate::Error::external("down", "connection refused"))
        }
    }

    #[test]
    fn test_rules_only() {
        let classifier = IntentClassifier::new();
        let result = classifier.classify("compare gpt-2 and bert on performance");
        assert_eq!(result.intent, Intent::Comparison);
        assert_eq!(result.source, DetectionSource::Rules);
    }

    #[test]
    fn test_llm_tier_wins() {
        let classifier = IntentClassifier::new().with_llm(Arc::new(Canned("notebook")));
        let result = classifier.classify("compare gpt-2 and bert");
        assert_eq!(result.intent, Intent::Notebook);
        assert_eq!(result.source, DetectionSource::Llm);
    }

    #[test]
    fn test_llm_failure_falls_through() {
        let classifier = IntentClassifier::new().with_llm(Arc::new(Down));
        let result = classifier.classify("find images of cats");
        assert_eq!(result.intent, Intent::ImageSearch);
        assert_eq!(result.source, DetectionSource::Rules);
    }

    #[test]
    fn test_llm_blank_falls_through() {
        let classifier = IntentClassifier::new().with_llm(Arc::new(Canned("")));
        assert_eq!(classifier.classify("hello").source, DetectionSource::Default);
    }

    #[test]
    fn test_default_unknown() {
        let result = classify_offline("good morning");
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.source, DetectionSource::Default);
    }

    #[test]
    fn test_linguistic_source() {
        let result = classify_offline("neural network stuff");
        assert_eq!(result.intent, Intent::Retrieval);
        assert_eq!(result.source, DetectionSource::Linguistic);
    }

    #[test]
    fn test_from_config_respects_flag() {
        let provider: Arc<dyn LlmProvider> = Arc::new(Canned("metadata"));
        let off = IntentClassifier::from_config(&ClassifierConfig::default(), Some(provider.clone()));
        assert!(off.provider().is_none());

        let config = ClassifierConfig {
            use_llm: true,
            llm_timeout_ms: 100,
        };
        let on = IntentClassifier::from_config(&config, Some(provider));
        assert!(on.provider().is_some());
        assert_eq!(on.timeout(), Duration::from_millis(100));
    }
}

//! LLM client abstraction.
//!
//! The external classification/extraction service is an optional collaborator.
//! Providers return free text; the query module decides what to make of it.

mod ollama;

pub use ollama::OllamaClient;

use crate::Result;
use crate::config::{LlmBackend, LlmConfig};
use std::sync::Arc;
use std::time::Duration;

/// Prompt used to classify a query into one intent.
pub const INTENT_PROMPT: &str = "\
Classify the following query about AI models into one of these categories:
- retrieval: Finding specific models or information about them
- comparison: Comparing two or more models
- notebook: Creating or working with notebooks for model analysis
- image_search: Finding images generated by models
- metadata: Questions about model metadata, properties or configuration
- unknown: None of the above

Respond with the category name only.";

/// Prompt used to extract structured parameters from a query.
pub const PARAMS_PROMPT: &str = "\
Extract parameters from this query about AI models. Return a JSON object with these possible keys:
- model_ids: list of model identifiers mentioned
- metrics: performance metrics of interest (accuracy, loss, perplexity, clip-score)
- filters: mapping of field name to value or {operator: value}
- limit: maximum number of results, as an integer
- sort_by: {\"field\": name, \"order\": \"ascending\" | \"descending\"}
- timeframe: time period mentioned, if any

Only include keys that are relevant to the query. Respond with JSON only.";

/// Trait for LLM providers.
pub trait LlmProvider: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Generates a completion for the given prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn complete(&self, prompt: &str) -> Result<String>;

    /// Generates a completion with a system prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    ///
    /// Default implementation concatenates system and user prompts.
    fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
        let combined = format!("{system}\n\nQuery: {user}\n\nAnswer:");
        self.complete(&combined)
    }

    /// Asks the service for the intent of a query. Returns free text.
    ///
    /// # Errors
    ///
    /// Returns an error if the service fails.
    fn classify_query(&self, text: &str) -> Result<String> {
        self.complete_with_system(INTENT_PROMPT, text)
    }

    /// Asks the service for query parameters. Returns free text that should
    /// contain a JSON object, possibly fenced.
    ///
    /// # Errors
    ///
    /// Returns an error if the service fails.
    fn extract_query_params(&self, text: &str) -> Result<String> {
        self.complete_with_system(PARAMS_PROMPT, text)
    }
}

/// HTTP client configuration for LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for LlmHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl LlmHttpConfig {
    /// Loads HTTP configuration from config settings.
    #[must_use]
    pub const fn from_config(config: &LlmConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            connect_timeout_ms: config.connect_timeout_ms,
        }
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(timeout_ms) = env_u64("MODELSCOUT_LLM_HTTP_TIMEOUT_MS") {
            self.timeout_ms = timeout_ms;
        }
        if let Some(connect_timeout_ms) = env_u64("MODELSCOUT_LLM_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = connect_timeout_ms;
        }
        self
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Builds a blocking HTTP client for LLM requests with configured timeouts.
#[must_use]
pub fn build_http_client(config: LlmHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build LLM HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Builds the configured provider, or `None` when the LLM tier is disabled.
#[must_use]
pub fn build_provider(config: &LlmConfig) -> Option<Arc<dyn LlmProvider>> {
    match config.provider {
        LlmBackend::Ollama => Some(Arc::new(OllamaClient::from_config(config))),
        LlmBackend::Disabled => None,
    }
}

/// Extracts JSON from LLM response, handling markdown code blocks.
#[must_use]
pub fn extract_json_from_response(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let content_start = start + 3;
        let after_marker = &trimmed[content_start..];
        let json_start = after_marker
            .find('{')
            .map_or(content_start, |pos| content_start + pos);
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        prompts: Mutex<Vec<String>>,
    }

    impl LlmProvider for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("retrieval".to_string())
        }
    }

    #[test]
    fn test_extract_json_raw() {
        let response = r#"{"key": "value"}"#;
        assert_eq!(extract_json_from_response(response), r#"{"key": "value"}"#);
    }

    #[test]
    fn test_extract_json_markdown() {
        let response = "```json\n{\"model_ids\": [\"bert\"]}\n```";
        assert_eq!(
            extract_json_from_response(response),
            r#"{"model_ids": ["bert"]}"#
        );
    }

    #[test]
    fn test_extract_json_unlabeled_fence() {
        let response = "Sure!\n```\n{\"limit\": 5}\n```";
        assert_eq!(extract_json_from_response(response), r#"{"limit": 5}"#);
    }

    #[test]
    fn test_extract_json_with_prefix() {
        let response = "Here is the result: {\"key\": \"value\"} hope this helps";
        assert_eq!(extract_json_from_response(response), r#"{"key": "value"}"#);
    }

    #[test]
    fn test_extract_json_no_object() {
        assert_eq!(extract_json_from_response("  nothing here "), "nothing here");
    }

    #[test]
    fn test_default_classify_prompt_embeds_query() {
        let provider = Recording {
            prompts: Mutex::new(Vec::new()),
        };
        provider.classify_query("find bert").unwrap();
        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].starts_with("Classify the following query"));
        assert!(prompts[0].contains("Query: find bert"));
    }

    #[test]
    fn test_build_provider_disabled() {
        let config = LlmConfig {
            provider: LlmBackend::Disabled,
            ..LlmConfig::default()
        };
        assert!(build_provider(&config).is_none());
    }

    #[test]
    fn test_http_config_from_config() {
        let config = LlmConfig {
            timeout_ms: 10,
            connect_timeout_ms: 0,
            ..LlmConfig::default()
        };
        let http = LlmHttpConfig::from_config(&config);
        assert_eq!(http.timeout_ms, 10);
        assert_eq!(http.connect_timeout_ms, 0);
    }
}

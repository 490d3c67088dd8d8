//! Parsed query.

use crate::models::{DetectionSource, Intent, ParameterBag};
use serde::Serialize;

/// A query after classification and extraction.
///
/// Built once per incoming query and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedQuery {
    /// Text as received.
    pub raw_text: String,
    /// Lemmatized content words with entity spans kept verbatim.
    pub processed_text: String,
    /// Classified intent.
    pub intent: Intent,
    /// Classifier tier that decided the intent.
    pub source: DetectionSource,
    /// Extracted parameters.
    pub parameters: ParameterBag,
}

impl ParsedQuery {
    /// Text to embed for semantic search: the processed text, or the raw
    /// text when preprocessing removed everything.
    #[must_use]
    pub fn search_text(&self) -> &str {
        if self.processed_text.trim().is_empty() {
            &self.raw_text
        } else {
            &self.processed_text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_text_falls_back_to_raw() {
        let mut query = ParsedQuery {
            raw_text: "what is it".to_string(),
            processed_text: String::new(),
            intent: Intent::Unknown,
            source: DetectionSource::Default,
            parameters: ParameterBag::new(),
        };
        assert_eq!(query.search_text(), "what is it");

        query.processed_text = "bert".to_string();
        assert_eq!(query.search_text(), "bert");
    }
}

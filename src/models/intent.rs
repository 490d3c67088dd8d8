//! Query intent types.
//!
//! - [`Intent`]: the caller's classified purpose for a query
//! - [`DetectionSource`]: which classifier tier produced the intent

use serde::{Deserialize, Serialize};

/// The classified purpose of a catalog query.
///
/// Closed set; every query resolves to exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Basic information retrieval about models.
    Retrieval,
    /// Side-by-side comparison of two or more models.
    Comparison,
    /// Request to generate an analysis notebook.
    Notebook,
    /// Search over images generated by models.
    ImageSearch,
    /// Questions about catalog metadata and schema.
    Metadata,
    /// Nothing matched.
    Unknown,
}

impl Intent {
    /// All intents in canonical order.
    ///
    /// Response parsing for the external classifier tries names in this order.
    pub const ALL: [Self; 6] = [
        Self::Retrieval,
        Self::Comparison,
        Self::Notebook,
        Self::ImageSearch,
        Self::Metadata,
        Self::Unknown,
    ];

    /// Returns the canonical wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieval => "retrieval",
            Self::Comparison => "comparison",
            Self::Notebook => "notebook",
            Self::ImageSearch => "image_search",
            Self::Metadata => "metadata",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a canonical intent name (case-insensitive, `-`/space tolerant).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str() == normalized)
    }

    /// Parses an intent name, coercing anything unrecognized to [`Intent::Retrieval`].
    #[must_use]
    pub fn parse_or_retrieval(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            tracing::warn!(intent = s, "Unknown intent, falling back to retrieval");
            Self::Retrieval
        })
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which classifier tier produced an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    /// The external LLM-backed classification service.
    Llm,
    /// Rule patterns.
    #[default]
    Rules,
    /// Verb/noun heuristics.
    Linguistic,
    /// No tier resolved; default applied.
    Default,
}

impl DetectionSource {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Rules => "rules",
            Self::Linguistic => "linguistic",
            Self::Default => "default",
        }
    }
}

impl std::fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_parse() {
        assert_eq!(Intent::parse("retrieval"), Some(Intent::Retrieval));
        assert_eq!(Intent::parse("IMAGE_SEARCH"), Some(Intent::ImageSearch));
        assert_eq!(Intent::parse("image-search"), Some(Intent::ImageSearch));
        assert_eq!(Intent::parse(" Comparison "), Some(Intent::Comparison));
        assert_eq!(Intent::parse("summarize"), None);
    }

    #[test]
    fn test_parse_or_retrieval_coerces() {
        assert_eq!(Intent::parse_or_retrieval("gibberish"), Intent::Retrieval);
        assert_eq!(Intent::parse_or_retrieval("metadata"), Intent::Metadata);
    }

    #[test]
    fn test_intent_serde_names() {
        let json = serde_json::to_string(&Intent::ImageSearch).unwrap();
        assert_eq!(json, "\"image_search\"");
        let intent: Intent = serde_json::from_str("\"notebook\"").unwrap();
        assert_eq!(intent, Intent::Notebook);
    }

    #[test]
    fn test_as_str_roundtrips() {
        for intent in Intent::ALL {
            assert_eq!(Intent::parse(intent.as_str()), Some(intent));
            assert_eq!(intent.to_string(), intent.as_str());
        }
    }

    #[test]
    fn test_detection_source_display() {
        assert_eq!(DetectionSource::Llm.to_string(), "llm");
        assert_eq!(DetectionSource::Linguistic.to_string(), "linguistic");
    }
}

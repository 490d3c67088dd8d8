//! Response envelope returned by the dispatcher.

use crate::comparison::ComparisonResults;
use crate::models::Intent;
use serde::Serialize;
use serde_json::{Map, Value};

/// Which search strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    /// Semantic search over model scripts.
    TextSearch,
    /// Semantic search over generated images.
    ImageSearch,
    /// Metadata-only fetch.
    MetadataSearch,
    /// Multi-model comparison.
    Comparison,
    /// Notebook generation request.
    NotebookRequest,
    /// Empty result from the fallback cascade.
    FallbackSearch,
}

impl SearchKind {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TextSearch => "text_search",
            Self::ImageSearch => "image_search",
            Self::MetadataSearch => "metadata_search",
            Self::Comparison => "comparison",
            Self::NotebookRequest => "notebook_request",
            Self::FallbackSearch => "fallback_search",
        }
    }
}

impl std::fmt::Display for SearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchItem {
    /// Record id.
    pub id: String,
    /// Similarity score (absent for metadata fetches).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Record metadata.
    pub metadata: Map<String, Value>,
    /// Document text (text search).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Image location (image search).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    /// Thumbnail location (image search).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<String>,
    /// 1-based position in the result list.
    pub rank: usize,
}

/// Handler timings in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Timings {
    /// Time spent producing the query embedding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_time_ms: Option<f64>,
    /// Time spent in the vector store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_time_ms: Option<f64>,
    /// Total handler time.
    pub total_time_ms: f64,
}

/// Notebook generation request descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotebookRequest {
    /// Models to analyze.
    pub model_ids: Vec<String>,
    /// Requested analyses.
    pub analysis_types: Vec<String>,
    /// Dataset, when named.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    /// Resource profile.
    pub resources: String,
}

/// Status of a notebook request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotebookStatus {
    /// Queued for the notebook generator.
    Pending,
}

/// Placeholder result for a queued notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotebookResult {
    /// `nb_{first_model}_{unix_ts}`.
    pub notebook_id: String,
    /// Human-readable title.
    pub title: String,
    /// Current status.
    pub status: NotebookStatus,
    /// Unix timestamp of the expected completion.
    pub estimated_completion_time: u64,
}

/// Handler-specific part of a successful response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Text, image, metadata and fallback searches.
    Search {
        /// Ranked hits.
        items: Vec<SearchItem>,
        /// Number of hits.
        total_found: usize,
        /// Timings.
        #[serde(skip_serializing_if = "Option::is_none")]
        performance: Option<Timings>,
        /// Explanation for an empty fallback result.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Multi-model comparison.
    Comparison {
        /// Requested model ids, in request order.
        models: Vec<String>,
        /// Dimensions compared.
        dimensions: Vec<String>,
        /// Organized records and summaries.
        results: Box<ComparisonResults>,
        /// Timings.
        performance: Timings,
    },
    /// Notebook generation request.
    Notebook {
        /// Request descriptor.
        request: NotebookRequest,
        /// Pending placeholder.
        result: NotebookResult,
        /// Timings.
        performance: Timings,
    },
}

impl Payload {
    /// Builds a search payload.
    #[must_use]
    pub fn search(items: Vec<SearchItem>, performance: Option<Timings>) -> Self {
        Self::Search {
            total_found: items.len(),
            items,
            performance,
            message: None,
        }
    }

    /// Returns the hit count of a search payload, 0 otherwise.
    #[must_use]
    pub fn total_found(&self) -> usize {
        match self {
            Self::Search { total_found, .. } => *total_found,
            _ => 0,
        }
    }

    /// Returns the timings, when the payload carries them.
    #[must_use]
    pub const fn timings(&self) -> Option<&Timings> {
        match self {
            Self::Search { performance, .. } => performance.as_ref(),
            Self::Comparison { performance, .. } | Self::Notebook { performance, .. } => {
                Some(performance)
            },
        }
    }

    /// Result count reported in the envelope metadata.
    ///
    /// Items for searches, resolved models for comparisons, one for notebooks.
    #[must_use]
    pub fn result_count(&self) -> usize {
        match self {
            Self::Search { items, .. } => items.len(),
            Self::Comparison { results, .. } => results.resolved_count(),
            Self::Notebook { .. } => 1,
        }
    }
}

/// What a handler returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerOutput {
    /// Strategy that produced the payload.
    #[serde(rename = "type")]
    pub kind: SearchKind,
    /// Payload.
    #[serde(flatten)]
    pub payload: Payload,
}

impl HandlerOutput {
    /// Creates a handler output.
    #[must_use]
    pub const fn new(kind: SearchKind, payload: Payload) -> Self {
        Self { kind, payload }
    }
}

/// Metadata attached to every envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeMetadata {
    /// Intent that was dispatched.
    pub intent: Intent,
    /// Wall-clock dispatch time.
    pub execution_time_ms: f64,
    /// Number of results (successful envelopes only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_count: Option<usize>,
    /// Sanitized parameters (successful envelopes only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// Normalized response for every dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    /// Whether the handler succeeded.
    pub success: bool,
    /// Handler output on success.
    #[serde(flatten)]
    pub output: Option<HandlerOutput>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Dispatch metadata.
    pub metadata: EnvelopeMetadata,
}

impl ResponseEnvelope {
    /// Wraps a successful handler output.
    #[must_use]
    pub fn success(output: HandlerOutput, metadata: EnvelopeMetadata) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
            metadata,
        }
    }

    /// Builds a failed envelope.
    #[must_use]
    pub fn failure(error: impl Into<String>, intent: Intent, execution_time_ms: f64) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            metadata: EnvelopeMetadata {
                intent,
                execution_time_ms,
                result_count: None,
                parameters: None,
            },
        }
    }

    /// Returns the strategy that produced this response.
    #[must_use]
    pub fn kind(&self) -> Option<SearchKind> {
        self.output.as_ref().map(|output| output.kind)
    }

    /// Returns the payload, if successful.
    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.output.as_ref().map(|output| &output.payload)
    }

    /// Returns the search items, empty for non-search payloads.
    #[must_use]
    pub fn items(&self) -> &[SearchItem] {
        match self.payload() {
            Some(Payload::Search { items, .. }) => items,
            _ => &[],
        }
    }

    /// Serializes the envelope to JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

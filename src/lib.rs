//! # modelscout
//!
//! Query understanding and dispatch engine for catalogs of trained AI models.
//!
//! A natural-language question goes through three stages:
//!
//! 1. **Intent classification** ([`query::IntentClassifier`]): an optional LLM
//!    service, then rule patterns, then linguistic heuristics.
//! 2. **Parameter extraction** ([`query::ParameterExtractor`]): model identifiers,
//!    metrics, filters, limits, sorting and intent-specific fields.
//! 3. **Dispatch** ([`dispatch::SearchDispatcher`]): one of six search strategies
//!    runs against the vector-database collaborator and the result is normalized
//!    into a [`ResponseEnvelope`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use modelscout::{EngineConfig, QueryEngine};
//!
//! let engine = QueryEngine::builder(EngineConfig::default())
//!     .vector_store(store)
//!     .text_embedder(embedder.clone())
//!     .image_embedder(embedder)
//!     .build()?;
//!
//! let answer = engine.answer("compare gpt-2 and bert on performance", None).await;
//! assert!(answer.response.success);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod comparison;
pub mod config;
pub mod dispatch;
pub mod embedding;
pub mod engine;
pub mod llm;
pub mod models;
pub mod observability;
pub mod query;
pub mod security;
pub mod storage;

pub use config::EngineConfig;
pub use dispatch::SearchDispatcher;
pub use engine::{EngineAnswer, QueryEngine};
pub use models::{Intent, ParameterBag, ParsedQuery, ResponseEnvelope};
pub use query::{IntentClassifier, ParameterExtractor, QueryParser};

/// Error type for modelscout operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Validation` | A handler is missing required parameters (model ids) |
/// | `ExternalService` | Classifier, embedder or vector database failed or timed out |
/// | `Parse` | A collaborator returned malformed JSON |
/// | `MissingData` | No catalog record exists for a requested model |
/// | `OperationFailed` | Local I/O, configuration or runtime failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Required parameters are missing or invalid.
    ///
    /// The display form is the bare message so that it can be surfaced to
    /// callers verbatim in a failed envelope.
    #[error("{0}")]
    Validation(String),

    /// An external collaborator failed.
    #[error("external service '{service}' failed: {cause}")]
    ExternalService {
        /// The collaborator that failed.
        service: String,
        /// The underlying cause.
        cause: String,
    },

    /// A collaborator response could not be parsed.
    #[error("failed to parse {context}: {cause}")]
    Parse {
        /// What was being parsed.
        context: String,
        /// The underlying cause.
        cause: String,
    },

    /// No record was found for a requested model.
    #[error("no catalog record for model '{0}'")]
    MissingData(String),

    /// A local operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::ExternalService`] from any displayable cause.
    pub fn external(service: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::ExternalService {
            service: service.into(),
            cause: cause.to_string(),
        }
    }

    /// Returns a short, stable label for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::ExternalService { .. } => "external_service",
            Self::Parse { .. } => "parse",
            Self::MissingData(_) => "missing_data",
            Self::OperationFailed { .. } => "operation_failed",
        }
    }
}

/// Result type alias for modelscout operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
#[must_use]
pub fn current_timestamp() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

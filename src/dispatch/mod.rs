//! Search dispatch.
//!
//! The dispatcher maps an [`Intent`] to exactly one [`Handler`], runs it
//! against the collaborators and normalizes the outcome into a
//! [`ResponseEnvelope`]. Handler failures never escape: they are logged,
//! reported to analytics and turned into `{success: false, error}`.
//!
//! ```text
//! Intent          Handler
//!   Retrieval   ─▶ TextSearch
//!   Comparison  ─▶ Comparison
//!   Notebook    ─▶ NotebookRequest
//!   ImageSearch ─▶ ImageSearch
//!   Metadata    ─▶ MetadataSearch
//!   Unknown     ─▶ Fallback
//! ```

mod comparison;
mod notebook;
mod search;

pub use search::NO_RESULTS_MESSAGE;

use crate::config::DispatchConfig;
use crate::embedding::{ImageEmbedder, TextEmbedder};
use crate::models::{
    EnvelopeMetadata, HandlerOutput, Intent, ParameterBag, ParsedQuery, ResponseEnvelope,
};
use crate::observability::{Analytics, current_query_id};
use crate::security::{AccessControl, sanitize_parameters};
use crate::storage::VectorStore;
use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Search strategy bound to an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    /// Semantic search over model scripts.
    TextSearch,
    /// Multi-model comparison.
    Comparison,
    /// Notebook generation request.
    NotebookRequest,
    /// Semantic search over generated images.
    ImageSearch,
    /// Metadata-only fetch.
    MetadataSearch,
    /// Text search, then metadata search, then an empty result.
    Fallback,
}

impl Handler {
    /// Returns the handler for `intent`.
    #[must_use]
    pub const fn for_intent(intent: Intent) -> Self {
        match intent {
            Intent::Retrieval => Self::TextSearch,
            Intent::Comparison => Self::Comparison,
            Intent::Notebook => Self::NotebookRequest,
            Intent::ImageSearch => Self::ImageSearch,
            Intent::Metadata => Self::MetadataSearch,
            Intent::Unknown => Self::Fallback,
        }
    }

    /// Returns the handler name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TextSearch => "text_search",
            Self::Comparison => "comparison",
            Self::NotebookRequest => "notebook_request",
            Self::ImageSearch => "image_search",
            Self::MetadataSearch => "metadata_search",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routes parsed queries to search handlers.
#[derive(Clone)]
pub struct SearchDispatcher {
    store: Arc<dyn VectorStore>,
    text_embedder: Arc<dyn TextEmbedder>,
    image_embedder: Arc<dyn ImageEmbedder>,
    access_control: Option<Arc<dyn AccessControl>>,
    analytics: Option<Arc<dyn Analytics>>,
    config: DispatchConfig,
}

impl SearchDispatcher {
    /// Creates a dispatcher without access control or analytics.
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        text_embedder: Arc<dyn TextEmbedder>,
        image_embedder: Arc<dyn ImageEmbedder>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            text_embedder,
            image_embedder,
            access_control: None,
            analytics: None,
            config,
        }
    }

    /// Filters parameters through `access_control` whenever a user id is given.
    #[must_use]
    pub fn with_access_control(mut self, access_control: Arc<dyn AccessControl>) -> Self {
        self.access_control = Some(access_control);
        self
    }

    /// Reports timings and failures to `analytics`.
    #[must_use]
    pub fn with_analytics(mut self, analytics: Arc<dyn Analytics>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    /// Returns the dispatcher settings.
    #[must_use]
    pub const fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Dispatches a parsed query, searching on its preprocessed text.
    pub async fn dispatch_parsed(
        &self,
        parsed: &ParsedQuery,
        user_id: Option<&str>,
    ) -> ResponseEnvelope {
        self.dispatch(
            parsed.search_text(),
            parsed.intent,
            parsed.parameters.clone(),
            user_id,
        )
        .await
    }

    /// Dispatches with an intent given by name. Unrecognized names run as
    /// [`Intent::Retrieval`].
    pub async fn dispatch_named(
        &self,
        text: &str,
        intent: &str,
        parameters: ParameterBag,
        user_id: Option<&str>,
    ) -> ResponseEnvelope {
        self.dispatch(text, Intent::parse_or_retrieval(intent), parameters, user_id)
            .await
    }

    /// Runs the handler for `intent` and wraps the outcome. Never fails.
    #[instrument(
        name = "query.dispatch",
        skip(self, text, parameters, user_id),
        fields(intent = %intent, handler = %Handler::for_intent(intent))
    )]
    pub async fn dispatch(
        &self,
        text: &str,
        intent: Intent,
        parameters: ParameterBag,
        user_id: Option<&str>,
    ) -> ResponseEnvelope {
        let start = Instant::now();
        let query_id = parameters.query_id.clone().or_else(current_query_id);

        let outcome = match self.authorize(intent, parameters, user_id) {
            Ok(parameters) => self
                .run(Handler::for_intent(intent), text, &parameters)
                .await
                .map(|output| (output, parameters)),
            Err(e) => Err(e),
        };
        let elapsed_ms = elapsed_ms(start);

        metrics::histogram!("query_dispatch_duration_ms", "intent" => intent.as_str())
            .record(elapsed_ms);

        match outcome {
            Ok((output, parameters)) => {
                let result_count = output.payload.result_count();
                metrics::counter!(
                    "query_dispatch_total",
                    "intent" => intent.as_str(),
                    "status" => "success"
                )
                .increment(1);
                tracing::info!(
                    query_id = ?query_id,
                    kind = %output.kind,
                    result_count,
                    execution_time_ms = elapsed_ms,
                    "Dispatch completed"
                );

                if let (Some(analytics), Some(query_id)) = (&self.analytics, &query_id) {
                    if let Some(timings) = output.payload.timings() {
                        analytics.log_performance(query_id, timings);
                    }
                }

                ResponseEnvelope::success(
                    output,
                    EnvelopeMetadata {
                        intent,
                        execution_time_ms: elapsed_ms,
                        result_count: Some(result_count),
                        parameters: Some(Value::Object(sanitize_parameters(&parameters))),
                    },
                )
            },
            Err(e) => {
                metrics::counter!(
                    "query_dispatch_total",
                    "intent" => intent.as_str(),
                    "status" => "error"
                )
                .increment(1);
                tracing::error!(
                    error = %e,
                    error_kind = e.kind(),
                    query_id = ?query_id,
                    handler = %Handler::for_intent(intent),
                    text_len = text.len(),
                    execution_time_ms = elapsed_ms,
                    "Dispatch failed"
                );

                if let (Some(analytics), Some(query_id)) = (&self.analytics, &query_id) {
                    analytics.mark_failed(query_id);
                }

                ResponseEnvelope::failure(e.to_string(), intent, elapsed_ms)
            },
        }
    }

    /// Applies access control when both a collaborator and a user are present.
    fn authorize(
        &self,
        intent: Intent,
        parameters: ParameterBag,
        user_id: Option<&str>,
    ) -> Result<ParameterBag> {
        match (&self.access_control, user_id) {
            (Some(access_control), Some(user_id)) => {
                access_control.authorize(intent, user_id)?;
                access_control.apply_filters(parameters, user_id)
            },
            _ => Ok(parameters),
        }
    }

    async fn run(
        &self,
        handler: Handler,
        text: &str,
        parameters: &ParameterBag,
    ) -> Result<HandlerOutput> {
        match handler {
            Handler::TextSearch => search::text(self, text, parameters).await,
            Handler::Comparison => comparison::compare(self, parameters).await,
            Handler::NotebookRequest => notebook::request(self, parameters),
            Handler::ImageSearch => search::image(self, text, parameters).await,
            Handler::MetadataSearch => search::metadata(self, parameters).await,
            Handler::Fallback => Ok(search::fallback(self, text, parameters).await),
        }
    }
}

impl fmt::Debug for SearchDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchDispatcher")
            .field("access_control", &self.access_control.is_some())
            .field("analytics", &self.analytics.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Milliseconds since `start`.
fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1_000.0
}

/// Maps a vector-store failure to an external-service error, leaving
/// errors that already name their cause alone.
fn store_error(e: Error) -> Error {
    match e {
        Error::ExternalService { .. } | Error::Validation(_) => e,
        other => Error::external("vector_store", other),
    }
}

//! Bounded calls to the external LLM service.
//!
//! The provider is blocking, so each call runs on its own thread and the
//! caller waits on a channel with a timeout. A timed-out thread is left to
//! finish on its own; its result is discarded.

use crate::llm::LlmProvider;
use crate::observability::{QueryContext, current_query_id, enter_query_context};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

/// Which question is being put to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmStage {
    /// Intent classification.
    Intent,
    /// Parameter extraction.
    Params,
}

impl LlmStage {
    /// Returns the stage label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Params => "params",
        }
    }

    const fn completed_metric(self) -> &'static str {
        match self {
            Self::Intent => "intent_llm_completed",
            Self::Params => "params_llm_completed",
        }
    }
}

/// Asks the provider for a `stage` answer about `text`.
///
/// Returns `None` on error, timeout or an empty answer. A zero timeout waits
/// indefinitely.
pub fn run_with_timeout(
    provider: &Arc<dyn LlmProvider>,
    text: &str,
    timeout: Duration,
    stage: LlmStage,
) -> Option<String> {
    let provider = Arc::clone(provider);
    let text = text.to_string();
    let (tx, rx) = mpsc::channel();
    let parent_span = tracing::Span::current();
    let query_id = current_query_id();

    std::thread::spawn(move || {
        let _query_guard = query_id.map(QueryContext::from_id).map(enter_query_context);
        let _parent = parent_span.enter();
        let span = tracing::info_span!("query.llm", stage = stage.as_str());
        let _guard = span.enter();
        let result = match stage {
            LlmStage::Intent => provider.classify_query(&text),
            LlmStage::Params => provider.extract_query_params(&text),
        };
        let _ = tx.send(result);
    });

    let received = if timeout.is_zero() {
        rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
    } else {
        rx.recv_timeout(timeout)
    };

    match received {
        Ok(Ok(response)) if response.trim().is_empty() => {
            metrics::counter!(stage.completed_metric(), "status" => "empty").increment(1);
            tracing::debug!(stage = stage.as_str(), "LLM returned an empty response");
            None
        },
        Ok(Ok(response)) => {
            metrics::counter!(stage.completed_metric(), "status" => "success").increment(1);
            Some(response)
        },
        Ok(Err(e)) => {
            metrics::counter!(stage.completed_metric(), "status" => "error").increment(1);
            tracing::warn!(stage = stage.as_str(), error = %e, "LLM call failed, falling back");
            None
        },
        Err(RecvTimeoutError::Timeout) => {
            metrics::counter!(stage.completed_metric(), "status" => "timeout").increment(1);
            tracing::warn!(
                stage = stage.as_str(),
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "LLM call timed out, falling back"
            );
            None
        },
        Err(RecvTimeoutError::Disconnected) => {
            metrics::counter!(stage.completed_metric(), "status" => "error").increment(1);
            tracing::warn!(stage = stage.as_str(), "LLM worker exited without a response");
            None
        },
    }
}

//! Notebook request handler.
//!
//! Generation itself happens elsewhere; this handler validates the request
//! and returns a descriptor plus a pending placeholder.

use super::{SearchDispatcher, elapsed_ms};
use crate::models::{
    HandlerOutput, NotebookRequest, NotebookResult, NotebookStatus, ParameterBag, Payload,
    SearchKind, Timings,
};
use crate::{Error, Result, current_timestamp};
use std::time::Instant;

const DEFAULT_ANALYSIS: &str = "basic";
const DEFAULT_RESOURCES: &str = "standard";

pub(super) fn request(
    dispatcher: &SearchDispatcher,
    parameters: &ParameterBag,
) -> Result<HandlerOutput> {
    let start = Instant::now();

    let model_ids = parameters.model_ids.to_vec();
    let Some(first) = model_ids.first() else {
        return Err(Error::Validation(
            "Notebook generation requires at least one model ID".to_string(),
        ));
    };

    let now = current_timestamp();
    let result = NotebookResult {
        notebook_id: format!("nb_{first}_{now}"),
        title: format!("Analysis of {}", model_ids.join(", ")),
        status: NotebookStatus::Pending,
        estimated_completion_time: now.saturating_add(dispatcher.config().notebook_eta_secs),
    };

    let analysis_types = if parameters.analysis_types.is_empty() {
        vec![DEFAULT_ANALYSIS.to_string()]
    } else {
        parameters.analysis_types.clone()
    };
    let request = NotebookRequest {
        model_ids,
        analysis_types,
        dataset: parameters.dataset.clone(),
        resources: parameters
            .resources
            .clone()
            .unwrap_or_else(|| DEFAULT_RESOURCES.to_string()),
    };

    tracing::info!(notebook_id = %result.notebook_id, "Notebook request queued");

    Ok(HandlerOutput::new(
        SearchKind::NotebookRequest,
        Payload::Notebook {
            request,
            result,
            performance: Timings {
                total_time_ms: elapsed_ms(start),
                ..Timings::default()
            },
        },
    ))
}

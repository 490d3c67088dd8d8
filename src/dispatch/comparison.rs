//! Comparison handler: concurrent per-model fetch, then the comparison engine.

use super::{SearchDispatcher, elapsed_ms};
use crate::comparison::ComparisonResults;
use crate::models::{HandlerOutput, ModelRecord, ParameterBag, Payload, SearchKind, Timings};
use crate::storage::{BackendFilter, FilterOperator, GetRequest, VectorStore, translate_map};
use crate::{Error, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::instrument;

/// Resolves every requested model concurrently and compares them.
#[instrument(name = "handler.comparison", skip_all, fields(models = parameters.model_ids.len()))]
pub(super) async fn compare(
    dispatcher: &SearchDispatcher,
    parameters: &ParameterBag,
) -> Result<HandlerOutput> {
    let start = Instant::now();

    if parameters.model_ids.len() < 2 {
        return Err(Error::Validation(
            "Comparison requires at least two model IDs".to_string(),
        ));
    }

    let model_ids = parameters.model_ids.to_vec();
    let dimensions = if parameters.comparison_dimensions.is_empty() {
        dispatcher.config().default_dimensions.clone()
    } else {
        parameters.comparison_dimensions.clone()
    };

    // Caller and access-control filters narrow every per-model fetch.
    let base_filter = translate_map(&parameters.filters);
    let records = fetch_all(
        &dispatcher.store,
        &dispatcher.config().scripts_collection,
        &model_ids,
        &base_filter,
        &dimensions,
    )
    .await;
    let search_time_ms = elapsed_ms(start);

    let results = ComparisonResults::build(&records, &dimensions);
    tracing::debug!(
        resolved = results.resolved_count(),
        requested = model_ids.len(),
        "Comparison models resolved"
    );

    Ok(HandlerOutput::new(
        SearchKind::Comparison,
        Payload::Comparison {
            models: model_ids,
            dimensions,
            results: Box::new(results),
            performance: Timings {
                embedding_time_ms: None,
                search_time_ms: Some(search_time_ms),
                total_time_ms: elapsed_ms(start),
            },
        },
    ))
}

/// Fetches one record per model in parallel. The result keeps `model_ids`
/// order; a model whose fetch fails or finds nothing becomes a stub.
async fn fetch_all(
    store: &Arc<dyn VectorStore>,
    collection: &str,
    model_ids: &[String],
    base_filter: &BackendFilter,
    dimensions: &[String],
) -> Vec<ModelRecord> {
    let mut records: Vec<ModelRecord> = model_ids.iter().map(ModelRecord::not_found).collect();
    let mut tasks = JoinSet::new();

    for (index, model_id) in model_ids.iter().enumerate() {
        let store = Arc::clone(store);
        let request = GetRequest::new(collection)
            .with_filter(
                base_filter
                    .clone()
                    .with("model_id", FilterOperator::Eq, json!(model_id)),
            )
            .with_limit(1);
        let model_id = model_id.clone();
        let dimensions = dimensions.to_vec();

        tasks.spawn(async move {
            let record = fetch_one(store.as_ref(), request, &model_id, &dimensions).await;
            (index, record)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, record)) => {
                if let Some(slot) = records.get_mut(index) {
                    *slot = record;
                }
            },
            Err(e) => tracing::error!(error = %e, "Model fetch task failed"),
        }
    }

    records
}

async fn fetch_one(
    store: &dyn VectorStore,
    request: GetRequest,
    model_id: &str,
    dimensions: &[String],
) -> ModelRecord {
    match store.get(request).await {
        Ok(found) => found.first().map_or_else(
            || {
                tracing::debug!(model_id, "No catalog record, using stub");
                ModelRecord::not_found(model_id)
            },
            |record| ModelRecord::from_metadata(model_id, &record.metadata, dimensions),
        ),
        Err(e) => {
            tracing::warn!(model_id, error = %e, "Model fetch failed, using stub");
            ModelRecord::not_found(model_id)
        },
    }
}

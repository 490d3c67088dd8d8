//! Text, image, metadata and fallback searches.

use super::{SearchDispatcher, elapsed_ms, store_error};
use crate::Result;
use crate::models::{HandlerOutput, ParameterBag, Payload, SearchItem, SearchKind, Timings};
use crate::storage::{
    FilterOperator, GetRequest, Include, SearchRequest, StoredRecord, translate_map,
};
use serde_json::{Value, json};
use std::time::Instant;
use tracing::instrument;

/// Message attached to an empty fallback result.
pub const NO_RESULTS_MESSAGE: &str = "No results found using various search strategies";

/// Embeds the query text and searches the scripts collection.
#[instrument(name = "handler.text_search", skip_all)]
pub(super) async fn text(
    dispatcher: &SearchDispatcher,
    text: &str,
    parameters: &ParameterBag,
) -> Result<HandlerOutput> {
    let start = Instant::now();
    let config = dispatcher.config();

    let embedding = dispatcher.text_embedder.embed_text(text).await?;
    let embedding_time_ms = elapsed_ms(start);

    let request = SearchRequest::new(
        &config.scripts_collection,
        embedding,
        parameters.limit_or(config.text_limit),
    )
    .with_filter(translate_map(&parameters.filters))
    .with_include(Include::ALL);

    let search_start = Instant::now();
    let records = dispatcher.store.search(request).await.map_err(store_error)?;
    let search_time_ms = elapsed_ms(search_start);

    let items = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| SearchItem {
            rank: i + 1,
            id: record.id,
            score: record.score,
            metadata: record.metadata,
            content: Some(record.document.unwrap_or_default()),
            image_path: None,
            thumbnail_path: None,
        })
        .collect();

    let timings = Timings {
        embedding_time_ms: Some(embedding_time_ms),
        search_time_ms: Some(search_time_ms),
        total_time_ms: elapsed_ms(start),
    };
    Ok(HandlerOutput::new(
        SearchKind::TextSearch,
        Payload::search(items, Some(timings)),
    ))
}

/// Searches the images collection by image bytes or by text projected into
/// the image space.
#[instrument(name = "handler.image_search", skip_all)]
pub(super) async fn image(
    dispatcher: &SearchDispatcher,
    text: &str,
    parameters: &ParameterBag,
) -> Result<HandlerOutput> {
    let start = Instant::now();
    let config = dispatcher.config();

    let embedding = match &parameters.image_data {
        Some(bytes) => dispatcher.image_embedder.embed_image(bytes).await?,
        None => {
            dispatcher
                .image_embedder
                .embed_text_for_image_search(text)
                .await?
        },
    };
    let embedding_time_ms = elapsed_ms(start);

    let mut filter = translate_map(&parameters.filters);
    if !parameters.style_tags.is_empty() {
        filter.insert("style_tags", FilterOperator::In, json!(parameters.style_tags));
    }
    if let Some(prompt) = &parameters.prompt_terms {
        filter.insert("prompt", FilterOperator::Contains, json!(prompt));
    }
    if let Some(resolution) = parameters.resolution {
        filter.insert("resolution.width", FilterOperator::Eq, json!(resolution.width));
        filter.insert("resolution.height", FilterOperator::Eq, json!(resolution.height));
    }
    if !parameters.model_ids.is_empty() {
        filter.insert("source_model_id", FilterOperator::In, json!(parameters.model_ids));
    }

    let request = SearchRequest::new(
        &config.images_collection,
        embedding,
        parameters.limit_or(config.image_limit),
    )
    .with_filter(filter)
    .with_include(Include::METADATAS);

    let search_start = Instant::now();
    let records = dispatcher.store.search(request).await.map_err(store_error)?;
    let search_time_ms = elapsed_ms(search_start);

    let items = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| SearchItem {
            rank: i + 1,
            image_path: metadata_string(&record, "image_path"),
            thumbnail_path: metadata_string(&record, "thumbnail_path"),
            id: record.id,
            score: record.score,
            metadata: record.metadata,
            content: None,
        })
        .collect();

    let timings = Timings {
        embedding_time_ms: Some(embedding_time_ms),
        search_time_ms: Some(search_time_ms),
        total_time_ms: elapsed_ms(start),
    };
    Ok(HandlerOutput::new(
        SearchKind::ImageSearch,
        Payload::search(items, Some(timings)),
    ))
}

fn metadata_string(record: &StoredRecord, key: &str) -> Option<String> {
    record
        .metadata
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Fetches scripts-collection records by filter, without embedding.
#[instrument(name = "handler.metadata_search", skip_all)]
pub(super) async fn metadata(
    dispatcher: &SearchDispatcher,
    parameters: &ParameterBag,
) -> Result<HandlerOutput> {
    let start = Instant::now();
    let config = dispatcher.config();

    let request = GetRequest::new(&config.scripts_collection)
        .with_filter(translate_map(&parameters.filters))
        .with_limit(parameters.limit_or(config.metadata_limit));
    let records = dispatcher.store.get(request).await.map_err(store_error)?;
    let search_time_ms = elapsed_ms(start);

    let items = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| SearchItem {
            rank: i + 1,
            id: record.id,
            score: record.score,
            metadata: record.metadata,
            content: record.document,
            image_path: None,
            thumbnail_path: None,
        })
        .collect();

    let timings = Timings {
        embedding_time_ms: None,
        search_time_ms: Some(search_time_ms),
        total_time_ms: elapsed_ms(start),
    };
    Ok(HandlerOutput::new(
        SearchKind::MetadataSearch,
        Payload::search(items, Some(timings)),
    ))
}

/// Text search, then metadata search, then an empty successful result.
/// Failures along the way are logged and treated as empty.
#[instrument(name = "handler.fallback", skip_all)]
pub(super) async fn fallback(
    dispatcher: &SearchDispatcher,
    text: &str,
    parameters: &ParameterBag,
) -> HandlerOutput {
    let start = Instant::now();

    match self::text(dispatcher, text, parameters).await {
        Ok(output) if output.payload.total_found() > 0 => return output,
        Ok(_) => tracing::debug!("Fallback text search found nothing"),
        Err(e) => tracing::warn!(error = %e, "Fallback text search failed"),
    }

    match self::metadata(dispatcher, parameters).await {
        Ok(output) if output.payload.total_found() > 0 => return output,
        Ok(_) => tracing::debug!("Fallback metadata search found nothing"),
        Err(e) => tracing::warn!(error = %e, "Fallback metadata search failed"),
    }

    let timings = Timings {
        total_time_ms: elapsed_ms(start),
        ..Timings::default()
    };
    HandlerOutput::new(
        SearchKind::FallbackSearch,
        Payload::Search {
            items: Vec::new(),
            total_found: 0,
            performance: Some(timings),
            message: Some(NO_RESULTS_MESSAGE.to_string()),
        },
    )
}

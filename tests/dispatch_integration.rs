//! Dispatcher integration tests.
//!
//! Runs every handler against an in-memory catalog:
//! - Text, image and metadata searches honor limits and filters
//! - Comparison resolves models concurrently and stubs missing ones
//! - Notebook and comparison validation surface as failed envelopes
//! - Fallback degrades to an empty successful result
//! - Access control narrows results and denies disallowed intents
//! - Analytics sees timings and failures keyed by query id

// Integration tests use expect/unwrap/panic for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use modelscout::config::DispatchConfig;
use modelscout::dispatch::NO_RESULTS_MESSAGE;
use modelscout::embedding::HashEmbedder;
use modelscout::models::{NotebookStatus, Payload, Resolution, SearchKind, Timings};
use modelscout::observability::Analytics;
use modelscout::security::{Role, RoleBasedAccessControl};
use modelscout::storage::MemoryVectorStore;
use modelscout::{Intent, ParameterBag, QueryParser, SearchDispatcher};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn catalog() -> serde_json::Value {
    json!({
        "model_scripts": [
            {
                "id": "bert-script",
                "document": "bert bidirectional transformer encoder for language understanding",
                "metadata": {
                    "model_id": "bert",
                    "architecture_type": "transformer",
                    "model_dimensions": {"hidden_size": 768, "num_layers": 12,
                                         "num_attention_heads": 12, "total_parameters": 110_000_000},
                    "performance": {"accuracy": 0.91, "loss": 0.30},
                    "framework": {"name": "pytorch", "version": "2.1"}
                }
            },
            {
                "id": "gpt2-script",
                "document": "gpt-2 autoregressive transformer decoder for text generation",
                "metadata": {
                    "model_id": "gpt-2",
                    "architecture_type": "transformer",
                    "model_dimensions": {"hidden_size": 1024, "num_layers": 24,
                                         "num_attention_heads": 16, "total_parameters": 345_000_000},
                    "performance": {"accuracy": 0.88, "loss": 0.42},
                    "access_level": "internal"
                }
            },
            {
                "id": "secret-script",
                "document": "convolutional network trained on private data",
                "metadata": {
                    "model_id": "secret-net",
                    "architecture_type": "cnn",
                    "access_level": "restricted"
                }
            }
        ],
        "generated_images": [
            {
                "id": "img-1",
                "metadata": {
                    "source_model_id": "stable-diffusion",
                    "prompt": "a cat on a mat",
                    "style_tags": ["watercolor"],
                    "resolution": {"width": 512, "height": 512},
                    "image_path": "/images/img-1.png",
                    "thumbnail_path": "/thumbs/img-1.png"
                }
            },
            {
                "id": "img-2",
                "metadata": {
                    "source_model_id": "dall-e",
                    "prompt": "a dog in the rain",
                    "style_tags": ["oil painting"],
                    "resolution": {"width": 1024, "height": 768},
                    "image_path": "/images/img-2.png"
                }
            }
        ]
    })
}

fn store() -> Arc<MemoryVectorStore> {
    Arc::new(MemoryVectorStore::from_catalog(catalog(), &HashEmbedder::new()).unwrap())
}

fn dispatcher_with(store: Arc<MemoryVectorStore>) -> SearchDispatcher {
    let embedder = Arc::new(HashEmbedder::new());
    SearchDispatcher::new(store, embedder.clone(), embedder, DispatchConfig::default())
}

fn dispatcher() -> SearchDispatcher {
    dispatcher_with(store())
}

fn bag_with_models(ids: &[&str]) -> ParameterBag {
    let mut bag = ParameterBag::new();
    for id in ids {
        bag.add_model_id(id);
    }
    bag
}

/// Records every analytics call.
#[derive(Default)]
struct RecordingAnalytics {
    performance: Mutex<Vec<String>>,
    failed: Mutex<Vec<String>>,
}

impl Analytics for RecordingAnalytics {
    fn log_performance(&self, query_id: &str, _timings: &Timings) {
        self.performance.lock().unwrap().push(query_id.to_string());
    }

    fn mark_failed(&self, query_id: &str) {
        self.failed.lock().unwrap().push(query_id.to_string());
    }
}

// ============================================================================
// Search handlers
// ============================================================================

#[tokio::test]
async fn test_text_search_returns_ranked_documents() {
    let response = dispatcher()
        .dispatch("bert transformer encoder", Intent::Retrieval, ParameterBag::new(), None)
        .await;

    assert!(response.success, "error: {:?}", response.error);
    assert_eq!(response.kind(), Some(SearchKind::TextSearch));
    let items = response.items();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].rank, 1);
    assert!(items.iter().all(|item| item.content.is_some()));
    assert!(items.iter().all(|item| item.score.is_some()));
    assert_eq!(response.metadata.intent, Intent::Retrieval);
    assert_eq!(response.metadata.result_count, Some(3));
}

#[tokio::test]
async fn test_text_search_honors_limit() {
    let mut bag = ParameterBag::new();
    bag.set_limit(1);
    let response = dispatcher()
        .dispatch("transformer", Intent::Retrieval, bag, None)
        .await;

    assert!(response.success);
    assert_eq!(response.items().len(), 1);
}

#[tokio::test]
async fn test_image_search_filters_by_resolution() {
    let mut bag = ParameterBag::new();
    bag.resolution = Resolution::parse("512x512");
    let response = dispatcher()
        .dispatch("cat images", Intent::ImageSearch, bag, None)
        .await;

    assert!(response.success, "error: {:?}", response.error);
    assert_eq!(response.kind(), Some(SearchKind::ImageSearch));
    let items = response.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "img-1");
    assert_eq!(items[0].image_path.as_deref(), Some("/images/img-1.png"));
    assert_eq!(items[0].thumbnail_path.as_deref(), Some("/thumbs/img-1.png"));
    assert!(items[0].content.is_none());
}

#[tokio::test]
async fn test_image_search_by_style_and_source_model() {
    let mut bag = bag_with_models(&["dall-e"]);
    bag.style_tags = vec!["oil painting".to_string()];
    let response = dispatcher()
        .dispatch("rainy dog", Intent::ImageSearch, bag, None)
        .await;

    assert!(response.success);
    let ids: Vec<&str> = response.items().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["img-2"]);
}

#[tokio::test]
async fn test_image_search_with_image_bytes() {
    let mut bag = ParameterBag::new();
    bag.image_data = Some(vec![0x89, b'P', b'N', b'G']);
    let response = dispatcher()
        .dispatch("", Intent::ImageSearch, bag, None)
        .await;

    assert!(response.success);
    assert_eq!(response.items().len(), 2);
    let echoed = response.metadata.parameters.unwrap();
    assert_eq!(echoed["image_data"], json!("[binary data removed]"));
}

#[tokio::test]
async fn test_metadata_search_applies_aliased_filters() {
    let mut bag = ParameterBag::new();
    bag.filters.insert("architecture".to_string(), json!("transformer"));
    let response = dispatcher()
        .dispatch("transformer models", Intent::Metadata, bag, None)
        .await;

    assert!(response.success);
    assert_eq!(response.kind(), Some(SearchKind::MetadataSearch));
    let mut ids: Vec<&str> = response.items().iter().map(|i| i.id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["bert-script", "gpt2-script"]);
    assert!(response.items().iter().all(|item| item.score.is_none()));
}

#[tokio::test]
async fn test_metadata_search_with_range_filter() {
    let mut bag = ParameterBag::new();
    bag.filters.insert(
        "params".to_string(),
        json!({"operator": "greater than", "value": 200_000_000}),
    );
    let response = dispatcher()
        .dispatch("big models", Intent::Metadata, bag, None)
        .await;

    assert!(response.success);
    let ids: Vec<&str> = response.items().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["gpt2-script"]);
}

// ============================================================================
// Comparison
// ============================================================================

#[tokio::test]
async fn test_comparison_resolves_and_stubs_missing_models() {
    let bag = bag_with_models(&["bert", "gpt-2", "missing-model"]);
    let response = dispatcher()
        .dispatch("compare", Intent::Comparison, bag, None)
        .await;

    assert!(response.success, "error: {:?}", response.error);
    assert_eq!(response.kind(), Some(SearchKind::Comparison));
    assert_eq!(response.metadata.result_count, Some(2));

    let Some(Payload::Comparison {
        models,
        dimensions,
        results,
        ..
    }) = response.payload()
    else {
        panic!("expected a comparison payload");
    };
    assert_eq!(models, &vec!["bert", "gpt-2", "missing-model"]);
    assert_eq!(dimensions, &vec!["architecture", "performance"]);
    assert!(results.models["bert"].found);
    assert!(!results.models["missing-model"].found);
    assert_eq!(results.dimensions["performance"]["missing-model"], json!({}));

    let performance = results
        .summary
        .performance
        .as_ref()
        .and_then(|summary| summary.available())
        .expect("performance summary");
    let accuracy = performance.accuracy.as_ref().expect("accuracy ranking");
    assert_eq!(accuracy.best.model_id, "bert");
}

#[tokio::test]
async fn test_comparison_uses_requested_dimensions() {
    let mut bag = bag_with_models(&["bert", "gpt-2"]);
    bag.comparison_dimensions = vec!["framework".to_string()];
    let response = dispatcher()
        .dispatch("compare", Intent::Comparison, bag, None)
        .await;

    let Some(Payload::Comparison { results, .. }) = response.payload() else {
        panic!("expected a comparison payload");
    };
    assert_eq!(results.dimensions["framework"]["bert"]["name"], json!("pytorch"));
    assert_eq!(results.dimensions["framework"]["gpt-2"], json!({}));
    assert!(results.summary.performance.is_none());
}

#[tokio::test]
async fn test_comparison_requires_two_models() {
    let response = dispatcher()
        .dispatch("compare bert", Intent::Comparison, bag_with_models(&["bert"]), None)
        .await;

    assert!(!response.success);
    assert!(response.output.is_none());
    assert_eq!(
        response.error.as_deref(),
        Some("Comparison requires at least two model IDs")
    );
    assert_eq!(response.metadata.intent, Intent::Comparison);
}

// ============================================================================
// Notebook
// ============================================================================

#[tokio::test]
async fn test_notebook_request_is_pending() {
    let mut bag = bag_with_models(&["bert", "gpt-2"]);
    bag.dataset = Some("imagenet".to_string());
    let response = dispatcher()
        .dispatch("notebook", Intent::Notebook, bag, None)
        .await;

    assert!(response.success);
    assert_eq!(response.kind(), Some(SearchKind::NotebookRequest));
    let Some(Payload::Notebook { request, result, .. }) = response.payload() else {
        panic!("expected a notebook payload");
    };
    assert!(result.notebook_id.starts_with("nb_bert_"));
    assert_eq!(result.title, "Analysis of bert, gpt-2");
    assert_eq!(result.status, NotebookStatus::Pending);
    assert_eq!(request.analysis_types, vec!["basic"]);
    assert_eq!(request.resources, "standard");
    assert_eq!(request.dataset.as_deref(), Some("imagenet"));
}

#[tokio::test]
async fn test_notebook_named_after_first_mentioned_model() {
    let parsed = QueryParser::new().parse("create a notebook to analyze gpt-2 and bert");
    assert_eq!(parsed.intent, Intent::Notebook);
    let response = dispatcher().dispatch_parsed(&parsed, None).await;

    let Some(Payload::Notebook { request, result, .. }) = response.payload() else {
        panic!("expected a notebook payload");
    };
    assert!(result.notebook_id.starts_with("nb_gpt-2_"));
    assert_eq!(result.title, "Analysis of gpt-2, bert");
    assert_eq!(request.model_ids, vec!["gpt-2", "bert"]);
}

#[tokio::test]
async fn test_notebook_requires_a_model() {
    let response = dispatcher()
        .dispatch("notebook", Intent::Notebook, ParameterBag::new(), None)
        .await;

    assert!(!response.success);
    assert_eq!(
        response.error.as_deref(),
        Some("Notebook generation requires at least one model ID")
    );
}

// ============================================================================
// Fallback and failures
// ============================================================================

#[tokio::test]
async fn test_fallback_uses_text_search_when_it_finds_something() {
    let response = dispatcher()
        .dispatch("encoder", Intent::Unknown, ParameterBag::new(), None)
        .await;

    assert!(response.success);
    assert_eq!(response.kind(), Some(SearchKind::TextSearch));
    assert_eq!(response.metadata.intent, Intent::Unknown);
}

#[tokio::test]
async fn test_fallback_on_empty_store_is_successful_and_empty() {
    let response = dispatcher_with(Arc::new(MemoryVectorStore::new()))
        .dispatch("good morning", Intent::Unknown, ParameterBag::new(), None)
        .await;

    assert!(response.success);
    assert_eq!(response.kind(), Some(SearchKind::FallbackSearch));
    assert!(response.items().is_empty());
    let Some(Payload::Search { message, .. }) = response.payload() else {
        panic!("expected a search payload");
    };
    assert_eq!(message.as_deref(), Some(NO_RESULTS_MESSAGE));
}

#[tokio::test]
async fn test_store_failure_becomes_failed_envelope() {
    let response = dispatcher_with(Arc::new(MemoryVectorStore::new()))
        .dispatch("bert", Intent::Retrieval, ParameterBag::new(), None)
        .await;

    assert!(!response.success);
    assert!(response.error.is_some());
    assert!(response.metadata.parameters.is_none());
}

#[tokio::test]
async fn test_unknown_intent_name_runs_as_retrieval() {
    let response = dispatcher()
        .dispatch_named("bert", "summarize", ParameterBag::new(), None)
        .await;

    assert!(response.success);
    assert_eq!(response.metadata.intent, Intent::Retrieval);
    assert_eq!(response.kind(), Some(SearchKind::TextSearch));
}

#[tokio::test]
async fn test_sanitized_parameters_drop_credentials() {
    let mut bag = ParameterBag::new();
    bag.query_id = Some("q-7".to_string());
    bag.extra.insert("api_key".to_string(), json!("sk-123"));
    bag.extra.insert("session_token".to_string(), json!("abc"));
    bag.extra.insert("team".to_string(), json!("vision"));

    let response = dispatcher()
        .dispatch("bert", Intent::Retrieval, bag, None)
        .await;

    let echoed = response.metadata.parameters.unwrap();
    assert!(echoed.get("api_key").is_none());
    assert!(echoed.get("session_token").is_none());
    assert!(echoed.get("query_id").is_none());
    assert_eq!(echoed["team"], json!("vision"));
}

// ============================================================================
// Access control
// ============================================================================

#[tokio::test]
async fn test_access_levels_narrow_results_by_role() {
    let access = RoleBasedAccessControl::new()
        .with_assignment("root", Role::Admin)
        .with_assignment("res", Role::Researcher);
    let dispatcher = dispatcher().with_access_control(Arc::new(access));

    let count = |user: &'static str| {
        let dispatcher = dispatcher.clone();
        async move {
            dispatcher
                .dispatch("all", Intent::Metadata, ParameterBag::new(), Some(user))
                .await
                .items()
                .len()
        }
    };

    assert_eq!(count("root").await, 3);
    assert_eq!(count("res").await, 2);
    assert_eq!(count("guest").await, 1);
}

#[tokio::test]
async fn test_caller_cannot_override_access_filter() {
    let dispatcher =
        dispatcher().with_access_control(Arc::new(RoleBasedAccessControl::new()));
    let mut bag = ParameterBag::new();
    bag.filters
        .insert("access_level".to_string(), json!("restricted"));

    let response = dispatcher
        .dispatch("all", Intent::Metadata, bag, Some("guest"))
        .await;

    assert!(response.success);
    let ids: Vec<&str> = response.items().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["bert-script"]);
}

#[tokio::test]
async fn test_access_control_skipped_without_user() {
    let dispatcher =
        dispatcher().with_access_control(Arc::new(RoleBasedAccessControl::new()));
    let response = dispatcher
        .dispatch("all", Intent::Metadata, ParameterBag::new(), None)
        .await;

    assert_eq!(response.items().len(), 3);
}

#[tokio::test]
async fn test_viewer_cannot_request_notebooks() {
    let dispatcher =
        dispatcher().with_access_control(Arc::new(RoleBasedAccessControl::new()));
    let response = dispatcher
        .dispatch("notebook", Intent::Notebook, bag_with_models(&["bert"]), Some("guest"))
        .await;

    assert!(!response.success);
    assert_eq!(
        response.error.as_deref(),
        Some("Role 'viewer' is not allowed to run notebook queries")
    );
}

// ============================================================================
// Analytics
// ============================================================================

#[tokio::test]
async fn test_analytics_records_success_and_failure() {
    let analytics = Arc::new(RecordingAnalytics::default());
    let dispatcher = dispatcher().with_analytics(analytics.clone());

    let mut ok = ParameterBag::new();
    ok.query_id = Some("q-ok".to_string());
    dispatcher.dispatch("bert", Intent::Retrieval, ok, None).await;

    let mut bad = ParameterBag::new();
    bad.query_id = Some("q-bad".to_string());
    dispatcher.dispatch("compare", Intent::Comparison, bad, None).await;

    dispatcher
        .dispatch("bert", Intent::Retrieval, ParameterBag::new(), None)
        .await;

    assert_eq!(*analytics.performance.lock().unwrap(), vec!["q-ok"]);
    assert_eq!(*analytics.failed.lock().unwrap(), vec!["q-bad"]);
}

//! End-to-end tests: configuration and catalog files, parse, dispatch.
//!
//! Covers the full `QueryEngine` path with the in-memory store and hash
//! embedder, plus the optional classification service through a test double.

// Integration tests use expect/unwrap/panic for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use modelscout::embedding::HashEmbedder;
use modelscout::llm::LlmProvider;
use modelscout::models::{DetectionSource, Payload, SearchKind};
use modelscout::observability::MetricsAnalytics;
use modelscout::security::{Role, RoleBasedAccessControl};
use modelscout::storage::MemoryVectorStore;
use modelscout::{EngineConfig, Error, Intent, QueryEngine};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const CATALOG: &str = r#"{
  "model_scripts": [
    {"id": "bert-script",
     "document": "bert bidirectional transformer encoder",
     "metadata": {"model_id": "bert", "architecture_type": "transformer",
                  "model_dimensions": {"total_parameters": 110000000, "num_layers": 12},
                  "performance": {"accuracy": 0.91}}},
    {"id": "gpt2-script",
     "document": "gpt-2 transformer decoder for text generation",
     "metadata": {"model_id": "gpt-2", "architecture_type": "transformer",
                  "model_dimensions": {"total_parameters": 345000000, "num_layers": 24},
                  "performance": {"accuracy": 0.88},
                  "access_level": "internal"}}
  ],
  "generated_images": [
    {"id": "img-1",
     "metadata": {"source_model_id": "stable-diffusion", "prompt": "a lighthouse at dusk",
                  "resolution": {"width": 512, "height": 512},
                  "image_path": "/images/img-1.png"}},
    {"id": "img-2",
     "metadata": {"source_model_id": "stable-diffusion", "prompt": "a forest",
                  "resolution": {"width": 768, "height": 768},
                  "image_path": "/images/img-2.png"}}
  ]
}"#;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

fn engine_with(config: EngineConfig, llm: Option<Arc<dyn LlmProvider>>) -> QueryEngine {
    let catalog = write_temp(CATALOG);
    let embedder = HashEmbedder::new();
    let store = MemoryVectorStore::load_catalog(catalog.path(), &embedder).unwrap();
    let embedder = Arc::new(embedder);

    let access = RoleBasedAccessControl::new().with_assignment("lead", Role::Researcher);
    let mut builder = QueryEngine::builder(config)
        .vector_store(Arc::new(store))
        .text_embedder(embedder.clone())
        .image_embedder(embedder)
        .access_control(Arc::new(access))
        .analytics(Arc::new(MetricsAnalytics::new()));
    if let Some(llm) = llm {
        builder = builder.llm(llm);
    }
    builder.build().unwrap()
}

fn engine() -> QueryEngine {
    engine_with(EngineConfig::default(), None)
}

/// Classification service that always answers with the same text.
struct Canned(&'static str);

impl LlmProvider for Canned {
    fn name(&self) -> &'static str {
        "canned"
    }

    fn complete(&self, _prompt: &str) -> modelscout::Result<String> {
        Ok(self.0.to_string())
    }
}

/// Classification service that is always down.
struct Down;

impl LlmProvider for Down {
    fn name(&self) -> &'static str {
        "down"
    }

    fn complete(&self, _prompt: &str) -> modelscout::Result<String> {
        Err(Error::external("canned", "connection refused"))
    }
}

// ============================================================================
// Worked examples
// ============================================================================

#[tokio::test]
async fn test_comparison_end_to_end() {
    let answer = engine()
        .answer("compare gpt-2 and bert on performance and architecture", None)
        .await;

    assert_eq!(answer.parsed.intent, Intent::Comparison);
    assert!(answer.response.success, "error: {:?}", answer.response.error);
    assert_eq!(answer.response.kind(), Some(SearchKind::Comparison));
    assert_eq!(answer.response.metadata.result_count, Some(2));

    let Some(Payload::Comparison { dimensions, results, .. }) = answer.response.payload() else {
        panic!("expected a comparison payload");
    };
    assert_eq!(dimensions, &vec!["performance", "architecture"]);
    assert!(results.summary.architecture.is_some());
}

#[tokio::test]
async fn test_image_search_end_to_end() {
    let answer = engine()
        .answer("find images generated by stable-diffusion with resolution 512x512", None)
        .await;

    assert_eq!(answer.parsed.intent, Intent::ImageSearch);
    assert!(answer.response.success, "error: {:?}", answer.response.error);
    let ids: Vec<&str> = answer.response.items().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["img-1"]);
}

#[tokio::test]
async fn test_access_control_by_user() {
    let engine = engine();

    let guest = engine.answer("show transformer metadata", Some("guest")).await;
    assert_eq!(guest.parsed.intent, Intent::Metadata);
    assert_eq!(guest.response.items().len(), 1);

    let lead = engine.answer("show transformer metadata", Some("lead")).await;
    assert_eq!(lead.response.items().len(), 2);
}

#[tokio::test]
async fn test_answer_serializes_without_identity() {
    let answer = engine().answer("tell me about bert", Some("lead")).await;
    let value = serde_json::to_value(&answer).unwrap();

    assert_eq!(value["query_id"], json!(answer.query_id));
    assert_eq!(value["response"]["success"], json!(true));
    assert_eq!(value["response"]["type"], json!("text_search"));
    assert!(value["response"]["metadata"]["parameters"].get("query_id").is_none());
    assert!(value["response"]["metadata"]["parameters"].get("user_id").is_none());
}

// ============================================================================
// Classification service
// ============================================================================

#[tokio::test]
async fn test_classification_service_decides_intent() {
    let engine = engine_with(
        EngineConfig::default().with_llm(true),
        Some(Arc::new(Canned("metadata"))),
    );
    let answer = engine.answer("find transformer models", None).await;

    assert_eq!(answer.parsed.intent, Intent::Metadata);
    assert_eq!(answer.parsed.source, DetectionSource::Llm);
    assert_eq!(answer.response.kind(), Some(SearchKind::MetadataSearch));
}

#[tokio::test]
async fn test_classification_service_ignored_when_disabled() {
    let engine = engine_with(EngineConfig::default(), Some(Arc::new(Canned("metadata"))));
    let answer = engine.answer("find images of lighthouses", None).await;

    assert_eq!(answer.parsed.intent, Intent::ImageSearch);
    assert_eq!(answer.parsed.source, DetectionSource::Rules);
}

#[tokio::test]
async fn test_classification_service_outage_degrades_to_rules() {
    let engine = engine_with(EngineConfig::default().with_llm(true), Some(Arc::new(Down)));
    let answer = engine
        .answer("compare gpt-2 and bert on performance", None)
        .await;

    assert_eq!(answer.parsed.intent, Intent::Comparison);
    assert_eq!(answer.parsed.source, DetectionSource::Rules);
    assert!(answer.response.success);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_file_drives_dispatch() {
    let file = write_temp(
        r#"
[dispatch]
text_limit = 1
scripts_collection = "model_scripts"
default_dimensions = ["performance"]

[logging]
level = "modelscout=debug"
format = "json"
"#,
    );
    let config = EngineConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.dispatch.text_limit, 1);
    assert_eq!(config.dispatch.default_dimensions, vec!["performance"]);
    assert_eq!(config.logging.level.as_deref(), Some("modelscout=debug"));
    assert_eq!(config.dispatch.image_limit, 20);
}

#[tokio::test]
async fn test_configured_limit_applies() {
    let config = EngineConfig::from_toml("[dispatch]\ntext_limit = 1\n").unwrap();
    let answer = engine_with(config, None).answer("tell me about transformers", None).await;

    assert!(answer.response.success);
    assert_eq!(answer.response.items().len(), 1);
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    let result = EngineConfig::load(Some(&missing));
    assert!(matches!(result, Err(Error::OperationFailed { .. })));
}

#[test]
fn test_invalid_catalog_is_a_parse_error() {
    let file = write_temp(r#"{"model_scripts": {"not": "a list"}}"#);
    let result = MemoryVectorStore::load_catalog(file.path(), &HashEmbedder::new());
    assert!(matches!(result, Err(Error::Parse { .. })));
}

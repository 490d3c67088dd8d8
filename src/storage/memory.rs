//! In-memory vector store.
//!
//! Brute-force cosine search over per-collection record lists, with the
//! same filter semantics a vector database applies to metadata.

use super::{BackendFilter, FilterOperator, GetRequest, SearchRequest, StoredRecord, VectorStore};
use crate::embedding::{HashEmbedder, cosine_similarity};
use crate::models::resolve_path;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

/// One record of a JSON catalog file.
///
/// ```json
/// {"id": "bert-base", "document": "class Bert...", "metadata": {"model_id": "bert"}}
/// ```
///
/// Without an explicit `embedding`, the loader embeds the document, or the
/// `prompt` metadata field for images, or the id.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    /// Record id.
    pub id: String,
    /// Document text.
    #[serde(default)]
    pub document: Option<String>,
    /// Record metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Precomputed embedding.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl CatalogEntry {
    fn embedding_text(&self) -> String {
        if let Some(document) = self.document.as_deref().filter(|d| !d.trim().is_empty()) {
            return document.to_string();
        }
        if let Some(Value::String(prompt)) = resolve_path(&self.metadata, "prompt") {
            return prompt.clone();
        }
        match resolve_path(&self.metadata, "model_id") {
            Some(Value::String(model_id)) => format!("{} {model_id}", self.id),
            _ => self.id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    embedding: Vec<f32>,
    metadata: Map<String, Value>,
    document: Option<String>,
}

/// Thread-safe in-memory [`VectorStore`].
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<Entry>>>,
}

impl MemoryVectorStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn upsert(
        &self,
        collection: &str,
        id: impl Into<String>,
        embedding: Vec<f32>,
        metadata: Map<String, Value>,
        document: Option<String>,
    ) -> Result<()> {
        let id = id.into();
        let mut collections = self.collections.write().map_err(|e| Error::OperationFailed {
            operation: "upsert".to_string(),
            cause: e.to_string(),
        })?;
        let entries = collections.entry(collection.to_string()).or_default();
        let entry = Entry {
            id: id.clone(),
            embedding,
            metadata,
            document,
        };
        match entries.iter_mut().find(|e| e.id == id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    /// Number of records in `collection`.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Builds a store from a JSON catalog mapping collection names to
    /// lists of [`CatalogEntry`].
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not have that shape.
    pub fn from_catalog(catalog: Value, embedder: &HashEmbedder) -> Result<Self> {
        let collections: HashMap<String, Vec<CatalogEntry>> = serde_json::from_value(catalog)
            .map_err(|e| Error::Parse {
                context: "catalog".to_string(),
                cause: e.to_string(),
            })?;

        let store = Self::new();
        for (collection, entries) in collections {
            let count = entries.len();
            for entry in entries {
                let embedding = match &entry.embedding {
                    Some(embedding) => embedding.clone(),
                    None => embedder.embed_sync(&entry.embedding_text()),
                };
                store.upsert(
                    &collection,
                    entry.id,
                    embedding,
                    entry.metadata,
                    entry.document,
                )?;
            }
            tracing::debug!(collection = %collection, count, "Loaded catalog collection");
        }
        Ok(store)
    }

    /// Reads a JSON catalog file. See [`MemoryVectorStore::from_catalog`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_catalog(path: &Path, embedder: &HashEmbedder) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: format!("read catalog {}", path.display()),
            cause: e.to_string(),
        })?;
        let catalog: Value = serde_json::from_str(&content).map_err(|e| Error::Parse {
            context: format!("catalog {}", path.display()),
            cause: e.to_string(),
        })?;
        Self::from_catalog(catalog, embedder)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Vec<Entry>>>> {
        self.collections.read().map_err(|e| Error::OperationFailed {
            operation: "read".to_string(),
            cause: e.to_string(),
        })
    }
}

fn unknown_collection(name: &str) -> Error {
    Error::MissingData(format!("collection '{name}' does not exist"))
}

fn to_record(entry: &Entry, score: Option<f32>, include: super::Include) -> StoredRecord {
    StoredRecord {
        id: entry.id.clone(),
        score,
        metadata: if include.metadatas {
            entry.metadata.clone()
        } else {
            Map::new()
        },
        document: if include.documents {
            entry.document.clone()
        } else {
            None
        },
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn search(&self, request: SearchRequest) -> Result<Vec<StoredRecord>> {
        let collections = self.read()?;
        let entries = collections
            .get(&request.collection)
            .ok_or_else(|| unknown_collection(&request.collection))?;

        let mut scored: Vec<(f32, &Entry)> = entries
            .iter()
            .filter(|e| matches(&request.filter, &e.metadata))
            .map(|e| (cosine_similarity(&request.embedding, &e.embedding), e))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(request.limit)
            .map(|(score, e)| to_record(e, Some(score), request.include))
            .collect())
    }

    async fn get(&self, request: GetRequest) -> Result<Vec<StoredRecord>> {
        let collections = self.read()?;
        let entries = collections
            .get(&request.collection)
            .ok_or_else(|| unknown_collection(&request.collection))?;

        Ok(entries
            .iter()
            .filter(|e| {
                request
                    .ids
                    .as_ref()
                    .is_none_or(|ids| ids.iter().any(|id| *id == e.id))
            })
            .filter(|e| matches(&request.filter, &e.metadata))
            .take(request.limit.unwrap_or(usize::MAX))
            .map(|e| to_record(e, None, request.include))
            .collect())
    }
}

/// Returns true if `metadata` satisfies every constraint in `filter`.
#[must_use]
pub fn matches(filter: &BackendFilter, metadata: &Map<String, Value>) -> bool {
    filter.iter().all(|(field, ops)| {
        let actual = resolve_path(metadata, field);
        ops.iter()
            .all(|(op, expected)| satisfies(actual, *op, expected))
    })
}

fn satisfies(actual: Option<&Value>, op: FilterOperator, expected: &Value) -> bool {
    match op {
        FilterOperator::Eq => actual.is_some_and(|a| loose_eq(a, expected)),
        FilterOperator::Ne => !actual.is_some_and(|a| loose_eq(a, expected)),
        FilterOperator::Gt => compare(actual, expected).is_some_and(Ordering::is_gt),
        FilterOperator::Gte => compare(actual, expected).is_some_and(Ordering::is_ge),
        FilterOperator::Lt => compare(actual, expected).is_some_and(Ordering::is_lt),
        FilterOperator::Lte => compare(actual, expected).is_some_and(Ordering::is_le),
        FilterOperator::In => actual.is_some_and(|a| member(a, expected)),
        FilterOperator::Nin => !actual.is_some_and(|a| member(a, expected)),
        FilterOperator::Contains => actual.is_some_and(|a| contains(a, expected)),
    }
}

/// Equality with numbers compared by value and strings case-insensitively.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => x.eq_ignore_ascii_case(y),
        _ => a == b,
    }
}

fn compare(actual: Option<&Value>, expected: &Value) -> Option<Ordering> {
    match (actual?, expected) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::Number(y)) => x.trim().parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.as_str().cmp(y.as_str())),
        _ => None,
    }
}

/// `$in`: the value (or any element of an array value) is listed.
fn member(actual: &Value, expected: &Value) -> bool {
    let Value::Array(options) = expected else {
        return loose_eq(actual, expected);
    };
    match actual {
        Value::Array(values) => values
            .iter()
            .any(|v| options.iter().any(|o| loose_eq(v, o))),
        _ => options.iter().any(|o| loose_eq(actual, o)),
    }
}

fn contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(haystack), Value::String(needle)) => haystack
            .to_lowercase()
            .contains(&needle.to_lowercase()),
        (Value::Array(values), _) => values.iter().any(|v| loose_eq(v, expected)),
        _ => false,
    }
}

//! Vector database collaborator.
//!
//! The engine talks to the catalog through [`VectorStore`]: similarity
//! `search` over an embedding and metadata `get` by id or filter. Filters
//! arrive already translated into a [`BackendFilter`] (see [`filter`]).
//! [`MemoryVectorStore`] is the in-process implementation used by the CLI
//! and tests.

// Allow cast precision loss for score calculations where exact precision is not critical.
#![allow(clippy::cast_precision_loss)]
// Lock guards are held for the duration of a scan.
#![allow(clippy::significant_drop_tightening)]

pub mod filter;
mod memory;

pub use filter::{BackendFilter, FilterOperator, translate, translate_map};
pub use memory::{CatalogEntry, MemoryVectorStore};

use crate::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Which optional fields a store should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Include {
    /// Return record metadata.
    pub metadatas: bool,
    /// Return record documents.
    pub documents: bool,
}

impl Include {
    /// Metadata and documents.
    pub const ALL: Self = Self {
        metadatas: true,
        documents: true,
    };

    /// Metadata only.
    pub const METADATAS: Self = Self {
        metadatas: true,
        documents: false,
    };
}

impl Default for Include {
    fn default() -> Self {
        Self::METADATAS
    }
}

/// Similarity search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Collection to search.
    pub collection: String,
    /// Query embedding.
    pub embedding: Vec<f32>,
    /// Metadata constraints.
    pub filter: BackendFilter,
    /// Maximum number of records.
    pub limit: usize,
    /// Fields to return.
    pub include: Include,
}

impl SearchRequest {
    /// Creates a request with no filter, metadata only.
    #[must_use]
    pub fn new(collection: impl Into<String>, embedding: Vec<f32>, limit: usize) -> Self {
        Self {
            collection: collection.into(),
            embedding,
            filter: BackendFilter::new(),
            limit,
            include: Include::default(),
        }
    }

    /// Sets the filter.
    #[must_use]
    pub fn with_filter(mut self, filter: BackendFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the included fields.
    #[must_use]
    pub const fn with_include(mut self, include: Include) -> Self {
        self.include = include;
        self
    }
}

/// Metadata fetch request. With `ids` set, only those records are
/// considered; the filter still applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetRequest {
    /// Collection to read.
    pub collection: String,
    /// Restrict to these record ids.
    pub ids: Option<Vec<String>>,
    /// Metadata constraints.
    pub filter: BackendFilter,
    /// Maximum number of records.
    pub limit: Option<usize>,
    /// Fields to return.
    pub include: Include,
}

impl GetRequest {
    /// Creates an unrestricted fetch.
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// Restricts to the given ids.
    #[must_use]
    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Sets the filter.
    #[must_use]
    pub fn with_filter(mut self, filter: BackendFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A record returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Record id.
    pub id: String,
    /// Similarity score, higher is closer. Absent for `get`.
    pub score: Option<f32>,
    /// Metadata, empty unless requested.
    pub metadata: Map<String, Value>,
    /// Document text, if requested and stored.
    pub document: Option<String>,
}

/// Vector database operations the dispatcher relies on.
///
/// Implementations must be safe to call concurrently; the comparison handler
/// issues one `get` per model in parallel.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Returns the records closest to `request.embedding`, best first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or the collection is
    /// unknown.
    async fn search(&self, request: SearchRequest) -> Result<Vec<StoredRecord>>;

    /// Returns records matching ids and filter, in storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or the collection is
    /// unknown.
    async fn get(&self, request: GetRequest) -> Result<Vec<StoredRecord>>;
}

//! Vector store seam
//!
//! Provides:
//! - The narrow `VectorStore` trait every backend implements directly
//! - Search requests and nearest-neighbour variants
//! - Metadata filters (equality, membership, numeric range)
//! - An in-process `MemoryStore` backend

mod filter;
mod memory;

pub use filter::Filter;
pub use memory::MemoryStore;

use crate::document::{Document, SearchHit};
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// Nearest-neighbour variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// Top-k by similarity, unscored
    Similarity,
    /// Top-k by similarity with relevance >= threshold, scored
    SimilarityScoreThreshold { score_threshold: f64 },
    /// Maximal marginal relevance over `fetch_k` candidates, unscored
    Mmr { fetch_k: usize, lambda_mult: f64 },
}

impl SearchType {
    pub fn name(&self) -> &'static str {
        match self {
            SearchType::Similarity => "similarity",
            SearchType::SimilarityScoreThreshold { .. } => "similarity_score_threshold",
            SearchType::Mmr { .. } => "mmr",
        }
    }
}

/// One sub-query sent to a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub search_type: SearchType,
    pub k: usize,
    pub filter: Option<Filter>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, search_type: SearchType, k: usize) -> Self {
        Self {
            query: query.into(),
            search_type,
            k,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Same parameters, different query text
    pub fn for_query(&self, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..self.clone()
        }
    }
}

/// Common trait for all vector store backends
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Run one query; hit shape follows `request.search_type`
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>>;

    /// Fetch every document matching `filter`, unscored
    async fn get_by_filter(&self, filter: &Filter) -> Result<Vec<Document>>;

    /// Delete every document matching `filter`, returning what was removed
    async fn delete_by_filter(&self, filter: &Filter) -> Result<Vec<Document>>;

    /// Add documents, returning their ids
    async fn add(&self, documents: Vec<Document>) -> Result<Vec<String>>;

    /// Delete every chunk belonging to the named files
    async fn delete_by_file_names(
        &self,
        file_name_key: &str,
        file_names: &[String],
    ) -> Result<Vec<Document>> {
        if file_names.is_empty() {
            return Ok(Vec::new());
        }
        self.delete_by_filter(&Filter::is_in(file_name_key, file_names))
            .await
    }

    /// Replace every file present in `documents`: delete its chunks, then add.
    ///
    /// A failed add puts the deleted chunks back before returning the error.
    async fn upsert(
        &self,
        file_name_key: &str,
        documents: Vec<Document>,
    ) -> Result<(Vec<Document>, Vec<String>)> {
        let file_names: Vec<String> = documents
            .iter()
            .filter_map(|doc| doc.meta(file_name_key).and_then(|v| v.as_str()))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let deleted = self.delete_by_file_names(file_name_key, &file_names).await?;
        match self.add(documents).await {
            Ok(added) => Ok((deleted, added)),
            Err(err) => {
                warn!(
                    files = file_names.len(),
                    error = %err,
                    "Upsert failed, restoring deleted chunks"
                );
                self.add(deleted).await?;
                Err(err)
            }
        }
    }
}

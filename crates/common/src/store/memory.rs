//! In-process vector store
//!
//! Keeps documents and their embeddings in memory behind a `RwLock`.
//! Used for ephemeral collections and as the reference backend in tests.

use super::{Filter, SearchRequest, SearchType, VectorStore};
use crate::document::{Document, SearchHit};
use crate::embeddings::{cosine_distance_relevance, cosine_similarity, Embedder};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

struct StoredRecord {
    document: Document,
    embedding: Vec<f32>,
}

/// Candidate scored against the query
struct Candidate<'a> {
    record: &'a StoredRecord,
    similarity: f64,
}

/// Memory-backed vector store
pub struct MemoryStore {
    name: String,
    embedder: Arc<dyn Embedder>,
    records: RwLock<Vec<StoredRecord>>,
}

impl MemoryStore {
    /// Create an empty collection
    pub fn new(name: impl Into<String>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            name: name.into(),
            embedder,
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Rank matching records by similarity, best first; ties keep insertion order
    fn rank<'a>(
        records: &'a [StoredRecord],
        query: &[f32],
        filter: Option<&Filter>,
    ) -> Vec<Candidate<'a>> {
        let mut candidates: Vec<Candidate<'a>> = records
            .iter()
            .filter(|record| filter.map_or(true, |f| f.matches(&record.document.metadata)))
            .map(|record| Candidate {
                record,
                similarity: cosine_similarity(query, &record.embedding),
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        candidates
    }

    /// Greedy maximal marginal relevance selection
    fn select_mmr<'a>(
        candidates: Vec<Candidate<'a>>,
        k: usize,
        lambda_mult: f64,
    ) -> Vec<Candidate<'a>> {
        let mut remaining = candidates;
        let mut selected: Vec<Candidate<'a>> = Vec::with_capacity(k.min(remaining.len()));

        while selected.len() < k && !remaining.is_empty() {
            let mut best_index = 0;
            let mut best_score = f64::NEG_INFINITY;

            for (index, candidate) in remaining.iter().enumerate() {
                let redundancy = selected
                    .iter()
                    .map(|chosen| {
                        cosine_similarity(&candidate.record.embedding, &chosen.record.embedding)
                    })
                    .fold(f64::NEG_INFINITY, f64::max);
                let redundancy = if selected.is_empty() { 0.0 } else { redundancy };

                let score = lambda_mult * candidate.similarity - (1.0 - lambda_mult) * redundancy;
                if score > best_score {
                    best_score = score;
                    best_index = index;
                }
            }

            selected.push(remaining.remove(best_index));
        }

        selected
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let query = self.embedder.embed(&request.query).await?;
        let records = self.records.read().await;
        let ranked = Self::rank(&records, &query, request.filter.as_ref());

        let hits: Vec<SearchHit> = match request.search_type {
            SearchType::Similarity => ranked
                .into_iter()
                .take(request.k)
                .map(|c| SearchHit::Plain(c.record.document.clone()))
                .collect(),
            SearchType::SimilarityScoreThreshold { score_threshold } => ranked
                .into_iter()
                .take(request.k)
                .map(|c| {
                    let relevance = cosine_distance_relevance(1.0 - c.similarity);
                    (c, relevance)
                })
                .filter(|(_, relevance)| *relevance >= score_threshold)
                .map(|(c, relevance)| SearchHit::Scored(c.record.document.clone(), relevance))
                .collect(),
            SearchType::Mmr { fetch_k, lambda_mult } => {
                let pool: Vec<Candidate<'_>> =
                    ranked.into_iter().take(fetch_k.max(request.k)).collect();
                Self::select_mmr(pool, request.k, lambda_mult)
                    .into_iter()
                    .map(|c| SearchHit::Plain(c.record.document.clone()))
                    .collect()
            }
        };

        debug!(
            collection = %self.name,
            search_type = request.search_type.name(),
            k = request.k,
            hits = hits.len(),
            "Memory store search"
        );

        Ok(hits)
    }

    async fn get_by_filter(&self, filter: &Filter) -> Result<Vec<Document>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|record| filter.matches(&record.document.metadata))
            .map(|record| record.document.clone())
            .collect())
    }

    async fn delete_by_filter(&self, filter: &Filter) -> Result<Vec<Document>> {
        let mut records = self.records.write().await;
        let (deleted, kept): (Vec<StoredRecord>, Vec<StoredRecord>) = records
            .drain(..)
            .partition(|record| filter.matches(&record.document.metadata));
        *records = kept;

        debug!(collection = %self.name, deleted = deleted.len(), "Deleted documents");
        Ok(deleted.into_iter().map(|record| record.document).collect())
    }

    async fn add(&self, documents: Vec<Document>) -> Result<Vec<String>> {
        let texts: Vec<String> = documents.iter().map(|doc| doc.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(AppError::Backend {
                message: format!(
                    "embedder '{}' returned {} embeddings for {} documents",
                    self.embedder.model_name(),
                    embeddings.len(),
                    documents.len()
                ),
            });
        }

        let mut records = self.records.write().await;
        let mut known: HashSet<String> = records
            .iter()
            .map(|record| record.document.id.clone())
            .collect();
        let mut batch = Vec::with_capacity(documents.len());

        // Validate the whole batch before committing any of it
        for (mut document, embedding) in documents.into_iter().zip(embeddings) {
            if document.id.is_empty() {
                document.id = Uuid::new_v4().to_string();
            }
            if !known.insert(document.id.clone()) {
                return Err(AppError::validation(
                    "id",
                    format!("document '{}' already exists in '{}'", document.id, self.name),
                ));
            }
            batch.push(StoredRecord { document, embedding });
        }

        let ids: Vec<String> = batch.iter().map(|record| record.document.id.clone()).collect();
        records.extend(batch);

        debug!(collection = %self.name, added = ids.len(), "Added documents");
        Ok(ids)
    }
}

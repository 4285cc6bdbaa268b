//! Concurrent sub-query fan-out against one collection

use super::flat::FlatResultMerger;
use futures::future::try_join_all;
use mosaic_common::document::SearchHit;
use mosaic_common::errors::{AppError, Result};
use mosaic_common::metrics;
use mosaic_common::store::{SearchRequest, VectorStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Reject an empty or oversized batch of sub-queries
pub fn validate_queries(queries: &[String], max_subqueries: usize) -> Result<()> {
    if queries.len() > max_subqueries {
        return Err(AppError::TooManySubqueries {
            count: queries.len(),
            limit: max_subqueries,
        });
    }
    if queries.iter().any(|q| q.trim().is_empty()) {
        return Err(AppError::validation("queries", "sub-queries must not be blank"));
    }
    Ok(())
}

/// Runs every sub-query against one store concurrently
pub struct MultiQuerySearch {
    store: Arc<dyn VectorStore>,
    max_subqueries: usize,
    merger: FlatResultMerger,
}

impl MultiQuerySearch {
    pub fn new(store: Arc<dyn VectorStore>, max_subqueries: usize) -> Self {
        Self {
            store,
            max_subqueries,
            merger: FlatResultMerger::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// One hit list per query, in query order.
    ///
    /// `template` supplies search type, `k` and filter; its query text is
    /// replaced by each sub-query. Any failing sub-query fails the batch.
    pub async fn search(
        &self,
        queries: &[String],
        template: &SearchRequest,
    ) -> Result<Vec<Vec<SearchHit>>> {
        validate_queries(queries, self.max_subqueries)?;
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let requests: Vec<SearchRequest> = queries
            .iter()
            .map(|q| template.for_query(q.as_str()))
            .collect();
        let per_query =
            try_join_all(requests.iter().map(|request| self.store.search(request))).await?;

        let result_count: usize = per_query.iter().map(Vec::len).sum();
        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_search(elapsed, template.search_type.name(), queries.len(), result_count);

        info!(
            queries = queries.len(),
            search_type = template.search_type.name(),
            k = template.k,
            results = result_count,
            duration_ms = elapsed * 1000.0,
            "Multi-query search complete"
        );

        Ok(per_query)
    }

    /// Search, then flat-merge every sub-query's hits into one list
    pub async fn search_merged(
        &self,
        queries: &[String],
        template: &SearchRequest,
    ) -> Result<Vec<SearchHit>> {
        let per_query = self.search(queries, template).await?;
        let merged = self.merger.merge(per_query)?;
        debug!(merged = merged.len(), "Sub-query results merged");
        Ok(merged)
    }
}

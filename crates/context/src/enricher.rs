//! Context enrichment over a chunk collection
//!
//! Search hits are folded into one span per group, each span is widened
//! to a context window, the window's chunks are fetched by a position
//! range filter and stitched back into a single passage per group.

use crate::stitcher::ChunkStitcher;
use crate::window::ConsolidatedGroup;
use futures::future::try_join_all;
use mosaic_common::config::GroupingConfig;
use mosaic_common::document::{Chunk, GroupKey, SearchHit};
use mosaic_common::errors::Result;
use mosaic_common::metrics;
use mosaic_common::store::{Filter, SearchRequest, VectorStore};
use mosaic_search::{FlatResultMerger, MultiQuerySearch};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Fold hits into per-group position spans, in first-seen group order.
///
/// Hits without grouping metadata cannot be windowed and are skipped.
pub fn collect_groups(
    hits: &[SearchHit],
    grouping: &GroupingConfig,
) -> Result<Vec<ConsolidatedGroup>> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<ConsolidatedGroup> = Vec::new();

    for hit in hits {
        let Some(chunk) = Chunk::from_document(hit.document(), grouping)? else {
            debug!(id = hit.id(), "Hit has no grouping metadata, skipping enrichment");
            continue;
        };
        match index.get(&chunk.group_key) {
            Some(&slot) => groups[slot].absorb(&chunk),
            None => {
                index.insert(chunk.group_key.clone(), groups.len());
                groups.push(ConsolidatedGroup::from_chunk(&chunk));
            }
        }
    }

    Ok(groups)
}

/// Enriched search over one chunk collection
pub struct ContextEnricher {
    search: MultiQuerySearch,
    grouping: GroupingConfig,
    merger: FlatResultMerger,
    stitcher: ChunkStitcher,
}

impl ContextEnricher {
    pub fn new(
        store: Arc<dyn VectorStore>,
        grouping: GroupingConfig,
        max_subqueries: usize,
    ) -> Self {
        Self {
            search: MultiQuerySearch::new(store, max_subqueries),
            grouping,
            merger: FlatResultMerger::new(),
            stitcher: ChunkStitcher::new(),
        }
    }

    /// Stitched passages, one per group touched by the search.
    ///
    /// With `merge_results` every sub-query's hits are merged first and a
    /// single list comes back; otherwise there is one list per query.
    /// Scores play no part in enrichment and are dropped up front.
    pub async fn enriched_search(
        &self,
        queries: &[String],
        window_size: usize,
        merge_results: bool,
        template: &SearchRequest,
    ) -> Result<Vec<Vec<String>>> {
        let start = Instant::now();
        let per_query: Vec<Vec<SearchHit>> = self
            .search
            .search(queries, template)
            .await?
            .into_iter()
            .map(|hits| {
                hits.into_iter()
                    .map(|hit| SearchHit::Plain(hit.into_document()))
                    .collect()
            })
            .collect();

        if per_query.iter().all(Vec::is_empty) {
            return Ok(Vec::new());
        }

        let lists = if merge_results {
            vec![self.merger.merge(per_query)?]
        } else {
            per_query
        };

        let mut output = Vec::with_capacity(lists.len());
        let mut windows = 0;
        for hits in &lists {
            let passages = self.enrich_list(hits, window_size).await?;
            windows += passages.len();
            output.push(passages);
        }

        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_enrichment(elapsed, windows);
        info!(
            queries = queries.len(),
            lists = output.len(),
            windows,
            window_size,
            duration_ms = elapsed * 1000.0,
            "Context enrichment complete"
        );

        Ok(output)
    }

    async fn enrich_list(&self, hits: &[SearchHit], window_size: usize) -> Result<Vec<String>> {
        let groups = collect_groups(hits, &self.grouping)?;
        try_join_all(groups.iter().map(|group| self.enrich_group(group, window_size))).await
    }

    async fn enrich_group(&self, group: &ConsolidatedGroup, window_size: usize) -> Result<String> {
        let (start, end) = group.window(window_size)?;
        let filter = group
            .group_key
            .to_filter()
            .and(Filter::between(self.grouping.position_key.as_str(), start as f64, end as f64));

        let documents = self.search.store().get_by_filter(&filter).await?;
        let mut chunks = Vec::with_capacity(documents.len());
        for document in &documents {
            if let Some(chunk) = Chunk::from_document(document, &self.grouping)? {
                chunks.push(chunk);
            }
        }

        debug!(
            min_position = group.min_position,
            max_position = group.max_position,
            start,
            end,
            fetched = chunks.len(),
            "Fetched context window"
        );

        Ok(self.stitcher.stitch(&chunks))
    }
}

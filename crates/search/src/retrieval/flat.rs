//! Flat consolidation of multi-query results
//!
//! Unscored hits are deduplicated by id in first-seen order. Scored hits
//! are collapsed per id to the first-seen document and the arithmetic
//! mean of every score the id received across all sub-queries.

use super::ordered::{mean, InsertionOrderMap};
use mosaic_common::document::{Document, HitShape, SearchHit};
use mosaic_common::errors::{AppError, Result};
use mosaic_common::metrics;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

struct ScoredEntry {
    document: Document,
    scores: Vec<f64>,
}

/// Merges per-query hit lists against a single collection
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatResultMerger;

impl FlatResultMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge hit lists from several sub-queries.
    ///
    /// The first non-empty list decides the shape; a hit of the other shape
    /// anywhere in the input is a `ShapeMismatch`. Output keeps first-seen
    /// order, not score order.
    pub fn merge(&self, per_query: Vec<Vec<SearchHit>>) -> Result<Vec<SearchHit>> {
        let Some(shape) = per_query
            .iter()
            .find_map(|hits| hits.first())
            .map(SearchHit::shape)
        else {
            return Ok(Vec::new());
        };

        for (query_index, hits) in per_query.iter().enumerate() {
            if let Some(odd) = hits.iter().find(|hit| hit.shape() != shape) {
                return Err(AppError::ShapeMismatch {
                    query_index,
                    expected: shape.as_str(),
                    found: odd.shape().as_str(),
                });
            }
        }

        let inputs: usize = per_query.iter().map(Vec::len).sum();
        let merged = match shape {
            HitShape::Plain => Self::dedup(per_query),
            HitShape::Scored => Self::average(per_query),
        };

        debug!(
            shape = shape.as_str(),
            inputs,
            outputs = merged.len(),
            "Merged multi-query results"
        );
        metrics::record_consolidation("flat", inputs, merged.len());

        Ok(merged)
    }

    fn dedup(per_query: Vec<Vec<SearchHit>>) -> Vec<SearchHit> {
        let mut seen: HashSet<String> = HashSet::new();
        per_query
            .into_iter()
            .flatten()
            .filter(|hit| seen.insert(hit.id().to_string()))
            .collect()
    }

    fn average(per_query: Vec<Vec<SearchHit>>) -> Vec<SearchHit> {
        let mut entries: InsertionOrderMap<ScoredEntry> = InsertionOrderMap::default();

        for hit in per_query.into_iter().flatten() {
            let SearchHit::Scored(document, score) = hit else {
                continue;
            };
            let id = document.id.clone();
            entries
                .get_or_insert_with(&id, || ScoredEntry {
                    document,
                    scores: Vec::new(),
                })
                .scores
                .push(score);
        }

        entries
            .into_values()
            .into_iter()
            .map(|entry| SearchHit::Scored(entry.document, mean(&entry.scores)))
            .collect()
    }
}

/// Stable sort, best score first; unscored hits keep their order at the end
pub fn sort_by_score(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| match (a.score(), b.score()) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

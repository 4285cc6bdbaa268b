//! Two-level consolidation for parent entities carrying scored children
//!
//! Provides:
//! - Per-query input types (`ScoredEntity`, `ParentWithChildren`)
//! - Output types with ids removed (`RankedEntity`, `MergedParent`)
//! - `HierarchicalResultMerger` to average parents and children across sub-queries
//! - `strip_ids` for callers that keep sub-query results separate

use super::ordered::{mean, InsertionOrderMap};
use mosaic_common::metrics;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Entity as returned by one sub-query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntity {
    pub id: String,
    pub content: String,
    pub score: f64,
}

impl ScoredEntity {
    pub fn new(id: impl Into<String>, content: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            score,
        }
    }

    fn ranked(self) -> RankedEntity {
        RankedEntity {
            content: self.content,
            score: self.score,
        }
    }
}

/// Parent hit with the children found for it in the same sub-query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentWithChildren {
    pub parent: ScoredEntity,
    pub children: Vec<ScoredEntity>,
}

/// Entity in consolidated output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntity {
    pub content: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedParent {
    pub parent: RankedEntity,
    pub children: Vec<RankedEntity>,
}

struct Accumulated {
    content: String,
    scores: Vec<f64>,
}

impl Accumulated {
    fn seed(content: String) -> Self {
        Self {
            content,
            scores: Vec::new(),
        }
    }

    fn ranked(self) -> RankedEntity {
        RankedEntity {
            score: mean(&self.scores),
            content: self.content,
        }
    }
}

struct ParentEntry {
    parent: Accumulated,
    children: InsertionOrderMap<Accumulated>,
}

/// Merges parent/child results across sub-queries
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalResultMerger;

impl HierarchicalResultMerger {
    pub fn new() -> Self {
        Self
    }

    /// Average every parent and child over the occurrences it appeared in.
    ///
    /// Parents left without children are dropped. Parents are ordered by
    /// averaged score, best first, and so are the children of each parent.
    /// Ties keep first-seen order.
    pub fn merge(&self, per_query: Vec<Vec<ParentWithChildren>>) -> Vec<MergedParent> {
        let inputs: usize = per_query.iter().map(Vec::len).sum();
        let mut parents: InsertionOrderMap<ParentEntry> = InsertionOrderMap::default();

        for occurrence in per_query.into_iter().flatten() {
            let ParentWithChildren { parent, children } = occurrence;
            let entry = parents.get_or_insert_with(&parent.id, || ParentEntry {
                parent: Accumulated::seed(parent.content),
                children: InsertionOrderMap::default(),
            });
            entry.parent.scores.push(parent.score);

            for child in children {
                entry
                    .children
                    .get_or_insert_with(&child.id, || Accumulated::seed(child.content))
                    .scores
                    .push(child.score);
            }
        }

        let mut merged: Vec<MergedParent> = parents
            .into_values()
            .into_iter()
            .filter(|entry| !entry.children.is_empty())
            .map(|entry| {
                let mut children: Vec<RankedEntity> = entry
                    .children
                    .into_values()
                    .into_iter()
                    .map(Accumulated::ranked)
                    .collect();
                children.sort_by(by_score_desc);
                MergedParent {
                    parent: entry.parent.ranked(),
                    children,
                }
            })
            .collect();
        merged.sort_by(|a, b| by_score_desc(&a.parent, &b.parent));

        debug!(inputs, outputs = merged.len(), "Merged hierarchical results");
        metrics::record_consolidation("hierarchical", inputs, merged.len());

        merged
    }
}

/// Drop ids from per-query results without merging across queries
pub fn strip_ids(per_query: Vec<Vec<ParentWithChildren>>) -> Vec<Vec<MergedParent>> {
    per_query
        .into_iter()
        .map(|parents| {
            parents
                .into_iter()
                .map(|item| MergedParent {
                    parent: item.parent.ranked(),
                    children: item.children.into_iter().map(ScoredEntity::ranked).collect(),
                })
                .collect()
        })
        .collect()
}

fn by_score_desc(a: &RankedEntity, b: &RankedEntity) -> Ordering {
    b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
}

//! Externally-facing records rendered from search hits

use super::{Metadata, SearchHit};
use serde::{Deserialize, Serialize};

/// Which fields to emit when rendering hits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFields {
    pub id: bool,
    pub content: bool,
    pub metadata: bool,
    pub score: bool,
}

impl Default for RecordFields {
    fn default() -> Self {
        Self {
            id: true,
            content: true,
            metadata: true,
            score: true,
        }
    }
}

impl RecordFields {
    /// Content and score only: ids stay internal once consolidation is final
    pub fn external() -> Self {
        Self {
            id: false,
            content: true,
            metadata: false,
            score: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl ResultRecord {
    fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.content.is_none()
            && self.metadata.is_none()
            && self.score.is_none()
    }
}

/// Render hits as records, skipping empty fields and records left with nothing
pub fn to_records(hits: &[SearchHit], fields: RecordFields) -> Vec<ResultRecord> {
    hits.iter()
        .map(|hit| {
            let doc = hit.document();
            ResultRecord {
                id: (fields.id && !doc.id.is_empty()).then(|| doc.id.clone()),
                content: (fields.content && !doc.content.is_empty()).then(|| doc.content.clone()),
                metadata: (fields.metadata && !doc.metadata.is_empty())
                    .then(|| doc.metadata.clone()),
                score: if fields.score { hit.score() } else { None },
            }
        })
        .filter(|record| !record.is_empty())
        .collect()
}

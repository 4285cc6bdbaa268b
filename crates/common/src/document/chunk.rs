//! Chunks: documents that know their place within a group

use super::{Document, Metadata, MetadataValue};
use crate::config::GroupingConfig;
use crate::errors::{AppError, Result};
use crate::store::Filter;
use serde::Serialize;
use std::collections::HashMap;

/// Canonical grouping key: sorted `(attribute, value)` pairs minus excluded keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct GroupKey(Vec<(String, MetadataValue)>);

impl GroupKey {
    pub fn from_metadata(metadata: &Metadata, excluded_keys: &[String]) -> Self {
        // BTreeMap iteration is already key-ordered
        let pairs = metadata
            .iter()
            .filter(|(key, _)| !excluded_keys.iter().any(|excluded| excluded == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self(pairs)
    }

    pub fn pairs(&self) -> &[(String, MetadataValue)] {
        &self.0
    }

    /// Equality filter on every attribute of the key
    pub fn to_filter(&self) -> Filter {
        Filter::And(
            self.0
                .iter()
                .map(|(key, value)| Filter::eq(key.clone(), value.clone()))
                .collect(),
        )
    }
}

/// A document fragment tagged with its position inside a group
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub group_key: GroupKey,
    pub position: usize,
    pub group_size: usize,
    pub declared_overlap: usize,
}

fn read_count(doc: &Document, key: &str) -> Result<Option<usize>> {
    match doc.meta(key) {
        None => Ok(None),
        Some(value) => value.as_usize().map(Some).ok_or_else(|| AppError::InvalidMetadata {
            id: doc.id.clone(),
            key: key.to_string(),
            reason: format!("expected a non-negative integer, got {value:?}"),
        }),
    }
}

impl Chunk {
    /// Extract chunk coordinates from a document's metadata.
    ///
    /// Returns `Ok(None)` when position or group size is absent: such a
    /// document is an ungroupable singleton. Present but malformed values
    /// are an error.
    pub fn from_document(doc: &Document, grouping: &GroupingConfig) -> Result<Option<Self>> {
        let position = read_count(doc, &grouping.position_key)?;
        let group_size = read_count(doc, &grouping.group_size_key)?;
        let (Some(position), Some(group_size)) = (position, group_size) else {
            return Ok(None);
        };
        let declared_overlap = read_count(doc, &grouping.overlap_key)?.unwrap_or(0);

        Ok(Some(Self {
            id: doc.id.clone(),
            text: doc.content.clone(),
            group_key: GroupKey::from_metadata(&doc.metadata, &grouping.excluded_keys),
            position,
            group_size,
            declared_overlap,
        }))
    }
}

/// Tag documents with position, group size and overlap.
///
/// Documents sharing the same values for `group_attrs` form one group;
/// positions follow input order within each group. A missing attribute
/// counts as its own value.
pub fn tag_chunks(
    documents: Vec<Document>,
    group_attrs: &[String],
    overlap: usize,
    grouping: &GroupingConfig,
) -> Vec<Document> {
    let combination = |doc: &Document| -> Vec<Option<MetadataValue>> {
        group_attrs.iter().map(|attr| doc.meta(attr).cloned()).collect()
    };

    let mut totals: HashMap<Vec<Option<MetadataValue>>, usize> = HashMap::new();
    for doc in &documents {
        *totals.entry(combination(doc)).or_default() += 1;
    }

    let mut next_position: HashMap<Vec<Option<MetadataValue>>, usize> = HashMap::new();
    documents
        .into_iter()
        .map(|mut doc| {
            let key = combination(&doc);
            let position = next_position.entry(key.clone()).or_default();
            let total = totals.get(&key).copied().unwrap_or(0);

            doc.metadata.insert(grouping.position_key.clone(), (*position).into());
            doc.metadata.insert(grouping.group_size_key.clone(), total.into());
            doc.metadata.insert(grouping.overlap_key.clone(), overlap.into());
            *position += 1;
            doc
        })
        .collect()
}

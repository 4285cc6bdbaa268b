//! Documents as they travel between the vector store and the consolidation engine
//!
//! Provides:
//! - Typed metadata values with canonical equality and hashing
//! - Plain and scored search hits as one tagged enum
//! - Chunk extraction and grouping keys
//! - Externally-facing result records

mod chunk;
mod record;

pub use chunk::{tag_chunks, Chunk, GroupKey};
pub use record::{to_records, RecordFields, ResultRecord};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Metadata attached to every stored document, ordered by key
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A single metadata value
///
/// Floats compare and hash by bit pattern so values can be part of a
/// grouping key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetadataValue {
    /// Integer view; floats qualify only when they carry no fraction
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(v) => Some(*v),
            MetadataValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|v| usize::try_from(v).ok())
    }

    /// Numeric view used by range filters
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Int(v) => Some(*v as f64),
            MetadataValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for MetadataValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MetadataValue::Bool(a), MetadataValue::Bool(b)) => a == b,
            (MetadataValue::Int(a), MetadataValue::Int(b)) => a == b,
            (MetadataValue::Float(a), MetadataValue::Float(b)) => a.to_bits() == b.to_bits(),
            (MetadataValue::Str(a), MetadataValue::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for MetadataValue {}

impl Hash for MetadataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            MetadataValue::Bool(v) => v.hash(state),
            MetadataValue::Int(v) => v.hash(state),
            MetadataValue::Float(v) => v.to_bits().hash(state),
            MetadataValue::Str(v) => v.hash(state),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Str(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Str(value)
    }
}

impl From<&String> for MetadataValue {
    fn from(value: &String) -> Self {
        MetadataValue::Str(value.clone())
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        MetadataValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

/// A stored text fragment and its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned identifier; empty until the store assigns one
    #[serde(default)]
    pub id: String,

    pub content: String,

    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Builder-style metadata insertion
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }
}

/// Which shape a search hit has
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitShape {
    Plain,
    Scored,
}

impl HitShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            HitShape::Plain => "plain",
            HitShape::Scored => "scored",
        }
    }
}

/// One item returned by the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchHit {
    /// Unscored document (similarity / MMR search)
    Plain(Document),
    /// Document with a normalised relevance score in [0, 1]
    Scored(Document, f64),
}

impl SearchHit {
    pub fn document(&self) -> &Document {
        match self {
            SearchHit::Plain(doc) | SearchHit::Scored(doc, _) => doc,
        }
    }

    pub fn into_document(self) -> Document {
        match self {
            SearchHit::Plain(doc) | SearchHit::Scored(doc, _) => doc,
        }
    }

    pub fn id(&self) -> &str {
        &self.document().id
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            SearchHit::Plain(_) => None,
            SearchHit::Scored(_, score) => Some(*score),
        }
    }

    pub fn shape(&self) -> HitShape {
        match self {
            SearchHit::Plain(_) => HitShape::Plain,
            SearchHit::Scored(..) => HitShape::Scored,
        }
    }
}

//! Metadata filters understood by every vector store

use crate::document::{Metadata, MetadataValue};
use serde::{Deserialize, Serialize};

/// Predicate over document metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Exact equality on an attribute
    Eq { key: String, value: MetadataValue },
    /// Attribute value is one of `values`
    In { key: String, values: Vec<MetadataValue> },
    /// Numeric attribute >= bound
    Gte { key: String, value: f64 },
    /// Numeric attribute <= bound
    Lte { key: String, value: f64 },
    /// Every clause holds; an empty conjunction matches everything
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Filter::Eq {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<MetadataValue>>(
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn gte(key: impl Into<String>, value: f64) -> Self {
        Filter::Gte { key: key.into(), value }
    }

    pub fn lte(key: impl Into<String>, value: f64) -> Self {
        Filter::Lte { key: key.into(), value }
    }

    /// Inclusive numeric range on one attribute
    pub fn between(key: impl Into<String>, low: f64, high: f64) -> Self {
        let key = key.into();
        Filter::And(vec![Filter::gte(key.clone(), low), Filter::lte(key, high)])
    }

    /// Conjunction, flattening nested `And`s
    pub fn and(self, other: Filter) -> Self {
        let mut clauses = match self {
            Filter::And(clauses) => clauses,
            single => vec![single],
        };
        match other {
            Filter::And(more) => clauses.extend(more),
            single => clauses.push(single),
        }
        Filter::And(clauses)
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Filter::Eq { key, value } => metadata.get(key) == Some(value),
            Filter::In { key, values } => metadata
                .get(key)
                .is_some_and(|actual| values.contains(actual)),
            Filter::Gte { key, value } => metadata
                .get(key)
                .and_then(MetadataValue::as_f64)
                .is_some_and(|actual| actual >= *value),
            Filter::Lte { key, value } => metadata
                .get(key)
                .and_then(MetadataValue::as_f64)
                .is_some_and(|actual| actual <= *value),
            Filter::And(clauses) => clauses.iter().all(|clause| clause.matches(metadata)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn meta() -> Metadata {
        Document::new("x", "")
            .with_meta("file_name", "a.md")
            .with_meta("pos", 4i64)
            .with_meta("weight", 0.5)
            .metadata
    }

    #[test]
    fn test_equality() {
        assert!(Filter::eq("file_name", "a.md").matches(&meta()));
        assert!(!Filter::eq("file_name", "b.md").matches(&meta()));
        assert!(!Filter::eq("missing", "a.md").matches(&meta()));
    }

    #[test]
    fn test_membership() {
        assert!(Filter::is_in("file_name", ["b.md", "a.md"]).matches(&meta()));
        assert!(!Filter::is_in("file_name", ["c.md"]).matches(&meta()));
    }

    #[test]
    fn test_range_accepts_ints_and_floats() {
        assert!(Filter::between("pos", 2.0, 4.0).matches(&meta()));
        assert!(!Filter::between("pos", 5.0, 9.0).matches(&meta()));
        assert!(Filter::gte("weight", 0.5).matches(&meta()));
        assert!(!Filter::lte("file_name", 10.0).matches(&meta()));
    }

    #[test]
    fn test_and_flattens() {
        let filter = Filter::eq("file_name", "a.md").and(Filter::between("pos", 0.0, 10.0));
        match &filter {
            Filter::And(clauses) => assert_eq!(clauses.len(), 3),
            other => panic!("expected conjunction, got {other:?}"),
        }
        assert!(filter.matches(&meta()));
        assert!(Filter::And(vec![]).matches(&meta()));
    }
}

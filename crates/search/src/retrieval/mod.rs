//! Multi-query retrieval and consolidation
//!
//! Provides:
//! - Flat merging (dedup for plain hits, score averaging for scored hits)
//! - Hierarchical merging of parents with nested children
//! - Concurrent sub-query fan-out against one collection
//! - Parent/child schema search over two collections

mod flat;
mod hierarchical;
mod multi_query;
mod ordered;
mod schema;

pub use flat::{sort_by_score, FlatResultMerger};
pub use hierarchical::{
    strip_ids, HierarchicalResultMerger, MergedParent, ParentWithChildren, RankedEntity,
    ScoredEntity,
};
pub use multi_query::{validate_queries, MultiQuerySearch};
pub use schema::{SchemaResults, SchemaSearch};

//! Mosaic Search
//!
//! Sub-query fan-out and cross-query consolidation:
//! - `FlatResultMerger` for hits from a single collection
//! - `HierarchicalResultMerger` for parents carrying scored children
//! - `MultiQuerySearch` and `SchemaSearch` drive the vector stores

pub mod retrieval;

pub use retrieval::{
    FlatResultMerger, HierarchicalResultMerger, MergedParent, MultiQuerySearch, ParentWithChildren,
    SchemaResults, SchemaSearch,
};

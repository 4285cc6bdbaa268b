//! Mosaic Context Engine
//!
//! Rebuilds readable context from retrieved chunks:
//! - Window arithmetic around the positions a search touched
//! - Overlap-aware stitching of a fetched window
//! - Enriched search and the consolidation pipeline entry point

pub mod enricher;
pub mod pipeline;
pub mod stitcher;
pub mod window;

pub use enricher::{collect_groups, ContextEnricher};
pub use pipeline::ConsolidationPipeline;
pub use stitcher::{find_overlap, ChunkStitcher};
pub use window::{compute_window, ConsolidatedGroup};

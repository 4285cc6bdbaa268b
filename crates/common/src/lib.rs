//! Mosaic Common Library
//!
//! Shared code for the Mosaic retrieval consolidation crates including:
//! - Document, chunk and metadata types
//! - The vector store seam and an in-memory backend
//! - Embedding abstraction
//! - Error types and handling
//! - Configuration management
//! - Tracing and metrics

pub mod config;
pub mod document;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod store;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use document::{Chunk, Document, GroupKey, Metadata, MetadataValue, SearchHit};
pub use embeddings::{Embedder, KeywordEmbedder};
pub use errors::{AppError, Result};
pub use store::{Filter, MemoryStore, SearchRequest, SearchType, VectorStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Configuration management for Mosaic
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use crate::errors::{AppError, Result};
use crate::store::SearchType;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Flat retrieval and context enrichment
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Parent/child (schema) retrieval
    #[serde(default)]
    pub hierarchical: HierarchicalConfig,

    /// Metadata keys that describe chunk grouping
    #[serde(default)]
    pub grouping: GroupingConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Nearest-neighbour variant requested from the vector store
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Similarity,
    SimilarityScoreThreshold,
    Mmr,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Number of chunks each enriched group should span
    #[serde(default = "default_context_window_size")]
    pub context_window_size: usize,

    /// Results per sub-query
    #[serde(default = "default_k")]
    pub k: usize,

    /// Candidate pool for MMR
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,

    /// MMR trade-off: 1.0 is pure relevance, 0.0 pure diversity
    #[serde(default = "default_lambda_mult")]
    pub lambda_mult: f64,

    /// Upper bound on sub-queries per request
    #[serde(default = "default_max_subqueries")]
    pub max_subqueries: usize,

    #[serde(default = "default_search_kind")]
    pub search_type: SearchKind,

    /// Required when `search_type` is `similarity_score_threshold`
    #[serde(default)]
    pub score_threshold: Option<f64>,

    /// Merge sub-query results into one list before enrichment
    #[serde(default = "default_true")]
    pub merge_results: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HierarchicalConfig {
    #[serde(default = "default_k_parents")]
    pub k_parents: usize,

    #[serde(default = "default_score_threshold")]
    pub parent_score_threshold: f64,

    #[serde(default = "default_k_children")]
    pub k_children: usize,

    #[serde(default = "default_score_threshold")]
    pub child_score_threshold: f64,

    /// Child metadata key holding the owning parent's id
    #[serde(default = "default_parent_id_key")]
    pub parent_id_key: String,

    #[serde(default = "default_true")]
    pub merge_results: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupingConfig {
    /// Position of a chunk within its group
    #[serde(default = "default_position_key")]
    pub position_key: String,

    /// Number of chunks in the group
    #[serde(default = "default_group_size_key")]
    pub group_size_key: String,

    /// Declared overlap (characters) between consecutive chunks
    #[serde(default = "default_overlap_key")]
    pub overlap_key: String,

    /// Source file identifier, used by upsert and delete
    #[serde(default = "default_file_name_key")]
    pub file_name_key: String,

    /// Keys left out of the group key
    #[serde(default = "default_excluded_keys")]
    pub excluded_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_context_window_size() -> usize { 3 }
fn default_k() -> usize { 10 }
fn default_fetch_k() -> usize { 25 }
fn default_lambda_mult() -> f64 { 0.5 }
fn default_max_subqueries() -> usize { 5 }
fn default_search_kind() -> SearchKind { SearchKind::Mmr }
fn default_true() -> bool { true }
fn default_k_parents() -> usize { 10 }
fn default_k_children() -> usize { 15 }
fn default_score_threshold() -> f64 { 0.75 }
fn default_parent_id_key() -> String { "table_id".to_string() }
fn default_position_key() -> String { "headers_chunk_id".to_string() }
fn default_group_size_key() -> String { "headers_comb_total".to_string() }
fn default_overlap_key() -> String { "chunk_overlap".to_string() }
fn default_file_name_key() -> String { "file_name".to_string() }
fn default_excluded_keys() -> Vec<String> {
    vec![default_position_key(), default_group_size_key(), default_overlap_key()]
}
fn default_log_level() -> String { "info".to_string() }
fn default_service_name() -> String { "mosaic".to_string() }

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            context_window_size: default_context_window_size(),
            k: default_k(),
            fetch_k: default_fetch_k(),
            lambda_mult: default_lambda_mult(),
            max_subqueries: default_max_subqueries(),
            search_type: default_search_kind(),
            score_threshold: None,
            merge_results: true,
        }
    }
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            k_parents: default_k_parents(),
            parent_score_threshold: default_score_threshold(),
            k_children: default_k_children(),
            child_score_threshold: default_score_threshold(),
            parent_id_key: default_parent_id_key(),
            merge_results: true,
        }
    }
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            position_key: default_position_key(),
            group_size_key: default_group_size_key(),
            overlap_key: default_overlap_key(),
            file_name_key: default_file_name_key(),
            excluded_keys: default_excluded_keys(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            service_name: default_service_name(),
        }
    }
}

impl RetrievalConfig {
    /// Resolve the configured search variant into store parameters
    pub fn search_type(&self) -> Result<SearchType> {
        match self.search_type {
            SearchKind::Similarity => Ok(SearchType::Similarity),
            SearchKind::SimilarityScoreThreshold => {
                let score_threshold = self.score_threshold.ok_or_else(|| {
                    AppError::validation(
                        "retrieval.score_threshold",
                        "required for similarity_score_threshold search",
                    )
                })?;
                Ok(SearchType::SimilarityScoreThreshold { score_threshold })
            }
            SearchKind::Mmr => Ok(SearchType::Mmr {
                fetch_k: self.fetch_k,
                lambda_mult: self.lambda_mult,
            }),
        }
    }
}

fn check_unit_interval(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AppError::validation(
            field,
            format!("must be in range [0.0, 1.0], got {value}"),
        ))
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // e.g., APP__RETRIEVAL__CONTEXT_WINDOW_SIZE=5
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot honour
    pub fn validate(&self) -> Result<()> {
        let retrieval = &self.retrieval;
        if retrieval.max_subqueries < 1 {
            return Err(AppError::validation(
                "retrieval.max_subqueries",
                "must be an integer greater than or equal to 1",
            ));
        }
        if retrieval.k == 0 {
            return Err(AppError::validation("retrieval.k", "must be at least 1"));
        }
        if retrieval.search_type == SearchKind::Mmr && retrieval.fetch_k < retrieval.k {
            return Err(AppError::validation(
                "retrieval.fetch_k",
                format!("must be >= k ({}), got {}", retrieval.k, retrieval.fetch_k),
            ));
        }
        check_unit_interval("retrieval.lambda_mult", retrieval.lambda_mult)?;
        if let Some(threshold) = retrieval.score_threshold {
            check_unit_interval("retrieval.score_threshold", threshold)?;
        }
        // Surfaces a missing threshold for the threshold variant
        retrieval.search_type()?;

        let hierarchical = &self.hierarchical;
        if hierarchical.k_parents == 0 || hierarchical.k_children == 0 {
            return Err(AppError::validation(
                "hierarchical.k_parents",
                "k_parents and k_children must be at least 1",
            ));
        }
        check_unit_interval(
            "hierarchical.parent_score_threshold",
            hierarchical.parent_score_threshold,
        )?;
        check_unit_interval(
            "hierarchical.child_score_threshold",
            hierarchical.child_score_threshold,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.retrieval.context_window_size, 3);
        assert_eq!(config.retrieval.search_type, SearchKind::Mmr);
        assert_eq!(config.hierarchical.k_children, 15);
        assert_eq!(config.grouping.excluded_keys.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_name_stays_in_group_key() {
        let grouping = GroupingConfig::default();
        assert!(!grouping.excluded_keys.contains(&grouping.file_name_key));
    }

    #[test]
    fn test_zero_subqueries_rejected() {
        let mut config = AppConfig::default();
        config.retrieval.max_subqueries = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("greater than or equal to 1"));
    }

    #[test]
    fn test_threshold_search_requires_threshold() {
        let mut config = AppConfig::default();
        config.retrieval.search_type = SearchKind::SimilarityScoreThreshold;
        assert!(config.validate().is_err());

        config.retrieval.score_threshold = Some(0.4);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.retrieval.search_type().unwrap(),
            SearchType::SimilarityScoreThreshold { score_threshold: 0.4 }
        );
    }

    #[test]
    fn test_lambda_out_of_range() {
        let mut config = AppConfig::default();
        config.retrieval.lambda_mult = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let json = r#"{ "retrieval": { "context_window_size": 7, "search_type": "similarity" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.retrieval.context_window_size, 7);
        assert_eq!(config.retrieval.k, 10);
        assert_eq!(config.retrieval.search_type().unwrap(), SearchType::Similarity);
        assert_eq!(config.hierarchical.parent_id_key, "table_id");
    }
}

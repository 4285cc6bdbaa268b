//! Consolidation pipeline
//!
//! Entry point that binds configuration to collections:
//! - Flat consolidation over a chunk collection, rendered as records
//! - Context enrichment over the same collection
//! - Parent/child consolidation over a schema collection pair
//! - File-level upsert and delete for the chunk collection

use crate::enricher::ContextEnricher;
use mosaic_common::config::AppConfig;
use mosaic_common::document::{to_records, Document, RecordFields, ResultRecord};
use mosaic_common::errors::{AppError, Result};
use mosaic_common::store::{SearchRequest, VectorStore};
use mosaic_search::{MultiQuerySearch, SchemaResults, SchemaSearch};
use std::sync::Arc;
use tracing::{info, instrument};

struct ChunkCollection {
    search: MultiQuerySearch,
    enricher: ContextEnricher,
}

/// Configured consolidation over one or both kinds of collection
pub struct ConsolidationPipeline {
    config: AppConfig,
    chunks: Option<ChunkCollection>,
    schema: Option<SchemaSearch>,
}

impl ConsolidationPipeline {
    /// Create a pipeline with no collections attached
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            chunks: None,
            schema: None,
        })
    }

    /// Attach the chunk collection used for flat and enriched search
    pub fn with_chunk_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        let max_subqueries = self.config.retrieval.max_subqueries;
        self.chunks = Some(ChunkCollection {
            search: MultiQuerySearch::new(store.clone(), max_subqueries),
            enricher: ContextEnricher::new(store, self.config.grouping.clone(), max_subqueries),
        });
        self
    }

    /// Attach the parent and child collections used for schema search
    pub fn with_schema_stores(
        mut self,
        parents: Arc<dyn VectorStore>,
        children: Arc<dyn VectorStore>,
    ) -> Self {
        self.schema = Some(SchemaSearch::new(
            parents,
            children,
            self.config.hierarchical.clone(),
            self.config.retrieval.max_subqueries,
        ));
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn chunks(&self) -> Result<&ChunkCollection> {
        self.chunks.as_ref().ok_or_else(|| AppError::Configuration {
            message: "no chunk collection attached".to_string(),
        })
    }

    fn schema(&self) -> Result<&SchemaSearch> {
        self.schema.as_ref().ok_or_else(|| AppError::Configuration {
            message: "no schema collections attached".to_string(),
        })
    }

    /// Search parameters from the retrieval config; query text is set per sub-query
    pub fn request_template(&self) -> Result<SearchRequest> {
        let retrieval = &self.config.retrieval;
        Ok(SearchRequest::new("", retrieval.search_type()?, retrieval.k))
    }

    /// Merged hits from every sub-query as external records (no ids)
    #[instrument(skip(self, queries), fields(queries = queries.len()))]
    pub async fn search(&self, queries: &[String]) -> Result<Vec<ResultRecord>> {
        let chunks = self.chunks()?;
        let template = self.request_template()?;
        let hits = chunks.search.search_merged(queries, &template).await?;
        Ok(to_records(&hits, RecordFields::external()))
    }

    /// Context-enriched passages using the configured window size
    #[instrument(skip(self, queries), fields(queries = queries.len()))]
    pub async fn enriched_context(&self, queries: &[String]) -> Result<Vec<Vec<String>>> {
        let chunks = self.chunks()?;
        let template = self.request_template()?;
        let retrieval = &self.config.retrieval;
        chunks
            .enricher
            .enriched_search(
                queries,
                retrieval.context_window_size,
                retrieval.merge_results,
                &template,
            )
            .await
    }

    /// Parent/child results, merged or per query as configured
    #[instrument(skip(self, queries), fields(queries = queries.len()))]
    pub async fn schema_search(&self, queries: &[String]) -> Result<SchemaResults> {
        self.schema()?.search(queries).await
    }

    /// Replace every file present in `documents` in the chunk collection
    pub async fn upsert_chunks(
        &self,
        documents: Vec<Document>,
    ) -> Result<(Vec<Document>, Vec<String>)> {
        let chunks = self.chunks()?;
        let (deleted, added) = chunks
            .search
            .store()
            .upsert(&self.config.grouping.file_name_key, documents)
            .await?;
        info!(deleted = deleted.len(), added = added.len(), "Chunk collection upserted");
        Ok((deleted, added))
    }

    /// Delete the named files from every attached collection
    pub async fn delete_files(&self, file_names: &[String]) -> Result<usize> {
        let key = self.config.grouping.file_name_key.as_str();
        let mut deleted = 0;

        if let Some(chunks) = &self.chunks {
            deleted += chunks.search.store().delete_by_file_names(key, file_names).await?.len();
        }
        if let Some(schema) = &self.schema {
            let (parents, children) = schema.delete_by_file_names(key, file_names).await?;
            deleted += parents.len() + children.len();
        }

        info!(files = file_names.len(), deleted, "Files deleted");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_common::config::SearchKind;
    use mosaic_common::embeddings::KeywordEmbedder;
    use mosaic_common::store::MemoryStore;

    fn store() -> Arc<dyn VectorStore> {
        Arc::new(MemoryStore::new("chunks", Arc::new(KeywordEmbedder::new(["alpha"]))))
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.retrieval.k = 0;
        assert!(ConsolidationPipeline::new(config).is_err());
    }

    #[test]
    fn test_request_template_follows_config() {
        let mut config = AppConfig::default();
        config.retrieval.search_type = SearchKind::Similarity;
        config.retrieval.k = 4;
        let pipeline = ConsolidationPipeline::new(config).unwrap();

        let template = pipeline.request_template().unwrap();
        assert_eq!(template.k, 4);
        assert_eq!(template.search_type.name(), "similarity");
    }

    #[tokio::test]
    async fn test_missing_collections_are_configuration_errors() {
        let pipeline = ConsolidationPipeline::new(AppConfig::default()).unwrap();
        let queries = vec!["alpha".to_string()];

        assert!(matches!(
            pipeline.search(&queries).await.unwrap_err(),
            AppError::Configuration { .. }
        ));
        assert!(matches!(
            pipeline.schema_search(&queries).await.unwrap_err(),
            AppError::Configuration { .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_queries_give_empty_results() {
        let pipeline = ConsolidationPipeline::new(AppConfig::default())
            .unwrap()
            .with_chunk_store(store())
            .with_schema_stores(store(), store());

        assert!(pipeline.search(&[]).await.unwrap().is_empty());
        assert!(pipeline.enriched_context(&[]).await.unwrap().is_empty());
        assert!(pipeline.schema_search(&[]).await.unwrap().is_empty());
    }
}

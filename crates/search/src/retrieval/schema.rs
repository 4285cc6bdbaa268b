//! Parent/child retrieval over two collections
//!
//! Parents (for example table summaries) are searched with a relevance
//! threshold; each surviving parent then scopes a child search (its
//! columns) through the parent id stored in child metadata. A parent
//! whose child search comes back empty is dropped from that sub-query.

use super::hierarchical::{
    strip_ids, HierarchicalResultMerger, MergedParent, ParentWithChildren, ScoredEntity,
};
use super::multi_query::validate_queries;
use futures::future::try_join_all;
use mosaic_common::config::HierarchicalConfig;
use mosaic_common::document::{Document, SearchHit};
use mosaic_common::errors::{AppError, Result};
use mosaic_common::metrics;
use mosaic_common::store::{Filter, SearchRequest, SearchType, VectorStore};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Schema search output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaResults {
    /// One consolidated list across every sub-query
    Merged(Vec<MergedParent>),
    /// One list per sub-query, in query order
    PerQuery(Vec<Vec<MergedParent>>),
}

impl SchemaResults {
    pub fn is_empty(&self) -> bool {
        match self {
            SchemaResults::Merged(parents) => parents.is_empty(),
            SchemaResults::PerQuery(lists) => lists.iter().all(Vec::is_empty),
        }
    }
}

/// Two-collection hierarchical search
pub struct SchemaSearch {
    parents: Arc<dyn VectorStore>,
    children: Arc<dyn VectorStore>,
    config: HierarchicalConfig,
    max_subqueries: usize,
    merger: HierarchicalResultMerger,
}

impl SchemaSearch {
    pub fn new(
        parents: Arc<dyn VectorStore>,
        children: Arc<dyn VectorStore>,
        config: HierarchicalConfig,
        max_subqueries: usize,
    ) -> Self {
        Self {
            parents,
            children,
            config,
            max_subqueries,
            merger: HierarchicalResultMerger::new(),
        }
    }

    pub fn config(&self) -> &HierarchicalConfig {
        &self.config
    }

    /// Search every query, then merge or strip ids per `config.merge_results`
    pub async fn search(&self, queries: &[String]) -> Result<SchemaResults> {
        self.search_with(queries, self.config.merge_results).await
    }

    pub async fn search_with(
        &self,
        queries: &[String],
        merge_results: bool,
    ) -> Result<SchemaResults> {
        validate_queries(queries, self.max_subqueries)?;

        let start = Instant::now();
        let per_query = try_join_all(
            queries
                .iter()
                .enumerate()
                .map(|(index, query)| self.search_one(index, query)),
        )
        .await?;

        let parents_found: usize = per_query.iter().map(Vec::len).sum();
        metrics::record_search(
            start.elapsed().as_secs_f64(),
            "hierarchical",
            queries.len(),
            parents_found,
        );
        info!(
            queries = queries.len(),
            parents = parents_found,
            merge_results,
            "Schema search complete"
        );

        Ok(if merge_results {
            SchemaResults::Merged(self.merger.merge(per_query))
        } else {
            SchemaResults::PerQuery(strip_ids(per_query))
        })
    }

    async fn search_one(&self, query_index: usize, query: &str) -> Result<Vec<ParentWithChildren>> {
        let parent_request = SearchRequest::new(
            query,
            SearchType::SimilarityScoreThreshold {
                score_threshold: self.config.parent_score_threshold,
            },
            self.config.k_parents,
        );
        let parents = scored(query_index, self.parents.search(&parent_request).await?)?;

        let with_children = try_join_all(parents.into_iter().map(|parent| async move {
            let request = SearchRequest::new(
                query,
                SearchType::SimilarityScoreThreshold {
                    score_threshold: self.config.child_score_threshold,
                },
                self.config.k_children,
            )
            .with_filter(Filter::eq(self.config.parent_id_key.as_str(), parent.id.as_str()));
            let children = scored(query_index, self.children.search(&request).await?)?;
            Ok::<_, AppError>(ParentWithChildren { parent, children })
        }))
        .await?;

        let found = with_children.len();
        let kept: Vec<ParentWithChildren> = with_children
            .into_iter()
            .filter(|item| !item.children.is_empty())
            .collect();
        debug!(query_index, found, kept = kept.len(), "Parents resolved");

        Ok(kept)
    }

    /// Delete the named files from both collections
    pub async fn delete_by_file_names(
        &self,
        file_name_key: &str,
        file_names: &[String],
    ) -> Result<(Vec<Document>, Vec<Document>)> {
        let (parents, children) = tokio::try_join!(
            self.parents.delete_by_file_names(file_name_key, file_names),
            self.children.delete_by_file_names(file_name_key, file_names),
        )?;
        Ok((parents, children))
    }

    /// Replace every file named by the incoming parents in both collections.
    ///
    /// Returns the deleted parents and children, then the new parent and child ids.
    pub async fn upsert(
        &self,
        file_name_key: &str,
        parents: Vec<Document>,
        children: Vec<Document>,
    ) -> Result<((Vec<Document>, Vec<Document>), (Vec<String>, Vec<String>))> {
        let file_names: Vec<String> = parents
            .iter()
            .filter_map(|doc| doc.meta(file_name_key).and_then(|v| v.as_str()))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let deleted = self.delete_by_file_names(file_name_key, &file_names).await?;
        let parent_ids = self.parents.add(parents).await?;
        let child_ids = self.children.add(children).await?;

        info!(
            files = file_names.len(),
            parents_added = parent_ids.len(),
            children_added = child_ids.len(),
            "Schema collections upserted"
        );
        Ok((deleted, (parent_ids, child_ids)))
    }
}

/// Threshold searches must come back scored
fn scored(query_index: usize, hits: Vec<SearchHit>) -> Result<Vec<ScoredEntity>> {
    hits.into_iter()
        .map(|hit| match hit {
            SearchHit::Scored(doc, score) => Ok(ScoredEntity {
                id: doc.id,
                content: doc.content,
                score,
            }),
            SearchHit::Plain(_) => Err(AppError::ShapeMismatch {
                query_index,
                expected: "scored",
                found: "plain",
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mosaic_common::embeddings::KeywordEmbedder;
    use mosaic_common::store::MemoryStore;

    const VOCAB: [&str; 4] = ["orders", "customers", "amount", "email"];

    fn config(merge_results: bool) -> HierarchicalConfig {
        HierarchicalConfig {
            k_parents: 5,
            parent_score_threshold: 0.75,
            k_children: 5,
            child_score_threshold: 0.75,
            parent_id_key: "table_id".to_string(),
            merge_results,
        }
    }

    async fn stores() -> (Arc<MemoryStore>, Arc<MemoryStore>) {
        let embedder = Arc::new(KeywordEmbedder::new(VOCAB));
        let tables = Arc::new(MemoryStore::new("tables", embedder.clone()));
        let columns = Arc::new(MemoryStore::new("columns", embedder));

        tables
            .add(vec![
                Document::new("t_orders", "orders table with amount")
                    .with_meta("file_name", "sales.md"),
                Document::new("t_customers", "customers table").with_meta("file_name", "crm.md"),
            ])
            .await
            .unwrap();
        columns
            .add(vec![
                Document::new("c_amount", "orders amount")
                    .with_meta("table_id", "t_orders")
                    .with_meta("file_name", "sales.md"),
                Document::new("c_email", "customers email")
                    .with_meta("table_id", "t_customers")
                    .with_meta("file_name", "crm.md"),
            ])
            .await
            .unwrap();

        (tables, columns)
    }

    fn queries(items: &[&str]) -> Vec<String> {
        items.iter().map(|q| q.to_string()).collect()
    }

    #[tokio::test]
    async fn test_children_scoped_to_parent() {
        let (tables, columns) = stores().await;
        let search = SchemaSearch::new(tables, columns, config(true), 5);

        let results = search.search(&queries(&["orders amount"])).await.unwrap();
        let SchemaResults::Merged(merged) = results else {
            panic!("expected merged results");
        };
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].parent.content, "orders table with amount");
        assert_eq!(merged[0].children.len(), 1);
        assert_eq!(merged[0].children[0].content, "orders amount");
    }

    #[tokio::test]
    async fn test_parent_without_children_dropped() {
        let (tables, columns) = stores().await;
        columns
            .delete_by_filter(&Filter::eq("table_id", "t_customers"))
            .await
            .unwrap();
        let search = SchemaSearch::new(tables, columns, config(true), 5);

        let results = search.search(&queries(&["customers"])).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_per_query_results_without_merge() {
        let (tables, columns) = stores().await;
        let search = SchemaSearch::new(tables, columns, config(false), 5);

        let results = search
            .search(&queries(&["orders amount", "customers email"]))
            .await
            .unwrap();
        let SchemaResults::PerQuery(lists) = results else {
            panic!("expected per-query results");
        };
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0][0].parent.content, "orders table with amount");
        assert_eq!(lists[1][0].children[0].content, "customers email");
    }

    #[tokio::test]
    async fn test_subquery_limit() {
        let (tables, columns) = stores().await;
        let search = SchemaSearch::new(tables, columns, config(true), 1);
        let err = search.search(&queries(&["orders", "customers"])).await.unwrap_err();
        assert!(matches!(err, AppError::TooManySubqueries { .. }));
    }

    #[tokio::test]
    async fn test_upsert_replaces_file_in_both_collections() {
        let (tables, columns) = stores().await;
        let search = SchemaSearch::new(tables.clone(), columns.clone(), config(true), 5);

        let ((deleted_tables, deleted_columns), (table_ids, column_ids)) = search
            .upsert(
                "file_name",
                vec![Document::new("t_orders_v2", "orders table")
                    .with_meta("file_name", "sales.md")],
                vec![Document::new("c_amount_v2", "orders amount")
                    .with_meta("table_id", "t_orders_v2")
                    .with_meta("file_name", "sales.md")],
            )
            .await
            .unwrap();

        assert_eq!(deleted_tables.len(), 1);
        assert_eq!(deleted_columns.len(), 1);
        assert_eq!(table_ids, vec!["t_orders_v2".to_string()]);
        assert_eq!(column_ids, vec!["c_amount_v2".to_string()]);
        assert_eq!(tables.len().await, 2);
        assert_eq!(columns.len().await, 2);
    }

    struct PlainStore;

    #[async_trait]
    impl VectorStore for PlainStore {
        async fn search(&self, _request: &SearchRequest) -> Result<Vec<SearchHit>> {
            Ok(vec![SearchHit::Plain(Document::new("t", "table"))])
        }

        async fn get_by_filter(&self, _filter: &Filter) -> Result<Vec<Document>> {
            Ok(Vec::new())
        }

        async fn delete_by_filter(&self, _filter: &Filter) -> Result<Vec<Document>> {
            Ok(Vec::new())
        }

        async fn add(&self, documents: Vec<Document>) -> Result<Vec<String>> {
            Ok(documents.into_iter().map(|d| d.id).collect())
        }
    }

    #[tokio::test]
    async fn test_unscored_parent_hits_are_rejected() {
        let search = SchemaSearch::new(Arc::new(PlainStore), Arc::new(PlainStore), config(true), 5);
        let err = search.search(&queries(&["orders"])).await.unwrap_err();
        assert!(matches!(err, AppError::ShapeMismatch { query_index: 0, .. }));
    }
}

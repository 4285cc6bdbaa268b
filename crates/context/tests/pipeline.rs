//! End-to-end consolidation against in-memory collections

use mosaic_common::config::{AppConfig, SearchKind};
use mosaic_common::document::{tag_chunks, Document};
use mosaic_common::embeddings::KeywordEmbedder;
use mosaic_common::store::{MemoryStore, VectorStore};
use mosaic_context::ConsolidationPipeline;
use mosaic_search::SchemaResults;
use std::sync::Arc;

const VOCAB: [&str; 6] = ["invoice", "refund", "churn", "orders", "amount", "customers"];

fn embedder() -> Arc<KeywordEmbedder> {
    Arc::new(KeywordEmbedder::new(VOCAB))
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.retrieval.search_type = SearchKind::Similarity;
    config.retrieval.k = 1;
    config.retrieval.context_window_size = 3;
    config
}

fn file_chunks(file: &str, parts: &[&str], overlap: usize) -> Vec<Document> {
    let grouping = AppConfig::default().grouping;
    let docs = parts
        .iter()
        .enumerate()
        .map(|(i, text)| Document::new(format!("{file}#{i}"), *text).with_meta("file_name", file))
        .collect();
    tag_chunks(docs, &["file_name".to_string()], overlap, &grouping)
}

fn queries(items: &[&str]) -> Vec<String> {
    items.iter().map(|q| q.to_string()).collect()
}

async fn chunk_pipeline(config: AppConfig) -> (ConsolidationPipeline, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new("chunks", embedder()));
    let pipeline = ConsolidationPipeline::new(config)
        .unwrap()
        .with_chunk_store(store.clone());

    let mut documents = file_chunks(
        "billing.md",
        &["send the invoice", "invoice then wait", "wait for refund", "refund is final"],
        8,
    );
    documents.extend(file_chunks(
        "retention.md",
        &["churn overview", "overview of churn drivers"],
        8,
    ));
    pipeline.upsert_chunks(documents).await.unwrap();

    (pipeline, store)
}

#[tokio::test]
async fn enriched_context_stitches_window() {
    let (pipeline, _) = chunk_pipeline(config()).await;

    let passages = pipeline.enriched_context(&queries(&["refund"])).await.unwrap();
    assert_eq!(passages, vec![vec!["invoice then wait for refund is final".to_string()]]);
}

#[tokio::test]
async fn enriched_context_per_query() {
    let mut config = config();
    config.retrieval.merge_results = false;
    config.retrieval.context_window_size = 2;
    let (pipeline, _) = chunk_pipeline(config).await;

    let passages = pipeline
        .enriched_context(&queries(&["invoice", "churn"]))
        .await
        .unwrap();
    assert_eq!(
        passages,
        vec![
            vec!["send the invoice then wait".to_string()],
            vec!["churn overview of churn drivers".to_string()],
        ]
    );
}

#[tokio::test]
async fn flat_search_renders_records_without_ids() {
    let mut config = config();
    config.retrieval.search_type = SearchKind::SimilarityScoreThreshold;
    config.retrieval.score_threshold = Some(0.9);
    config.retrieval.k = 4;
    let (pipeline, _) = chunk_pipeline(config).await;

    let records = pipeline.search(&queries(&["refund", "refund"])).await.unwrap();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert!(record.id.is_none());
        assert!(record.metadata.is_none());
        assert!((record.score.unwrap() - 1.0).abs() < 1e-9);
    }
    assert_eq!(records[0].content.as_deref(), Some("wait for refund"));

    let json = serde_json::to_value(&records[0]).unwrap();
    assert!(json.get("id").is_none());
}

#[tokio::test]
async fn upsert_replaces_only_the_named_file() {
    let (pipeline, store) = chunk_pipeline(config()).await;
    assert_eq!(store.len().await, 6);

    let (deleted, added) = pipeline
        .upsert_chunks(file_chunks("billing.md", &["invoice only"], 0))
        .await
        .unwrap();
    assert_eq!(deleted.len(), 4);
    assert_eq!(added, vec!["billing.md#0".to_string()]);
    assert_eq!(store.len().await, 3);

    let removed = pipeline.delete_files(&["retention.md".to_string()]).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn schema_search_merges_across_queries() {
    let tables = Arc::new(MemoryStore::new("tables", embedder()));
    let columns = Arc::new(MemoryStore::new("columns", embedder()));
    tables
        .add(vec![
            Document::new("orders", "orders table").with_meta("file_name", "sales.md"),
            Document::new("customers", "customers table").with_meta("file_name", "crm.md"),
        ])
        .await
        .unwrap();
    columns
        .add(vec![
            Document::new("orders.amount", "orders amount")
                .with_meta("table_id", "orders")
                .with_meta("file_name", "sales.md"),
            Document::new("orders.customer", "orders customers")
                .with_meta("table_id", "orders")
                .with_meta("file_name", "sales.md"),
        ])
        .await
        .unwrap();

    let pipeline = ConsolidationPipeline::new(config())
        .unwrap()
        .with_schema_stores(tables.clone(), columns.clone());

    let results = pipeline
        .schema_search(&queries(&["orders amount", "orders customers"]))
        .await
        .unwrap();
    let SchemaResults::Merged(merged) = results else {
        panic!("expected merged schema results");
    };

    // The customers table has no columns and is dropped
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].parent.content, "orders table");
    assert_eq!(merged[0].children.len(), 2);
    assert!(merged[0].children[0].score >= merged[0].children[1].score);

    let removed = pipeline.delete_files(&["sales.md".to_string()]).await.unwrap();
    assert_eq!(removed, 3);
    assert_eq!(tables.len().await, 1);
    assert!(columns.is_empty().await);
}

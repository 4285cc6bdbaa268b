//! Embedding seam
//!
//! Embedding generation lives outside Mosaic; stores that embed text
//! themselves (such as [`crate::store::MemoryStore`]) take any
//! implementation of this trait.

use crate::errors::Result;
use async_trait::async_trait;

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Bag-of-keywords embedder: one dimension per vocabulary term.
///
/// Deterministic and dependency-free, for ephemeral collections and tests.
#[derive(Debug, Clone)]
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
}

impl KeywordEmbedder {
    pub fn new<S: Into<String>>(vocabulary: impl IntoIterator<Item = S>) -> Self {
        Self {
            vocabulary: vocabulary
                .into_iter()
                .map(|term| term.into().to_lowercase())
                .collect(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(self
            .vocabulary
            .iter()
            .map(|term| lower.matches(term.as_str()).count() as f32)
            .collect())
    }

    fn model_name(&self) -> &str {
        "keyword-count"
    }
}

/// Cosine similarity in [-1, 1]; zero vectors are orthogonal to everything
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Map cosine distance in [0, 2] to a relevance score in [0, 1]
pub fn cosine_distance_relevance(distance: f64) -> f64 {
    1.0 - distance / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_keyword_embedder_counts_terms() {
        let embedder = KeywordEmbedder::new(["Revenue", "churn"]);
        assert_eq!(embedder.dimensions(), 2);

        let vector = tokio_test::block_on(embedder.embed("revenue vs REVENUE target")).unwrap();
        assert_eq!(vector, vec![2.0, 0.0]);

        let batch = tokio_test::block_on(
            embedder.embed_batch(&["churn".to_string(), "weather".to_string()]),
        )
        .unwrap();
        assert_eq!(batch, vec![vec![0.0, 1.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn test_relevance_normalisation() {
        assert_eq!(cosine_distance_relevance(0.0), 1.0);
        assert_eq!(cosine_distance_relevance(1.0), 0.5);
        assert_eq!(cosine_distance_relevance(2.0), 0.0);
    }
}

//! Per-video vector indexes.
//!
//! A [`VectorIndex`] holds the embedded chunks of exactly one video. The
//! [`VectorIndexStore`] owns every persisted index together with the title catalog,
//! and a [`Retriever`] answers similarity queries against one loaded index.

mod index;
mod retriever;
mod store;

pub use index::{IndexArtifact, IndexEntry, VectorIndex};
pub use retriever::Retriever;
pub use store::{ReconcileReport, VectorIndexStore};

use serde::{Deserialize, Serialize};

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// Position of the chunk in the source transcript.
    pub index: usize,
    /// Chunk text.
    pub content: String,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Chunks selected for one question, ordered by descending similarity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunks: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn new(chunks: Vec<ScoredChunk>) -> Self {
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk texts in retrieval order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|c| c.content.as_str())
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_retrieval_result_texts() {
        let result = RetrievalResult::new(vec![
            ScoredChunk {
                index: 2,
                content: "cats".to_string(),
                score: 0.9,
            },
            ScoredChunk {
                index: 0,
                content: "dogs".to_string(),
                score: 0.4,
            },
        ]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.texts().collect::<Vec<_>>(), vec!["cats", "dogs"]);
    }
}

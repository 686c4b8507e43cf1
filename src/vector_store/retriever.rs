//! Similarity retrieval over one loaded index.

use super::{RetrievalResult, VectorIndex};
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Returns the chunks of one video most similar to a query.
///
/// Queries are embedded with the index's own embedder, so a retriever can never
/// mix embedding spaces.
#[derive(Debug, Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self { index }
    }

    /// The index this retriever searches.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Return at most `k` chunks ordered by descending similarity.
    #[instrument(skip(self, query), fields(video_id = %self.index.video_id()))]
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 || self.index.is_empty() {
            return Ok(RetrievalResult::default());
        }

        let query_embedding = self.index.embedder().embed(query).await?;
        let chunks = self.index.search(&query_embedding, k);

        debug!(
            "Retrieved {} chunks (best score {:.3})",
            chunks.len(),
            chunks.first().map_or(0.0, |c| c.score)
        );
        Ok(RetrievalResult::new(chunks))
    }
}

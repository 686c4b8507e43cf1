//! The persisted per-video index artifact and its loaded, searchable form.

use super::{cosine_similarity, ScoredChunk};
use crate::embedding::Embedder;
use crate::error::{Result, TubeqaError};
use crate::video_source::VideoId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// One embedded chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Position of the chunk in the transcript.
    pub index: usize,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Serialized form of a video index.
///
/// The title is stored here as well as in the catalog so a missing catalog entry
/// can be restored from the artifact alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexArtifact {
    pub format_version: u32,
    pub video_id: VideoId,
    pub title: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<IndexEntry>,
}

impl IndexArtifact {
    /// Build an artifact from chunk texts and their embeddings.
    pub fn new(
        video_id: VideoId,
        title: String,
        embedding_model: &str,
        dimensions: usize,
        entries: Vec<IndexEntry>,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            video_id,
            title,
            embedding_model: embedding_model.to_string(),
            dimensions,
            created_at: Utc::now(),
            entries,
        }
    }

    /// Read and validate an artifact file.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let artifact: Self = serde_json::from_str(&content)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Write the artifact so readers see either the old file or the complete new one.
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| TubeqaError::Io(e.error))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(TubeqaError::IndexBuild(format!(
                "Unsupported index format version {} for {}",
                self.format_version, self.video_id
            )));
        }
        if self.entries.is_empty() {
            return Err(TubeqaError::IndexBuild(format!(
                "Index for {} has no entries",
                self.video_id
            )));
        }
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.embedding.len() != self.dimensions)
        {
            return Err(TubeqaError::IndexBuild(format!(
                "Index for {} has an embedding of length {} (expected {})",
                self.video_id,
                entry.embedding.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

/// An immutable, searchable index bound to the embedder that built it.
pub struct VectorIndex {
    artifact: IndexArtifact,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("video_id", &self.artifact.video_id)
            .field("title", &self.artifact.title)
            .field("entries", &self.artifact.entries.len())
            .field("embedding_model", &self.artifact.embedding_model)
            .finish()
    }
}

impl VectorIndex {
    /// Pair an artifact with the embedder used for queries.
    ///
    /// Fails if the artifact was built with a different embedding model.
    pub(crate) fn new(artifact: IndexArtifact, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if artifact.embedding_model != embedder.model() {
            return Err(TubeqaError::IndexBuild(format!(
                "Index for {} was built with embedding model '{}' but '{}' is configured; rebuild it with `prepare --force`",
                artifact.video_id,
                artifact.embedding_model,
                embedder.model()
            )));
        }
        if artifact.dimensions != embedder.dimensions() {
            return Err(TubeqaError::IndexBuild(format!(
                "Index for {} has {} dimensions but the embedder produces {}",
                artifact.video_id,
                artifact.dimensions,
                embedder.dimensions()
            )));
        }
        Ok(Self { artifact, embedder })
    }

    pub fn video_id(&self) -> &VideoId {
        &self.artifact.video_id
    }

    pub fn title(&self) -> &str {
        &self.artifact.title
    }

    pub fn embedding_model(&self) -> &str {
        &self.artifact.embedding_model
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.artifact.created_at
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.artifact.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifact.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.artifact.entries
    }

    pub(crate) fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Top `k` entries by cosine similarity to `query_embedding`.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .artifact
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                index: entry.index,
                content: entry.content.clone(),
                score: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SpyEmbedder;

    fn artifact(model: &str, dims: usize) -> IndexArtifact {
        IndexArtifact::new(
            VideoId::parse("abc12345678").unwrap(),
            "Cats".to_string(),
            model,
            dims,
            vec![
                IndexEntry {
                    index: 0,
                    content: "first".to_string(),
                    embedding: vec![1.0, 0.0],
                },
                IndexEntry {
                    index: 1,
                    content: "second".to_string(),
                    embedding: vec![0.6, 0.8],
                },
                IndexEntry {
                    index: 2,
                    content: "third".to_string(),
                    embedding: vec![0.0, 1.0],
                },
            ],
        )
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let embedder = Arc::new(SpyEmbedder::with_dimensions(2));
        let index = VectorIndex::new(artifact(SpyEmbedder::MODEL, 2), embedder).unwrap();

        let results = index.search(&[0.0, 1.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "third");
        assert_eq!(results[1].content, "second");
        assert!(results[0].score >= results[1].score);

        // Fewer entries than k.
        assert_eq!(index.search(&[1.0, 0.0], 10).len(), 3);
    }

    #[test]
    fn test_model_mismatch_is_rejected() {
        let embedder = Arc::new(SpyEmbedder::with_dimensions(2));
        let err = VectorIndex::new(artifact("some-other-model", 2), embedder).unwrap_err();
        assert!(matches!(err, TubeqaError::IndexBuild(_)));
    }

    #[test]
    fn test_artifact_roundtrip_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc12345678.index.json");

        artifact(SpyEmbedder::MODEL, 2).write_atomic(&path).unwrap();
        let loaded = IndexArtifact::read(&path).unwrap();
        assert_eq!(loaded.title, "Cats");
        assert_eq!(loaded.entries.len(), 3);

        // Declared dimensions disagree with the stored vectors.
        artifact(SpyEmbedder::MODEL, 3).write_atomic(&path).unwrap();
        assert!(matches!(
            IndexArtifact::read(&path),
            Err(TubeqaError::IndexBuild(_))
        ));
    }
}

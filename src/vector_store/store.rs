//! Persistent store of per-video indexes and the title catalog.
//!
//! Layout inside the index directory:
//!
//! - `<video_id>.index.json`: one immutable artifact per video
//! - the catalog (`video_metadata.json` or `catalog.db`)
//! - `<video_id>.lock`: held while an index is being built or deleted
//!
//! The artifact is always written before its catalog entry. [`VectorIndexStore::reconcile`]
//! runs on open and repairs whatever an interrupted write left behind.

use super::{IndexArtifact, IndexEntry, VectorIndex};
use crate::catalog::{self, CatalogEntry, CatalogRepository};
use crate::chunking::Chunk;
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::error::{Result, TubeqaError};
use crate::lock::{FileLock, KeyedLocks};
use crate::video_source::{fallback_title, VideoId};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, instrument, warn};

const ARTIFACT_SUFFIX: &str = ".index.json";
const LOCK_SUFFIX: &str = ".lock";

/// What [`VectorIndexStore::reconcile`] repaired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Catalog entries restored from orphaned artifacts.
    pub restored: Vec<VideoId>,
    /// Catalog entries removed because their artifact is gone.
    pub removed: Vec<VideoId>,
    /// Unreadable artifacts moved aside.
    pub quarantined: Vec<PathBuf>,
    /// Videos left alone because another writer held their lock.
    pub skipped: Vec<VideoId>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.restored.is_empty() && self.removed.is_empty() && self.quarantined.is_empty()
    }
}

/// Owns every persisted video index and the metadata catalog.
pub struct VectorIndexStore {
    index_dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    catalog: Arc<dyn CatalogRepository>,
    build_locks: KeyedLocks,
    lock_timeout: Duration,
    stale_lock: Duration,
}

impl VectorIndexStore {
    /// Open a store rooted at `index_dir`, repairing any inconsistency left by a crash.
    #[instrument(skip(embedder, catalog))]
    pub fn open(
        index_dir: &Path,
        embedder: Arc<dyn Embedder>,
        catalog: Arc<dyn CatalogRepository>,
    ) -> Result<Self> {
        std::fs::create_dir_all(index_dir)?;

        let store = Self {
            index_dir: index_dir.to_path_buf(),
            embedder,
            catalog,
            build_locks: KeyedLocks::new(),
            lock_timeout: Duration::from_secs(300),
            stale_lock: Duration::from_secs(900),
        };

        let report = store.reconcile()?;
        if !report.is_clean() {
            warn!(
                "Repaired index store: {} restored, {} removed, {} quarantined",
                report.restored.len(),
                report.removed.len(),
                report.quarantined.len()
            );
        }

        Ok(store)
    }

    /// Open the store described by settings with the given embedder.
    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let index_dir = settings.index_dir();
        let catalog = catalog::open_catalog(&index_dir, &settings.index)?;
        Ok(Self::open(&index_dir, embedder, catalog)?.with_lock_timeouts(
            Duration::from_secs(settings.index.lock_timeout_seconds),
            Duration::from_secs(settings.index.stale_lock_seconds),
        ))
    }

    /// Override how long to wait for a build lock and when a lock counts as abandoned.
    pub fn with_lock_timeouts(mut self, timeout: Duration, stale_after: Duration) -> Self {
        self.lock_timeout = timeout;
        self.stale_lock = stale_after;
        self
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Path of the artifact for `id`.
    pub fn artifact_path(&self, id: &VideoId) -> PathBuf {
        self.index_dir.join(format!("{}{}", id, ARTIFACT_SUFFIX))
    }

    fn lock_path(&self, id: &VideoId) -> PathBuf {
        self.index_dir.join(format!("{}{}", id, LOCK_SUFFIX))
    }

    /// Whether an index artifact exists on disk for `id`.
    pub fn exists(&self, id: &VideoId) -> bool {
        self.artifact_path(id).is_file()
    }

    /// Load the index for `id`, or build and persist it from `chunks`.
    ///
    /// Returns `(index, was_created)`. When the index already exists the chunks are
    /// ignored and the embedder is never called.
    #[instrument(skip(self, chunks, title), fields(video_id = %id, chunks = chunks.len()))]
    pub async fn get_or_build(
        &self,
        id: &VideoId,
        chunks: &[Chunk],
        title: Option<&str>,
    ) -> Result<(Arc<VectorIndex>, bool)> {
        if let Some(index) = self.load(id)? {
            debug!("Reusing existing index");
            return Ok((index, false));
        }

        let _guard = self.build_locks.lock(id.as_str()).await;
        let file_lock =
            FileLock::acquire(&self.lock_path(id), self.lock_timeout, self.stale_lock).await?;

        // Another task or process may have finished the build while we waited.
        if let Some(index) = self.load(id)? {
            info!("Index was built concurrently, reusing it");
            return Ok((index, false));
        }

        let _heartbeat = file_lock.keep_alive(self.stale_lock / 3);
        let index = self.build(id, chunks, title).await?;
        Ok((index, true))
    }

    async fn build(
        &self,
        id: &VideoId,
        chunks: &[Chunk],
        title: Option<&str>,
    ) -> Result<Arc<VectorIndex>> {
        if chunks.is_empty() {
            return Err(TubeqaError::EmptyTranscript(id.to_string()));
        }

        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| fallback_title(id.as_str()));

        info!("Embedding {} chunks", chunks.len());
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(TubeqaError::IndexBuild(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let entries = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry {
                index: chunk.index,
                content: chunk.text.clone(),
                embedding,
            })
            .collect();

        let artifact = IndexArtifact::new(
            id.clone(),
            title.clone(),
            self.embedder.model(),
            self.embedder.dimensions(),
            entries,
        );

        let path = self.artifact_path(id);
        artifact
            .write_atomic(&path)
            .map_err(|e| TubeqaError::IndexBuild(format!("Failed to write {:?}: {}", path, e)))?;

        if let Err(e) = self.catalog.put(id, CatalogEntry::new(&title)) {
            // Keep artifact and catalog in step.
            if let Err(remove_err) = std::fs::remove_file(&path) {
                warn!("Failed to roll back {:?}: {}", path, remove_err);
            }
            return Err(TubeqaError::IndexBuild(format!(
                "Failed to record catalog entry: {}",
                e
            )));
        }

        info!("Saved index for \"{}\" to {:?}", title, path);
        Ok(Arc::new(VectorIndex::new(artifact, self.embedder.clone())?))
    }

    /// Load a persisted index without building. `Ok(None)` if none exists.
    #[instrument(skip(self), fields(video_id = %id))]
    pub fn load(&self, id: &VideoId) -> Result<Option<Arc<VectorIndex>>> {
        let path = self.artifact_path(id);
        let artifact = match IndexArtifact::read(&path) {
            Ok(artifact) => artifact,
            Err(TubeqaError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TubeqaError::IndexBuild(format!(
                    "Failed to load index {:?}: {}",
                    path, e
                )))
            }
        };

        if &artifact.video_id != id {
            return Err(TubeqaError::IndexBuild(format!(
                "Index file {:?} belongs to video {}",
                path, artifact.video_id
            )));
        }

        debug!("Loaded index with {} entries", artifact.entries.len());
        Ok(Some(Arc::new(VectorIndex::new(artifact, self.embedder.clone())?)))
    }

    /// Load a persisted index, failing with `IndexNotFound` if there is none.
    pub fn require(&self, id: &VideoId) -> Result<Arc<VectorIndex>> {
        self.load(id)?
            .ok_or_else(|| TubeqaError::IndexNotFound(id.to_string()))
    }

    /// The video whose artifact was modified most recently.
    pub fn most_recent(&self) -> Result<Option<VideoId>> {
        let mut latest: Option<(SystemTime, VideoId)> = None;

        for (id, path) in self.artifacts()? {
            let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!("Skipping {:?}: {}", path, e);
                    continue;
                }
            };
            if latest.as_ref().map_or(true, |(t, _)| modified > *t) {
                latest = Some((modified, id));
            }
        }

        Ok(latest.map(|(_, id)| id))
    }

    /// All indexed videos as `(title, id)` pairs.
    pub fn list_all(&self) -> Result<Vec<(String, VideoId)>> {
        Ok(self
            .catalog
            .list_all()?
            .into_iter()
            .map(|(id, entry)| (entry.title, id))
            .collect())
    }

    /// Catalog title for `id`.
    pub fn title(&self, id: &VideoId) -> Result<Option<String>> {
        Ok(self.catalog.get(id)?.map(|e| e.title))
    }

    /// Find a video by exact title, falling back to a case-insensitive match.
    pub fn find_by_title(&self, title: &str) -> Result<Option<VideoId>> {
        let all = self.list_all()?;
        let wanted = title.trim();

        if let Some((_, id)) = all.iter().find(|(t, _)| t == wanted) {
            return Ok(Some(id.clone()));
        }

        let lower = wanted.to_lowercase();
        Ok(all
            .into_iter()
            .find(|(t, _)| t.to_lowercase() == lower)
            .map(|(_, id)| id))
    }

    /// Delete the index and catalog entry for `id`. Returns whether anything was removed.
    #[instrument(skip(self), fields(video_id = %id))]
    pub async fn delete(&self, id: &VideoId) -> Result<bool> {
        let _guard = self.build_locks.lock(id.as_str()).await;
        let _file_lock =
            FileLock::acquire(&self.lock_path(id), self.lock_timeout, self.stale_lock).await?;

        let had_catalog = self.catalog.remove(id)?;
        let had_artifact = match std::fs::remove_file(self.artifact_path(id)) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        if had_catalog || had_artifact {
            info!("Deleted index");
        }
        Ok(had_catalog || had_artifact)
    }

    /// Make the catalog agree with the artifacts on disk.
    ///
    /// Artifacts without a catalog entry get one (using the title stored in the
    /// artifact). Catalog entries without an artifact are dropped. Artifacts that
    /// cannot be parsed are renamed to `*.corrupt`. Each video is repaired under its
    /// lock file; videos locked by an in-progress build or delete are skipped.
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        let mut ids: BTreeSet<VideoId> = self.artifacts()?.into_iter().map(|(id, _)| id).collect();
        ids.extend(self.catalog.list_all()?.into_iter().map(|(id, _)| id));

        for id in ids {
            let Some(_lock) = FileLock::try_acquire(&self.lock_path(&id), self.stale_lock)? else {
                debug!("Skipping {} while another writer holds its lock", id);
                report.skipped.push(id);
                continue;
            };
            self.reconcile_one(&id, &mut report)?;
        }

        Ok(report)
    }

    /// Repair one video. The caller holds its lock file.
    fn reconcile_one(&self, id: &VideoId, report: &mut ReconcileReport) -> Result<()> {
        let path = self.artifact_path(id);

        if path.is_file() {
            match IndexArtifact::read(&path) {
                Ok(artifact) if &artifact.video_id == id => {
                    if self.catalog.get(id)?.is_none() {
                        self.catalog.put(id, CatalogEntry::new(&artifact.title))?;
                        report.restored.push(id.clone());
                    }
                    return Ok(());
                }
                Ok(_) | Err(_) => {
                    let quarantine = path.with_extension("json.corrupt");
                    warn!("Moving unreadable index {:?} to {:?}", path, quarantine);
                    std::fs::rename(&path, &quarantine)?;
                    report.quarantined.push(quarantine);
                }
            }
        }

        if self.catalog.remove(id)? {
            report.removed.push(id.clone());
        }
        Ok(())
    }

    /// Every `<id>.index.json` in the index directory.
    fn artifacts(&self) -> Result<Vec<(VideoId, PathBuf)>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.index_dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(stem) = name.strip_suffix(ARTIFACT_SUFFIX) else {
                continue;
            };
            match VideoId::try_from(stem.to_string()) {
                Ok(id) => found.push((id, path)),
                Err(_) => debug!("Ignoring {:?}", path),
            }
        }
        Ok(found)
    }
}

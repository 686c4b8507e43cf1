//! Video metadata catalog.
//!
//! Maps each indexed video to its display title. The catalog is shared by every
//! session using the same index directory, so each backend performs its
//! read-merge-write as a single atomic step.

mod json;
mod sqlite;

pub use json::JsonFileCatalog;
pub use sqlite::SqliteCatalog;

use crate::config::{CatalogBackend, IndexSettings, Settings};
use crate::error::Result;
use crate::video_source::VideoId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Display metadata recorded for an indexed video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Human-readable video title.
    pub title: String,
}

impl CatalogEntry {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// Persistent catalog of indexed videos.
pub trait CatalogRepository: Send + Sync {
    /// Look up one video.
    fn get(&self, id: &VideoId) -> Result<Option<CatalogEntry>>;

    /// Insert or replace the entry for a video.
    fn put(&self, id: &VideoId, entry: CatalogEntry) -> Result<()>;

    /// Remove the entry for a video. Returns whether one existed.
    fn remove(&self, id: &VideoId) -> Result<bool>;

    /// All entries, in no particular order.
    fn list_all(&self) -> Result<Vec<(VideoId, CatalogEntry)>>;
}

/// Open the configured catalog backend inside `index_dir`.
pub fn open_catalog(index_dir: &Path, settings: &IndexSettings) -> Result<Arc<dyn CatalogRepository>> {
    let catalog: Arc<dyn CatalogRepository> = match settings.catalog {
        CatalogBackend::Json => Arc::new(
            JsonFileCatalog::new(index_dir.join(JsonFileCatalog::FILE_NAME))?.with_lock_timeouts(
                Duration::from_secs(settings.lock_timeout_seconds),
                Duration::from_secs(settings.stale_lock_seconds),
            ),
        ),
        CatalogBackend::Sqlite => Arc::new(SqliteCatalog::new(&index_dir.join(SqliteCatalog::FILE_NAME))?),
    };
    Ok(catalog)
}

/// Open the catalog described by the full settings.
pub fn open_from_settings(settings: &Settings) -> Result<Arc<dyn CatalogRepository>> {
    open_catalog(&settings.index_dir(), &settings.index)
}

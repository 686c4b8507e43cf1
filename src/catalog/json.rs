//! JSON file catalog.
//!
//! Stores `{ "<video_id>": { "title": "..." } }` in a single file. Every mutation
//! takes a lock file, re-reads the current table, applies the change and replaces
//! the file atomically through a temp file in the same directory.

use super::{CatalogEntry, CatalogRepository};
use crate::error::{Result, TubeqaError};
use crate::lock::FileLock;
use crate::video_source::VideoId;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument, warn};

type Table = BTreeMap<String, CatalogEntry>;

/// Catalog backed by one JSON file.
pub struct JsonFileCatalog {
    path: PathBuf,
    lock_timeout: Duration,
    stale_lock: Duration,
}

impl JsonFileCatalog {
    /// Default file name inside the index directory.
    pub const FILE_NAME: &'static str = "video_metadata.json";

    /// Create a catalog at `path`. The file is created lazily on first write.
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            lock_timeout: Duration::from_secs(30),
            stale_lock: Duration::from_secs(300),
        })
    }

    /// Override lock wait and stale-lock thresholds.
    pub fn with_lock_timeouts(mut self, timeout: Duration, stale_after: Duration) -> Self {
        self.lock_timeout = timeout;
        self.stale_lock = stale_after;
        self
    }

    /// Path of the catalog file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    fn read_table(&self) -> Result<Table> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Table::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Table::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_table(&self, table: &Table) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, table)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| TubeqaError::Io(e.error))?;
        Ok(())
    }

    /// Apply `change` to the current table under the catalog lock.
    fn update<T>(&self, change: impl FnOnce(&mut Table) -> T) -> Result<T> {
        let _lock = FileLock::acquire_blocking(&self.lock_path(), self.lock_timeout, self.stale_lock)?;
        let mut table = self.read_table()?;
        let out = change(&mut table);
        self.write_table(&table)?;
        Ok(out)
    }
}

impl CatalogRepository for JsonFileCatalog {
    fn get(&self, id: &VideoId) -> Result<Option<CatalogEntry>> {
        Ok(self.read_table()?.remove(id.as_str()))
    }

    #[instrument(skip(self, entry), fields(video_id = %id))]
    fn put(&self, id: &VideoId, entry: CatalogEntry) -> Result<()> {
        self.update(|table| {
            table.insert(id.to_string(), entry);
        })?;
        debug!("Recorded catalog entry");
        Ok(())
    }

    #[instrument(skip(self), fields(video_id = %id))]
    fn remove(&self, id: &VideoId) -> Result<bool> {
        self.update(|table| table.remove(id.as_str()).is_some())
    }

    fn list_all(&self) -> Result<Vec<(VideoId, CatalogEntry)>> {
        let table = self.read_table()?;
        Ok(table
            .into_iter()
            .filter_map(|(key, entry)| match VideoId::try_from(key.clone()) {
                Ok(id) => Some((id, entry)),
                Err(_) => {
                    warn!("Ignoring catalog entry with invalid video ID {:?}", key);
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn id(s: &str) -> VideoId {
        VideoId::parse(s).unwrap()
    }

    #[test]
    fn test_put_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = JsonFileCatalog::new(dir.path().join(JsonFileCatalog::FILE_NAME)).unwrap();

        assert!(catalog.list_all().unwrap().is_empty());
        assert!(catalog.get(&id("abc12345678")).unwrap().is_none());

        catalog
            .put(&id("abc12345678"), CatalogEntry::new("Cats"))
            .unwrap();
        catalog
            .put(&id("dQw4w9WgXcQ"), CatalogEntry::new("Never gonna"))
            .unwrap();

        assert_eq!(
            catalog.get(&id("abc12345678")).unwrap(),
            Some(CatalogEntry::new("Cats"))
        );
        assert_eq!(catalog.list_all().unwrap().len(), 2);

        assert!(catalog.remove(&id("abc12345678")).unwrap());
        assert!(!catalog.remove(&id("abc12345678")).unwrap());
        assert_eq!(catalog.list_all().unwrap().len(), 1);
        assert!(!catalog.lock_path().exists());
    }

    #[test]
    fn test_reads_legacy_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(JsonFileCatalog::FILE_NAME);
        std::fs::write(
            &path,
            r#"{
    "abc12345678": {
        "title": "Cats"
    },
    "../../oops": {
        "title": "Bad"
    }
}"#,
        )
        .unwrap();

        let catalog = JsonFileCatalog::new(path).unwrap();
        let all = catalog.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0.as_str(), "abc12345678");
        assert_eq!(all[0].1.title, "Cats");
    }

    #[test]
    fn test_concurrent_puts_do_not_lose_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(JsonFileCatalog::FILE_NAME);
        let catalog = Arc::new(JsonFileCatalog::new(path.clone()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let catalog = catalog.clone();
                std::thread::spawn(move || {
                    let video = id(&format!("video{:06}", i));
                    catalog
                        .put(&video, CatalogEntry::new(format!("Title {}", i)))
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // A second handle on the same file sees every write.
        let reopened = JsonFileCatalog::new(path).unwrap();
        assert_eq!(reopened.list_all().unwrap().len(), 8);
    }
}

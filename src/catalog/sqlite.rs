//! SQLite catalog implementation.

use super::{CatalogEntry, CatalogRepository};
use crate::error::{Result, TubeqaError};
use crate::video_source::VideoId;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, instrument, warn};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS videos (
    video_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Catalog stored in a SQLite database.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Default database file name inside the index directory.
    pub const FILE_NAME: &'static str = "catalog.db";

    /// Open (or create) the catalog database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(std::time::Duration::from_secs(10))?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened SQLite catalog at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory catalog (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TubeqaError::IndexBuild(format!("Failed to acquire catalog lock: {}", e)))
    }
}

impl CatalogRepository for SqliteCatalog {
    fn get(&self, id: &VideoId) -> Result<Option<CatalogEntry>> {
        let conn = self.conn()?;
        let title = conn
            .query_row(
                "SELECT title FROM videos WHERE video_id = ?1",
                params![id.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(title.map(CatalogEntry::new))
    }

    #[instrument(skip(self, entry), fields(video_id = %id))]
    fn put(&self, id: &VideoId, entry: CatalogEntry) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO videos (video_id, title, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(video_id) DO UPDATE SET title = excluded.title, updated_at = excluded.updated_at
            "#,
            params![id.as_str(), entry.title, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    #[instrument(skip(self), fields(video_id = %id))]
    fn remove(&self, id: &VideoId) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM videos WHERE video_id = ?1", params![id.as_str()])?;
        Ok(deleted > 0)
    }

    fn list_all(&self) -> Result<Vec<(VideoId, CatalogEntry)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT video_id, title FROM videos ORDER BY video_id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(key, title)| match VideoId::try_from(key.clone()) {
                Ok(id) => Some((id, CatalogEntry::new(title))),
                Err(_) => {
                    warn!("Ignoring catalog row with invalid video ID {:?}", key);
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_catalog() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        let id = VideoId::parse("abc12345678").unwrap();

        assert!(catalog.get(&id).unwrap().is_none());

        catalog.put(&id, CatalogEntry::new("Cats")).unwrap();
        catalog.put(&id, CatalogEntry::new("Cats, renamed")).unwrap();

        assert_eq!(catalog.get(&id).unwrap().unwrap().title, "Cats, renamed");
        assert_eq!(catalog.list_all().unwrap().len(), 1);

        assert!(catalog.remove(&id).unwrap());
        assert!(catalog.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_sqlite_catalog_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SqliteCatalog::FILE_NAME);
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();

        SqliteCatalog::new(&path)
            .unwrap()
            .put(&id, CatalogEntry::new("Never gonna"))
            .unwrap();

        let reopened = SqliteCatalog::new(&path).unwrap();
        assert_eq!(reopened.get(&id).unwrap().unwrap().title, "Never gonna");
    }
}

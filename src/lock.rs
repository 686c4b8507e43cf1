//! Advisory locks serializing writes to shared on-disk state.
//!
//! Two layers are used: [`KeyedLocks`] serializes tasks within this process and
//! [`FileLock`] serializes processes sharing the same index directory.

use crate::error::{Result, TubeqaError};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);

/// An exclusive lock file, removed when dropped.
///
/// The file holds a token unique to this holder. Only the holder whose token is
/// in the file removes or refreshes it.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    token: String,
}

impl FileLock {
    /// Try to take the lock once.
    ///
    /// Returns `Ok(None)` if another holder owns it. A lock file not refreshed for
    /// `stale_after` is treated as abandoned and removed.
    pub fn try_acquire(path: &Path, stale_after: Duration) -> Result<Option<Self>> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                let token = new_token();
                writeln!(file, "{}", token)?;
                debug!("Acquired lock {:?}", path);
                Ok(Some(Self {
                    path: path.to_path_buf(),
                    token,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                reclaim_if_stale(path, stale_after)?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Wait for the lock without blocking the runtime.
    pub async fn acquire(path: &Path, timeout: Duration, stale_after: Duration) -> Result<Self> {
        let started = Instant::now();
        loop {
            if let Some(lock) = Self::try_acquire(path, stale_after)? {
                return Ok(lock);
            }
            if started.elapsed() >= timeout {
                return Err(timed_out(path));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait for the lock on the current thread. For short critical sections only.
    pub fn acquire_blocking(path: &Path, timeout: Duration, stale_after: Duration) -> Result<Self> {
        let started = Instant::now();
        loop {
            if let Some(lock) = Self::try_acquire(path, stale_after)? {
                return Ok(lock);
            }
            if started.elapsed() >= timeout {
                return Err(timed_out(path));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the lock file still carries this holder's token.
    pub fn is_held(&self) -> bool {
        holds(&self.path, &self.token)
    }

    /// Bump the lock's modification time so it does not look abandoned.
    ///
    /// Returns `false` if the lock has been reclaimed by someone else.
    pub fn refresh(&self) -> Result<bool> {
        refresh(&self.path, &self.token)
    }

    /// Refresh the lock every `every` until the returned guard is dropped.
    ///
    /// Must be called within a Tokio runtime.
    pub fn keep_alive(&self, every: Duration) -> Heartbeat {
        let path = self.path.clone();
        let token = self.token.clone();
        let every = every.max(POLL_INTERVAL);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match refresh(&path, &token) {
                    Ok(true) => debug!("Refreshed lock {:?}", path),
                    Ok(false) => {
                        warn!("Lock {:?} was taken over by another holder", path);
                        break;
                    }
                    Err(e) => warn!("Failed to refresh lock {:?}: {}", path, e),
                }
            }
        });

        Heartbeat { handle }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim() == self.token => {
                if let Err(e) = std::fs::remove_file(&self.path) {
                    warn!("Failed to release lock {:?}: {}", self.path, e);
                }
            }
            Ok(_) => warn!(
                "Lock {:?} now belongs to another holder, leaving it in place",
                self.path
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Lock {:?} disappeared while held", self.path)
            }
            Err(e) => warn!("Failed to read lock {:?}: {}", self.path, e),
        }
    }
}

/// Background refresh of a [`FileLock`], stopped when dropped.
#[derive(Debug)]
pub struct Heartbeat {
    handle: JoinHandle<()>,
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn new_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(
        "{}-{}-{}",
        std::process::id(),
        nanos,
        NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)
    )
}

fn holds(path: &Path, token: &str) -> bool {
    std::fs::read_to_string(path).is_ok_and(|content| content.trim() == token)
}

fn refresh(path: &Path, token: &str) -> Result<bool> {
    if !holds(path, token) {
        return Ok(false);
    }
    OpenOptions::new()
        .write(true)
        .open(path)?
        .set_modified(SystemTime::now())?;
    Ok(true)
}

/// Remove an abandoned lock. The owner is read first so a lock reclaimed and
/// re-created by someone else in the meantime is left alone.
fn reclaim_if_stale(path: &Path, stale_after: Duration) -> Result<()> {
    let owner = match std::fs::read_to_string(path) {
        Ok(owner) => owner,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if !is_stale(path, stale_after) || !holds(path, owner.trim()) {
        return Ok(());
    }

    warn!("Removing abandoned lock {:?} held by {}", path, owner.trim());
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > stale_after)
}

fn timed_out(path: &Path) -> TubeqaError {
    TubeqaError::IndexBuild(format!(
        "Timed out waiting for lock {:?}; another process may be writing the same index",
        path
    ))
}

/// In-process async mutexes keyed by string.
///
/// Entries exist only while some task holds or waits for the key.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyedGuard<'_> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(key.to_string()).or_default().clone()
        };
        let guard = mutex.lock_owned().await;
        KeyedGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Exclusive access to one key of a [`KeyedLocks`] table.
#[derive(Debug)]
pub struct KeyedGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex (and its Arc) before checking for other users.
        drop(self.guard.take());

        let mut locks = self.locks.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

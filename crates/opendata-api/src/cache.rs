//! Cached serving of JSON data files.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use opendata_core::clock::Clock;

use crate::error::ApiError;

#[derive(Clone)]
struct CacheEntry {
    value: Arc<Value>,
    etag: String,
    modified: SystemTime,
    loaded_at: DateTime<Utc>,
}

/// A served document together with its cache identity.
#[derive(Debug, Clone)]
pub struct CachedDocument {
    /// The parsed file content.
    pub data: Arc<Value>,
    /// SHA-256 hex of the file bytes.
    pub etag: String,
    /// When the content was last loaded or revalidated.
    pub fetched_at: DateTime<Utc>,
}

/// In-memory cache over a directory of JSON files.
///
/// Entries are trusted for the configured TTL. Past the TTL the file is
/// re-statted and reloaded only when its mtime moved; entries for files
/// that disappeared are evicted.
pub struct DataCache {
    root: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl DataCache {
    #[must_use]
    pub fn new(root: PathBuf, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            root,
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cached entries.
    ///
    /// # Panics
    ///
    /// Panics if the cache lock is poisoned.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.read().expect("data cache lock poisoned").len()
    }

    /// Serves the JSON document at `path`, relative to the cache root.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for empty, absolute or
    /// traversing paths, [`ApiError::NotFound`] for missing files,
    /// [`ApiError::InvalidUpstreamData`] for files that do not hold
    /// JSON, and [`ApiError::Internal`] for other I/O failures.
    ///
    /// # Panics
    ///
    /// Panics if the cache lock is poisoned.
    pub async fn fetch(&self, path: &str) -> Result<CachedDocument, ApiError> {
        let relative = sanitize(path)?;
        let full_path = self.root.join(relative);
        let now = self.clock.now();

        // The lock is released before any filesystem access.
        let cached = self
            .entries
            .read()
            .expect("data cache lock poisoned")
            .get(path)
            .cloned();

        if let Some(entry) = cached {
            if now - entry.loaded_at < self.ttl {
                return Ok(CachedDocument {
                    data: entry.value,
                    etag: entry.etag,
                    fetched_at: entry.loaded_at,
                });
            }
            match tokio::fs::metadata(&full_path).await {
                Ok(meta) => {
                    let modified = file_mtime(&meta, path)?;
                    if modified == entry.modified {
                        let mut entries =
                            self.entries.write().expect("data cache lock poisoned");
                        if let Some(live) = entries.get_mut(path) {
                            live.loaded_at = now;
                        }
                        return Ok(CachedDocument {
                            data: entry.value,
                            etag: entry.etag,
                            fetched_at: now,
                        });
                    }
                    // mtime moved, reload below.
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    self.evict(path);
                    return Err(not_found(path));
                }
                Err(err) => {
                    return Err(ApiError::Internal(format!(
                        "failed to stat data file {path:?}: {err}"
                    )));
                }
            }
        }

        self.load(path, &full_path, now).await
    }

    async fn load(
        &self,
        path: &str,
        full_path: &Path,
        now: DateTime<Utc>,
    ) -> Result<CachedDocument, ApiError> {
        let bytes = match tokio::fs::read(full_path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                self.evict(path);
                return Err(not_found(path));
            }
            Err(err) => {
                return Err(ApiError::Internal(format!(
                    "failed to read data file {path:?}: {err}"
                )));
            }
        };
        let value: Value = serde_json::from_slice(&bytes).map_err(|_| {
            ApiError::InvalidUpstreamData(format!("data file {path:?} does not hold valid JSON"))
        })?;
        let meta = tokio::fs::metadata(full_path).await.map_err(|err| {
            ApiError::Internal(format!("failed to stat data file {path:?}: {err}"))
        })?;
        let modified = file_mtime(&meta, path)?;
        let etag = format!("{:x}", Sha256::digest(&bytes));

        let entry = CacheEntry {
            value: Arc::new(value),
            etag: etag.clone(),
            modified,
            loaded_at: now,
        };
        let document = CachedDocument {
            data: entry.value.clone(),
            etag,
            fetched_at: now,
        };
        self.entries
            .write()
            .expect("data cache lock poisoned")
            .insert(path.to_string(), entry);
        debug!(path, etag = %document.etag, "data file loaded into cache");
        Ok(document)
    }

    fn evict(&self, path: &str) {
        let removed = self
            .entries
            .write()
            .expect("data cache lock poisoned")
            .remove(path);
        if removed.is_some() {
            debug!(path, "evicted cache entry for deleted data file");
        }
    }
}

fn sanitize(path: &str) -> Result<PathBuf, ApiError> {
    if path.is_empty() {
        return Err(ApiError::Validation(
            "data path must not be empty".to_string(),
        ));
    }
    let mut clean = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            _ => {
                return Err(ApiError::Validation(format!(
                    "data path {path:?} is not allowed"
                )));
            }
        }
    }
    Ok(clean)
}

fn file_mtime(meta: &std::fs::Metadata, path: &str) -> Result<SystemTime, ApiError> {
    meta.modified().map_err(|err| {
        ApiError::Internal(format!("mtime unavailable for data file {path:?}: {err}"))
    })
}

fn not_found(path: &str) -> ApiError {
    ApiError::NotFound(format!("data file not found: {path}"))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration as StdDuration;

    use chrono::TimeZone;
    use opendata_test_support::MutableClock;
    use tempfile::TempDir;

    use super::*;

    fn cache_at(root: &TempDir, ttl_secs: i64) -> (DataCache, Arc<MutableClock>) {
        let clock = Arc::new(MutableClock::new(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        ));
        let cache = DataCache::new(
            root.path().to_path_buf(),
            Duration::seconds(ttl_secs),
            clock.clone(),
        );
        (cache, clock)
    }

    fn write_file(root: &TempDir, path: &str, contents: &str) {
        let full = root.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, contents).unwrap();
    }

    #[tokio::test]
    async fn test_fetch_parses_and_caches() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let (cache, _clock) = cache_at(&dir, 60);
        let contents = r#"{"rows": [1, 2, 3]}"#;
        write_file(&dir, "datasets/population.json", contents);

        // Act
        let document = cache.fetch("datasets/population.json").await.unwrap();

        // Assert
        assert_eq!(document.data["rows"][2], 3);
        let expected_etag = format!("{:x}", Sha256::digest(contents.as_bytes()));
        assert_eq!(document.etag, expected_etag);
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_fresh_entry_is_served_from_memory() {
        let dir = TempDir::new().unwrap();
        let (cache, _clock) = cache_at(&dir, 60);
        write_file(&dir, "report.json", r#"{"version": 1}"#);
        cache.fetch("report.json").await.unwrap();

        // The file changes, but the entry is still inside its TTL.
        write_file(&dir, "report.json", r#"{"version": 2}"#);
        let document = cache.fetch("report.json").await.unwrap();

        assert_eq!(document.data["version"], 1);
    }

    #[tokio::test]
    async fn test_unchanged_mtime_is_trusted_past_ttl() {
        let dir = TempDir::new().unwrap();
        let (cache, clock) = cache_at(&dir, 60);
        write_file(&dir, "report.json", r#"{"version": 1}"#);
        let first = cache.fetch("report.json").await.unwrap();

        clock.advance(Duration::seconds(61));
        let second = cache.fetch("report.json").await.unwrap();

        assert_eq!(second.data["version"], 1);
        assert_eq!(second.etag, first.etag);
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_changed_file_is_reloaded_past_ttl() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let (cache, clock) = cache_at(&dir, 60);
        write_file(&dir, "report.json", r#"{"version": 1}"#);
        let first = cache.fetch("report.json").await.unwrap();

        // Act: replace the content and force a different mtime.
        write_file(&dir, "report.json", r#"{"version": 2}"#);
        let file = fs::OpenOptions::new()
            .write(true)
            .open(dir.path().join("report.json"))
            .unwrap();
        file.set_modified(SystemTime::now() + StdDuration::from_secs(5))
            .unwrap();
        clock.advance(Duration::seconds(61));
        let second = cache.fetch("report.json").await.unwrap();

        // Assert
        assert_eq!(second.data["version"], 2);
        assert_ne!(second.etag, first.etag);
    }

    #[tokio::test]
    async fn test_deleted_file_is_evicted_and_reported_missing() {
        let dir = TempDir::new().unwrap();
        let (cache, clock) = cache_at(&dir, 60);
        write_file(&dir, "report.json", r#"{"version": 1}"#);
        cache.fetch("report.json").await.unwrap();

        fs::remove_file(dir.path().join("report.json")).unwrap();
        clock.advance(Duration::seconds(61));
        let result = cache.fetch("report.json").await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_path_returns_not_found() {
        let dir = TempDir::new().unwrap();
        let (cache, _clock) = cache_at(&dir, 60);

        let result = cache.fetch("missing.json").await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_non_json_content_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (cache, _clock) = cache_at(&dir, 60);
        write_file(&dir, "broken.json", "these are not the bytes you are looking for");

        let result = cache.fetch("broken.json").await;

        assert!(matches!(result, Err(ApiError::InvalidUpstreamData(_))));
    }

    #[tokio::test]
    async fn test_traversing_and_absolute_paths_are_rejected() {
        let dir = TempDir::new().unwrap();
        let (cache, _clock) = cache_at(&dir, 60);

        for bad in ["../etc/passwd", "/etc/passwd", "", "a/../b.json", "./x.json"] {
            let result = cache.fetch(bad).await;
            assert!(
                matches!(result, Err(ApiError::Validation(_))),
                "path {bad:?} should be rejected"
            );
        }
    }
}

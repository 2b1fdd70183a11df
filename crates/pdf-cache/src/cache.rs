//! Artifact store: existence checks, touching reads and atomic writes

use crate::codec::sanitize;
use crate::error::{CacheError, Result};
use crate::locks::KeyLocks;
use crate::normalize::normalize_pdf;
use crate::scan::scan_cache_dir;
use crate::types::{CacheConfig, CacheScan, CacheStats};
use filetime::FileTime;
use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, error, info, warn};

/// A PDF cache backed by a single flat directory.
///
/// Cloning is cheap; clones share counters and write locks.
#[derive(Debug, Clone)]
pub struct PdfCache {
    config: Arc<CacheConfig>,
    /// Serializes concurrent writers of the same storage name
    write_locks: Arc<KeyLocks>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl PdfCache {
    /// Open a cache, creating its directory if needed.
    ///
    /// Failing to create the directory is the only error this type reports.
    pub async fn open(config: CacheConfig) -> Result<Self> {
        fs::create_dir_all(&config.cache_dir)
            .await
            .map_err(|source| CacheError::CreateDir {
                path: config.cache_dir.clone(),
                source,
            })?;
        info!(cache_dir = ?config.cache_dir, "Cache initialized");

        Ok(Self {
            config: Arc::new(config),
            write_locks: Arc::new(KeyLocks::default()),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Final path of the artifact stored under `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut file_name = sanitize(key);
        file_name.push_str(&self.config.artifact_suffix);
        self.config.cache_dir.join(file_name)
    }

    fn temp_path_for(&self, path: &Path) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(&self.config.temp_suffix);
        PathBuf::from(name)
    }

    /// Whether an artifact is stored under `key`. Errors count as absent.
    pub async fn exists(&self, key: &str) -> bool {
        let path = self.path_for(key);
        match fs::try_exists(&path).await {
            Ok(exists) => exists,
            Err(e) => {
                error!(key, path = ?path, error = %e, "Failed to check cache existence");
                false
            }
        }
    }

    /// Path of the artifact for `key`, refreshing its access time on a hit
    pub async fn get_path(&self, key: &str) -> Option<PathBuf> {
        if !self.exists(key).await {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Cache miss");
            return None;
        }

        let path = self.path_for(key);
        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(key, path = ?path, "Cache hit");
        touch(&path).await;
        Some(path)
    }

    /// Contents of the artifact for `key`, refreshing its access time on a hit
    pub async fn get_data(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.get_path(key).await?;
        match fs::read(&path).await {
            Ok(data) => {
                debug!(key, size = data.len(), "Read cached PDF");
                Some(data)
            }
            Err(e) => {
                error!(key, path = ?path, error = %e, "Failed to read cached PDF");
                None
            }
        }
    }

    /// Normalize `payload` and store it under `key`.
    ///
    /// The document is written to a temp file next to the final path and
    /// renamed into place, so readers see either the old or the new artifact.
    /// Failures are logged and leave the cache as it was. The write runs on
    /// the blocking pool and completes even if this future is dropped.
    pub async fn put(&self, key: &str, payload: Vec<u8>) {
        let storage_name = sanitize(key);
        let path = self.path_for(key);
        let temp_path = self.temp_path_for(&path);

        let guard = self.write_locks.acquire(&storage_name).await;
        debug!(key, path = ?path, "Scheduling cache write");

        let write = tokio::task::spawn_blocking(move || {
            let result = write_atomic(&payload, &temp_path, &path);
            drop(guard);
            result.map(|size| (path, size))
        });

        match write.await {
            Ok(Ok((path, size))) => info!(key, path = ?path, size, "Cached PDF"),
            Ok(Err(e)) => error!(key, error = %e, "Failed to cache PDF"),
            Err(e) => error!(key, error = %e, "Cache write task failed"),
        }
    }

    /// Scan the cache directory for valid entries
    pub async fn scan(&self) -> CacheScan {
        scan_cache_dir(&self.config).await
    }

    /// Keys of all valid cached documents
    pub async fn list_cached_keys(&self) -> Vec<String> {
        let keys: Vec<String> = self
            .scan()
            .await
            .entries
            .into_iter()
            .map(|entry| entry.key)
            .collect();
        info!(count = keys.len(), "Listed cached keys");
        keys
    }

    /// Get current cache statistics
    pub async fn stats(&self) -> CacheStats {
        let scan = self.scan().await;
        CacheStats {
            entries: scan.entries.len(),
            total_size: scan.total_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Set access and modification time to now. Failures are logged only.
async fn touch(path: &Path) {
    let target = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        let now = FileTime::now();
        filetime::set_file_times(&target, now, now)
    })
    .await;

    match result {
        Ok(Ok(())) => debug!(path = ?path, "Touched cache file"),
        Ok(Err(e)) => warn!(path = ?path, error = %e, "Failed to touch cache file"),
        Err(e) => warn!(path = ?path, error = %e, "Touch task failed"),
    }
}

/// Normalize, write to `temp_path`, rename onto `path`. Removes the temp
/// file on failure. Returns the stored size.
fn write_atomic(payload: &[u8], temp_path: &Path, path: &Path) -> Result<u64> {
    let result = write_then_rename(payload, temp_path, path);
    if result.is_err() {
        remove_temp(temp_path);
    }
    result
}

fn write_then_rename(payload: &[u8], temp_path: &Path, path: &Path) -> Result<u64> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let normalized = normalize_pdf(payload)?;

    let mut file = std::fs::File::create(temp_path)?;
    file.write_all(&normalized)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(temp_path, path)?;
    Ok(normalized.len() as u64)
}

fn remove_temp(temp_path: &Path) {
    match std::fs::remove_file(temp_path) {
        Ok(()) => debug!(path = ?temp_path, "Removed partial cache file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => error!(path = ?temp_path, error = %e, "Failed to remove partial cache file"),
    }
}

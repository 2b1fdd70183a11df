//! Cache directory scanning

use crate::codec::unsanitize;
use crate::types::{CacheConfig, CacheScan, ScannedEntry};
use std::io::ErrorKind;
use tokio::fs;
use tracing::{debug, error, warn};

/// Enumerate valid cache entries under `config.cache_dir`.
///
/// Temp files, files without the artifact suffix and empty files are skipped.
/// Files removed between listing and stat are skipped silently. A missing or
/// unreadable directory yields an empty scan.
pub(crate) async fn scan_cache_dir(config: &CacheConfig) -> CacheScan {
    let mut scan = CacheScan::default();

    let mut dir = match fs::read_dir(&config.cache_dir).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(cache_dir = ?config.cache_dir, "Cache directory not found during scan");
            return scan;
        }
        Err(e) => {
            error!(cache_dir = ?config.cache_dir, error = %e, "Failed to list cache directory");
            return scan;
        }
    };

    loop {
        let entry = match dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                error!(cache_dir = ?config.cache_dir, error = %e, "Failed to read cache directory entry");
                break;
            }
        };

        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            debug!(file_name = ?entry.file_name(), "Skipping non UTF-8 file name");
            continue;
        };
        let Some(storage_name) = storage_name_of(file_name, config) else {
            continue;
        };

        let path = entry.path();
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                error!(path = ?path, error = %e, "Failed to stat cache file during scan");
                continue;
            }
        };

        if !metadata.is_file() || metadata.len() == 0 {
            continue;
        }
        let Some(accessed) = config.recency.timestamp(&metadata) else {
            warn!(path = ?path, "No usable timestamp for cache file");
            continue;
        };

        scan.total_size += metadata.len();
        scan.entries.push(ScannedEntry {
            accessed,
            size: metadata.len(),
            key: unsanitize(storage_name),
            path,
        });
    }

    scan
}

/// Strip the artifact suffix from a complete entry's file name
fn storage_name_of<'a>(file_name: &'a str, config: &CacheConfig) -> Option<&'a str> {
    if !config.temp_suffix.is_empty() && file_name.ends_with(&config.temp_suffix) {
        return None;
    }
    file_name.strip_suffix(&config.artifact_suffix)
}

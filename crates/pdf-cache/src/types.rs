//! Cache types

use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::PathBuf;
use std::time::SystemTime;

pub const DEFAULT_ARTIFACT_SUFFIX: &str = ".pdf";
pub const DEFAULT_TEMP_SUFFIX: &str = ".part";

/// Which file timestamp serves as the LRU clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecencySource {
    /// Last access time (`atime`)
    #[default]
    AccessTime,
    /// Last modification time (`mtime`), for volumes mounted without atime tracking.
    /// Touches set both timestamps, so this sees the same hits.
    ModifiedTime,
}

impl RecencySource {
    /// Parse `atime` / `mtime` (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "atime" | "access" => Some(Self::AccessTime),
            "mtime" | "modified" => Some(Self::ModifiedTime),
            _ => None,
        }
    }

    /// Read the selected timestamp, falling back to the other one when the
    /// platform cannot report it.
    pub(crate) fn timestamp(self, metadata: &Metadata) -> Option<SystemTime> {
        match self {
            Self::AccessTime => metadata.accessed().or_else(|_| metadata.modified()).ok(),
            Self::ModifiedTime => metadata.modified().or_else(|_| metadata.accessed()).ok(),
        }
    }
}

/// Configuration for a [`crate::PdfCache`]
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub cache_dir: PathBuf,
    pub artifact_suffix: String,
    pub temp_suffix: String,
    pub recency: RecencySource,
}

impl CacheConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_recency(mut self, recency: RecencySource) -> Self {
        self.recency = recency;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache/pdf"),
            artifact_suffix: DEFAULT_ARTIFACT_SUFFIX.to_string(),
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
            recency: RecencySource::AccessTime,
        }
    }
}

/// A valid cache file found by a directory scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedEntry {
    pub accessed: SystemTime,
    pub size: u64,
    pub path: PathBuf,
    pub key: String,
}

/// Result of a directory scan
#[derive(Debug, Clone, Default)]
pub struct CacheScan {
    pub entries: Vec<ScannedEntry>,
    pub total_size: u64,
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub hits: u64,
    pub misses: u64,
}

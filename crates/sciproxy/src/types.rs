//! Request and response types for the proxy endpoints

use chrono::{DateTime, Utc};
use pdf_cache::{CacheStats, ScannedEntry};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStats,
}

/// A document currently held in the cache
#[derive(Debug, Serialize)]
pub struct CachedDocument {
    pub key: String,
    pub size: u64,
    pub last_accessed: DateTime<Utc>,
}

impl From<ScannedEntry> for CachedDocument {
    fn from(entry: ScannedEntry) -> Self {
        Self {
            key: entry.key,
            size: entry.size,
            last_accessed: entry.accessed.into(),
        }
    }
}

/// Body of a purge request; omitted limits are not applied
#[derive(Debug, Default, Deserialize)]
pub struct PurgeRequest {
    #[serde(default)]
    pub max_age_secs: Option<u64>,
    #[serde(default)]
    pub max_size_bytes: Option<u64>,
}

/// Keys removed by a purge
#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub purged: Vec<String>,
}

/// Query parameters accepted on document requests
#[derive(Debug, Default, Deserialize)]
pub struct DocumentQuery {
    /// Skip the cache lookup and fetch from upstream
    #[serde(default)]
    pub refresh: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_cached_document_from_entry() {
        let accessed = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let doc = CachedDocument::from(ScannedEntry {
            accessed,
            size: 2048,
            path: PathBuf::from("/cache/10.1@x.pdf"),
            key: "10.1/x".to_string(),
        });

        assert_eq!(doc.key, "10.1/x");
        assert_eq!(doc.size, 2048);
        assert_eq!(doc.last_accessed.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_purge_request_defaults() {
        let request: PurgeRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.max_age_secs, None);
        assert_eq!(request.max_size_bytes, None);

        let request: PurgeRequest = serde_json::from_str(r#"{"max_size_bytes": 0}"#).unwrap();
        assert_eq!(request.max_size_bytes, Some(0));
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            uptime_secs: 3600,
            cache: CacheStats {
                entries: 12,
                total_size: 5_000_000,
                hits: 40,
                misses: 8,
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("5000000"));
    }
}

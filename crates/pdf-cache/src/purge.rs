//! Age- and size-based eviction

use crate::cache::PdfCache;
use crate::types::ScannedEntry;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, error, info, warn};

enum Removal {
    Removed,
    AlreadyGone,
    Failed,
}

impl PdfCache {
    /// Purge entries by age, then by total size.
    ///
    /// * `max_age` - entries whose recency timestamp is older than this are
    ///   removed. `None` or zero skips the age phase.
    /// * `max_total_size` - after the age phase, least recently used entries
    ///   are removed until the total size is at or below this many bytes.
    ///   `None` skips the size phase; `Some(0)` empties the cache.
    ///
    /// Returns the keys that were removed. Failures are logged, never returned.
    pub async fn purge(
        &self,
        max_age: Option<Duration>,
        max_total_size: Option<u64>,
    ) -> HashSet<String> {
        let mut purged = HashSet::new();

        if let Some(max_age) = max_age.filter(|age| !age.is_zero()) {
            self.purge_by_age(max_age, &mut purged).await;
        }

        if let Some(max_total_size) = max_total_size {
            self.purge_by_size(max_total_size, &mut purged).await;
        }

        info!(purged = purged.len(), "Purge complete");
        purged
    }

    async fn purge_by_age(&self, max_age: Duration, purged: &mut HashSet<String>) {
        let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
            debug!(max_age_secs = max_age.as_secs(), "Age limit predates the epoch, nothing to purge");
            return;
        };
        info!(max_age_secs = max_age.as_secs(), "Starting age purge");

        let expired: Vec<ScannedEntry> = self
            .scan()
            .await
            .entries
            .into_iter()
            .filter(|entry| entry.accessed < cutoff)
            .collect();
        info!(count = expired.len(), "[Age purge] Found expired entries");

        for entry in expired {
            if let Removal::Removed = remove_entry(&entry).await {
                info!(key = %entry.key, path = ?entry.path, "[Age purge] Removed");
                purged.insert(entry.key);
            }
        }
    }

    async fn purge_by_size(&self, max_total_size: u64, purged: &mut HashSet<String>) {
        let scan = self.scan().await;
        let mut total = scan.total_size;
        info!(
            current_bytes = total,
            target_bytes = max_total_size,
            "Starting size purge"
        );

        if total <= max_total_size {
            info!("[Size purge] Cache size within limit");
            return;
        }

        let mut entries = scan.entries;
        entries.sort_by_key(|entry| entry.accessed);

        for entry in entries {
            if total <= max_total_size {
                break;
            }
            if let Removal::Removed = remove_entry(&entry).await {
                total = total.saturating_sub(entry.size);
                info!(key = %entry.key, size = entry.size, remaining_bytes = total, "[Size purge] Removed");
                purged.insert(entry.key);
            }
        }

        if total > max_total_size {
            warn!(
                remaining_bytes = total,
                target_bytes = max_total_size,
                "[Size purge] Finished above target size"
            );
        }
    }
}

async fn remove_entry(entry: &ScannedEntry) -> Removal {
    match fs::remove_file(&entry.path).await {
        Ok(()) => Removal::Removed,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = ?entry.path, "Cache file already removed");
            Removal::AlreadyGone
        }
        Err(e) => {
            error!(path = ?entry.path, error = %e, "Failed to remove cache file");
            Removal::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::normalize_pdf;
    use crate::test_support::{open_cache, sample_pdf, set_access_age};
    use std::collections::HashSet;
    use std::time::Duration;
    use tempfile::tempdir;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn keys(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_purge_without_limits_is_noop() {
        let dir = tempdir().unwrap();
        let cache = open_cache(dir.path()).await;
        cache.put("10.6000/keep", sample_pdf("keep")).await;

        assert!(cache.purge(None, None).await.is_empty());
        assert!(cache.exists("10.6000/keep").await);
    }

    #[tokio::test]
    async fn test_purge_zero_age_is_skipped() {
        let dir = tempdir().unwrap();
        let cache = open_cache(dir.path()).await;
        cache.put("10.6000/keep", sample_pdf("keep")).await;
        set_access_age(&cache.path_for("10.6000/keep"), 10 * DAY);

        assert!(cache.purge(Some(Duration::ZERO), None).await.is_empty());
        assert!(cache.exists("10.6000/keep").await);
    }

    #[tokio::test]
    async fn test_purge_by_age_only() {
        let dir = tempdir().unwrap();
        let cache = open_cache(dir.path()).await;
        cache.put("10.7000/old", sample_pdf("old")).await;
        cache.put("10.7000/new", sample_pdf("new")).await;
        set_access_age(&cache.path_for("10.7000/old"), 10 * DAY);
        set_access_age(&cache.path_for("10.7000/new"), DAY);

        let purged = cache.purge(Some(5 * DAY), None).await;

        assert_eq!(purged, keys(&["10.7000/old"]));
        assert!(!cache.exists("10.7000/old").await);
        assert!(cache.exists("10.7000/new").await);
    }

    #[tokio::test]
    async fn test_purge_by_age_just_added_survives() {
        let dir = tempdir().unwrap();
        let cache = open_cache(dir.path()).await;
        cache.put("10.7500/fresh", sample_pdf("fresh")).await;

        assert!(cache.purge(Some(DAY), None).await.is_empty());
        assert!(cache.exists("10.7500/fresh").await);
    }

    #[tokio::test]
    async fn test_purge_by_size_removes_least_recently_used() {
        let dir = tempdir().unwrap();
        let cache = open_cache(dir.path()).await;
        let names = ["10.8000/lru", "10.8000/middle", "10.8000/mru"];
        for (i, key) in names.iter().enumerate() {
            cache.put(key, sample_pdf(&format!("document number {i}"))).await;
        }
        set_access_age(&cache.path_for(names[0]), 3 * DAY);
        set_access_age(&cache.path_for(names[1]), 2 * DAY);
        set_access_age(&cache.path_for(names[2]), DAY);

        let scan = cache.scan().await;
        let size_of = |key: &str| scan.entries.iter().find(|e| e.key == key).unwrap().size;
        let target = size_of(names[1]) + size_of(names[2]) + 1;
        assert!(target < scan.total_size);

        let purged = cache.purge(None, Some(target)).await;

        assert_eq!(purged, keys(&[names[0]]));
        assert!(!cache.exists(names[0]).await);
        assert!(cache.exists(names[1]).await);
        assert!(cache.exists(names[2]).await);
    }

    #[tokio::test]
    async fn test_purge_by_size_exact_limit_is_noop() {
        let dir = tempdir().unwrap();
        let cache = open_cache(dir.path()).await;
        cache.put("10.8500/exact", sample_pdf("exact")).await;
        let total = cache.scan().await.total_size;

        assert!(cache.purge(None, Some(total)).await.is_empty());
        assert!(cache.exists("10.8500/exact").await);
    }

    #[tokio::test]
    async fn test_purge_by_size_ignores_temp_and_empty_files() {
        let dir = tempdir().unwrap();
        let cache = open_cache(dir.path()).await;
        cache.put("10.8600/real", sample_pdf("real")).await;
        let root = cache.config().cache_dir.clone();
        std::fs::write(root.join("10.8600@partial.pdf.part"), vec![0u8; 64 * 1024]).unwrap();
        std::fs::write(root.join("10.8600@empty.pdf"), b"").unwrap();
        let real_size = cache.scan().await.total_size;

        assert!(cache.purge(None, Some(real_size)).await.is_empty());

        let purged = cache.purge(None, Some(0)).await;
        assert_eq!(purged, keys(&["10.8600/real"]));
        assert!(root.join("10.8600@partial.pdf.part").exists());
        assert!(root.join("10.8600@empty.pdf").exists());
    }

    #[tokio::test]
    async fn test_age_phase_runs_before_size_phase() {
        let dir = tempdir().unwrap();
        let cache = open_cache(dir.path()).await;
        cache.put("10.9500/expired", sample_pdf("expired")).await;
        cache.put("10.9500/older", sample_pdf("older")).await;
        cache.put("10.9500/recent", sample_pdf("recent")).await;
        set_access_age(&cache.path_for("10.9500/expired"), 30 * DAY);
        set_access_age(&cache.path_for("10.9500/older"), 2 * DAY);
        set_access_age(&cache.path_for("10.9500/recent"), DAY);

        let scan = cache.scan().await;
        let survivors: u64 = scan
            .entries
            .iter()
            .filter(|e| e.key != "10.9500/expired")
            .map(|e| e.size)
            .sum();

        // The size phase must see the total left after the age phase.
        let purged = cache.purge(Some(7 * DAY), Some(survivors)).await;

        assert_eq!(purged, keys(&["10.9500/expired"]));
        assert!(cache.exists("10.9500/older").await);
        assert!(cache.exists("10.9500/recent").await);
    }

    #[tokio::test]
    async fn test_purge_by_size_purge_all() {
        let dir = tempdir().unwrap();
        let cache = open_cache(dir.path()).await;
        let documents = [
            ("10.9000/small", "a"),
            ("10.9000/medium", "a somewhat longer body of text"),
            ("10.9000/large", "an even longer body of text that makes this document the largest one here"),
        ];
        for (key, text) in documents {
            cache.put(key, sample_pdf(text)).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(
            cache.get_data("10.9000/small").await.unwrap(),
            normalize_pdf(&sample_pdf("a")).unwrap()
        );

        let purged = cache.purge(None, Some(0)).await;

        assert_eq!(purged, keys(&documents.map(|(key, _)| key)));
        for (key, _) in documents {
            assert!(!cache.exists(key).await);
        }
        assert!(cache.list_cached_keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_purge_by_age_with_modified_time_clock() {
        use crate::{CacheConfig, PdfCache, RecencySource};
        use filetime::FileTime;
        use std::time::SystemTime;

        let dir = tempdir().unwrap();
        let config = CacheConfig::new(dir.path().join("cache")).with_recency(RecencySource::ModifiedTime);
        let cache = PdfCache::open(config).await.unwrap();
        cache.put("10.9900/stale", sample_pdf("stale")).await;
        cache.put("10.9900/fresh", sample_pdf("fresh")).await;

        let stale = FileTime::from_system_time(SystemTime::now() - 10 * DAY);
        filetime::set_file_mtime(cache.path_for("10.9900/stale"), stale).unwrap();

        let purged = cache.purge(Some(5 * DAY), None).await;
        assert_eq!(purged, keys(&["10.9900/stale"]));
        assert!(cache.exists("10.9900/fresh").await);
    }
}

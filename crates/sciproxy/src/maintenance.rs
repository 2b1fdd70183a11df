//! Periodic cache purge

use crate::config::PurgePolicy;
use pdf_cache::PdfCache;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Apply `policy` once and return the number of purged documents
pub async fn run_purge(cache: &PdfCache, policy: &PurgePolicy) -> usize {
    let purged = cache.purge(policy.max_age, policy.max_total_size).await;
    if purged.is_empty() {
        debug!("Scheduled purge removed nothing");
    } else {
        info!(count = purged.len(), "Scheduled purge removed documents");
    }
    purged.len()
}

/// Purge immediately and then every `period` until the task is aborted
pub fn spawn_purge_job(cache: PdfCache, policy: PurgePolicy, period: Duration) -> JoinHandle<()> {
    info!(
        period_secs = period.as_secs(),
        max_age_secs = policy.max_age.map(|d| d.as_secs()),
        max_total_size = policy.max_total_size,
        "Starting purge job"
    );

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            run_purge(&cache, &policy).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_cache::test_support::sample_pdf;
    use pdf_cache::CacheConfig;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_run_purge_applies_size_limit() {
        let dir = tempdir().unwrap();
        let cache = PdfCache::open(CacheConfig::new(dir.path())).await.unwrap();
        cache.put("10.1/a", sample_pdf("a")).await;
        cache.put("10.1/b", sample_pdf("b")).await;

        let policy = PurgePolicy {
            max_age: None,
            max_total_size: Some(0),
        };
        assert_eq!(run_purge(&cache, &policy).await, 2);
        assert!(cache.list_cached_keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_purge_keeps_recent_documents() {
        let dir = tempdir().unwrap();
        let cache = PdfCache::open(CacheConfig::new(dir.path())).await.unwrap();
        cache.put("10.1/a", sample_pdf("a")).await;

        let policy = PurgePolicy {
            max_age: Some(Duration::from_secs(3600)),
            max_total_size: None,
        };
        assert_eq!(run_purge(&cache, &policy).await, 0);
        assert_eq!(cache.list_cached_keys().await, vec!["10.1/a".to_string()]);
    }

    #[tokio::test]
    async fn test_purge_job_runs_repeatedly() {
        let dir = tempdir().unwrap();
        let cache = PdfCache::open(CacheConfig::new(dir.path())).await.unwrap();
        let policy = PurgePolicy {
            max_age: None,
            max_total_size: Some(0),
        };

        let job = spawn_purge_job(cache.clone(), policy, Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Added after the first run, removed by a later one
        cache.put("10.1/late", sample_pdf("late")).await;
        let mut removed = false;
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(25)).await;
            if !cache.exists("10.1/late").await {
                removed = true;
                break;
            }
        }

        job.abort();
        assert!(removed);
    }
}

//! Sciproxy - DOI to PDF proxy
//!
//! Resolves DOIs to PDFs through a chain of upstream sources and keeps the
//! downloaded documents in a filesystem cache.

mod config;
mod error;
mod maintenance;
mod server;
mod types;

use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::maintenance::{run_purge, spawn_purge_job};
use crate::server::{start_server, ServerState, SharedState};
use doi_fetch::{DoiResolver, IeeeSource, SciHubSource, SourceChain};
use pdf_cache::PdfCache;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("sciproxy=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting sciproxy...");

    let config = Config::from_env()?;
    info!("Listen address: {}", config.bind_addr);
    info!("Cache dir: {:?}", config.cache.cache_dir);
    info!("Cache recency: {:?}", config.cache.recency);
    if let Some(max_total_size) = config.purge.max_total_size {
        info!("Max cache size: {} MB", max_total_size / (1024 * 1024));
    }
    if let Some(max_age) = config.purge.max_age {
        info!("Max document age: {} seconds", max_age.as_secs());
    }

    let cache = PdfCache::open(config.cache.clone()).await.map_err(|e| {
        error!(error = %e, "Cache directory is unusable");
        e
    })?;

    let sources = build_sources(&config)?;
    info!("Upstream sources: {:?}", sources.source_names());

    let purge_job = match (config.purge.is_enabled(), config.purge_interval) {
        (true, Some(period)) => Some(spawn_purge_job(cache.clone(), config.purge, period)),
        (true, None) => {
            run_purge(&cache, &config.purge).await;
            None
        }
        (false, _) => None,
    };

    let state: SharedState = Arc::new(ServerState::new(cache, sources));

    let served = start_server(state, config.bind_addr, shutdown_signal())
        .await
        .map_err(|e| ProxyError::Config(format!("Server error: {}", e)));

    if let Some(job) = purge_job {
        job.abort();
    }
    info!("Shutdown complete");

    served
}

fn build_sources(config: &Config) -> Result<SourceChain> {
    let resolver = Arc::new(DoiResolver::with_base_url(&config.doi_resolver_url)?);
    let ieee = IeeeSource::new(
        resolver,
        &config.ieee_hostname,
        config.ieee_proxy_url.as_deref(),
    )?;
    let scihub = SciHubSource::with_base_url(&config.scihub_url)?;

    Ok(SourceChain::new()
        .with_source(Arc::new(ieee))
        .with_source(Arc::new(scihub)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

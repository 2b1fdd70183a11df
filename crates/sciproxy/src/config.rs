//! Configuration parsed from environment variables

use crate::error::{ProxyError, Result};
use pdf_cache::{CacheConfig, RecencySource};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const BYTES_PER_MBYTE: f64 = 1024.0 * 1024.0;

/// Limits applied by each purge run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PurgePolicy {
    pub max_age: Option<Duration>,
    pub max_total_size: Option<u64>,
}

impl PurgePolicy {
    pub fn is_enabled(&self) -> bool {
        self.max_age.is_some() || self.max_total_size.is_some()
    }
}

/// Proxy configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub cache: CacheConfig,
    pub purge: PurgePolicy,
    /// `None` disables the periodic purge job
    pub purge_interval: Option<Duration>,
    pub doi_resolver_url: String,
    pub ieee_hostname: String,
    pub ieee_proxy_url: Option<String>,
    pub scihub_url: String,
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Parse configuration from any variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let host: IpAddr = host
            .parse()
            .map_err(|_| ProxyError::Config(format!("invalid HOST: {}", host)))?;

        let port = match var("PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| ProxyError::Config(format!("invalid PORT: {}", port)))?,
            None => 8080,
        };

        let cache_dir = var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./cache/pdf"));

        let recency = match var("CACHE_RECENCY") {
            Some(value) => RecencySource::parse(&value).ok_or_else(|| {
                ProxyError::Config(format!("invalid CACHE_RECENCY: {} (expected atime or mtime)", value))
            })?,
            None => RecencySource::AccessTime,
        };

        let max_age = var("CACHE_MAX_AGE_DAYS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(|days| {
                days.checked_mul(SECONDS_PER_DAY)
                    .map(Duration::from_secs)
                    .ok_or_else(|| {
                        ProxyError::Config(format!("CACHE_MAX_AGE_DAYS out of range: {}", days))
                    })
            })
            .transpose()?;

        let max_total_size = var("CACHE_MAX_SIZE_MB")
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|mb| *mb >= 0.0)
            .map(|mb| (mb * BYTES_PER_MBYTE) as u64);

        let purge_interval = var("PURGE_INTERVAL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .map_or(Some(Duration::from_secs(3600)), |secs| {
                (secs > 0).then(|| Duration::from_secs(secs))
            });

        let doi_resolver_url =
            var("DOI_RESOLVER_URL").unwrap_or_else(|| "https://doi.org".to_string());

        let ieee_hostname =
            var("IEEE_HOSTNAME").unwrap_or_else(|| doi_fetch::ieee::IEEE_HOSTNAME.to_string());

        let ieee_proxy_url = var("IEEE_PROXY_URL").filter(|s| !s.is_empty());

        let scihub_url = var("SCIHUB_URL")
            .unwrap_or_else(|| doi_fetch::scihub::DEFAULT_SCIHUB_URL.to_string());

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            cache: CacheConfig::new(cache_dir).with_recency(recency),
            purge: PurgePolicy {
                max_age,
                max_total_size,
            },
            purge_interval,
            doi_resolver_url,
            ieee_hostname,
            ieee_proxy_url,
            scihub_url,
        })
    }
}

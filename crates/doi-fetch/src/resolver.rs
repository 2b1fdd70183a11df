//! DOI → landing page resolution

use std::time::Duration;

use moka::future::Cache;
use reqwest::Client;
use tracing::debug;

use crate::error::Result;
use crate::USER_AGENT;

const DEFAULT_RESOLVER_URL: &str = "https://doi.org";
const CACHE_TTL_SECS: u64 = 3600; // 1 hour

/// Follows doi.org redirects to find where a DOI lands
pub struct DoiResolver {
    client: Client,
    base_url: String,
    cache: Cache<String, String>,
}

impl DoiResolver {
    /// Create a resolver that uses doi.org
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_RESOLVER_URL)
    }

    /// Create a resolver against a custom DOI resolver URL
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(CACHE_TTL_SECS))
            .build();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    /// URL queried for `doi`
    pub fn doi_url(&self, doi: &str) -> String {
        format!("{}/{}", self.base_url, doi)
    }

    /// Final URL after following all redirects for `doi`.
    ///
    /// The landing status is not checked: an unknown DOI resolves to the
    /// resolver's own URL, which no source will accept. Only successful
    /// lookups are cached.
    pub async fn resolve(&self, doi: &str) -> Result<String> {
        if let Some(cached) = self.cache.get(doi).await {
            return Ok(cached);
        }

        let url = self.doi_url(doi);
        let response = self.client.head(&url).send().await?;
        let landing = response.url().to_string();
        debug!(doi, landing = %landing, status = %response.status(), "Resolved DOI");

        if response.status().is_success() {
            self.cache.insert(doi.to_string(), landing.clone()).await;
        }
        Ok(landing)
    }
}

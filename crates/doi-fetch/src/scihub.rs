//! Sci-Hub source

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::{info, warn};

use crate::error::{FetchError, Result};
use crate::source::PdfSource;
use crate::USER_AGENT;

pub const DEFAULT_SCIHUB_URL: &str = "https://sci-hub.se";
const RETRY_LIMIT: u32 = 4;
const BACKOFF_BASE_SECS: u64 = 3;

/// Scrapes the Sci-Hub article page for the embedded PDF link
pub struct SciHubSource {
    client: Client,
    base_url: String,
    retry_limit: u32,
}

impl SciHubSource {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_SCIHUB_URL)
    }

    /// Create a source for a specific Sci-Hub mirror
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_limit: RETRY_LIMIT,
        })
    }

    /// Absolute URL for a link found on the article page
    pub fn pdf_url(&self, link: &str) -> String {
        if link.starts_with("//") {
            format!("https:{}", link)
        } else {
            format!("{}{}", self.base_url, link)
        }
    }

    /// Download `pdf_url`, retrying connection failures with exponential backoff
    async fn fetch_with_retry(&self, pdf_url: &str) -> Result<Vec<u8>> {
        let mut last_error = None;

        for attempt in 0..self.retry_limit {
            match self.client.get(pdf_url).send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.bytes().await?.to_vec());
                }
                Ok(response) => {
                    warn!(status = %response.status(), url = %pdf_url, "Sci-Hub refused PDF download");
                    return Err(FetchError::Status {
                        url: pdf_url.to_string(),
                        status: response.status().as_u16(),
                    });
                }
                Err(e) if e.is_connect() => {
                    warn!(attempt = attempt + 1, url = %pdf_url, error = %e, "Connection to Sci-Hub failed");
                    last_error = Some(e);
                    if attempt + 1 < self.retry_limit {
                        tokio::time::sleep(backoff(attempt)).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(attempts = self.retry_limit, url = %pdf_url, "Giving up on Sci-Hub download");
        Err(match last_error {
            Some(e) => e.into(),
            None => FetchError::NotFound(pdf_url.to_string()),
        })
    }
}

#[async_trait]
impl PdfSource for SciHubSource {
    fn name(&self) -> &str {
        "scihub"
    }

    async fn fetch_pdf(&self, doi: &str) -> Result<Vec<u8>> {
        let page_url = format!("{}/{}", self.base_url, doi);
        info!(doi, url = %page_url, "Fetching PDF from Sci-Hub");

        let page = self.client.get(&page_url).send().await?.text().await?;
        let link = extract_pdf_link(&page).ok_or_else(|| {
            warn!(doi, "No PDF link on Sci-Hub page");
            FetchError::Extraction(format!("no PDF link for {} on Sci-Hub", doi))
        })?;

        let pdf_url = self.pdf_url(link);
        info!(doi, url = %pdf_url, "Found Sci-Hub PDF link");
        self.fetch_with_retry(&pdf_url).await
    }
}

/// Path of the PDF from the page's `location.href='...'` redirect
pub fn extract_pdf_link(page: &str) -> Option<&str> {
    static LINK: OnceLock<Regex> = OnceLock::new();
    let pattern = LINK.get_or_init(|| {
        Regex::new(r"location\.href='(/[^']*)'").expect("static regex is valid")
    });
    pattern
        .captures(page)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Delay before retry number `attempt + 1`: 1s, 3s, 9s, ...
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(BACKOFF_BASE_SECS.pow(attempt))
}

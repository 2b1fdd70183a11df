//! IEEE Xplore source

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{FetchError, Result};
use crate::resolver::DoiResolver;
use crate::source::PdfSource;
use crate::USER_AGENT;

pub const IEEE_HOSTNAME: &str = "ieeexplore.ieee.org";

/// Downloads PDFs for DOIs that land on IEEE Xplore.
///
/// `hostname` may point at an institutional mirror of IEEE Xplore; the DOI
/// must still resolve to `ieeexplore.ieee.org`.
pub struct IeeeSource {
    client: Client,
    resolver: Arc<DoiResolver>,
    hostname: String,
}

impl IeeeSource {
    /// Create a source downloading from `hostname`, optionally via an HTTP proxy
    pub fn new(resolver: Arc<DoiResolver>, hostname: &str, proxy_url: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(USER_AGENT);
        if let Some(proxy_url) = proxy_url {
            builder = builder.proxy(Proxy::all(proxy_url)?);
        }

        Ok(Self {
            client: builder.build()?,
            resolver,
            hostname: hostname.to_string(),
        })
    }

    /// Download URL for an IEEE document number
    pub fn pdf_url(&self, document_id: &str) -> String {
        format!(
            "https://{}/stampPDF/getPDF.jsp?tp=&arnumber={}",
            self.hostname, document_id
        )
    }

    async fn fetch_document(&self, document_id: &str) -> Result<Vec<u8>> {
        let url = self.pdf_url(document_id);
        info!(url = %url, "Fetching PDF from IEEE");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), url = %url, "IEEE refused PDF download");
            return Err(FetchError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl PdfSource for IeeeSource {
    fn name(&self) -> &str {
        "ieee"
    }

    async fn fetch_pdf(&self, doi: &str) -> Result<Vec<u8>> {
        let landing = self.resolver.resolve(doi).await?;
        if !landing.contains(IEEE_HOSTNAME) {
            debug!(doi, landing = %landing, "DOI does not resolve to IEEE");
            return Err(FetchError::Unsupported(format!(
                "{} does not resolve to {}",
                doi, IEEE_HOSTNAME
            )));
        }

        let document_id = extract_document_id(&landing).ok_or_else(|| {
            FetchError::Extraction(format!("no document id in {}", landing))
        })?;
        info!(doi, landing = %landing, document_id = %document_id, "Resolved IEEE document");

        self.fetch_document(&document_id).await
    }
}

/// Document number from an IEEE landing URL such as
/// `https://ieeexplore.ieee.org/document/771073/`
pub fn extract_document_id(landing: &str) -> Option<String> {
    let url = Url::parse(landing).ok()?;
    let mut segments = url.path_segments()?;
    segments.find(|segment| *segment == "document")?;
    segments
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

//! Ordered fallback over several sources

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{FetchError, Result};
use crate::source::PdfSource;

/// A PDF and the name of the source that delivered it
#[derive(Debug, Clone)]
pub struct FetchedPdf {
    pub data: Vec<u8>,
    pub source: String,
}

/// Tries each source in order until one returns a document
#[derive(Clone, Default)]
pub struct SourceChain {
    sources: Vec<Arc<dyn PdfSource>>,
}

impl SourceChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source; sources are tried in insertion order
    pub fn with_source(mut self, source: Arc<dyn PdfSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Fetch `doi` from the first source that succeeds
    pub async fn fetch(&self, doi: &str) -> Result<FetchedPdf> {
        for source in &self.sources {
            match source.fetch_pdf(doi).await {
                Ok(data) if !data.is_empty() => {
                    info!(doi, source = source.name(), size = data.len(), "Fetched PDF");
                    return Ok(FetchedPdf {
                        data,
                        source: source.name().to_string(),
                    });
                }
                Ok(_) => warn!(doi, source = source.name(), "Source returned an empty document"),
                Err(e) => warn!(doi, source = source.name(), error = %e, "Source failed"),
            }
        }

        Err(FetchError::NotFound(doi.to_string()))
    }
}

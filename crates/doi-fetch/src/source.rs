//! The capability shared by all document sources

use crate::error::Result;
use async_trait::async_trait;

/// Something that can fetch the PDF for a DOI
#[async_trait]
pub trait PdfSource: Send + Sync {
    /// Short name used in logs and responses
    fn name(&self) -> &str;

    /// Download the PDF bytes for `doi`
    async fn fetch_pdf(&self, doi: &str) -> Result<Vec<u8>>;
}

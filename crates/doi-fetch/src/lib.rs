//! DOI PDF fetching
//!
//! Resolves DOIs through doi.org and downloads the PDF from the first
//! source in a [`SourceChain`] that can deliver it.

pub mod chain;
pub mod error;
pub mod ieee;
pub mod resolver;
pub mod scihub;
pub mod source;

pub use chain::{FetchedPdf, SourceChain};
pub use error::{FetchError, Result};
pub use ieee::IeeeSource;
pub use resolver::DoiResolver;
pub use scihub::SciHubSource;
pub use source::PdfSource;

/// Browser user agent; several publishers reject library defaults
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/79.0.3945.130 Safari/537.36";

//! Error types for DOI fetching

use std::fmt;

#[derive(Debug)]
pub enum FetchError {
    Http(Box<reqwest::Error>),
    /// Upstream answered with a non-success status
    Status { url: String, status: u16 },
    /// The source does not handle this DOI
    Unsupported(String),
    /// The upstream response did not contain what the source expected
    Extraction(String),
    /// No source could deliver the document
    NotFound(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(err) => write!(f, "HTTP error: {}", err),
            FetchError::Status { url, status } => {
                write!(f, "Upstream returned status {} for {}", status, url)
            }
            FetchError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            FetchError::Extraction(msg) => write!(f, "Extraction error: {}", msg),
            FetchError::NotFound(doi) => write!(f, "No source could fetch {}", doi),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

//! Error types for the PDF cache

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum CacheError {
    /// The cache root could not be created
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    Io(std::io::Error),
    /// The payload is not a readable PDF
    Pdf(lopdf::Error),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::CreateDir { path, source } => {
                write!(f, "Failed to create cache directory {}: {}", path.display(), source)
            }
            CacheError::Io(err) => write!(f, "IO error: {}", err),
            CacheError::Pdf(err) => write!(f, "PDF error: {}", err),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::CreateDir { source, .. } => Some(source),
            CacheError::Io(err) => Some(err),
            CacheError::Pdf(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err)
    }
}

impl From<lopdf::Error> for CacheError {
    fn from(err: lopdf::Error) -> Self {
        CacheError::Pdf(err)
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

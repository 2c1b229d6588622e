use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum LecternError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("API Error: {0}")]
    Api(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("DownloadError: Failed to download '{0}' from '{1}': {2}")]
    DownloadError(String, String, String),

    #[error("Cache Error: {0}")]
    Cache(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Installation Error: {0}")]
    InstallError(String),

    #[error("Checksum Mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("Incompatible: {0}")]
    Incompatible(String),

    #[error("Archive Shape Error: {0}")]
    ArchiveShape(String),

    #[error("Another update workload is already running")]
    WorkloadActive,

    #[error("Parsing Error in {0}: {1}")]
    ParseError(&'static str, String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl From<std::io::Error> for LecternError {
    fn from(err: std::io::Error) -> Self {
        LecternError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for LecternError {
    fn from(err: reqwest::Error) -> Self {
        LecternError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for LecternError {
    fn from(err: serde_json::Error) -> Self {
        LecternError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LecternError>;

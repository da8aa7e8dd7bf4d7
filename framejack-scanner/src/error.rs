use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Target has no network origin: {0}")]
    OpaqueOrigin(String),
}

impl ScanError {
    /// Short tag used in log lines and crawl records
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::HttpError(e) if e.is_timeout() => "timeout",
            ScanError::HttpError(e) if e.is_connect() => "connect",
            ScanError::HttpError(_) => "http",
            ScanError::InvalidUrl(_) => "invalid-url",
            ScanError::OpaqueOrigin(_) => "opaque-origin",
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

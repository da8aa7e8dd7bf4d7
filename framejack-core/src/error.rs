use framejack_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Crawl error: {0}")]
    ScanError(#[from] ScanError),
}

/// Failures inside one browser check. None of these abort a scan; the
/// verifier turns them into an indeterminate verdict.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Browser error: {0}")]
    Browser(#[from] anyhow::Error),

    #[error("Could not encode PoC document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Verification exceeded {0:?}")]
    Deadline(std::time::Duration),

    #[error("Verification task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

use thiserror::Error;

/// Failure kinds for a [`super::Listener`]'s one-time setup phase, ported
/// from the original's `SetupException` hierarchy
/// (`executor_setup_exception.py`). Every variant here ends the Listener's
/// setup and is reported to the Orchestrator as `SETUP_FAILED`.
#[derive(Debug, Error, Clone)]
pub enum SetupError {
    #[error("failed to download artifact: {0}")]
    FileDownloadFailed(String),

    #[error("checksum mismatch for downloaded artifact: {0}")]
    CheckSumFailed(String),

    #[error("invalid contract address: {0}")]
    InvalidAddress(String),

    #[error("failed to compile contract code: {0}")]
    CompilationFailed(String),
}

impl From<crate::chain::ChainError> for SetupError {
    fn from(err: crate::chain::ChainError) -> Self {
        match err {
            crate::chain::ChainError::InvalidAddress(msg) => SetupError::InvalidAddress(msg),
            other => SetupError::FileDownloadFailed(other.to_string()),
        }
    }
}

impl From<crate::downloader::DownloadError> for SetupError {
    fn from(err: crate::downloader::DownloadError) -> Self {
        match err {
            crate::downloader::DownloadError::ChecksumMismatch { path } => {
                SetupError::CheckSumFailed(path)
            }
            other => SetupError::FileDownloadFailed(other.to_string()),
        }
    }
}

impl From<crate::proof::ProofError> for SetupError {
    fn from(err: crate::proof::ProofError) -> Self {
        SetupError::CompilationFailed(err.to_string())
    }
}

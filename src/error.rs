use crate::load::LoadStatus;
use crate::models::SourceType;

/// Errors surfaced by the transfer pipeline and its collaborators.
///
/// Payloads are plain strings so errors can be cloned out of worker tasks and
/// compared in tests.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransferError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Load check error: {0}")]
    LoadCheckError(String),

    #[error("Got terminate load status: {0}")]
    Terminated(String),

    #[error("Unknown load status: {0}")]
    UnknownLoadStatus(LoadStatus),

    #[error("No source configured for {0}")]
    MissingSource(SourceType),

    #[error("Source error: {0}")]
    SourceError(String),

    #[error("Corrupted archive: {0}")]
    CorruptedArchive(String),

    #[error("Archive error: {0}")]
    ArchiveError(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Worker error: {0}")]
    WorkerError(String),
}

impl TransferError {
    /// Whether this error is only a consequence of cancellation rather than a root cause.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }
}

impl From<std::io::Error> for TransferError {
    fn from(e: std::io::Error) -> Self {
        TransferError::ArchiveError(e.to_string())
    }
}

impl From<serde_json::Error> for TransferError {
    fn from(e: serde_json::Error) -> Self {
        TransferError::ArchiveError(format!("metadata serialization: {e}"))
    }
}

impl From<tokio::task::JoinError> for TransferError {
    fn from(e: tokio::task::JoinError) -> Self {
        TransferError::WorkerError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;

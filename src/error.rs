use crate::domain::payment::ValidationFailure;
use crate::domain::ports::HandoffError;
use crate::domain::tags::TagError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationFailure),
    #[error("Payment app unreachable: {0}")]
    HandoffUnreachable(#[from] HandoffError),
    #[error("Payment confirmed but the record was NOT saved: {0}")]
    PersistenceFailed(#[source] StorageError),
    #[error("A payment is already pending; finish or cancel it first")]
    AlreadyPending,
    #[error("No payment is waiting for confirmation")]
    NoConfirmationPending,
    #[error("Nothing has been scanned yet")]
    NoScannedPayload,
    #[error("The scan screen is closed; payments can no longer be handed off")]
    Detached,
    #[error("Failed to save expense: {0}")]
    Storage(#[from] StorageError),
    #[error("Tag error: {0}")]
    Tag(#[from] TagError),
}

/// Failures raised by persistence adapters.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage backend error: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        StorageError::Backend(Box::new(err))
    }
}

/// Failures reading a recorded session.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid event row: {0}")]
    InvalidRow(String),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

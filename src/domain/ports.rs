use super::expense::{CommittedRecord, NewExpense, RecordId};
use crate::error::StorageError;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandoffError {
    #[error("No payment app found to handle `{0}`")]
    Unreachable(String),
}

/// Launches the external payment app through a deep link.
///
/// The outcome of the payment itself is never observable here; only whether
/// the link could be opened.
#[async_trait]
pub trait HandoffLauncher: Send + Sync {
    async fn can_handle(&self, uri: &str) -> bool;
    async fn launch(&self, uri: &str) -> Result<(), HandoffError>;
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn insert(&self, expense: NewExpense) -> Result<RecordId, StorageError>;
    async fn all(&self) -> Result<Vec<CommittedRecord>, StorageError>;
}

/// Read-only list of tags the user may pick from.
pub trait TagSource: Send + Sync {
    fn tags(&self) -> Vec<String>;
}

pub type HandoffLauncherBox = Box<dyn HandoffLauncher>;
pub type ExpenseStoreBox = Box<dyn ExpenseStore>;

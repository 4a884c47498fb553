use crate::domain::expense::{CommittedRecord, NewExpense, RecordId};
use crate::domain::ports::{ExpenseStore, HandoffError, HandoffLauncher};
use crate::error::StorageError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for expense records.
///
/// Ids are handed out sequentially from 1, and records are listed in
/// insertion order. Ideal for testing or for runs where persistence is not
/// required.
#[derive(Default, Clone)]
pub struct InMemoryExpenseStore {
    records: Arc<RwLock<Vec<CommittedRecord>>>,
}

impl InMemoryExpenseStore {
    /// Creates a new, empty in-memory expense store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExpenseStore for InMemoryExpenseStore {
    async fn insert(&self, expense: NewExpense) -> Result<RecordId, StorageError> {
        let mut records = self.records.write().await;
        let id = RecordId(records.len() as u64 + 1);
        records.push(CommittedRecord::from_new(id, expense));
        Ok(id)
    }

    async fn all(&self) -> Result<Vec<CommittedRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records.clone())
    }
}

/// Opens deep links whose scheme belongs to an installed payment app.
///
/// Every successful launch is recorded so callers can inspect what was handed
/// off. Clones share the record.
#[derive(Default, Clone)]
pub struct SchemeLauncher {
    schemes: Arc<Vec<String>>,
    launched: Arc<RwLock<Vec<String>>>,
}

impl SchemeLauncher {
    pub fn new<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schemes: Arc::new(schemes.into_iter().map(Into::into).collect()),
            launched: Arc::default(),
        }
    }

    /// URIs launched so far, oldest first.
    pub async fn launched(&self) -> Vec<String> {
        self.launched.read().await.clone()
    }

    fn handles(&self, uri: &str) -> bool {
        self.schemes.iter().any(|scheme| uri.starts_with(scheme.as_str()))
    }
}

#[async_trait]
impl HandoffLauncher for SchemeLauncher {
    async fn can_handle(&self, uri: &str) -> bool {
        self.handles(uri)
    }

    async fn launch(&self, uri: &str) -> Result<(), HandoffError> {
        if !self.handles(uri) {
            return Err(HandoffError::Unreachable(uri.to_string()));
        }
        self.launched.write().await.push(uri.to_string());
        Ok(())
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spendscan::application::controller::ReconciliationController;
use spendscan::domain::expense::{CommittedRecord, NewExpense, RecordId};
use spendscan::domain::lifecycle::{LifecycleState, LifecycleWatcher};
use spendscan::domain::ports::ExpenseStore;
use spendscan::error::StorageError;
use spendscan::infrastructure::in_memory::{InMemoryExpenseStore, SchemeLauncher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const PAYLOAD: &str = "upi://pay?pa=x@bank";

pub fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
}

/// Counts calls to `insert` and optionally fails every one of them.
#[derive(Clone, Default)]
pub struct CountingStore {
    inner: InMemoryExpenseStore,
    inserts: Arc<AtomicUsize>,
    fail: bool,
}

impl CountingStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExpenseStore for CountingStore {
    async fn insert(&self, expense: NewExpense) -> Result<RecordId, StorageError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.inner.insert(expense).await
    }

    async fn all(&self) -> Result<Vec<CommittedRecord>, StorageError> {
        self.inner.all().await
    }
}

pub fn attached_controller(
    store: &CountingStore,
) -> (ReconciliationController, LifecycleWatcher, SchemeLauncher) {
    let launcher = SchemeLauncher::new(["upi://"]);
    let mut watcher = LifecycleWatcher::default();
    let mut controller =
        ReconciliationController::new(Box::new(launcher.clone()), Box::new(store.clone()));
    controller.attach(&mut watcher);
    (controller, watcher, launcher)
}

pub fn leave_and_return(watcher: &mut LifecycleWatcher) {
    watcher.transition(LifecycleState::Inactive);
    watcher.transition(LifecycleState::Background);
    watcher.transition(LifecycleState::Active);
}

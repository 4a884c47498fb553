use crate::domain::expense::{CommittedRecord, NewExpense, RecordId};
use crate::domain::ports::ExpenseStore;
use crate::error::StorageError;
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing expense records.
pub const CF_EXPENSES: &str = "expenses";
/// Column Family for bookkeeping such as the id counter.
pub const CF_META: &str = "meta";

const LAST_ID_KEY: &[u8] = b"last_id";

/// A persistent expense store using RocksDB.
///
/// Records are stored as JSON keyed by their big-endian id, so iteration
/// returns them in insertion order. The last assigned id is written in the
/// same batch as the record it belongs to.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbExpenseStore {
    db: Arc<DB>,
    insert_lock: Arc<Mutex<()>>,
}

impl RocksDbExpenseStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_expenses = ColumnFamilyDescriptor::new(CF_EXPENSES, Options::default());
        let cf_meta = ColumnFamilyDescriptor::new(CF_META, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_expenses, cf_meta])?;

        Ok(Self {
            db: Arc::new(db),
            insert_lock: Arc::default(),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db.cf_handle(name).ok_or_else(|| {
            StorageError::Io(std::io::Error::other(format!(
                "`{name}` column family not found"
            )))
        })
    }

    fn last_id(&self) -> Result<u64, StorageError> {
        let meta = self.cf(CF_META)?;
        match self.db.get_cf(meta, LAST_ID_KEY)? {
            Some(bytes) => {
                let bytes: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StorageError::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "corrupt id counter",
                    ))
                })?;
                Ok(u64::from_be_bytes(bytes))
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl ExpenseStore for RocksDbExpenseStore {
    async fn insert(&self, expense: NewExpense) -> Result<RecordId, StorageError> {
        let _guard = self.insert_lock.lock().await;

        let id = RecordId(self.last_id()? + 1);
        let record = CommittedRecord::from_new(id, expense);
        let value = serde_json::to_vec(&record)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_EXPENSES)?, id.0.to_be_bytes(), value);
        batch.put_cf(self.cf(CF_META)?, LAST_ID_KEY, id.0.to_be_bytes());
        self.db.write(batch)?;

        Ok(id)
    }

    async fn all(&self) -> Result<Vec<CommittedRecord>, StorageError> {
        let cf = self.cf(CF_EXPENSES)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier handed out by the persistence collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The row written once the user confirms a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub amount: Decimal,
    pub note: String,
    pub tag: String,
    pub date: DateTime<Utc>,
}

impl NewExpense {
    /// UTC with millisecond precision and a `Z` suffix.
    pub fn timestamp_iso8601(&self) -> String {
        iso8601(&self.date)
    }
}

pub fn iso8601(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A persisted expense. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedRecord {
    pub id: RecordId,
    pub amount: Decimal,
    pub note: String,
    pub tag: String,
    pub date: String,
}

impl CommittedRecord {
    pub fn from_new(id: RecordId, expense: NewExpense) -> Self {
        let date = expense.timestamp_iso8601();
        Self {
            id,
            amount: expense.amount,
            note: expense.note,
            tag: expense.tag,
            date,
        }
    }
}

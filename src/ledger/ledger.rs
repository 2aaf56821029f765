use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{category::CategoryRegistry, transaction::Transaction};
use crate::storage::WriteBatch;

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

/// Everything known about one owner's money at a point in time.
///
/// The repository hands these out behind an `Arc` and never mutates a
/// published value; each write produces the next snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ledger {
    pub owner_id: String,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub categories: CategoryRegistry,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Ledger::schema_version_default")]
    pub schema_version: u8,
}

impl Ledger {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            transactions: Vec::new(),
            categories: CategoryRegistry::default(),
            updated_at: Utc::now(),
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Builds a snapshot from records supplied by a store, normalizing each.
    pub fn from_records(owner_id: impl Into<String>, records: Vec<Transaction>) -> Self {
        let mut ledger = Self::new(owner_id);
        ledger.transactions = records
            .into_iter()
            .map(|mut txn| {
                txn.normalize();
                txn
            })
            .collect();
        ledger
    }

    pub fn transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| txn.id == id)
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Members of a materialized series, earliest first.
    pub fn group(&self, group_id: Uuid) -> Vec<&Transaction> {
        let mut members: Vec<&Transaction> = self
            .transactions
            .iter()
            .filter(|txn| txn.group_id() == Some(group_id))
            .collect();
        members.sort_by_key(|txn| txn.anchor_date);
        members
    }

    /// Records that follow a periodic rule, lazily expanded or materialized.
    pub fn recurring(&self) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|txn| txn.is_recurring())
            .collect()
    }

    /// Applies a batch that the store has already accepted.
    pub fn apply(&mut self, batch: &WriteBatch, at: DateTime<Utc>) {
        batch.apply_to(&mut self.transactions);
        self.touch(at);
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::recurring::{materialize_series, RecurrenceHorizon};
    use crate::ledger::transaction::{RecurrenceKind, TransactionKind};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn coffee(day: u32) -> Transaction {
        Transaction::new(
            "ana",
            TransactionKind::Expense,
            Decimal::new(450, 2),
            "Food",
            NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
        )
    }

    #[test]
    fn apply_replaces_in_place_and_deletes() {
        let mut ledger = Ledger::new("ana");
        let first = coffee(1);
        let second = coffee(2);
        let mut batch = WriteBatch::new();
        batch.put(first.clone());
        batch.put(second.clone());
        ledger.apply(&batch, Utc::now());

        let mut edited = first.clone();
        edited.description = "espresso".into();
        let mut batch = WriteBatch::new();
        batch.put(edited);
        batch.delete(second.id);
        ledger.apply(&batch, Utc::now());

        assert_eq!(ledger.transaction_count(), 1);
        assert_eq!(ledger.transactions[0].description, "espresso");
    }

    #[test]
    fn group_lists_siblings_in_date_order() {
        let template = coffee(30).repeating(RecurrenceKind::Monthly);
        let mut records = materialize_series(&template, RecurrenceHorizon::months(2));
        records.reverse();
        let group_id = records[0].group_id().unwrap();
        let ledger = Ledger::from_records("ana", records);
        let members = ledger.group(group_id);
        assert_eq!(members.len(), 3);
        assert!(members.windows(2).all(|w| w[0].anchor_date < w[1].anchor_date));
        assert_eq!(ledger.recurring().len(), 3);
    }
}

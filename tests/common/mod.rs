#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use cashflow_core::{
    config::{Config, ConfigManager},
    core::{FixedClock, TransactionRepository},
    errors::{LedgerError, Result},
    ledger::Transaction,
    storage::{JsonStore, MemoryStore, TransactionStore, WriteBatch, WriteOp},
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub const OWNER: &str = "ana";

/// Creates an isolated store and config manager backed by a unique directory.
pub fn setup_test_env() -> (JsonStore, ConfigManager) {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);

    let store = JsonStore::new(base.join("ledgers")).expect("create json store");
    let config_manager =
        ConfigManager::with_base_dir(base).expect("create config manager for temp dir");
    (store, config_manager)
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn money(raw: &str) -> Decimal {
    raw.parse().expect("valid decimal")
}

/// Repository over `store` whose clock reads `today`.
pub fn repository_on(
    store: Box<dyn TransactionStore>,
    config: Config,
    today: NaiveDate,
) -> TransactionRepository {
    TransactionRepository::with_clock(OWNER, store, config, Arc::new(FixedClock::on(today)))
        .expect("open repository")
}

pub fn memory_repository(config: Config) -> TransactionRepository {
    repository_on(Box::new(MemoryStore::new()), config, day(2024, 3, 15))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Unavailable,
    /// Applies only the first operation of a batch, then reports it.
    Partial,
}

/// Memory-backed store that can be told to fail the next batches.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failure: Mutex<Option<Failure>>,
}

impl FlakyStore {
    pub fn failing(failure: Failure) -> Self {
        Self {
            inner: MemoryStore::new(),
            failure: Mutex::new(Some(failure)),
        }
    }

    pub fn seeded(records: Vec<Transaction>, failure: Failure) -> Self {
        Self {
            inner: MemoryStore::seeded(OWNER, records),
            failure: Mutex::new(Some(failure)),
        }
    }
}

impl TransactionStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    fn load(&self, owner_id: &str) -> Result<Vec<Transaction>> {
        self.inner.load(owner_id)
    }

    fn apply(&self, owner_id: &str, batch: &WriteBatch) -> Result<()> {
        let failure = *self.failure.lock().expect("lock failure mode");
        match failure {
            None => self.inner.apply(owner_id, batch),
            Some(Failure::Unavailable) => Err(LedgerError::Unavailable(
                "backend gave up after retries".into(),
            )),
            Some(Failure::Partial) => {
                let mut first = WriteBatch::new();
                match batch.ops().first() {
                    Some(WriteOp::Put(txn)) => {
                        first.put(txn.clone());
                    }
                    Some(WriteOp::Delete(id)) => {
                        first.delete(*id);
                    }
                    None => return Ok(()),
                }
                self.inner.apply(owner_id, &first)?;
                Err(LedgerError::PartialWrite {
                    applied: 1,
                    total: batch.len(),
                })
            }
        }
    }
}

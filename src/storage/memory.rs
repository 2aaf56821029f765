use std::{collections::HashMap, sync::Mutex};

use crate::{
    errors::{LedgerError, Result},
    ledger::Transaction,
};

use super::{TransactionStore, WriteBatch};

/// Process-local store, handy for tests and for embedding without a disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    owners: Mutex<HashMap<String, Vec<Transaction>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `records` for `owner_id`.
    pub fn seeded(owner_id: impl Into<String>, records: Vec<Transaction>) -> Self {
        let store = Self::new();
        if let Ok(mut owners) = store.owners.lock() {
            owners.insert(owner_id.into(), records);
        }
        store
    }
}

impl TransactionStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, owner_id: &str) -> Result<Vec<Transaction>> {
        let owners = self
            .owners
            .lock()
            .map_err(|_| LedgerError::Unavailable("memory store lock poisoned".into()))?;
        Ok(owners.get(owner_id).cloned().unwrap_or_default())
    }

    fn apply(&self, owner_id: &str, batch: &WriteBatch) -> Result<()> {
        let mut owners = self
            .owners
            .lock()
            .map_err(|_| LedgerError::Unavailable("memory store lock poisoned".into()))?;
        let records = owners.entry(owner_id.to_string()).or_default();
        batch.check_against(records)?;
        batch.apply_to(records);
        Ok(())
    }
}

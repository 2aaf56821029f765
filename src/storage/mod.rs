//! Persistence collaborators and the batches they apply.

pub mod json_backend;
pub mod memory;

use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::ledger::Transaction;

pub use json_backend::JsonStore;
pub use memory::MemoryStore;

/// Abstraction over whatever durably holds an owner's transaction records.
///
/// `apply` must be all-or-nothing. A backend that cannot guarantee that has
/// to report [`LedgerError::PartialWrite`] rather than success. Retrying is the
/// backend's own business; an error returned here is final for the caller.
pub trait TransactionStore: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;
    fn load(&self, owner_id: &str) -> Result<Vec<Transaction>>;
    fn apply(&self, owner_id: &str, batch: &WriteBatch) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put(Transaction),
    Delete(Uuid),
}

/// Ordered set of record writes applied as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, txn: Transaction) -> &mut Self {
        self.ops.push(WriteOp::Put(txn));
        self
    }

    pub fn delete(&mut self, id: Uuid) -> &mut Self {
        self.ops.push(WriteOp::Delete(id));
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Fails if a delete targets a record missing from `records`.
    pub fn check_against(&self, records: &[Transaction]) -> Result<()> {
        for op in &self.ops {
            if let WriteOp::Delete(id) = op {
                if !records.iter().any(|txn| txn.id == *id) {
                    return Err(LedgerError::TransactionNotFound(*id));
                }
            }
        }
        Ok(())
    }

    /// Puts replace a record with the same id in place or append; deletes
    /// remove by id.
    pub fn apply_to(&self, records: &mut Vec<Transaction>) {
        for op in &self.ops {
            match op {
                WriteOp::Put(txn) => match records.iter_mut().find(|t| t.id == txn.id) {
                    Some(existing) => *existing = txn.clone(),
                    None => records.push(txn.clone()),
                },
                WriteOp::Delete(id) => records.retain(|t| t.id != *id),
            }
        }
    }
}

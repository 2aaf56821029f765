use crate::errors::{LedgerError, Result};
use crate::ledger::{CategoryRegistry, TransactionKind};

pub struct CategoryService;

impl CategoryService {
    /// Registers a trimmed name and reports whether it was new. Exact
    /// duplicates are ignored.
    pub fn add(registry: &mut CategoryRegistry, kind: TransactionKind, name: &str) -> Result<bool> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::validation("category name cannot be empty"));
        }
        Ok(registry.add(kind, trimmed))
    }

    /// Forgets a category name. Transactions already using it keep it.
    pub fn remove(registry: &mut CategoryRegistry, kind: TransactionKind, name: &str) -> Result<()> {
        if !registry.remove(kind, name) {
            return Err(LedgerError::validation(format!(
                "{kind} category `{name}` not found"
            )));
        }
        Ok(())
    }

    pub fn list(registry: &CategoryRegistry, kind: TransactionKind) -> Vec<&str> {
        registry.names(kind).iter().map(String::as_str).collect()
    }
}

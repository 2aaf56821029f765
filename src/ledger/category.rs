//! Per-kind registry of known category names.
//!
//! The registry only feeds pickers and validation hints. Aggregation accepts
//! any category string, including ones that were never registered or were
//! removed after use.

use serde::{Deserialize, Serialize};

use super::transaction::TransactionKind;

const DEFAULT_INCOME: &[&str] = &["Salary", "Investments", "Gifts", "Other"];
const DEFAULT_EXPENSE: &[&str] = &[
    "Food",
    "Housing",
    "Transportation",
    "Leisure",
    "Utilities",
    "Health",
    "Personal",
    "Education",
    "Other",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRegistry {
    income: Vec<String>,
    expense: Vec<String>,
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|name| name.to_string()).collect();
        Self {
            income: owned(DEFAULT_INCOME),
            expense: owned(DEFAULT_EXPENSE),
        }
    }
}

impl CategoryRegistry {
    pub fn empty() -> Self {
        Self {
            income: Vec::new(),
            expense: Vec::new(),
        }
    }

    pub fn names(&self, kind: TransactionKind) -> &[String] {
        match kind {
            TransactionKind::Income => &self.income,
            TransactionKind::Expense => &self.expense,
        }
    }

    pub fn contains(&self, kind: TransactionKind, name: &str) -> bool {
        self.names(kind).iter().any(|known| known == name)
    }

    /// Registers `name` under `kind`. Returns `false` for blank names and
    /// exact duplicates.
    pub fn add(&mut self, kind: TransactionKind, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.contains(kind, name) {
            return false;
        }
        self.names_mut(kind).push(name.to_string());
        true
    }

    pub fn remove(&mut self, kind: TransactionKind, name: &str) -> bool {
        let names = self.names_mut(kind);
        let before = names.len();
        names.retain(|known| known != name);
        names.len() != before
    }

    fn names_mut(&mut self, kind: TransactionKind) -> &mut Vec<String> {
        match kind {
            TransactionKind::Income => &mut self.income,
            TransactionKind::Expense => &mut self.expense,
        }
    }
}

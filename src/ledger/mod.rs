//! Transaction model, calendar math, and occurrence expansion.

pub mod calendar;
pub mod category;
#[allow(clippy::module_inception)]
pub mod ledger;
pub mod recurring;
pub mod transaction;

pub use calendar::{format_day, parse_day, DateWindow};
pub use category::CategoryRegistry;
pub use ledger::Ledger;
pub use recurring::{expand, expand_with, materialize_series, Occurrence, RecurrenceHorizon};
pub use transaction::{
    Recurrence, RecurrenceKind, RecurrenceRule, Transaction, TransactionDraft, TransactionKind,
    TransactionPatch, TransactionStatus,
};

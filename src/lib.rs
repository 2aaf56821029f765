#![doc(test(attr(deny(warnings))))]

//! Cashflow Core expands recurring income and expense rules into dated
//! occurrences, aggregates what was actually paid, and tracks how much of an
//! emergency reserve the year's running deficit has consumed.

pub mod config;
pub mod core;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod utils;

use std::sync::Once;

pub use crate::config::{Config, ConfigManager, CurrencyCode, SeriesStrategy};
pub use crate::core::services::{
    CumulativeSummary, EmergencyFundStatus, ReportPeriod, SeriesScope, Summary,
};
pub use crate::core::TransactionRepository;
pub use crate::errors::LedgerError;
pub use crate::ledger::{
    expand, expand_with, DateWindow, Ledger, Occurrence, RecurrenceHorizon, RecurrenceKind,
    Transaction, TransactionDraft, TransactionKind, TransactionPatch, TransactionStatus,
};
pub use crate::storage::{JsonStore, MemoryStore, TransactionStore, WriteBatch};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        let build = utils::build_info::current();
        tracing::info!(
            version = build.version,
            hash = build.git_hash,
            "Cashflow Core tracing initialized."
        );
    });
}

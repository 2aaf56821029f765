use std::sync::{
    mpsc::{self, Receiver, Sender},
    Arc, Mutex, RwLock,
};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::services::{
    CategoryService, CumulativeSummary, EmergencyFundStatus, ReserveService, SeriesScope, Summary,
    SummaryService, TransactionService,
};
use crate::config::Config;
use crate::errors::{LedgerError, Result};
use crate::ledger::{
    DateWindow, Ledger, RecurrenceHorizon, Transaction, TransactionDraft, TransactionKind,
    TransactionPatch,
};
use crate::storage::{TransactionStore, WriteBatch};

/// One owner's transactions, published as immutable snapshots.
///
/// Readers clone the current `Arc<Ledger>` and never wait on writers. Writers
/// are serialized: each one plans a [`WriteBatch`] against the latest
/// snapshot, hands it to the store, and swaps in the next snapshot only after
/// the store accepted the whole batch.
pub struct TransactionRepository {
    owner_id: String,
    config: Config,
    store: Box<dyn TransactionStore>,
    clock: Arc<dyn Clock>,
    current: RwLock<Arc<Ledger>>,
    writer: Mutex<()>,
    subscribers: Mutex<Vec<Sender<Arc<Ledger>>>>,
}

impl TransactionRepository {
    pub fn open(
        owner_id: impl Into<String>,
        store: Box<dyn TransactionStore>,
        config: Config,
    ) -> Result<Self> {
        Self::with_clock(owner_id, store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        owner_id: impl Into<String>,
        store: Box<dyn TransactionStore>,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let owner_id = owner_id.into();
        let records = store.load(&owner_id)?;
        let mut ledger = Ledger::from_records(owner_id.clone(), records);
        ledger.touch(clock.now());
        info!(
            owner = %owner_id,
            store = store.name(),
            records = ledger.transaction_count(),
            "opened transaction repository"
        );
        Ok(Self {
            owner_id,
            config,
            store,
            clock,
            current: RwLock::new(Arc::new(ledger)),
            writer: Mutex::new(()),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn horizon(&self) -> RecurrenceHorizon {
        self.config.horizon()
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Ledger> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Receives the current snapshot right away and every later one as it is
    /// published. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<Arc<Ledger>> {
        let (tx, rx) = mpsc::channel();
        // A fresh channel cannot be disconnected yet.
        let _ = tx.send(self.snapshot());
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    /// Creates a transaction and returns its record. Under the eager strategy
    /// this is the first member of the new series.
    pub fn create(&self, draft: TransactionDraft) -> Result<Transaction> {
        let mut created = None;
        self.commit("create", |_, at| {
            let records = TransactionService::plan_create(
                &self.owner_id,
                &draft,
                self.config.series_strategy,
                self.horizon(),
                at,
            )?;
            created = records.first().cloned();
            let mut batch = WriteBatch::new();
            for record in records {
                batch.put(record);
            }
            Ok(batch)
        })?;
        created.ok_or_else(|| LedgerError::validation("nothing was created"))
    }

    pub fn update(
        &self,
        id: Uuid,
        patch: TransactionPatch,
        scope: SeriesScope,
    ) -> Result<Arc<Ledger>> {
        self.commit("update", |ledger, at| {
            TransactionService::plan_update(ledger, id, &patch, scope, self.horizon(), at)
        })
    }

    pub fn delete(&self, id: Uuid, scope: SeriesScope) -> Result<Arc<Ledger>> {
        self.commit("delete", |ledger, _| {
            TransactionService::plan_delete(ledger, id, scope)
        })
    }

    pub fn toggle_status(&self, id: Uuid) -> Result<Transaction> {
        let ledger = self.commit("toggle_status", |ledger, at| {
            TransactionService::plan_toggle(ledger, id, at)
        })?;
        ledger
            .transaction(id)
            .cloned()
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    pub fn skip_occurrence(&self, id: Uuid, day: NaiveDate) -> Result<Arc<Ledger>> {
        self.commit("skip_occurrence", |ledger, at| {
            TransactionService::plan_skip(ledger, id, day, self.horizon(), at)
        })
    }

    /// Registers a category name; adding a known name publishes nothing.
    /// Categories only live in memory; stores persist transactions alone.
    pub fn add_category(&self, kind: TransactionKind, name: &str) -> Result<Arc<Ledger>> {
        self.edit_categories(|ledger| CategoryService::add(&mut ledger.categories, kind, name))
    }

    pub fn remove_category(&self, kind: TransactionKind, name: &str) -> Result<Arc<Ledger>> {
        self.edit_categories(|ledger| {
            CategoryService::remove(&mut ledger.categories, kind, name).map(|()| true)
        })
    }

    /// Replaces the snapshot with what the store currently holds.
    pub fn reload(&self) -> Result<Arc<Ledger>> {
        let _guard = self.lock_writer()?;
        self.resync()
    }

    pub fn summarize(&self, window: DateWindow) -> Summary {
        let ledger = self.snapshot();
        SummaryService::summarize_window(&ledger.transactions, window, self.horizon())
    }

    pub fn cumulative(&self, up_to: NaiveDate) -> CumulativeSummary {
        let ledger = self.snapshot();
        ReserveService::cumulative(&ledger.transactions, up_to, self.horizon())
    }

    /// Reserve usage as of today.
    pub fn fund_status(&self) -> EmergencyFundStatus {
        let ledger = self.snapshot();
        ReserveService::fund_status(
            &ledger.transactions,
            self.clock.today(),
            self.config.emergency_fund_total,
            self.horizon(),
        )
    }

    fn commit<F>(&self, op: &'static str, plan: F) -> Result<Arc<Ledger>>
    where
        F: FnOnce(&Ledger, DateTime<Utc>) -> Result<WriteBatch>,
    {
        let _guard = self.lock_writer()?;
        let current = self.snapshot();
        let at = self.clock.now();
        let batch = plan(&current, at).map_err(|err| {
            debug!(op, owner = %self.owner_id, error = %err, "rejected write");
            err
        })?;
        if batch.is_empty() {
            return Ok(current);
        }

        if let Err(err) = self.store.apply(&self.owner_id, &batch) {
            warn!(
                op,
                owner = %self.owner_id,
                store = self.store.name(),
                error = %err,
                "store failed to apply batch"
            );
            if matches!(err, LedgerError::PartialWrite { .. }) {
                if let Err(reload_err) = self.resync() {
                    warn!(error = %reload_err, "could not reload after partial write");
                }
            }
            return Err(err);
        }

        let mut next = (*current).clone();
        next.apply(&batch, at);
        let next = self.publish(next);
        info!(
            op,
            owner = %self.owner_id,
            operations = batch.len(),
            records = next.transaction_count(),
            "applied write"
        );
        Ok(next)
    }

    fn edit_categories<F>(&self, edit: F) -> Result<Arc<Ledger>>
    where
        F: FnOnce(&mut Ledger) -> Result<bool>,
    {
        let _guard = self.lock_writer()?;
        let current = self.snapshot();
        let mut next = (*current).clone();
        if !edit(&mut next)? {
            return Ok(current);
        }
        next.touch(self.clock.now());
        Ok(self.publish(next))
    }

    fn resync(&self) -> Result<Arc<Ledger>> {
        let records = self.store.load(&self.owner_id)?;
        let mut next = Ledger::from_records(self.owner_id.clone(), records);
        next.categories = self.snapshot().categories.clone();
        next.touch(self.clock.now());
        Ok(self.publish(next))
    }

    fn publish(&self, ledger: Ledger) -> Arc<Ledger> {
        let next = Arc::new(ledger);
        match self.current.write() {
            Ok(mut guard) => *guard = Arc::clone(&next),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&next),
        }
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|tx| tx.send(Arc::clone(&next)).is_ok());
        }
        next
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|_| LedgerError::Unavailable("repository writer lock poisoned".into()))
    }
}

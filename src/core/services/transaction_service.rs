//! Validation and write planning for transactions.
//!
//! Every operation here is pure: it reads a snapshot and returns the
//! [`WriteBatch`] that would carry it out. The repository hands the batch to
//! the store and publishes the next snapshot only when the store accepts it.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SeriesStrategy;
use crate::errors::{LedgerError, Result};
use crate::ledger::{
    calendar::format_day,
    recurring::{exceeds_occurrence_cap, is_scheduled_on, materialize_series, series_days},
    Ledger, Occurrence, Recurrence, RecurrenceHorizon, RecurrenceKind, Transaction,
    TransactionDraft, TransactionPatch,
};
use crate::storage::WriteBatch;

/// Which records of a materialized series an update or delete reaches.
///
/// A lazily expanded series is a single record, so both scopes act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesScope {
    #[default]
    Single,
    Series,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Date,
    Description,
    Category,
    Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

pub struct TransactionService;

impl TransactionService {
    /// Rejects drafts with a non-positive amount, a blank category or an end
    /// date before the anchor.
    pub fn validate_draft(draft: &TransactionDraft) -> Result<()> {
        validate_amount(draft.amount)?;
        validate_category(&draft.category)?;
        if draft.recurrence != RecurrenceKind::None {
            validate_end_date(draft.anchor_date, draft.end_date)?;
        }
        Ok(())
    }

    /// Turns a validated draft into its rule-carrying record.
    pub fn build(owner_id: &str, draft: &TransactionDraft, at: DateTime<Utc>) -> Transaction {
        let mut txn = Transaction::new(
            owner_id,
            draft.kind,
            draft.amount,
            draft.category.trim(),
            draft.anchor_date,
        )
        .with_description(draft.description.clone())
        .with_status(draft.status)
        .repeating(draft.recurrence);
        if let Some(end) = draft.end_date {
            txn = txn.until(end);
        }
        txn.created_at = at;
        txn.updated_at = at;
        txn.normalize();
        txn
    }

    /// Records to persist for a new transaction: the rule itself, or one
    /// record per occurrence under the eager strategy.
    pub fn plan_create(
        owner_id: &str,
        draft: &TransactionDraft,
        strategy: SeriesStrategy,
        horizon: RecurrenceHorizon,
        at: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        Self::validate_draft(draft)?;
        let txn = Self::build(owner_id, draft, at);
        validate_series_length(&txn, horizon)?;
        let records = match strategy {
            SeriesStrategy::Eager if txn.is_recurring() => materialize_series(&txn, horizon),
            _ => vec![txn],
        };
        if records.is_empty() {
            return Err(LedgerError::validation(
                "recurring transaction has no occurrence before its end date",
            ));
        }
        Ok(records)
    }

    pub fn plan_update(
        ledger: &Ledger,
        id: Uuid,
        patch: &TransactionPatch,
        scope: SeriesScope,
        horizon: RecurrenceHorizon,
        at: DateTime<Utc>,
    ) -> Result<WriteBatch> {
        let current = find(ledger, id)?;
        validate_patch(patch)?;

        let mut batch = WriteBatch::new();
        let Some(group_id) = current.group_id() else {
            batch.put(reschedule(current, patch, horizon, at)?);
            return Ok(batch);
        };

        match scope {
            SeriesScope::Single if patch.touches_schedule() => Err(LedgerError::validation(
                "moving or reshaping one member of a series requires series scope",
            )),
            SeriesScope::Single => {
                let mut txn = current.clone();
                patch.apply_details(&mut txn);
                txn.updated_at = at;
                batch.put(txn);
                Ok(batch)
            }
            SeriesScope::Series if !patch.touches_schedule() => {
                for sibling in ledger.group(group_id) {
                    let mut txn = sibling.clone();
                    patch.apply_details(&mut txn);
                    txn.updated_at = at;
                    batch.put(txn);
                }
                Ok(batch)
            }
            SeriesScope::Series => rebuild_group(ledger, group_id, patch, horizon, at),
        }
    }

    pub fn plan_delete(ledger: &Ledger, id: Uuid, scope: SeriesScope) -> Result<WriteBatch> {
        let current = find(ledger, id)?;
        let mut batch = WriteBatch::new();
        match (scope, current.group_id()) {
            (SeriesScope::Series, Some(group_id)) => {
                for sibling in ledger.group(group_id) {
                    batch.delete(sibling.id);
                }
            }
            _ => {
                batch.delete(id);
            }
        }
        Ok(batch)
    }

    /// Flips `pending` and `paid` on one record.
    pub fn plan_toggle(ledger: &Ledger, id: Uuid, at: DateTime<Utc>) -> Result<WriteBatch> {
        let mut txn = find(ledger, id)?.clone();
        txn.status = txn.status.toggled();
        txn.updated_at = at;
        let mut batch = WriteBatch::new();
        batch.put(txn);
        Ok(batch)
    }

    /// Drops one occurrence of a lazily expanded series without touching its
    /// rule. Skipping a day that is already skipped is a no-op write.
    pub fn plan_skip(
        ledger: &Ledger,
        id: Uuid,
        day: NaiveDate,
        horizon: RecurrenceHorizon,
        at: DateTime<Utc>,
    ) -> Result<WriteBatch> {
        let current = find(ledger, id)?;
        if !current.is_recurring() || current.recurrence.is_materialized() {
            return Err(LedgerError::validation(
                "only lazily expanded series can skip an occurrence; delete the record instead",
            ));
        }
        if !is_scheduled_on(current, day, horizon) {
            return Err(LedgerError::validation(format!(
                "{} is not an occurrence of {}",
                format_day(day),
                current.id
            )));
        }
        let mut txn = current.clone();
        if let Err(position) = txn.recurrence.exceptions.binary_search(&day) {
            txn.recurrence.exceptions.insert(position, day);
        }
        txn.updated_at = at;
        let mut batch = WriteBatch::new();
        batch.put(txn);
        Ok(batch)
    }
}

/// Occurrences whose description or category contains `term`, ignoring
/// case. A blank term matches everything.
pub fn search_occurrences<'a>(occurrences: &[Occurrence<'a>], term: &str) -> Vec<Occurrence<'a>> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return occurrences.to_vec();
    }
    occurrences
        .iter()
        .filter(|occ| {
            occ.transaction.description.to_lowercase().contains(&needle)
                || occ.category().to_lowercase().contains(&needle)
        })
        .copied()
        .collect()
}

/// Stable sort of `occurrences` by `field`.
pub fn sort_occurrences(
    occurrences: &mut [Occurrence<'_>],
    field: SortField,
    direction: SortDirection,
) {
    occurrences.sort_by(|a, b| {
        let ordering = compare_by(a, b, field);
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

fn compare_by(a: &Occurrence<'_>, b: &Occurrence<'_>, field: SortField) -> Ordering {
    match field {
        SortField::Date => a.occurrence_date.cmp(&b.occurrence_date),
        SortField::Description => a
            .transaction
            .description
            .to_lowercase()
            .cmp(&b.transaction.description.to_lowercase()),
        SortField::Category => a.category().to_lowercase().cmp(&b.category().to_lowercase()),
        SortField::Amount => a.amount().cmp(&b.amount()),
    }
}

fn find(ledger: &Ledger, id: Uuid) -> Result<&Transaction> {
    ledger
        .transaction(id)
        .ok_or(LedgerError::TransactionNotFound(id))
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation("amount must be greater than zero"));
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<()> {
    if category.trim().is_empty() {
        return Err(LedgerError::validation("category is required"));
    }
    Ok(())
}

fn validate_end_date(anchor: NaiveDate, end: Option<NaiveDate>) -> Result<()> {
    match end {
        Some(end) if end < anchor => Err(LedgerError::validation(format!(
            "end date {} precedes the first occurrence {}",
            format_day(end),
            format_day(anchor)
        ))),
        _ => Ok(()),
    }
}

/// Open series are bounded by the horizon instead.
fn validate_series_length(txn: &Transaction, horizon: RecurrenceHorizon) -> Result<()> {
    if txn.recurrence.end_date.is_some() && exceeds_occurrence_cap(txn, horizon) {
        return Err(LedgerError::validation(format!(
            "series starting {} has too many occurrences; choose an earlier end date",
            format_day(txn.anchor_date)
        )));
    }
    Ok(())
}

fn validate_patch(patch: &TransactionPatch) -> Result<()> {
    if let Some(amount) = patch.amount {
        validate_amount(amount)?;
    }
    if let Some(category) = &patch.category {
        validate_category(category)?;
    }
    Ok(())
}

/// Applies a patch to a standalone or lazily expanded record. Changing the
/// rule or the anchor clears skipped days, which no longer line up.
fn reschedule(
    current: &Transaction,
    patch: &TransactionPatch,
    horizon: RecurrenceHorizon,
    at: DateTime<Utc>,
) -> Result<Transaction> {
    let mut txn = current.clone();
    patch.apply_details(&mut txn);

    let anchor = patch.anchor_date.unwrap_or(current.anchor_date);
    let kind = patch.recurrence.unwrap_or(current.recurrence.rule.kind());
    let end_date = patch.end_date.unwrap_or(current.recurrence.end_date);
    if kind != RecurrenceKind::None {
        validate_end_date(anchor, end_date)?;
    }

    if anchor != current.anchor_date || kind != current.recurrence.rule.kind() {
        let mut recurrence = Recurrence::new(kind, anchor);
        recurrence.end_date = end_date;
        txn.recurrence = recurrence;
    } else {
        txn.recurrence.end_date = end_date;
    }
    txn.anchor_date = anchor;
    txn.updated_at = at;
    txn.normalize();
    validate_series_length(&txn, horizon)?;
    Ok(txn)
}

/// Reschedules a materialized series in one batch.
///
/// Members whose day is still scheduled keep their id, status and details
/// (plus the patch). Days removed from the series before the edit stay
/// removed. Only days that were never part of the series get new records.
fn rebuild_group(
    ledger: &Ledger,
    group_id: Uuid,
    patch: &TransactionPatch,
    horizon: RecurrenceHorizon,
    at: DateTime<Utc>,
) -> Result<WriteBatch> {
    let siblings = ledger.group(group_id);
    let (Some(first), Some(last)) = (siblings.first(), siblings.last()) else {
        return Err(LedgerError::validation(format!(
            "series {group_id} has no members"
        )));
    };

    // The earliest member stands in for the series; its rule is the series
    // rule even when its own day was clamped.
    let mut series = (*first).clone();
    series.recurrence.group_id = None;
    series.recurrence.exceptions.clear();

    let by_day: HashMap<NaiveDate, &Transaction> =
        siblings.iter().map(|txn| (txn.anchor_date, *txn)).collect();
    let removed = removed_days(&series, last.anchor_date, &by_day, horizon);

    let template = reschedule(&series, patch, horizon, at)?;
    let mut batch = WriteBatch::new();
    let mut kept = HashSet::new();

    if !template.is_recurring() {
        kept.insert(template.id);
        batch.put(template);
    } else {
        for day in series_days(&template, horizon) {
            if removed.contains(&day) {
                continue;
            }
            let mut record = match by_day.get(&day) {
                Some(member) => {
                    let mut record = (*member).clone();
                    patch.apply_details(&mut record);
                    record
                }
                None => {
                    let mut record = template.clone();
                    record.id = Uuid::new_v4();
                    record.status = patch.status.unwrap_or_default();
                    record.created_at = at;
                    record
                }
            };
            record.anchor_date = day;
            record.recurrence = template.recurrence.clone();
            record.recurrence.group_id = Some(group_id);
            record.updated_at = at;
            kept.insert(record.id);
            batch.put(record);
        }
    }

    if kept.is_empty() {
        return Err(LedgerError::validation(
            "rescheduled series has no occurrence before its end date",
        ));
    }
    for sibling in siblings.iter().filter(|txn| !kept.contains(&txn.id)) {
        batch.delete(sibling.id);
    }
    Ok(batch)
}

/// Days the series was scheduled on up to its last member that no longer
/// have a record.
fn removed_days(
    series: &Transaction,
    last: NaiveDate,
    members: &HashMap<NaiveDate, &Transaction>,
    horizon: RecurrenceHorizon,
) -> BTreeSet<NaiveDate> {
    let mut span = series.clone();
    span.recurrence.end_date = Some(last);
    series_days(&span, horizon)
        .into_iter()
        .filter(|day| !members.contains_key(day))
        .collect()
}

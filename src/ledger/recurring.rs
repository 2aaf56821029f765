//! Occurrence expansion for recurring transactions.
//!
//! Lazily expanded records carry a rule and are turned into dated occurrences
//! per query. Materialized group members and one-off records are already
//! concrete, so expansion only filters them by date.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::calendar::{self, DateWindow};
use super::transaction::{RecurrenceRule, Transaction, TransactionKind, TransactionStatus};

const MAX_OCCURRENCES_PER_SERIES: usize = 4096;

/// How far past its anchor an open-ended series is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceHorizon {
    months: u32,
}

impl RecurrenceHorizon {
    pub const DEFAULT_MONTHS: u32 = 12;

    pub fn months(months: u32) -> Self {
        Self {
            months: months.max(1),
        }
    }

    pub fn get(&self) -> u32 {
        self.months
    }

    /// Last day an open-ended series anchored on `anchor` may produce.
    pub fn cap_for(&self, anchor: NaiveDate) -> NaiveDate {
        calendar::shift_month(anchor, self.months as i32).unwrap_or(NaiveDate::MAX)
    }
}

impl Default for RecurrenceHorizon {
    fn default() -> Self {
        Self::months(Self::DEFAULT_MONTHS)
    }
}

/// One concrete dated instance of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Occurrence<'a> {
    pub transaction: &'a Transaction,
    pub occurrence_date: NaiveDate,
    /// Position within its series; standalone records are always 0.
    pub index: u32,
}

impl<'a> Occurrence<'a> {
    pub fn amount(&self) -> rust_decimal::Decimal {
        self.transaction.amount
    }

    pub fn kind(&self) -> TransactionKind {
        self.transaction.kind
    }

    pub fn category(&self) -> &'a str {
        &self.transaction.category
    }

    pub fn status(&self) -> TransactionStatus {
        self.transaction.status
    }

    pub fn is_paid(&self) -> bool {
        self.transaction.status.is_paid()
    }
}

/// Expands `transactions` over `window` using the default horizon.
pub fn expand(transactions: &[Transaction], window: DateWindow) -> Vec<Occurrence<'_>> {
    expand_with(transactions, window, RecurrenceHorizon::default())
}

/// Expands `transactions` over the inclusive `window`.
///
/// Results are ordered newest first; occurrences on the same day keep the
/// order of their records in `transactions`.
pub fn expand_with(
    transactions: &[Transaction],
    window: DateWindow,
    horizon: RecurrenceHorizon,
) -> Vec<Occurrence<'_>> {
    let mut occurrences = Vec::new();
    for txn in transactions {
        if is_concrete(txn) {
            if window.contains(txn.anchor_date) {
                occurrences.push(Occurrence {
                    transaction: txn,
                    occurrence_date: txn.anchor_date,
                    index: 0,
                });
            }
            continue;
        }
        occurrences.extend(
            series_dates(txn, window, horizon)
                .into_iter()
                .map(|(index, occurrence_date)| Occurrence {
                    transaction: txn,
                    occurrence_date,
                    index,
                }),
        );
    }
    occurrences.sort_by(|a, b| b.occurrence_date.cmp(&a.occurrence_date));
    debug!(
        records = transactions.len(),
        occurrences = occurrences.len(),
        start = %window.start,
        end = %window.end,
        "expanded occurrences"
    );
    occurrences
}

/// Occurrence days of a lazily expanded series inside `window`, ascending and
/// paired with their series index. Skipped days are left out.
pub fn series_dates(
    txn: &Transaction,
    window: DateWindow,
    horizon: RecurrenceHorizon,
) -> Vec<(u32, NaiveDate)> {
    let mut dates = schedule(txn, window, horizon);
    dates.retain(|(_, day)| !txn.recurrence.is_skipped(*day));
    dates
}

/// Whether `day` is a scheduled day of `txn`, skipped or not.
pub fn is_scheduled_on(txn: &Transaction, day: NaiveDate, horizon: RecurrenceHorizon) -> bool {
    if is_concrete(txn) {
        return txn.anchor_date == day;
    }
    !schedule(txn, DateWindow::day(day), horizon).is_empty()
}

/// First occurrence strictly after `after`, if the series has one left.
pub fn next_occurrence(
    txn: &Transaction,
    after: NaiveDate,
    horizon: RecurrenceHorizon,
) -> Option<NaiveDate> {
    let start = after.succ_opt()?;
    if is_concrete(txn) {
        return (txn.anchor_date >= start).then_some(txn.anchor_date);
    }
    let limit = series_limit(txn, horizon);
    let window = DateWindow::new(start, limit).ok()?;
    series_dates(txn, window, horizon)
        .first()
        .map(|(_, day)| *day)
}

/// Every unskipped day of a series, from its anchor to its end date or to the
/// horizon cap when it has none.
pub fn series_days(txn: &Transaction, horizon: RecurrenceHorizon) -> Vec<NaiveDate> {
    let Ok(window) = DateWindow::new(txn.anchor_date, series_limit(txn, horizon)) else {
        return Vec::new();
    };
    series_dates(txn, window, horizon)
        .into_iter()
        .map(|(_, day)| day)
        .collect()
}

/// Whether a series would run past the most occurrences one series may
/// produce. Longer series are cut off at the cap.
pub fn exceeds_occurrence_cap(txn: &Transaction, horizon: RecurrenceHorizon) -> bool {
    if !txn.is_recurring() {
        return false;
    }
    let limit = series_limit(txn, horizon);
    matches!(
        nth_occurrence(txn.recurrence.rule, txn.anchor_date, MAX_OCCURRENCES_PER_SERIES as u32),
        Some(day) if day <= limit
    )
}

/// Turns a rule-carrying template into one record per occurrence, all sharing
/// a fresh group id. The series runs from the anchor to its end date, or to
/// the horizon cap when it has none.
pub fn materialize_series(template: &Transaction, horizon: RecurrenceHorizon) -> Vec<Transaction> {
    if !template.is_recurring() {
        return vec![template.clone()];
    }
    let group_id = Uuid::new_v4();
    series_days(template, horizon)
        .into_iter()
        .map(|day| {
            let mut record = template.clone();
            record.id = Uuid::new_v4();
            record.anchor_date = day;
            record.recurrence.group_id = Some(group_id);
            record.recurrence.exceptions.clear();
            record
        })
        .collect()
}

fn is_concrete(txn: &Transaction) -> bool {
    !txn.is_recurring() || txn.recurrence.is_materialized()
}

fn series_limit(txn: &Transaction, horizon: RecurrenceHorizon) -> NaiveDate {
    txn.recurrence
        .end_date
        .unwrap_or_else(|| horizon.cap_for(txn.anchor_date))
}

fn schedule(
    txn: &Transaction,
    window: DateWindow,
    horizon: RecurrenceHorizon,
) -> Vec<(u32, NaiveDate)> {
    let anchor = txn.anchor_date;
    let rule = txn.recurrence.rule;
    debug_assert!(
        rule.matches_anchor(anchor),
        "rule {rule:?} does not match anchor {anchor} of {}",
        txn.id
    );

    let limit = series_limit(txn, horizon).min(window.end);
    let start = window.start.max(anchor);
    let mut dates = Vec::new();
    if start > limit {
        return dates;
    }

    let mut index = first_index_on_or_after(rule, anchor, start);
    while dates.len() < MAX_OCCURRENCES_PER_SERIES {
        let Some(day) = nth_occurrence(rule, anchor, index) else {
            break;
        };
        if day > limit {
            break;
        }
        assert!(day >= anchor, "occurrence {day} precedes anchor {anchor}");
        if day >= start {
            dates.push((index, day));
        }
        index += 1;
    }
    if dates.len() == MAX_OCCURRENCES_PER_SERIES
        && matches!(nth_occurrence(rule, anchor, index), Some(day) if day <= limit)
    {
        warn!(
            id = %txn.id,
            cap = MAX_OCCURRENCES_PER_SERIES,
            "series truncated at the occurrence cap"
        );
    }
    dates
}

/// Smallest series index whose occurrence could land on or after `target`.
fn first_index_on_or_after(rule: RecurrenceRule, anchor: NaiveDate, target: NaiveDate) -> u32 {
    if target <= anchor {
        return 0;
    }
    match rule {
        RecurrenceRule::Weekly { .. } | RecurrenceRule::Biweekly { .. } => {
            let period = rule.period_days().unwrap_or(7);
            let elapsed = (target - anchor).num_days();
            let steps = (elapsed + period - 1).div_euclid(period);
            u32::try_from(steps).unwrap_or(u32::MAX)
        }
        RecurrenceRule::Monthly { .. } => {
            // The occurrence in `target`'s month may still fall before it; the
            // caller's `day >= start` check drops it.
            u32::try_from(calendar::months_between(anchor, target)).unwrap_or(0)
        }
        RecurrenceRule::None => 0,
    }
}

fn nth_occurrence(rule: RecurrenceRule, anchor: NaiveDate, index: u32) -> Option<NaiveDate> {
    match rule {
        RecurrenceRule::None => (index == 0).then_some(anchor),
        RecurrenceRule::Weekly { .. } | RecurrenceRule::Biweekly { .. } => {
            let period = rule.period_days()?;
            anchor.checked_add_signed(Duration::days(period * i64::from(index)))
        }
        RecurrenceRule::Monthly { day_of_month } => calendar::clamped_day_in_month(
            calendar::month_index(anchor) + index as i32,
            day_of_month,
        ),
    }
}

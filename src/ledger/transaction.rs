use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::calendar::days_in_month;

/// A base transaction record owned by one user.
///
/// For a lazily expanded series the record is the rule itself and
/// `anchor_date` is the first occurrence. For an eagerly materialized series
/// every occurrence is its own record, `anchor_date` is that occurrence's day
/// and `recurrence.group_id` links the siblings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub owner_id: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub anchor_date: NaiveDate,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default)]
    pub recurrence: Recurrence,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        owner_id: impl Into<String>,
        kind: TransactionKind,
        amount: Decimal,
        category: impl Into<String>,
        anchor_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            amount,
            kind,
            category: category.into(),
            description: String::new(),
            anchor_date,
            status: TransactionStatus::Pending,
            recurrence: Recurrence::none(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    /// Makes the record a lazily expanded series of `kind` anchored on its date.
    pub fn repeating(mut self, kind: RecurrenceKind) -> Self {
        self.recurrence = Recurrence::new(kind, self.anchor_date);
        self
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        if self.recurrence.rule.is_periodic() {
            self.recurrence.end_date = Some(end_date);
        }
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.rule.is_periodic()
    }

    pub fn group_id(&self) -> Option<Uuid> {
        self.recurrence.group_id
    }

    /// Positive for income, negative for expenses.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }

    /// Re-derives rule fields that no longer agree with the anchor and clears
    /// fields that do not apply to the current rule.
    ///
    /// Materialized group members keep the rule of their series, whose anchor
    /// is the first sibling rather than their own date.
    pub fn normalize(&mut self) {
        let kind = self.recurrence.rule.kind();
        if kind == RecurrenceKind::None {
            self.recurrence = Recurrence::none();
            return;
        }
        if self.recurrence.group_id.is_some() {
            self.recurrence.exceptions.clear();
            return;
        }
        if !self.recurrence.rule.matches_anchor(self.anchor_date) {
            self.recurrence.rule = RecurrenceRule::for_anchor(kind, self.anchor_date);
        }
        if matches!(self.recurrence.end_date, Some(end) if end < self.anchor_date) {
            self.recurrence.end_date = None;
        }
        let anchor = self.anchor_date;
        self.recurrence.exceptions.retain(|day| *day >= anchor);
        self.recurrence.exceptions.sort();
        self.recurrence.exceptions.dedup();
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        })
    }
}

/// Only `Paid` occurrences count toward realized totals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Paid,
}

impl TransactionStatus {
    pub fn toggled(self) -> Self {
        match self {
            TransactionStatus::Pending => TransactionStatus::Paid,
            TransactionStatus::Paid => TransactionStatus::Pending,
        }
    }

    pub fn is_paid(self) -> bool {
        matches!(self, TransactionStatus::Paid)
    }
}

/// The periodic rules a transaction can follow, without their anchor data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceKind {
    #[default]
    None,
    Weekly,
    Biweekly,
    Monthly,
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecurrenceKind::None => "none",
            RecurrenceKind::Weekly => "weekly",
            RecurrenceKind::Biweekly => "biweekly",
            RecurrenceKind::Monthly => "monthly",
        })
    }
}

/// A rule together with the anchor-derived fields it needs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecurrenceRule {
    #[default]
    None,
    Weekly {
        weekday: Weekday,
    },
    Biweekly {
        weekday: Weekday,
    },
    Monthly {
        day_of_month: u32,
    },
}

impl RecurrenceRule {
    pub fn for_anchor(kind: RecurrenceKind, anchor: NaiveDate) -> Self {
        match kind {
            RecurrenceKind::None => RecurrenceRule::None,
            RecurrenceKind::Weekly => RecurrenceRule::Weekly {
                weekday: anchor.weekday(),
            },
            RecurrenceKind::Biweekly => RecurrenceRule::Biweekly {
                weekday: anchor.weekday(),
            },
            RecurrenceKind::Monthly => RecurrenceRule::Monthly {
                day_of_month: anchor.day(),
            },
        }
    }

    pub fn kind(&self) -> RecurrenceKind {
        match self {
            RecurrenceRule::None => RecurrenceKind::None,
            RecurrenceRule::Weekly { .. } => RecurrenceKind::Weekly,
            RecurrenceRule::Biweekly { .. } => RecurrenceKind::Biweekly,
            RecurrenceRule::Monthly { .. } => RecurrenceKind::Monthly,
        }
    }

    pub fn is_periodic(&self) -> bool {
        !matches!(self, RecurrenceRule::None)
    }

    /// Whether the derived fields agree with `anchor`. A monthly rule past the
    /// end of a short month agrees with that month's last day.
    pub fn matches_anchor(&self, anchor: NaiveDate) -> bool {
        match *self {
            RecurrenceRule::None => true,
            RecurrenceRule::Weekly { weekday } | RecurrenceRule::Biweekly { weekday } => {
                weekday == anchor.weekday()
            }
            RecurrenceRule::Monthly { day_of_month } => {
                let last = days_in_month(anchor.year(), anchor.month());
                (1..=31).contains(&day_of_month) && anchor.day() == day_of_month.min(last)
            }
        }
    }

    /// Days between occurrences for fixed-length periods.
    pub fn period_days(&self) -> Option<i64> {
        match self {
            RecurrenceRule::Weekly { .. } => Some(7),
            RecurrenceRule::Biweekly { .. } => Some(14),
            RecurrenceRule::None | RecurrenceRule::Monthly { .. } => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecurrenceRule::None => "One-off",
            RecurrenceRule::Weekly { .. } => "Weekly",
            RecurrenceRule::Biweekly { .. } => "Every 2 weeks",
            RecurrenceRule::Monthly { .. } => "Monthly",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Recurrence {
    pub rule: RecurrenceRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Set on every record of an eagerly materialized series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
    /// Occurrence days removed from a lazily expanded series.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<NaiveDate>,
}

impl Recurrence {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(kind: RecurrenceKind, anchor: NaiveDate) -> Self {
        Self {
            rule: RecurrenceRule::for_anchor(kind, anchor),
            ..Self::default()
        }
    }

    pub fn is_materialized(&self) -> bool {
        self.group_id.is_some()
    }

    pub fn is_skipped(&self, day: NaiveDate) -> bool {
        self.exceptions.binary_search(&day).is_ok()
    }
}

/// Input for creating a transaction; ids and timestamps are assigned on write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionDraft {
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub anchor_date: NaiveDate,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default)]
    pub recurrence: RecurrenceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl TransactionDraft {
    pub fn new(
        kind: TransactionKind,
        amount: Decimal,
        category: impl Into<String>,
        anchor_date: NaiveDate,
    ) -> Self {
        Self {
            amount,
            kind,
            category: category.into(),
            description: String::new(),
            anchor_date,
            status: TransactionStatus::Pending,
            recurrence: RecurrenceKind::None,
            end_date: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn repeating(mut self, kind: RecurrenceKind) -> Self {
        self.recurrence = kind;
        self
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }
}

/// Field-level changes applied by an update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub amount: Option<Decimal>,
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub anchor_date: Option<NaiveDate>,
    pub status: Option<TransactionStatus>,
    pub recurrence: Option<RecurrenceKind>,
    pub end_date: Option<Option<NaiveDate>>,
}

impl TransactionPatch {
    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn anchor_date(mut self, anchor_date: NaiveDate) -> Self {
        self.anchor_date = Some(anchor_date);
        self
    }

    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn recurrence(mut self, kind: RecurrenceKind) -> Self {
        self.recurrence = Some(kind);
        self
    }

    pub fn end_date(mut self, end_date: Option<NaiveDate>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Whether the patch moves or reshapes the schedule.
    pub fn touches_schedule(&self) -> bool {
        self.anchor_date.is_some() || self.recurrence.is_some() || self.end_date.is_some()
    }

    /// Applies every non-schedule field to `txn`.
    pub fn apply_details(&self, txn: &mut Transaction) {
        if let Some(amount) = self.amount {
            txn.amount = amount;
        }
        if let Some(kind) = self.kind {
            txn.kind = kind;
        }
        if let Some(category) = &self.category {
            txn.category = category.trim().to_string();
        }
        if let Some(description) = &self.description {
            txn.description = description.clone();
        }
        if let Some(status) = self.status {
            txn.status = status;
        }
    }
}

//! Paid-only aggregation and the reporting views built on it.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Result;
use crate::ledger::{
    calendar::{self, DateWindow},
    recurring::expand_with,
    Occurrence, RecurrenceHorizon, Transaction, TransactionKind,
};

/// Realized totals over a set of occurrences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub balance: Decimal,
    pub by_category_income: BTreeMap<String, Decimal>,
    pub by_category_expense: BTreeMap<String, Decimal>,
}

/// Totals for one calendar day. The unqualified figures count every
/// occurrence regardless of status; the `paid_` ones only realized money.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary<'a> {
    pub date: NaiveDate,
    /// False for the leading and trailing days a month grid borrows from its
    /// neighbours.
    pub in_month: bool,
    pub income: Decimal,
    pub expense: Decimal,
    pub paid_income: Decimal,
    pub paid_expense: Decimal,
    pub balance: Decimal,
    pub occurrences: Vec<Occurrence<'a>>,
}

/// A Sunday-first month grid, always a whole number of weeks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarMonth<'a> {
    pub month: DateWindow,
    pub days: Vec<DaySummary<'a>>,
}

impl<'a> CalendarMonth<'a> {
    pub fn weeks(&self) -> impl Iterator<Item = &[DaySummary<'a>]> {
        self.days.chunks(7)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DaySummary<'a>> {
        self.days.iter().find(|day| day.date == date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthTotals {
    pub year: i32,
    pub month: u32,
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

/// Preset report ranges, each ending on the last day of the reference month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    OneMonth,
    ThreeMonths,
    SixMonths,
    YearToDate,
}

impl ReportPeriod {
    pub fn window(&self, reference: NaiveDate) -> DateWindow {
        let end = calendar::end_of_month(reference);
        let start = match self.months() {
            Some(months) => calendar::shift_month(reference, 1 - months as i32)
                .map(calendar::start_of_month)
                .unwrap_or(NaiveDate::MIN),
            None => calendar::start_of_year(reference),
        };
        DateWindow { start, end }
    }

    fn months(&self) -> Option<u32> {
        match self {
            ReportPeriod::OneMonth => Some(1),
            ReportPeriod::ThreeMonths => Some(3),
            ReportPeriod::SixMonths => Some(6),
            ReportPeriod::YearToDate => None,
        }
    }
}

/// Percentage change between two summaries; `None` where the previous value
/// is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub income_change: Option<Decimal>,
    pub expense_change: Option<Decimal>,
    pub balance_change: Option<Decimal>,
}

pub struct SummaryService;

impl SummaryService {
    /// Sums paid occurrences by kind and category. Pending occurrences are
    /// ignored and empty input yields a zero summary.
    pub fn summarize(occurrences: &[Occurrence<'_>]) -> Summary {
        let mut summary = Summary::default();
        for occ in occurrences.iter().filter(|occ| occ.is_paid()) {
            let (total, by_category) = match occ.kind() {
                TransactionKind::Income => {
                    (&mut summary.total_income, &mut summary.by_category_income)
                }
                TransactionKind::Expense => {
                    (&mut summary.total_expense, &mut summary.by_category_expense)
                }
            };
            *total += occ.amount();
            *by_category
                .entry(occ.category().to_string())
                .or_insert(Decimal::ZERO) += occ.amount();
        }
        summary.balance = summary.total_income - summary.total_expense;
        summary
    }

    pub fn summarize_window(
        transactions: &[Transaction],
        window: DateWindow,
        horizon: RecurrenceHorizon,
    ) -> Summary {
        let occurrences = expand_with(transactions, window, horizon);
        let summary = Self::summarize(&occurrences);
        debug!(
            occurrences = occurrences.len(),
            income = %summary.total_income,
            expense = %summary.total_expense,
            "summarized window"
        );
        summary
    }

    /// One entry per day of `window`, ascending.
    pub fn day_summaries<'a>(
        transactions: &'a [Transaction],
        window: DateWindow,
        horizon: RecurrenceHorizon,
    ) -> Vec<DaySummary<'a>> {
        let mut by_day: BTreeMap<NaiveDate, Vec<Occurrence<'a>>> = BTreeMap::new();
        for occ in expand_with(transactions, window, horizon) {
            by_day.entry(occ.occurrence_date).or_default().push(occ);
        }
        window
            .days()
            .map(|date| day_summary(date, by_day.remove(&date).unwrap_or_default()))
            .collect()
    }

    pub fn calendar_month(
        transactions: &[Transaction],
        year: i32,
        month: u32,
        horizon: RecurrenceHorizon,
    ) -> Result<CalendarMonth<'_>> {
        let month_window = DateWindow::month(year, month)?;
        let grid = DateWindow {
            start: calendar::start_of_week(month_window.start),
            end: calendar::end_of_week(month_window.end),
        };
        let mut days = Self::day_summaries(transactions, grid, horizon);
        for day in &mut days {
            day.in_month = month_window.contains(day.date);
        }
        Ok(CalendarMonth {
            month: month_window,
            days,
        })
    }

    /// Paid totals for every calendar month from `first`'s month through
    /// `last`'s month.
    pub fn monthly_trend(
        transactions: &[Transaction],
        first: NaiveDate,
        last: NaiveDate,
        horizon: RecurrenceHorizon,
    ) -> Vec<MonthTotals> {
        let months = calendar::months_between(first, last);
        (0..=months)
            .filter_map(|offset| calendar::shift_month(calendar::start_of_month(first), offset))
            .map(|month_start| {
                let window = DateWindow::containing_month(month_start);
                let summary = Self::summarize_window(transactions, window, horizon);
                MonthTotals {
                    year: month_start.year(),
                    month: month_start.month(),
                    income: summary.total_income,
                    expense: summary.total_expense,
                    balance: summary.balance,
                }
            })
            .collect()
    }

    pub fn compare_periods(current: &Summary, previous: &Summary) -> PeriodComparison {
        PeriodComparison {
            income_change: percent_change(current.total_income, previous.total_income),
            expense_change: percent_change(current.total_expense, previous.total_expense),
            balance_change: percent_change(current.balance, previous.balance),
        }
    }

    /// The month containing `reference` against the month before it.
    pub fn month_over_month(
        transactions: &[Transaction],
        reference: NaiveDate,
        horizon: RecurrenceHorizon,
    ) -> PeriodComparison {
        let current = Self::summarize_window(
            transactions,
            DateWindow::containing_month(reference),
            horizon,
        );
        let previous = calendar::shift_month(reference, -1)
            .map(|day| {
                Self::summarize_window(transactions, DateWindow::containing_month(day), horizon)
            })
            .unwrap_or_default();
        Self::compare_periods(&current, &previous)
    }
}

fn day_summary(date: NaiveDate, occurrences: Vec<Occurrence<'_>>) -> DaySummary<'_> {
    let mut summary = DaySummary {
        date,
        in_month: true,
        income: Decimal::ZERO,
        expense: Decimal::ZERO,
        paid_income: Decimal::ZERO,
        paid_expense: Decimal::ZERO,
        balance: Decimal::ZERO,
        occurrences: Vec::new(),
    };
    for occ in &occurrences {
        let paid = occ.is_paid();
        match occ.kind() {
            TransactionKind::Income => {
                summary.income += occ.amount();
                if paid {
                    summary.paid_income += occ.amount();
                }
            }
            TransactionKind::Expense => {
                summary.expense += occ.amount();
                if paid {
                    summary.paid_expense += occ.amount();
                }
            }
        }
    }
    summary.balance = summary.income - summary.expense;
    summary.occurrences = occurrences;
    summary
}

fn percent_change(current: Decimal, previous: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    Some((current - previous) / previous.abs() * Decimal::ONE_HUNDRED)
}

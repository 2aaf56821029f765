//! Year-to-date emergency-fund usage.
//!
//! Usage is the running deficit since January 1st of the queried day's year.
//! It never resets at month boundaries; only income catching up with
//! expenses brings it back down.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::summary_service::{Summary, SummaryService};
use crate::ledger::{calendar, DateWindow, RecurrenceHorizon, Transaction};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeSummary {
    #[serde(flatten)]
    pub summary: Summary,
    pub emergency_fund_used: Decimal,
}

/// Where the configured reserve stands after the year-to-date deficit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyFundStatus {
    pub total: Decimal,
    pub used: Decimal,
    pub remaining: Decimal,
    /// Share of `total` consumed, capped at 100; zero when nothing is reserved.
    pub used_percentage: Decimal,
}

impl EmergencyFundStatus {
    pub fn new(total: Decimal, used: Decimal) -> Self {
        let remaining = (total - used).max(Decimal::ZERO);
        let used_percentage = if total > Decimal::ZERO {
            (used / total * Decimal::ONE_HUNDRED).min(Decimal::ONE_HUNDRED)
        } else {
            Decimal::ZERO
        };
        Self {
            total,
            used,
            remaining,
            used_percentage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservePoint {
    pub date: NaiveDate,
    pub emergency_fund_used: Decimal,
}

pub struct ReserveService;

impl ReserveService {
    /// Paid totals from January 1st through `up_to`, plus the deficit they
    /// leave behind.
    pub fn cumulative(
        transactions: &[Transaction],
        up_to: NaiveDate,
        horizon: RecurrenceHorizon,
    ) -> CumulativeSummary {
        let summary =
            SummaryService::summarize_window(transactions, DateWindow::year_to_date(up_to), horizon);
        let emergency_fund_used = (summary.total_expense - summary.total_income).max(Decimal::ZERO);
        CumulativeSummary {
            summary,
            emergency_fund_used,
        }
    }

    pub fn fund_status(
        transactions: &[Transaction],
        up_to: NaiveDate,
        fund_total: Decimal,
        horizon: RecurrenceHorizon,
    ) -> EmergencyFundStatus {
        let used = Self::cumulative(transactions, up_to, horizon).emergency_fund_used;
        EmergencyFundStatus::new(fund_total, used)
    }

    /// Usage at every month end of `up_to`'s year, the last point being
    /// `up_to` itself.
    pub fn reserve_timeline(
        transactions: &[Transaction],
        up_to: NaiveDate,
        horizon: RecurrenceHorizon,
    ) -> Vec<ReservePoint> {
        (1..=up_to.month())
            .filter_map(|month| NaiveDate::from_ymd_opt(up_to.year(), month, 1))
            .map(|first| calendar::end_of_month(first).min(up_to))
            .map(|date| ReservePoint {
                date,
                emergency_fund_used: Self::cumulative(transactions, date, horizon)
                    .emergency_fund_used,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{TransactionKind, TransactionStatus};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn paid(kind: TransactionKind, amount: i64, date: NaiveDate) -> Transaction {
        Transaction::new("ana", kind, Decimal::new(amount, 0), "Other", date)
            .with_status(TransactionStatus::Paid)
    }

    fn deficit_ledger() -> Vec<Transaction> {
        vec![
            paid(TransactionKind::Income, 1000, day(2024, 1, 5)),
            paid(TransactionKind::Expense, 1500, day(2024, 1, 20)),
            paid(TransactionKind::Expense, 200, day(2024, 2, 10)),
        ]
    }

    #[test]
    fn usage_is_the_year_to_date_deficit() {
        let records = deficit_ledger();
        let horizon = RecurrenceHorizon::default();
        let jan = ReserveService::cumulative(&records, day(2024, 1, 31), horizon);
        let feb = ReserveService::cumulative(&records, day(2024, 2, 29), horizon);
        assert_eq!(jan.emergency_fund_used, Decimal::new(500, 0));
        assert_eq!(feb.emergency_fund_used, Decimal::new(700, 0));
        assert_eq!(feb.summary.balance, Decimal::new(-700, 0));
    }

    #[test]
    fn surplus_never_goes_negative_and_previous_years_do_not_leak() {
        let mut records = deficit_ledger();
        records.push(paid(TransactionKind::Income, 5000, day(2024, 3, 1)));
        let horizon = RecurrenceHorizon::default();
        let march = ReserveService::cumulative(&records, day(2024, 3, 31), horizon);
        assert_eq!(march.emergency_fund_used, Decimal::ZERO);

        let next_year = ReserveService::cumulative(&records, day(2025, 1, 31), horizon);
        assert_eq!(next_year.summary, Summary::default());
    }

    #[test]
    fn timeline_has_one_point_per_month_end() {
        let records = deficit_ledger();
        let points = ReserveService::reserve_timeline(
            &records,
            day(2024, 3, 15),
            RecurrenceHorizon::default(),
        );
        let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(2024, 1, 31), day(2024, 2, 29), day(2024, 3, 15)]);
        assert!(points
            .windows(2)
            .all(|w| w[0].emergency_fund_used <= w[1].emergency_fund_used));
    }

    #[test]
    fn fund_status_caps_percentage_and_floors_remaining() {
        let status = EmergencyFundStatus::new(Decimal::new(500, 0), Decimal::new(700, 0));
        assert_eq!(status.remaining, Decimal::ZERO);
        assert_eq!(status.used_percentage, Decimal::ONE_HUNDRED);

        let status = EmergencyFundStatus::new(Decimal::new(2000, 0), Decimal::new(700, 0));
        assert_eq!(status.remaining, Decimal::new(1300, 0));
        assert_eq!(status.used_percentage, Decimal::new(35, 0));

        let unset = EmergencyFundStatus::new(Decimal::ZERO, Decimal::new(700, 0));
        assert_eq!(unset.used_percentage, Decimal::ZERO);
    }

    #[test]
    fn cumulative_serializes_flat() {
        let records = deficit_ledger();
        let value = serde_json::to_value(ReserveService::cumulative(
            &records,
            day(2024, 2, 29),
            RecurrenceHorizon::default(),
        ))
        .unwrap();
        assert!(value.get("total_income").is_some());
        assert!(value.get("emergency_fund_used").is_some());
    }
}

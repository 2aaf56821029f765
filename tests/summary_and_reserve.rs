mod common;

use cashflow_core::{
    config::Config,
    core::services::{ReportPeriod, ReserveService, SummaryService},
    ledger::{
        expand, DateWindow, RecurrenceHorizon, RecurrenceKind, Transaction, TransactionDraft,
        TransactionKind, TransactionStatus,
    },
};
use chrono::NaiveDate;
use common::{day, memory_repository, money};
use rust_decimal::Decimal;

fn paid(kind: TransactionKind, amount: &str, category: &str, date: NaiveDate) -> Transaction {
    Transaction::new("ana", kind, money(amount), category, date).with_status(TransactionStatus::Paid)
}

fn sample_month() -> Vec<Transaction> {
    vec![
        paid(TransactionKind::Income, "3000", "Salary", day(2024, 5, 5)),
        paid(TransactionKind::Expense, "1200", "Housing", day(2024, 5, 10)),
        paid(TransactionKind::Expense, "45.50", "Food", day(2024, 5, 11)),
        paid(TransactionKind::Expense, "30.25", "Food", day(2024, 5, 20)),
        Transaction::new("ana", TransactionKind::Expense, money("80"), "Leisure", day(2024, 5, 22)),
    ]
}

#[test]
fn summarize_ignores_input_order() {
    let records = sample_month();
    let window = DateWindow::month(2024, 5).expect("month");
    let forward = expand(&records, window);
    let mut reversed = forward.clone();
    reversed.reverse();
    let mut rotated = forward.clone();
    rotated.rotate_left(2);

    let expected = SummaryService::summarize(&forward);
    assert_eq!(SummaryService::summarize(&reversed), expected);
    assert_eq!(SummaryService::summarize(&rotated), expected);
    assert_eq!(expected.total_expense, money("1275.75"));
    assert_eq!(expected.by_category_expense["Food"], money("75.75"));
    assert!(!expected.by_category_expense.contains_key("Leisure"));
}

#[test]
fn paid_income_and_pending_expense() {
    let records = vec![
        paid(TransactionKind::Income, "100", "Salary", day(2024, 6, 1)),
        Transaction::new("ana", TransactionKind::Expense, money("50"), "Food", day(2024, 6, 2)),
    ];
    let occurrences = expand(&records, DateWindow::month(2024, 6).expect("month"));
    assert_eq!(occurrences.len(), 2);

    let summary = SummaryService::summarize(&occurrences);
    assert_eq!(summary.total_income, money("100"));
    assert_eq!(summary.total_expense, Decimal::ZERO);
    assert_eq!(summary.balance, money("100"));
}

#[test]
fn empty_ledger_summarizes_to_zero() {
    let summary = SummaryService::summarize_window(
        &[],
        DateWindow::month(2024, 1).expect("month"),
        RecurrenceHorizon::default(),
    );
    assert_eq!(summary.total_income, Decimal::ZERO);
    assert_eq!(summary.total_expense, Decimal::ZERO);
    assert_eq!(summary.balance, Decimal::ZERO);
    assert!(summary.by_category_income.is_empty());
    assert!(summary.by_category_expense.is_empty());
}

#[test]
fn unregistered_categories_are_aggregated() {
    let records = vec![paid(
        TransactionKind::Expense,
        "12",
        "Crypto mining rig",
        day(2024, 6, 3),
    )];
    let summary = SummaryService::summarize_window(
        &records,
        DateWindow::month(2024, 6).expect("month"),
        RecurrenceHorizon::default(),
    );
    assert_eq!(summary.by_category_expense["Crypto mining rig"], money("12"));
}

#[test]
fn emergency_fund_usage_accumulates_across_months() {
    let repo = memory_repository(Config {
        emergency_fund_total: money("1000"),
        ..Config::default()
    });
    let entries = [
        (TransactionKind::Income, "1000", day(2024, 1, 5)),
        (TransactionKind::Expense, "1500", day(2024, 1, 18)),
        (TransactionKind::Expense, "200", day(2024, 2, 12)),
    ];
    for (kind, amount, date) in entries {
        repo.create(
            TransactionDraft::new(kind, money(amount), "Other", date)
                .with_status(TransactionStatus::Paid),
        )
        .expect("create");
    }

    let january = repo.cumulative(day(2024, 1, 31));
    let february = repo.cumulative(day(2024, 2, 29));
    assert_eq!(january.emergency_fund_used, money("500"));
    assert_eq!(february.emergency_fund_used, money("700"));
    assert!(february.emergency_fund_used >= january.emergency_fund_used);
    assert_eq!(february.summary.total_expense, money("1700"));

    // The repository clock reads 2024-03-15.
    let status = repo.fund_status();
    assert_eq!(status.used, money("700"));
    assert_eq!(status.remaining, money("300"));
    assert_eq!(status.used_percentage, money("70"));
}

#[test]
fn a_surplus_month_does_not_refill_the_fund_by_itself() {
    let records = vec![
        paid(TransactionKind::Income, "1000", "Salary", day(2024, 1, 5)),
        paid(TransactionKind::Expense, "1600", "Housing", day(2024, 1, 6)),
        paid(TransactionKind::Income, "1000", "Salary", day(2024, 2, 5)),
        paid(TransactionKind::Expense, "900", "Housing", day(2024, 2, 6)),
    ];
    let horizon = RecurrenceHorizon::default();
    let timeline = ReserveService::reserve_timeline(&records, day(2024, 2, 29), horizon);
    let used: Vec<Decimal> = timeline.iter().map(|p| p.emergency_fund_used).collect();
    assert_eq!(used, vec![money("600"), money("500")]);
}

#[test]
fn recurring_salary_feeds_the_cumulative_view() {
    let records = vec![
        paid(TransactionKind::Income, "2000", "Salary", day(2024, 1, 1))
            .repeating(RecurrenceKind::Monthly),
        paid(TransactionKind::Expense, "2500", "Housing", day(2024, 1, 2))
            .repeating(RecurrenceKind::Monthly),
    ];
    let horizon = RecurrenceHorizon::default();
    let april = ReserveService::cumulative(&records, day(2024, 4, 30), horizon);
    assert_eq!(april.summary.total_income, money("8000"));
    assert_eq!(april.emergency_fund_used, money("2000"));

    let window = ReportPeriod::ThreeMonths.window(day(2024, 4, 10));
    let trend = SummaryService::monthly_trend(&records, window.start, window.end, horizon);
    assert_eq!(trend.len(), 3);
    assert!(trend.iter().all(|month| month.balance == money("-500")));
}

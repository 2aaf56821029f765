mod common;

use cashflow_core::ledger::{
    calendar::{format_day, parse_day},
    expand, expand_with,
    recurring::next_occurrence,
    DateWindow, RecurrenceHorizon, RecurrenceKind, Transaction, TransactionKind,
};
use chrono::{Datelike, NaiveDate, Weekday};
use common::{day, money};

fn window(start: NaiveDate, end: NaiveDate) -> DateWindow {
    DateWindow::new(start, end).expect("valid window")
}

fn expense(anchor: NaiveDate) -> Transaction {
    Transaction::new("ana", TransactionKind::Expense, money("99.90"), "Utilities", anchor)
}

#[test]
fn one_off_transactions_occur_exactly_on_their_day() {
    for anchor in [day(2024, 1, 1), day(2024, 2, 29), day(2023, 12, 31)] {
        let records = vec![expense(anchor)];

        let hit = expand(&records, DateWindow::day(anchor));
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].occurrence_date, anchor);
        assert_eq!(hit[0].transaction.id, records[0].id);

        let after = window(
            anchor.succ_opt().expect("next day"),
            anchor + chrono::Duration::days(10),
        );
        assert!(expand(&records, after).is_empty());
    }
}

#[test]
fn monthly_on_the_31st_lands_on_the_last_day_of_february() {
    let leap = vec![expense(day(2024, 1, 31)).repeating(RecurrenceKind::Monthly)];
    let feb = expand(&leap, DateWindow::month(2024, 2).expect("month"));
    assert_eq!(feb.len(), 1);
    assert_eq!(feb[0].occurrence_date, day(2024, 2, 29));

    let common_year = vec![expense(day(2023, 1, 31)).repeating(RecurrenceKind::Monthly)];
    let feb = expand(&common_year, DateWindow::month(2023, 2).expect("month"));
    assert_eq!(feb.len(), 1);
    assert_eq!(feb[0].occurrence_date, day(2023, 2, 28));

    // Every month of the year gets exactly one occurrence.
    let year = expand(&leap, window(day(2024, 1, 1), day(2024, 12, 31)));
    let mut months: Vec<u32> = year.iter().map(|occ| occ.occurrence_date.month()).collect();
    months.sort_unstable();
    assert_eq!(months, (1..=12).collect::<Vec<_>>());
    // Clamping is computed from the anchor, so March is back on the 31st.
    assert!(year.iter().any(|occ| occ.occurrence_date == day(2024, 3, 31)));
}

#[test]
fn weekly_and_biweekly_keep_the_anchor_weekday() {
    let anchor = day(2024, 1, 2);
    assert_eq!(anchor.weekday(), Weekday::Tue);
    let records = vec![
        expense(anchor).repeating(RecurrenceKind::Weekly),
        expense(anchor).repeating(RecurrenceKind::Biweekly),
    ];
    let march = expand(&records, DateWindow::month(2024, 3).expect("month"));
    assert!(march
        .iter()
        .all(|occ| occ.occurrence_date.weekday() == Weekday::Tue));

    let weekly = march.iter().filter(|occ| occ.transaction.id == records[0].id).count();
    let biweekly = march.iter().filter(|occ| occ.transaction.id == records[1].id).count();
    assert_eq!(weekly, 4);
    assert_eq!(biweekly, 2);
}

#[test]
fn open_series_stop_at_the_configured_horizon() {
    let records = vec![expense(day(2024, 1, 10)).repeating(RecurrenceKind::Monthly)];
    let wide = window(day(2024, 1, 1), day(2026, 12, 31));

    assert_eq!(expand(&records, wide).len(), 13);
    assert_eq!(expand_with(&records, wide, RecurrenceHorizon::months(3)).len(), 4);

    let bounded = vec![expense(day(2024, 1, 10))
        .repeating(RecurrenceKind::Monthly)
        .until(day(2025, 6, 30))];
    assert_eq!(expand(&bounded, wide).len(), 18);
}

#[test]
fn results_are_newest_first_with_stable_ties() {
    let first = expense(day(2024, 4, 1)).repeating(RecurrenceKind::Weekly);
    let second = expense(day(2024, 4, 8));
    let records = vec![first.clone(), second.clone()];
    let occurrences = expand(&records, DateWindow::month(2024, 4).expect("month"));

    let dates: Vec<NaiveDate> = occurrences.iter().map(|occ| occ.occurrence_date).collect();
    let mut sorted = dates.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(dates, sorted);

    let on_eighth: Vec<_> = occurrences
        .iter()
        .filter(|occ| occ.occurrence_date == day(2024, 4, 8))
        .map(|occ| occ.transaction.id)
        .collect();
    assert_eq!(on_eighth, vec![first.id, second.id]);
}

#[test]
fn next_occurrence_finds_the_upcoming_bill() {
    let rent = expense(day(2024, 1, 31)).repeating(RecurrenceKind::Monthly);
    let horizon = RecurrenceHorizon::default();
    assert_eq!(
        next_occurrence(&rent, day(2024, 2, 15), horizon),
        Some(day(2024, 2, 29))
    );
    assert_eq!(next_occurrence(&rent, day(2025, 1, 31), horizon), None);
}

#[test]
fn boundary_strings_keep_the_written_day() {
    assert_eq!(parse_day("2024-03-10").expect("plain day"), day(2024, 3, 10));
    assert_eq!(
        parse_day("2024-03-10T23:30:00-05:00").expect("date-time"),
        day(2024, 3, 10)
    );
    assert_eq!(
        parse_day("2024-03-10 00:15:00").expect("date-time with space"),
        day(2024, 3, 10)
    );
    assert!(parse_day("10/03/2024").is_err());
    assert!(parse_day("2024-02-30").is_err());
    assert_eq!(format_day(day(2024, 3, 1)), "2024-03-01");

    let json = serde_json::to_string(&expense(day(2024, 3, 1))).expect("serialize");
    assert!(json.contains("\"anchor_date\":\"2024-03-01\""));
}

//! Calendar-day arithmetic.
//!
//! Every date in the crate is a [`NaiveDate`]: a day on the calendar with no
//! time of day and no zone. Nothing in this module consults a clock, so a date
//! can never drift across midnight because of where the code runs.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};

/// Wire format for dates crossing the crate boundary.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// An inclusive range of calendar days, `start ..= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(LedgerError::validation(format!(
                "window end {} precedes its start {}",
                format_day(end),
                format_day(start)
            )));
        }
        Ok(Self { start, end })
    }

    /// A window covering a single day.
    pub fn day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// The whole calendar month `month` (1-based) of `year`.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            LedgerError::validation(format!("invalid month {year}-{month:02}"))
        })?;
        Ok(Self::containing_month(first))
    }

    /// The calendar month that contains `day`.
    pub fn containing_month(day: NaiveDate) -> Self {
        Self {
            start: start_of_month(day),
            end: end_of_month(day),
        }
    }

    /// January 1st of `day`'s year through `day`.
    pub fn year_to_date(day: NaiveDate) -> Self {
        Self {
            start: start_of_year(day),
            end: day,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Iterates every day of the window in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), |day| day.succ_opt())
            .take_while(move |day| *day <= end)
    }

    /// Shrinks the window so it ends no later than `limit`. Returns `None` when
    /// nothing of the window is left.
    pub fn truncate_to(&self, limit: NaiveDate) -> Option<Self> {
        let end = self.end.min(limit);
        (end >= self.start).then_some(Self {
            start: self.start,
            end,
        })
    }
}

/// Parses a boundary date string into a calendar day.
///
/// Accepts `YYYY-MM-DD`, or a date-time whose first ten characters are that
/// day followed by `T` or a space. The written day is kept as-is; no offset is
/// ever applied.
pub fn parse_day(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let invalid = || LedgerError::validation(format!("invalid date `{raw}`, expected YYYY-MM-DD"));
    let day_part = match trimmed.get(..10) {
        Some(prefix) if trimmed.len() == 10 => prefix,
        Some(prefix) if matches!(trimmed.as_bytes()[10], b'T' | b' ') => prefix,
        _ => return Err(invalid()),
    };
    NaiveDate::parse_from_str(day_part, DAY_FORMAT).map_err(|_| invalid())
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

pub fn start_of_month(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.day0()))
}

pub fn end_of_month(day: NaiveDate) -> NaiveDate {
    let first = start_of_month(day);
    first + Duration::days(i64::from(days_in_month(day.year(), day.month())) - 1)
}

pub fn start_of_year(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.ordinal0()))
}

/// Sunday on or before `day`; calendar grids start their weeks on Sunday.
pub fn start_of_week(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_sunday()))
}

/// Saturday on or after `day`.
pub fn end_of_week(day: NaiveDate) -> NaiveDate {
    start_of_week(day) + Duration::days(6)
}

/// Zero-based month counter used for month-stepping math.
pub fn month_index(day: NaiveDate) -> i32 {
    day.year() * 12 + day.month0() as i32
}

/// Number of whole calendar months from `from`'s month to `to`'s month.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    month_index(to) - month_index(from)
}

/// Builds the date for `day_of_month` in the month at `index` (see
/// [`month_index`]), clamping to the month's last day when it is shorter.
pub fn clamped_day_in_month(index: i32, day_of_month: u32) -> Option<NaiveDate> {
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    let day = day_of_month.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Moves `date` by `months`, clamping the day to the target month's length.
pub fn shift_month(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    clamped_day_in_month(month_index(date) + months, date.day())
}

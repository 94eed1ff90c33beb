//! Local calendar-date helpers.
//!
//! Every date in nibble is a plain calendar day (`NaiveDate`) in the caregiver's local
//! timezone. Dates are never converted through UTC, so a day formatted here is the same
//! string the store uses as a lookup key.

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date on the local wall clock.
#[must_use]
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// Format a date as `YYYY-MM-DD`.
#[must_use]
pub fn local_date_string(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date_str(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .with_context(|| format!("Invalid date '{s}'. Use YYYY-MM-DD"))
}

/// Calendar date of a stored timestamp: the text before the `T`.
///
/// Timestamps are written with the local offset, so the date portion is already the
/// local day the record was created on.
#[must_use]
pub fn timestamp_date(timestamp: &str) -> Option<NaiveDate> {
    let date_part = timestamp.split('T').next()?;
    NaiveDate::parse_from_str(date_part.trim(), DATE_FORMAT).ok()
}

/// Whole days from `date` to `today`; negative when `date` is ahead of `today`.
#[must_use]
pub fn days_since(date: NaiveDate, today: NaiveDate) -> i64 {
    (today - date).num_days()
}

#[must_use]
pub fn is_future(date: NaiveDate, today: NaiveDate) -> bool {
    date > today
}

/// `date` moved by `days`, or `None` past the end of the supported calendar.
#[must_use]
pub fn shift_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
}

/// Human phrasing for how long ago a food was last given.
#[must_use]
pub fn format_last_given(last_given: Option<NaiveDate>, today: NaiveDate) -> String {
    let Some(date) = last_given else {
        return "Never given".to_string();
    };

    let days = days_since(date, today);
    match days {
        ..=0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{days} days ago"),
        7..=13 => "1 week ago".to_string(),
        14..=29 => format!("{} weeks ago", days / 7),
        30..=59 => "1 month ago".to_string(),
        _ => format!("{} months ago", days / 30),
    }
}

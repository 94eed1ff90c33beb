//! Month grid for the calendar view: six Sunday-first weeks covering one month.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::dates;
use crate::models::CalendarEntry;

/// Cells in a month grid: six rows of seven days.
pub const GRID_CELLS: usize = 42;

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_current_month: bool,
    pub is_today: bool,
    pub entries: Vec<CalendarEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
}

impl CalendarMonth {
    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarDay]> {
        self.days.chunks(7)
    }

    /// e.g. "October 2026"
    #[must_use]
    pub fn title(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.days
            .iter()
            .filter(|d| d.is_current_month)
            .map(|d| d.entries.len())
            .sum()
    }
}

/// Lay out `year`/`month` as a 42-day grid starting on the Sunday on or before the 1st.
///
/// Entries are attached to the cell with the same calendar date, keeping their input
/// order. Returns `None` when `month` is not a real month or the grid would run past
/// the supported date range.
#[must_use]
pub fn month_grid(
    year: i32,
    month: u32,
    entries: &[CalendarEntry],
    today: NaiveDate,
) -> Option<CalendarMonth> {
    let (start, _) = grid_bounds(year, month)?;

    let mut by_date: HashMap<NaiveDate, Vec<CalendarEntry>> = HashMap::new();
    for entry in entries {
        by_date.entry(entry.date).or_default().push(entry.clone());
    }

    let days = start
        .iter_days()
        .take(GRID_CELLS)
        .map(|date| CalendarDay {
            date,
            is_current_month: date.month() == month && date.year() == year,
            is_today: date == today,
            entries: by_date.remove(&date).unwrap_or_default(),
        })
        .collect();

    Some(CalendarMonth { year, month, days })
}

/// First and last date shown by the grid for `year`/`month`.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn grid_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let start = dates::shift_days(first, -i64::from(first.weekday().num_days_from_sunday()))?;
    Some((start, dates::shift_days(start, GRID_CELLS as i64 - 1)?))
}

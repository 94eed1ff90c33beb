use anyhow::Result;
use chrono::Datelike;
use std::process;

use nibble_core::calendar::CalendarMonth;
use nibble_core::dates;
use nibble_core::service::NibbleService;

use super::entry::format_entry_line;
use super::helpers::{parse_date, parse_month};

const WEEKDAY_HEADER: &str = " Sun  Mon  Tue  Wed  Thu  Fri  Sat";

/// Render a month as a text grid. Days with entries carry a `*`, today is bracketed and
/// days outside the month are dimmed to `.`.
pub(crate) fn render_month(month: &CalendarMonth) -> String {
    let mut out = format!("{:^34}\n{WEEKDAY_HEADER}\n", month.title());
    for week in month.weeks() {
        let cells: Vec<String> = week
            .iter()
            .map(|day| {
                if !day.is_current_month {
                    return "   . ".to_string();
                }
                let marker = if day.entries.is_empty() { ' ' } else { '*' };
                if day.is_today {
                    format!("[{:>2}]{marker}", day.date.day())
                } else {
                    format!(" {:>2} {marker}", day.date.day())
                }
            })
            .collect();
        out.push_str(cells.join("").trim_end());
        out.push('\n');
    }
    out
}

pub(crate) fn cmd_calendar(svc: &NibbleService, month: Option<&str>, json: bool) -> Result<()> {
    let (year, month) = parse_month(month, svc.today())?;
    let grid = svc.month(year, month)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&grid)?);
        return Ok(());
    }

    print!("{}", render_month(&grid));

    let mut current: Vec<_> = grid
        .days
        .iter()
        .filter(|d| d.is_current_month && !d.entries.is_empty())
        .collect();
    current.sort_by_key(|d| d.date);
    if current.is_empty() {
        println!("\nNo entries this month");
        return Ok(());
    }

    println!();
    for day in current {
        let names: Vec<&str> = day
            .entries
            .iter()
            .map(|e| e.food_name.as_deref().unwrap_or("?"))
            .collect();
        println!("  {} {}", day.date.format("%a %d"), names.join(", "));
    }
    println!("\n  {} entries", grid.entry_count());
    Ok(())
}

pub(crate) fn cmd_day(svc: &NibbleService, date: Option<&str>, json: bool) -> Result<()> {
    let date = parse_date(date, svc.today())?;
    let entries = svc.entries_for_date(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        eprintln!("No entries for {}", dates::local_date_string(date));
        process::exit(2);
    }

    println!("=== {} ===\n", date.format("%A, %B %-d, %Y"));
    for entry in &entries {
        println!("  {}", format_entry_line(entry));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nibble_core::calendar::month_grid;
    use nibble_core::models::{CalendarEntry, Texture};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_month_default_is_current() {
        assert_eq!(parse_month(None, d(2026, 10, 16)).unwrap(), (2026, 10));
    }

    #[test]
    fn test_render_month_marks_today_and_entries() {
        let entry = CalendarEntry {
            id: 1,
            uuid: String::new(),
            food_id: 1,
            date: d(2026, 10, 3),
            texture: Texture::Puree,
            notes: None,
            reaction: None,
            created_at: String::new(),
            food_name: Some("Pear".to_string()),
            food_emoji: None,
        };
        let grid = month_grid(2026, 10, &[entry], d(2026, 10, 16)).unwrap();
        let text = render_month(&grid);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0].trim(), "October 2026");
        assert_eq!(lines[1], WEEKDAY_HEADER);
        // six weeks after the two header lines
        assert_eq!(lines.len(), 8);
        // Oct 1 is a Thursday, so the first row opens with four padding days
        assert!(lines[2].starts_with("   .    .    .    .   1"));
        assert!(lines[2].contains("  3 *"));
        assert!(text.contains("[16]"));
    }
}

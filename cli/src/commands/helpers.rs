use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nibble_core::dates;
use nibble_core::models::{Food, FoodStatus, IntroStatus};

/// Parse a CLI date relative to `today`: `YYYY-MM-DD` or today/yesterday/tomorrow.
pub(crate) fn parse_date(date_str: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    match date_str.map(str::trim) {
        None | Some("today") => Ok(today),
        Some("yesterday") => dates::shift_days(today, -1).context("Date out of range"),
        Some("tomorrow") => dates::shift_days(today, 1).context("Date out of range"),
        Some(s) => NaiveDate::parse_from_str(s, dates::DATE_FORMAT).with_context(|| {
            format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
        }),
    }
}

/// Parse `YYYY-MM` into a year and month, defaulting to the month containing `today`.
pub(crate) fn parse_month(month_str: Option<&str>, today: NaiveDate) -> Result<(i32, u32)> {
    use chrono::Datelike;

    let Some(s) = month_str.map(str::trim) else {
        return Ok((today.year(), today.month()));
    };
    let invalid = || format!("Invalid month '{s}'. Use YYYY-MM");
    let (year, month) = s.split_once('-').with_context(invalid)?;
    let year: i32 = year.parse().with_context(invalid)?;
    let month: u32 = month.parse().with_context(invalid)?;
    if !(1..=12).contains(&month) {
        bail!(invalid());
    }
    Ok((year, month))
}

pub(crate) fn prompt_choice(count: usize) -> Result<usize> {
    eprint!("\nSelect a food (1-{count}): ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    let n: usize = line.trim().parse().context("Invalid number")?;
    if n < 1 || n > count {
        bail!("Selection out of range");
    }
    Ok(n - 1)
}

pub(crate) fn confirm(question: &str) -> Result<bool> {
    eprint!("{question} [y/N]: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub(crate) fn print_food_table(foods: &[&Food]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "")]
        emoji: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Allergen")]
        allergen: String,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .enumerate()
        .map(|(i, f)| FoodRow {
            idx: i + 1,
            id: f.id,
            emoji: f.display_emoji().to_string(),
            name: truncate(&f.name, 35),
            category: f.category.label().to_string(),
            allergen: if f.is_allergen { "yes" } else { "" }.to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// One-character progress marker for a food's status.
pub(crate) fn status_marker(status: IntroStatus) -> &'static str {
    match status {
        IntroStatus::Nothing => "[ ]",
        IntroStatus::Started => "[~]",
        IntroStatus::Done => "[x]",
    }
}

/// Short description of a food status, e.g. "2/3 · 4 days ago".
pub(crate) fn describe_status(food: &Food, status: &FoodStatus, today: NaiveDate) -> String {
    let mut parts = Vec::new();
    if food.is_allergen {
        parts.push(format!(
            "{}/{}",
            status.times_given.min(nibble_core::models::ALLERGEN_DONE_THRESHOLD),
            nibble_core::models::ALLERGEN_DONE_THRESHOLD
        ));
    }
    parts.push(dates::format_last_given(status.last_given_date, today));
    if status.has_planned {
        parts.push("planned".to_string());
    }
    if status.needs_reminder {
        parts.push("due again".to_string());
    }
    parts.join(" · ")
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

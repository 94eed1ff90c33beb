use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nibble_core::checklist::reminders;
use nibble_core::dates;
use nibble_core::models::Checklist;
use nibble_core::service::NibbleService;

use super::helpers::{describe_status, json_error, status_marker};
use super::resolve_food_arg;

pub(crate) fn cmd_checklist(svc: &NibbleService, search: Option<&str>, json: bool) -> Result<()> {
    let checklist = match search {
        Some(query) => svc.checklist_filtered(query)?,
        None => svc.checklist()?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&checklist)?);
        return Ok(());
    }

    if checklist.groups.is_empty() {
        match search {
            Some(query) => eprintln!("No foods match '{query}'"),
            None => eprintln!("No foods yet. Run `nibble food seed` to add the default list"),
        }
        process::exit(2);
    }

    let today = svc.today();
    for group in &checklist.groups {
        println!(
            "{} {} ({}/{})",
            group.category.icon(),
            group.category.label().to_uppercase(),
            group.done_count,
            group.total_count
        );
        for item in &group.foods {
            let food = &item.food;
            println!(
                "  {} [{}] {} {} — {}",
                status_marker(item.food_status.status),
                food.id,
                food.display_emoji(),
                food.name,
                describe_status(food, &item.food_status, today)
            );
        }
        println!();
    }

    print_totals(&checklist);
    Ok(())
}

fn print_totals(checklist: &Checklist) {
    let summary = &checklist.summary;
    println!(
        "  TOTAL: {}/{} foods introduced",
        summary.total_done, summary.total_count
    );
    let due = reminders(&checklist.groups);
    if !due.is_empty() {
        let names: Vec<&str> = due.iter().map(|f| f.food.name.as_str()).collect();
        println!("  DUE AGAIN: {}", names.join(", "));
    }
}

pub(crate) fn cmd_summary(svc: &NibbleService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct SummaryRow {
        #[tabled(rename = "")]
        icon: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Done")]
        done: usize,
        #[tabled(rename = "Total")]
        total: usize,
    }

    let checklist = svc.checklist()?;

    if json {
        let mut value = serde_json::to_value(&checklist.summary)?;
        if let Some(name) = svc.baby_name()? {
            value["baby_name"] = serde_json::Value::String(name);
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if checklist.summary.total_count == 0 {
        eprintln!("No foods yet. Run `nibble food seed` to add the default list");
        process::exit(2);
    }

    if let Some(name) = svc.baby_name()? {
        println!("=== {name} ===\n");
    }

    let rows: Vec<SummaryRow> = checklist
        .summary
        .category_stats
        .iter()
        .map(|s| SummaryRow {
            icon: s.icon.to_string(),
            category: s.category.label().to_string(),
            done: s.done,
            total: s.total,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    print_totals(&checklist);
    Ok(())
}

pub(crate) fn cmd_status(
    svc: &NibbleService,
    food_query: &str,
    food_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let food = match resolve_food_arg(svc, food_query, food_id) {
        Ok(food) => food,
        Err(e) if json => {
            println!("{}", json_error(&format!("{e:#}")));
            process::exit(2);
        }
        Err(e) => return Err(e),
    };
    let detail = svc.food_status(food.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let today = svc.today();
    let status = &detail.food_status;
    println!(
        "{} {} ({}{})",
        detail.food.display_emoji(),
        detail.food.name,
        detail.food.category.label(),
        if detail.food.is_allergen { ", allergen" } else { "" }
    );
    println!("  Status:     {}", status.status);
    println!("  Given:      {} time(s)", status.times_given);
    println!(
        "  Last given: {}",
        dates::format_last_given(status.last_given_date, today)
    );
    if detail.manual_marks + detail.auto_complete_marks > 0 {
        println!(
            "  Marks:      {} manual, {} auto-complete",
            detail.manual_marks, detail.auto_complete_marks
        );
    }
    if status.has_planned {
        println!("  Planned:    yes");
    }
    if status.needs_reminder {
        println!("  Reminder:   not given for over two weeks");
    }

    if !detail.entries.is_empty() {
        println!();
        for e in &detail.entries {
            let reaction = e
                .reaction
                .as_ref()
                .map(|r| format!(" — reaction: {r}"))
                .unwrap_or_default();
            let planned = if dates::is_future(e.date, today) {
                " (planned)"
            } else {
                ""
            };
            println!(
                "  [{}] {}{planned} — {}{reaction}",
                e.id,
                dates::local_date_string(e.date),
                e.texture
            );
        }
    }
    Ok(())
}

use anyhow::{Result, bail};
use std::process;

use nibble_core::dates;
use nibble_core::models::{CalendarEntry, NewCalendarEntry, Texture, UpdateCalendarEntry, non_blank};
use nibble_core::service::NibbleService;

use super::helpers::{json_error, parse_date};
use super::{resolve_food, resolve_food_arg};

/// Fields shared by `log` and `edit`.
pub(crate) struct EntryArgs {
    pub date: Option<String>,
    pub texture: Option<String>,
    pub notes: Option<String>,
    pub reaction: Option<String>,
}

pub(crate) fn format_entry_line(entry: &CalendarEntry) -> String {
    let name = entry.food_name.as_deref().unwrap_or("?");
    let emoji = entry
        .food_emoji
        .as_deref()
        .map(|e| format!("{e} "))
        .unwrap_or_default();
    let mut line = format!(
        "[{}] {emoji}{name} — {} — {}",
        entry.id,
        dates::local_date_string(entry.date),
        entry.texture
    );
    if let Some(ref notes) = entry.notes {
        line.push_str(&format!(" — {notes}"));
    }
    if let Some(ref reaction) = entry.reaction {
        line.push_str(&format!(" — reaction: {reaction}"));
    }
    line
}

pub(crate) fn cmd_log(
    svc: &NibbleService,
    food_query: &str,
    food_id: Option<i64>,
    args: EntryArgs,
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

    let date = parse_date(args.date.as_deref(), svc.today())?;
    let texture = args
        .texture
        .as_deref()
        .map(str::parse::<Texture>)
        .transpose()?
        .unwrap_or_default();

    let entry = svc.log_entry(&NewCalendarEntry {
        food_id: food.id,
        date,
        texture,
        notes: non_blank(args.notes),
        reaction: non_blank(args.reaction),
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let verb = if dates::is_future(date, svc.today()) {
            "Planned"
        } else {
            "Logged"
        };
        println!("{verb} {}", format_entry_line(&entry));
        let status = svc.food_status(food.id)?.food_status;
        println!("  {} is now {}", food.name, status.status);
    }

    Ok(())
}

pub(crate) fn cmd_edit(
    svc: &NibbleService,
    entry_id: i64,
    food_query: Option<&str>,
    args: EntryArgs,
    json: bool,
) -> Result<()> {
    if food_query.is_none()
        && args.date.is_none()
        && args.texture.is_none()
        && args.notes.is_none()
        && args.reaction.is_none()
    {
        bail!(
            "Nothing to update. Provide at least one of --food, --date, --texture, --notes, or --reaction"
        );
    }

    if svc.find_entry(entry_id)?.is_none() {
        if json {
            println!("{}", json_error(&format!("Entry {entry_id} not found")));
        } else {
            eprintln!("Entry {entry_id} not found");
        }
        process::exit(2);
    }

    let food_id = food_query
        .map(|q| resolve_food(svc, q).map(|f| f.id))
        .transpose()?;
    let date = args
        .date
        .as_deref()
        .map(|d| parse_date(Some(d), svc.today()))
        .transpose()?;
    let texture = args
        .texture
        .as_deref()
        .map(str::parse::<Texture>)
        .transpose()?;

    // an empty string clears the field
    let update = UpdateCalendarEntry {
        food_id,
        date,
        texture,
        notes: args.notes.map(|n| non_blank(Some(n))),
        reaction: args.reaction.map(|r| non_blank(Some(r))),
    };

    let entry = svc.edit_entry(entry_id, &update)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("Updated {}", format_entry_line(&entry));
    }
    Ok(())
}

pub(crate) fn cmd_delete(svc: &NibbleService, entry_id: i64, json: bool) -> Result<()> {
    if svc.delete_entry(entry_id)? {
        if json {
            println!("{}", serde_json::json!({ "deleted": entry_id }));
        } else {
            println!("Deleted entry {entry_id}");
        }
        Ok(())
    } else {
        if json {
            println!("{}", json_error(&format!("Entry {entry_id} not found")));
        } else {
            eprintln!("Entry {entry_id} not found");
        }
        process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_edit_propagates_errors_for_existing_entry() {
        let svc = NibbleService::new_in_memory().unwrap();
        svc.seed_defaults().unwrap();
        let pear = svc.find_food_by_name("Pear").unwrap().unwrap();
        let entry = svc
            .log_entry(&NewCalendarEntry {
                food_id: pear.id,
                date: NaiveDate::from_ymd_opt(2026, 10, 3).unwrap(),
                texture: Texture::Puree,
                notes: None,
                reaction: None,
            })
            .unwrap();

        let args = EntryArgs {
            date: None,
            texture: Some("crunchy".to_string()),
            notes: None,
            reaction: None,
        };
        let err = cmd_edit(&svc, entry.id, None, args, false).unwrap_err();
        assert!(err.to_string().contains("Invalid texture"));
        assert_eq!(svc.find_entry(entry.id).unwrap().unwrap().texture, Texture::Puree);
        assert_eq!(svc.find_entry(entry.id + 100).unwrap(), None);
    }

    #[test]
    fn test_format_entry_line() {
        let mut entry = CalendarEntry {
            id: 7,
            uuid: String::new(),
            food_id: 1,
            date: NaiveDate::from_ymd_opt(2026, 10, 3).unwrap(),
            texture: Texture::SoftChunks,
            notes: None,
            reaction: None,
            created_at: String::new(),
            food_name: Some("Pear".to_string()),
            food_emoji: Some("🍐".to_string()),
        };
        assert_eq!(format_entry_line(&entry), "[7] 🍐 Pear — 2026-10-03 — soft chunks");

        entry.food_emoji = None;
        entry.notes = Some("ate half".to_string());
        entry.reaction = Some("none".to_string());
        assert_eq!(
            format_entry_line(&entry),
            "[7] Pear — 2026-10-03 — soft chunks — ate half — reaction: none"
        );
    }
}

use anyhow::{Result, bail};

use nibble_core::dates;
use nibble_core::models::{Confidence, ParsedVoiceEntry, Texture};
use nibble_core::service::NibbleService;

use super::entry::format_entry_line;
use super::helpers::confirm;
use super::resolve_food;

fn confidence_label(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::High => "high",
        Confidence::Medium => "medium",
        Confidence::Low => "low",
    }
}

fn describe_parse(parsed: &ParsedVoiceEntry) -> String {
    let food = if parsed.food_id.is_some() {
        parsed.food_name.clone()
    } else if parsed.food_name.is_empty() {
        "(no food heard)".to_string()
    } else {
        format!("{} (not in your list)", parsed.food_name)
    };
    format!(
        "  Food:       {food}\n  Date:       {}\n  Texture:    {}\n  Confidence: {}",
        dates::local_date_string(parsed.date),
        parsed.texture,
        confidence_label(parsed.confidence)
    )
}

/// Parse a spoken sentence and, once confirmed, save it as a calendar entry.
///
/// With `--json` and without `--yes` this only reports the parse.
pub(crate) fn cmd_voice(
    svc: &NibbleService,
    words: &[String],
    food_query: Option<&str>,
    texture: Option<&str>,
    yes: bool,
    json: bool,
) -> Result<()> {
    let transcript = words.join(" ");
    if transcript.trim().is_empty() {
        bail!("Say something to parse, e.g. `nibble voice gave her mashed banana yesterday`");
    }

    let parsed = svc.parse_voice(&transcript)?;
    let food_override = food_query
        .map(|q| resolve_food(svc, q).map(|f| f.id))
        .transpose()?;
    let texture_override = texture.map(str::parse::<Texture>).transpose()?;

    if json {
        if !yes {
            println!("{}", serde_json::to_string_pretty(&parsed)?);
            return Ok(());
        }
        let entry = svc.confirm_voice(&parsed, food_override, texture_override)?;
        let value = serde_json::json!({ "parsed": parsed, "entry": entry });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Heard: \"{}\"", parsed.raw_transcript);
    println!("{}", describe_parse(&parsed));

    if food_override.is_none() && parsed.food_id.is_none() {
        bail!("No food matched. Re-run with --food <name> to pick one");
    }

    if !yes && !confirm("Save this entry?")? {
        println!("Discarded");
        return Ok(());
    }

    let entry = svc.confirm_voice(&parsed, food_override, texture_override)?;
    println!("Logged {}", format_entry_line(&entry));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn parsed(food_id: Option<i64>, food_name: &str) -> ParsedVoiceEntry {
        ParsedVoiceEntry {
            food_id,
            food_name: food_name.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            texture: Texture::Mashed,
            confidence: Confidence::Medium,
            raw_transcript: String::new(),
        }
    }

    #[test]
    fn test_describe_matched_food() {
        let text = describe_parse(&parsed(Some(3), "Banana"));
        assert!(text.contains("Food:       Banana\n"));
        assert!(text.contains("Date:       2026-10-15"));
        assert!(text.contains("Texture:    mashed"));
        assert!(text.contains("Confidence: medium"));
    }

    #[test]
    fn test_describe_unmatched_food() {
        let text = describe_parse(&parsed(None, "dragon fruit"));
        assert!(text.contains("dragon fruit (not in your list)"));
        assert!(describe_parse(&parsed(None, "")).contains("(no food heard)"));
    }
}

//! Voice transcript parsing.
//!
//! A spoken sentence like "gave her mashed banana yesterday" is read in three passes over
//! a shrinking buffer: the date is found and cut out, then the texture, and whatever is
//! left is matched against the household's foods. Each pass is an ordered rule table and
//! the first rule that matches wins.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::dates;
use crate::models::{Confidence, Food, ParsedVoiceEntry, Texture};

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const MONTHS_SHORT: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const WEEKDAYS: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

// Full names first so "september" is not read as "sep" + "tember".
const MONTH_ALTERNATION: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec";

static MONTH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({MONTH_ALTERNATION})\s+(\d{{1,2}})(?:st|nd|rd|th)?\b"
    ))
    .expect("month-first pattern is valid")
});

static DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({MONTH_ALTERNATION})\b"
    ))
    .expect("day-first pattern is valid")
});

static RELATIVE_DAYS: LazyLock<Vec<(Regex, i64)>> = LazyLock::new(|| {
    [("today", 0), ("yesterday", -1), ("tomorrow", 1)]
        .into_iter()
        .map(|(word, offset)| {
            let re = Regex::new(&format!("(?i){word}")).expect("keyword pattern is valid");
            (re, offset)
        })
        .collect()
});

static WEEKDAY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    WEEKDAYS
        .iter()
        .map(|day| Regex::new(&format!(r"(?i)(last\s+)?{day}")).expect("weekday pattern is valid"))
        .collect()
});

static STOPWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(gave|give|had|have|fed|feed|ate|eat|tried|try|some|the|a|an|her|him|baby|with)\b")
        .expect("stopword pattern is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Spoken texture words, checked in order. Longer forms come before their prefixes.
pub const TEXTURE_SYNONYMS: &[(&str, Texture)] = &[
    ("pureed", Texture::Puree),
    ("puree", Texture::Puree),
    ("blended", Texture::Puree),
    ("smooth", Texture::Puree),
    ("paste", Texture::Paste),
    ("mashed", Texture::Mashed),
    ("mash", Texture::Mashed),
    ("soft chunks", Texture::SoftChunks),
    ("chunks", Texture::SoftChunks),
    ("chunky", Texture::SoftChunks),
    ("finger foods", Texture::FingerFood),
    ("finger food", Texture::FingerFood),
    ("fingers", Texture::FingerFood),
    ("blw", Texture::FingerFood),
    ("mixed", Texture::Mixed),
    ("combination", Texture::Mixed),
];

static TEXTURE_PATTERNS: LazyLock<Vec<(Regex, Texture)>> = LazyLock::new(|| {
    TEXTURE_SYNONYMS
        .iter()
        .map(|(word, texture)| {
            let re = Regex::new(&format!("(?i){}", regex::escape(word)))
                .expect("texture pattern is valid");
            (re, *texture)
        })
        .collect()
});

/// What a date rule found, and the transcript with the match removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMatch {
    pub date: NaiveDate,
    pub remaining: String,
}

pub struct DateRule {
    pub name: &'static str,
    pub matcher: fn(&str, NaiveDate) -> Option<DateMatch>,
}

/// Date rules in priority order.
pub const DATE_RULES: &[DateRule] = &[
    DateRule {
        name: "relative-day",
        matcher: match_relative_day,
    },
    DateRule {
        name: "month-day",
        matcher: match_month_day,
    },
    DateRule {
        name: "day-month",
        matcher: match_day_month,
    },
    DateRule {
        name: "weekday",
        matcher: match_weekday,
    },
];

fn strip(re: &Regex, text: &str) -> String {
    re.replace_all(text, "").trim().to_string()
}

fn month_index(word: &str) -> Option<u32> {
    let lower = word.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == lower)
        .or_else(|| MONTHS_SHORT.iter().position(|m| *m == lower))
        .and_then(|i| u32::try_from(i + 1).ok())
}

/// `day` of `month` in `today`'s year. Days past the end of the month roll into the next
/// one, so "february 30" lands in early March.
fn resolve_month_day(month_word: &str, day_digits: &str, today: NaiveDate) -> Option<NaiveDate> {
    let month = month_index(month_word)?;
    let day: u32 = day_digits.parse().ok()?;
    if !(1..=31).contains(&day) {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(today.year(), month, 1)?;
    dates::shift_days(first, i64::from(day) - 1)
}

fn match_relative_day(text: &str, today: NaiveDate) -> Option<DateMatch> {
    RELATIVE_DAYS.iter().find_map(|(re, offset)| {
        if !re.is_match(text) {
            return None;
        }
        Some(DateMatch {
            date: dates::shift_days(today, *offset)?,
            remaining: strip(re, text),
        })
    })
}

fn match_month_day(text: &str, today: NaiveDate) -> Option<DateMatch> {
    let caps = MONTH_FIRST.captures(text)?;
    let date = resolve_month_day(&caps[1], &caps[2], today)?;
    Some(DateMatch {
        date,
        remaining: strip(&MONTH_FIRST, text),
    })
}

fn match_day_month(text: &str, today: NaiveDate) -> Option<DateMatch> {
    let caps = DAY_FIRST.captures(text)?;
    let date = resolve_month_day(&caps[2], &caps[1], today)?;
    Some(DateMatch {
        date,
        remaining: strip(&DAY_FIRST, text),
    })
}

/// Most recent past occurrence of the named weekday, never today. "last" goes back one
/// more week.
fn match_weekday(text: &str, today: NaiveDate) -> Option<DateMatch> {
    let current = i64::from(today.weekday().num_days_from_sunday());
    WEEKDAY_PATTERNS
        .iter()
        .zip(0_i64..)
        .find_map(|(re, target)| {
            let caps = re.captures(text)?;
            let mut days_ago = current - target;
            if days_ago <= 0 {
                days_ago += 7;
            }
            if caps.get(1).is_some() {
                days_ago += 7;
            }
            Some(DateMatch {
                date: dates::shift_days(today, -days_ago)?,
                remaining: strip(re, text),
            })
        })
}

/// Find the date in `text`, defaulting to `today` with nothing removed.
#[must_use]
pub fn extract_date(text: &str, today: NaiveDate) -> DateMatch {
    for rule in DATE_RULES {
        if let Some(found) = (rule.matcher)(text, today) {
            tracing::debug!(rule = rule.name, date = %found.date, "voice date matched");
            return found;
        }
    }
    DateMatch {
        date: today,
        remaining: text.to_string(),
    }
}

/// Find the texture in `text`, defaulting to puree with nothing removed.
#[must_use]
pub fn extract_texture(text: &str) -> (Texture, String) {
    TEXTURE_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map_or_else(
            || (Texture::default(), text.to_string()),
            |(re, texture)| (*texture, strip(re, text)),
        )
}

/// Lowercase `text`, drop filler words and collapse whitespace.
#[must_use]
pub fn clean_food_text(text: &str) -> String {
    let lower = text.to_lowercase();
    let without_fillers = STOPWORDS.replace_all(&lower, "");
    WHITESPACE
        .replace_all(&without_fillers, " ")
        .trim()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoodMatch<'a> {
    pub food: Option<&'a Food>,
    pub food_name: String,
    pub confidence: Confidence,
}

impl<'a> FoodMatch<'a> {
    fn found(food: &'a Food, confidence: Confidence) -> Self {
        Self {
            food: Some(food),
            food_name: food.name.clone(),
            confidence,
        }
    }

    fn missing(food_name: String) -> Self {
        Self {
            food: None,
            food_name,
            confidence: Confidence::Low,
        }
    }
}

/// Match what is left of a transcript against `foods`. Deleted foods never match.
#[must_use]
pub fn match_food<'a>(text: &str, foods: &'a [Food]) -> FoodMatch<'a> {
    let cleaned = clean_food_text(text);
    if cleaned.is_empty() {
        return FoodMatch::missing(String::new());
    }

    let live: Vec<(&Food, String)> = foods
        .iter()
        .filter(|f| !f.is_deleted())
        .map(|f| (f, f.name.to_lowercase()))
        .collect();

    if let Some((food, _)) = live.iter().find(|(_, name)| *name == cleaned) {
        return FoodMatch::found(*food, Confidence::High);
    }

    let partial: Vec<&Food> = live
        .iter()
        .filter(|(_, name)| name.contains(&cleaned) || cleaned.contains(name.as_str()))
        .map(|(food, _)| *food)
        .collect();
    match partial.as_slice() {
        [] => {}
        [only] => return FoodMatch::found(*only, Confidence::High),
        many => {
            // shortest name is the most specific; ties keep list order
            if let Some(best) = many.iter().min_by_key(|f| f.name.chars().count()) {
                return FoodMatch::found(*best, Confidence::Medium);
            }
        }
    }

    for word in cleaned.split(' ').filter(|w| w.chars().count() >= 3) {
        if let Some((food, _)) = live
            .iter()
            .find(|(_, name)| name.contains(word) || word.contains(name.as_str()))
        {
            return FoodMatch::found(*food, Confidence::Medium);
        }
    }

    let guess = cleaned.split(' ').take(2).collect::<Vec<_>>().join(" ");
    FoodMatch::missing(guess)
}

/// Parse a spoken transcript into a draft calendar entry. Never fails: unknown foods come
/// back with `food_id: None` and low confidence.
#[must_use]
pub fn parse_voice_entry(transcript: &str, foods: &[Food], today: NaiveDate) -> ParsedVoiceEntry {
    let DateMatch { date, remaining } = extract_date(transcript, today);
    let (texture, remaining) = extract_texture(&remaining);
    let matched = match_food(&remaining, foods);

    tracing::debug!(
        food = %matched.food_name,
        confidence = ?matched.confidence,
        %date,
        %texture,
        "parsed voice transcript"
    );

    ParsedVoiceEntry {
        food_id: matched.food.map(|f| f.id),
        food_name: matched.food_name,
        date,
        texture,
        confidence: matched.confidence,
        raw_transcript: transcript.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // a Friday
    fn today() -> NaiveDate {
        d(2026, 10, 16)
    }

    fn food_list(names: &[&str]) -> Vec<Food> {
        names
            .iter()
            .zip(1..)
            .map(|(name, id)| Food {
                id,
                uuid: format!("f{id}"),
                name: (*name).to_string(),
                category: Category::Other,
                is_allergen: false,
                is_default: false,
                emoji: None,
                created_at: String::new(),
                deleted_at: None,
            })
            .collect()
    }

    #[test]
    fn test_food_match_compares_whole_value() {
        let foods = food_list(&["Apple", "Pineapple"]);
        assert_eq!(
            match_food("apple", &foods),
            FoodMatch {
                food: Some(&foods[0]),
                food_name: "Apple".to_string(),
                confidence: Confidence::High,
            }
        );
        assert_ne!(match_food("pineapple", &foods), match_food("apple", &foods));
    }

    #[test]
    fn test_mashed_banana_today() {
        let foods = food_list(&["Banana"]);
        let parsed = parse_voice_entry("I gave mashed banana today", &foods, today());
        assert_eq!(parsed.date, today());
        assert_eq!(parsed.texture, Texture::Mashed);
        assert_eq!(parsed.food_id, Some(1));
        assert_eq!(parsed.food_name, "Banana");
        assert_eq!(parsed.confidence, Confidence::High);
        assert_eq!(parsed.raw_transcript, "I gave mashed banana today");
    }

    #[test]
    fn test_pureed_carrot_yesterday() {
        let foods = food_list(&["Carrot"]);
        let parsed = parse_voice_entry("she had pureed carrot yesterday", &foods, today());
        assert_eq!(parsed.date, d(2026, 10, 15));
        assert_eq!(parsed.texture, Texture::Puree);
        assert_eq!(parsed.food_id, Some(1));
        assert_eq!(parsed.confidence, Confidence::High);
    }

    #[test]
    fn test_month_name_date_defaults_texture() {
        let foods = food_list(&["Avocado"]);
        let parsed = parse_voice_entry("tried avocado on February 5th", &foods, today());
        assert_eq!(parsed.date, d(2026, 2, 5));
        assert_eq!(parsed.texture, Texture::Puree);
        assert_eq!(parsed.food_name, "Avocado");
        assert_eq!(parsed.confidence, Confidence::High);
    }

    #[test]
    fn test_unknown_food_is_low_confidence_guess() {
        let foods = food_list(&["Banana", "Apple"]);
        let parsed = parse_voice_entry("gave some weird mystery fruit today", &foods, today());
        assert_eq!(parsed.food_id, None);
        assert_eq!(parsed.confidence, Confidence::Low);
        assert_eq!(parsed.food_name, "weird mystery");
        assert_eq!(parsed.date, today());
    }

    #[test]
    fn test_tomorrow_is_a_plan() {
        let m = extract_date("peas tomorrow", today());
        assert_eq!(m.date, d(2026, 10, 17));
        assert_eq!(m.remaining, "peas");
    }

    #[test]
    fn test_relative_keyword_beats_month_name() {
        let m = extract_date("yesterday not march 3", today());
        assert_eq!(m.date, d(2026, 10, 15));
        assert_eq!(m.remaining, "not march 3");
    }

    #[test]
    fn test_short_month_and_day_first_forms() {
        assert_eq!(extract_date("Feb 5 egg", today()).date, d(2026, 2, 5));
        let m = extract_date("egg on the 5th of March", today());
        assert_eq!(m.date, d(2026, 3, 5));
        assert_eq!(m.remaining, "egg on the");
        assert_eq!(extract_date("22nd sept tofu", today()).date, today());
        assert_eq!(extract_date("22 sep tofu", today()).date, d(2026, 9, 22));
    }

    #[test]
    fn test_out_of_range_day_rolls_forward() {
        assert_eq!(extract_date("february 30th", today()).date, d(2026, 3, 2));
    }

    #[test]
    fn test_day_over_31_falls_through() {
        let m = extract_date("march 45", today());
        assert_eq!(m.date, today());
        assert_eq!(m.remaining, "march 45");
    }

    #[test]
    fn test_month_day_keeps_current_year() {
        let new_years_eve = d(2026, 12, 31);
        assert_eq!(
            extract_date("january 2nd", new_years_eve).date,
            d(2026, 1, 2)
        );
    }

    #[test]
    fn test_weekdays_are_strictly_past() {
        assert_eq!(extract_date("on monday", today()).date, d(2026, 10, 12));
        assert_eq!(extract_date("last monday", today()).date, d(2026, 10, 5));
        // same weekday as today means a week ago
        assert_eq!(extract_date("friday", today()).date, d(2026, 10, 9));
        assert_eq!(extract_date("Saturday", today()).date, d(2026, 10, 10));
        let m = extract_date("Last Sunday salmon", today());
        assert_eq!(m.date, d(2026, 10, 4));
        assert_eq!(m.remaining, "salmon");
    }

    #[test]
    fn test_no_date_defaults_to_today_untouched() {
        let m = extract_date("  lentils  ", today());
        assert_eq!(m.date, today());
        assert_eq!(m.remaining, "  lentils  ");
    }

    #[test]
    fn test_texture_table() {
        assert_eq!(
            extract_texture("soft chunks of pear"),
            (Texture::SoftChunks, "of pear".to_string())
        );
        assert_eq!(
            extract_texture("broccoli finger foods"),
            (Texture::FingerFood, "broccoli".to_string())
        );
        assert_eq!(extract_texture("BLW toast").0, Texture::FingerFood);
        assert_eq!(extract_texture("smooth oatmeal").0, Texture::Puree);
        assert_eq!(extract_texture("a combination plate").0, Texture::Mixed);
        assert_eq!(extract_texture("mash of peas").0, Texture::Mashed);
        assert_eq!(
            extract_texture("plain yogurt"),
            (Texture::Puree, "plain yogurt".to_string())
        );
    }

    #[test]
    fn test_clean_food_text() {
        assert_eq!(clean_food_text("Gave  the BABY some Peas"), "peas");
        // stopwords only match whole words
        assert_eq!(clean_food_text("heather"), "heather");
    }

    #[test]
    fn test_empty_after_cleaning() {
        let foods = food_list(&["Egg"]);
        let m = match_food("gave her some", &foods);
        assert_eq!(m, FoodMatch::missing(String::new()));
    }

    #[test]
    fn test_shortest_partial_wins() {
        let foods = food_list(&["Pineapple", "Apple"]);
        let m = match_food("apple", &foods);
        // exact match first
        assert_eq!(m.food.map(|f| f.id), Some(2));
        assert_eq!(m.confidence, Confidence::High);

        let m = match_food("pineapple", &foods);
        assert_eq!(m.food.map(|f| f.id), Some(1));
        assert_eq!(m.confidence, Confidence::High);

        let m = match_food("ripe pineapple slices", &foods);
        assert_eq!(m.food.map(|f| f.id), Some(2));
        assert_eq!(m.confidence, Confidence::Medium);
    }

    #[test]
    fn test_equal_length_tie_keeps_list_order() {
        let foods = food_list(&["Pear", "Plum"]);
        let m = match_food("pear and plum", &foods);
        assert_eq!(m.food_name, "Pear");
        assert_eq!(m.confidence, Confidence::Medium);
    }

    #[test]
    fn test_single_partial_is_high() {
        let foods = food_list(&["Sweet Potato", "Carrot"]);
        let m = match_food("potato", &foods);
        assert_eq!(m.food_name, "Sweet Potato");
        assert_eq!(m.confidence, Confidence::High);
    }

    #[test]
    fn test_word_fallback_is_medium() {
        let foods = food_list(&["Sweet Potato", "Carrot"]);
        let m = match_food("orange sweet", &foods);
        assert_eq!(m.food_name, "Sweet Potato");
        assert_eq!(m.confidence, Confidence::Medium);

        // words shorter than three letters are skipped
        let foods = food_list(&["Bok Choy"]);
        let m = match_food("ok then", &foods);
        assert_eq!(m.food, None);
        assert_eq!(m.food_name, "ok then");
    }

    #[test]
    fn test_deleted_foods_never_match() {
        let mut foods = food_list(&["Tofu"]);
        foods[0].deleted_at = Some("2026-10-01T00:00:00+00:00".to_string());
        let m = match_food("tofu", &foods);
        assert_eq!(m.food, None);
        assert_eq!(m.food_name, "tofu");
    }

    #[test]
    fn test_rules_are_ordered() {
        let names: Vec<&str> = DATE_RULES.iter().map(|r| r.name).collect();
        assert_eq!(names, ["relative-day", "month-day", "day-month", "weekday"]);
    }
}

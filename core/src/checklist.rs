//! Checklist derivation: turns raw foods, calendar entries and manual marks into
//! per-food introduction status, category groups and summary counts.
//!
//! Everything here is pure. `today` is passed in; nothing reads the clock. Records that
//! reference unknown foods are ignored rather than rejected, so derivation always
//! produces a result.

use std::cmp::Ordering;

use chrono::NaiveDate;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::dates;
use crate::models::{
    ALLERGEN_DONE_THRESHOLD, ALLERGEN_REMINDER_DAYS, CalendarEntry, Category, CategoryGroup,
    CategoryStat, ChecklistFood, ChecklistSummary, Food, FoodStatus, IntroStatus, ManualMark,
};

/// Status for a given number of introductions.
#[must_use]
pub fn intro_status(is_allergen: bool, times_given: usize) -> IntroStatus {
    if is_allergen {
        match times_given {
            0 => IntroStatus::Nothing,
            n if n >= ALLERGEN_DONE_THRESHOLD => IntroStatus::Done,
            _ => IntroStatus::Started,
        }
    } else if times_given >= 1 {
        IntroStatus::Done
    } else {
        IntroStatus::Nothing
    }
}

/// Derive the introduction status of one food.
///
/// Entries dated after `today` are plans: they set `has_planned` but never count as
/// given. Manual marks always count, dated by the day they were created.
#[must_use]
pub fn compute_food_status(
    food: &Food,
    entries: &[CalendarEntry],
    marks: &[ManualMark],
    today: NaiveDate,
) -> FoodStatus {
    let (past, future): (Vec<&CalendarEntry>, Vec<&CalendarEntry>) = entries
        .iter()
        .filter(|e| e.food_id == food.id)
        .partition(|e| !dates::is_future(e.date, today));
    let food_marks: Vec<&ManualMark> = marks.iter().filter(|m| m.food_id == food.id).collect();

    let times_given = past.len() + food_marks.len();

    let last_given_date = past
        .iter()
        .map(|e| e.date)
        .chain(food_marks.iter().filter_map(|m| m.given_date()))
        .max();

    let status = intro_status(food.is_allergen, times_given);
    let has_planned = !future.is_empty();

    let needs_reminder = food.is_allergen
        && status != IntroStatus::Done
        && last_given_date.is_some_and(|d| dates::days_since(d, today) > ALLERGEN_REMINDER_DAYS);

    FoodStatus {
        times_given,
        last_given_date,
        status,
        has_planned,
        needs_reminder,
    }
}

/// Attach a derived status to every food that has not been soft-deleted.
#[must_use]
pub fn build_checklist(
    foods: &[Food],
    entries: &[CalendarEntry],
    marks: &[ManualMark],
    today: NaiveDate,
) -> Vec<ChecklistFood> {
    let checklist: Vec<ChecklistFood> = foods
        .iter()
        .filter(|f| !f.is_deleted())
        .map(|food| ChecklistFood {
            food: food.clone(),
            food_status: compute_food_status(food, entries, marks, today),
        })
        .collect();
    tracing::debug!(
        foods = checklist.len(),
        entries = entries.len(),
        marks = marks.len(),
        "built checklist"
    );
    checklist
}

/// Lowercased name with accents stripped, so "Édamame" files under E.
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Name ordering for the checklist: accent- and case-insensitive first, then accented
/// after plain, then lowercase before uppercase.
#[must_use]
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

/// Group foods by category in display order. Empty categories are left out.
#[must_use]
pub fn group_by_category(foods: &[ChecklistFood]) -> Vec<CategoryGroup> {
    Category::ALL
        .into_iter()
        .filter_map(|category| {
            let mut members: Vec<ChecklistFood> = foods
                .iter()
                .filter(|f| f.food.category == category)
                .cloned()
                .collect();
            if members.is_empty() {
                return None;
            }
            members.sort_by(|a, b| compare_names(&a.food.name, &b.food.name));
            Some(CategoryGroup::new(category, members))
        })
        .collect()
}

#[must_use]
pub fn calculate_summary(groups: &[CategoryGroup]) -> ChecklistSummary {
    let category_stats: Vec<CategoryStat> = groups
        .iter()
        .map(|g| CategoryStat {
            category: g.category,
            done: g.done_count,
            total: g.total_count,
            icon: g.category.icon(),
        })
        .collect();

    ChecklistSummary {
        total_done: category_stats.iter().map(|s| s.done).sum(),
        total_count: category_stats.iter().map(|s| s.total).sum(),
        category_stats,
    }
}

/// Keep only foods whose name contains `query` (case-insensitive).
///
/// Counts are recomputed over what remains and groups left empty are dropped. A blank
/// query returns the groups unchanged.
#[must_use]
pub fn filter_checklist(groups: &[CategoryGroup], query: &str) -> Vec<CategoryGroup> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return groups.to_vec();
    }

    groups
        .iter()
        .filter_map(|g| {
            let foods: Vec<ChecklistFood> = g
                .foods
                .iter()
                .filter(|f| f.food.name.to_lowercase().contains(&needle))
                .cloned()
                .collect();
            (!foods.is_empty()).then(|| CategoryGroup::new(g.category, foods))
        })
        .collect()
}

/// Allergens that have gone quiet for too long, oldest first.
#[must_use]
pub fn reminders(groups: &[CategoryGroup]) -> Vec<&ChecklistFood> {
    let mut due: Vec<&ChecklistFood> = groups
        .iter()
        .flat_map(|g| g.foods.iter())
        .filter(|f| f.food_status.needs_reminder)
        .collect();
    due.sort_by_key(|f| f.food_status.last_given_date);
    due
}

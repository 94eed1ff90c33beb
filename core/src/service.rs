use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

use crate::calendar::{self, CalendarMonth};
use crate::checklist;
use crate::dates;
use crate::db::Database;
use crate::models::{
    ALLERGEN_DONE_THRESHOLD, CalendarEntry, Checklist, ExportData, Food, FoodDetail, FoodStatus,
    ImportSummary, ManualMark, NewCalendarEntry, NewFood, ParsedVoiceEntry, Texture,
    UpdateCalendarEntry, UpdateFood,
};
use crate::voice;

/// Source of "today". Derivation is always relative to the caller's local date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The local wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        dates::today_local()
    }
}

/// A clock stuck on one day.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub struct NibbleService {
    db: Database,
    clock: Box<dyn Clock>,
}

impl NibbleService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self {
            db,
            clock: Box::new(SystemClock),
        })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db,
            clock: Box::new(SystemClock),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    // --- Checklist ---

    /// Read foods, entries and marks afresh and derive the grouped checklist.
    pub fn checklist(&self) -> Result<Checklist> {
        let foods = self.db.list_foods(None)?;
        let entries = self.db.list_calendar_entries()?;
        let marks = self.db.list_manual_marks()?;

        let items = checklist::build_checklist(&foods, &entries, &marks, self.today());
        let groups = checklist::group_by_category(&items);
        let summary = checklist::calculate_summary(&groups);
        Ok(Checklist { groups, summary })
    }

    /// The checklist narrowed to foods whose name contains `query`. The summary still
    /// covers every food.
    pub fn checklist_filtered(&self, query: &str) -> Result<Checklist> {
        let Checklist { groups, summary } = self.checklist()?;
        Ok(Checklist {
            groups: checklist::filter_checklist(&groups, query),
            summary,
        })
    }

    pub fn food_status(&self, food_id: i64) -> Result<FoodDetail> {
        let food = self.db.get_food_by_id(food_id)?;
        let entries = self.db.get_entries_for_food(food_id)?;
        let marks = self.db.list_marks_for_food(food_id)?;
        let food_status = checklist::compute_food_status(&food, &entries, &marks, self.today());
        let auto_complete_marks = marks.iter().filter(|m| m.is_auto_complete).count();

        Ok(FoodDetail {
            food,
            food_status,
            entries,
            manual_marks: marks.len() - auto_complete_marks,
            auto_complete_marks,
        })
    }

    fn current_status(&self, food: &Food) -> Result<FoodStatus> {
        let entries = self.db.get_entries_for_food(food.id)?;
        let marks = self.db.list_marks_for_food(food.id)?;
        Ok(checklist::compute_food_status(
            food,
            &entries,
            &marks,
            self.today(),
        ))
    }

    // --- Voice ---

    pub fn parse_voice(&self, transcript: &str) -> Result<ParsedVoiceEntry> {
        let foods = self.db.list_foods(None)?;
        Ok(voice::parse_voice_entry(transcript, &foods, self.today()))
    }

    /// Save a parsed transcript as a calendar entry, optionally correcting the food or
    /// texture first.
    pub fn confirm_voice(
        &self,
        parsed: &ParsedVoiceEntry,
        food_override: Option<i64>,
        texture_override: Option<Texture>,
    ) -> Result<CalendarEntry> {
        let Some(food_id) = food_override.or(parsed.food_id) else {
            bail!(
                "No food matched '{}'. Pick a food before saving",
                parsed.raw_transcript
            );
        };
        self.db.insert_calendar_entry(&NewCalendarEntry {
            food_id,
            date: parsed.date,
            texture: texture_override.unwrap_or(parsed.texture),
            notes: None,
            reaction: None,
        })
    }

    // --- Calendar entries ---

    pub fn log_entry(&self, entry: &NewCalendarEntry) -> Result<CalendarEntry> {
        self.db.insert_calendar_entry(entry)
    }

    pub fn edit_entry(&self, id: i64, update: &UpdateCalendarEntry) -> Result<CalendarEntry> {
        self.db.update_calendar_entry(id, update)
    }

    pub fn delete_entry(&self, id: i64) -> Result<bool> {
        self.db.delete_calendar_entry(id)
    }

    pub fn get_entry(&self, id: i64) -> Result<CalendarEntry> {
        self.db.get_calendar_entry(id)
    }

    pub fn find_entry(&self, id: i64) -> Result<Option<CalendarEntry>> {
        self.db.find_calendar_entry(id)
    }

    pub fn entries_for_date(&self, date: NaiveDate) -> Result<Vec<CalendarEntry>> {
        self.db.get_entries_for_date(date)
    }

    pub fn month(&self, year: i32, month: u32) -> Result<CalendarMonth> {
        let (start, end) = calendar::grid_bounds(year, month)
            .with_context(|| format!("Invalid month {year}-{month:02}"))?;
        let entries = self.db.get_entries_between(start, end)?;
        calendar::month_grid(year, month, &entries, self.today())
            .with_context(|| format!("Invalid month {year}-{month:02}"))
    }

    // --- Manual marks ---

    /// Count one introduction without a calendar entry.
    pub fn tick_food(&self, food_id: i64) -> Result<ManualMark> {
        self.db.add_manual_mark(food_id)
    }

    /// Take back the newest manual mark. Refused while the food has calendar entries,
    /// which have to be deleted from the calendar instead.
    pub fn untick_food(&self, food_id: i64) -> Result<FoodStatus> {
        let food = self.db.get_food_by_id(food_id)?;
        let entry_count = self.db.count_entries_for_food(food_id)?;
        if entry_count > 0 {
            tracing::warn!(food_id, entry_count, "untick refused: food has calendar entries");
            bail!(
                "{} has {entry_count} calendar entr{}; delete them from the calendar instead",
                food.name,
                if entry_count == 1 { "y" } else { "ies" }
            );
        }
        let Some(newest) = self.db.list_marks_for_food(food_id)?.into_iter().next() else {
            bail!("{} has no marks to remove", food.name);
        };
        self.db.delete_manual_mark(newest.id)?;
        self.current_status(&food)
    }

    /// Mark an allergen as fully introduced by topping it up to the threshold with
    /// auto-complete marks.
    pub fn complete_allergen(&self, food_id: i64) -> Result<FoodStatus> {
        let food = self.db.get_food_by_id(food_id)?;
        if !food.is_allergen {
            bail!("{} is not an allergen", food.name);
        }
        let status = self.current_status(&food)?;
        let missing = ALLERGEN_DONE_THRESHOLD.saturating_sub(status.times_given);
        if missing == 0 {
            tracing::debug!(food_id, "allergen already done");
            return Ok(status);
        }
        self.db.add_multiple_manual_marks(food_id, missing, true)?;
        self.current_status(&food)
    }

    /// Remove the marks added by `complete_allergen`, leaving manual ticks and entries.
    pub fn undo_auto_complete(&self, food_id: i64) -> Result<FoodStatus> {
        let food = self.db.get_food_by_id(food_id)?;
        let removed = self.db.remove_auto_complete_marks_for_food(food_id)?;
        if removed == 0 {
            bail!("{} has no auto-complete marks", food.name);
        }
        self.current_status(&food)
    }

    // --- Foods ---

    pub fn list_foods(&self, search: Option<&str>) -> Result<Vec<Food>> {
        self.db.list_foods(search)
    }

    pub fn list_deleted_foods(&self) -> Result<Vec<Food>> {
        self.db.list_deleted_foods()
    }

    pub fn get_food(&self, id: i64) -> Result<Food> {
        self.db.get_food_by_id(id)
    }

    pub fn find_food_by_name(&self, name: &str) -> Result<Option<Food>> {
        self.db.find_food_by_name(name)
    }

    pub fn add_food(&self, food: &NewFood) -> Result<Food> {
        if let Some(existing) = self.db.find_food_by_name(&food.name)? {
            bail!("A food named '{}' already exists", existing.name);
        }
        self.db.insert_food(food)
    }

    pub fn edit_food(&self, id: i64, update: &UpdateFood) -> Result<Food> {
        if let Some(ref name) = update.name {
            if let Some(existing) = self.db.find_food_by_name(name)? {
                if existing.id != id {
                    bail!("A food named '{}' already exists", existing.name);
                }
            }
        }
        self.db.update_food(id, update)
    }

    pub fn delete_food(&self, id: i64) -> Result<bool> {
        self.db.soft_delete_food(id)
    }

    pub fn restore_food(&self, id: i64) -> Result<bool> {
        self.db.restore_food(id)
    }

    pub fn seed_defaults(&self) -> Result<usize> {
        self.db.seed_default_foods()
    }

    // --- Profile ---

    pub fn baby_name(&self) -> Result<Option<String>> {
        self.db.baby_name()
    }

    pub fn set_baby_name(&self, name: Option<&str>) -> Result<()> {
        self.db.set_baby_name(name)
    }

    // --- Export / Import ---

    pub fn export_all(&self) -> Result<ExportData> {
        self.db.export_all()
    }

    pub fn import_all(&self, data: &ExportData) -> Result<ImportSummary> {
        self.db.import_all(data)
    }
}

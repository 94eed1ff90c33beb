use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::dates;
use crate::models::{
    CalendarEntry, Category, DEFAULT_FOODS, ExportCalendarEntry, ExportData, ExportManualMark,
    Food, ImportSummary, ManualMark, NewCalendarEntry, NewFood, Texture, UpdateCalendarEntry,
    UpdateFood, validate_export_calendar_entry, validate_export_manual_mark, validate_food_data,
    validate_food_name,
};

/// Version written into exports.
pub const EXPORT_VERSION: i64 = 1;

const BABY_NAME_KEY: &str = "baby_name";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS foods (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    category TEXT NOT NULL,
                    is_allergen INTEGER NOT NULL DEFAULT 0,
                    is_default INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    deleted_at TEXT
                );

                CREATE TABLE IF NOT EXISTS calendar_entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    food_id INTEGER NOT NULL REFERENCES foods(id),
                    date TEXT NOT NULL,
                    texture TEXT NOT NULL,
                    notes TEXT,
                    reaction TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS manual_marks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    food_id INTEGER NOT NULL REFERENCES foods(id),
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_foods_name ON foods(name);
                CREATE INDEX IF NOT EXISTS idx_calendar_entries_date ON calendar_entries(date);
                CREATE INDEX IF NOT EXISTS idx_calendar_entries_food ON calendar_entries(food_id);
                CREATE INDEX IF NOT EXISTS idx_manual_marks_food ON manual_marks(food_id);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            // Per-food emoji and the bulk "mark as done" flag on marks
            self.conn.execute_batch(
                "ALTER TABLE foods ADD COLUMN emoji TEXT;
                 ALTER TABLE manual_marks ADD COLUMN is_auto_complete INTEGER NOT NULL DEFAULT 0;
                 PRAGMA user_version = 2;",
            )?;
        }

        if version < 3 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS user_settings (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                PRAGMA user_version = 3;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    const FOOD_COLUMNS: &'static str =
        "id, uuid, name, category, is_allergen, is_default, emoji, created_at, deleted_at";

    fn food_from_row(row: &rusqlite::Row) -> rusqlite::Result<Food> {
        Ok(Food {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            category: row.get(3)?,
            is_allergen: row.get(4)?,
            is_default: row.get(5)?,
            emoji: row.get(6)?,
            created_at: row.get(7)?,
            deleted_at: row.get(8)?,
        })
    }

    const ENTRY_SELECT: &'static str =
        "SELECT ce.id, ce.uuid, ce.food_id, ce.date, ce.texture, ce.notes, ce.reaction,
                ce.created_at, f.name, f.emoji
         FROM calendar_entries ce
         JOIN foods f ON ce.food_id = f.id";

    // Expects columns:
    // 0: ce.id, 1: ce.uuid, 2: ce.food_id, 3: ce.date, 4: ce.texture, 5: ce.notes,
    // 6: ce.reaction, 7: ce.created_at, 8: f.name, 9: f.emoji
    fn calendar_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<CalendarEntry> {
        Ok(CalendarEntry {
            id: row.get(0)?,
            uuid: row.get(1)?,
            food_id: row.get(2)?,
            date: date_from_column(row, 3)?,
            texture: row.get(4)?,
            notes: row.get(5)?,
            reaction: row.get(6)?,
            created_at: row.get(7)?,
            food_name: row.get(8)?,
            food_emoji: row.get(9)?,
        })
    }

    fn manual_mark_from_row(row: &rusqlite::Row) -> rusqlite::Result<ManualMark> {
        Ok(ManualMark {
            id: row.get(0)?,
            uuid: row.get(1)?,
            food_id: row.get(2)?,
            is_auto_complete: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    // --- Foods ---

    pub fn insert_food(&self, food: &NewFood) -> Result<Food> {
        let name = validate_food_name(&food.name)?;
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO foods (uuid, name, category, is_allergen, is_default, emoji, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                uuid,
                name,
                food.category,
                food.is_allergen,
                food.is_default,
                food.emoji,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, name = %name, category = %food.category, "added food");
        self.get_food_by_id(id)
    }

    pub fn get_food_by_id(&self, id: i64) -> Result<Food> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM foods WHERE id = ?1", Self::FOOD_COLUMNS),
                params![id],
                Self::food_from_row,
            )
            .with_context(|| format!("Food {id} not found"))
    }

    pub fn get_food_by_uuid(&self, uuid: &str) -> Result<Option<Food>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM foods WHERE uuid = ?1",
            Self::FOOD_COLUMNS
        ))?;
        let mut rows = stmt.query(params![uuid])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::food_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Live foods ordered by name, optionally narrowed by a name substring.
    pub fn list_foods(&self, search: Option<&str>) -> Result<Vec<Food>> {
        let escaped = search
            .unwrap_or_default()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM foods
             WHERE deleted_at IS NULL AND name LIKE ?1 ESCAPE '\\'
             ORDER BY name COLLATE NOCASE",
            Self::FOOD_COLUMNS
        ))?;
        let foods = stmt
            .query_map(params![pattern], Self::food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    /// Every food, soft-deleted ones included.
    pub fn list_all_foods(&self) -> Result<Vec<Food>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM foods ORDER BY id",
            Self::FOOD_COLUMNS
        ))?;
        let foods = stmt
            .query_map([], Self::food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    pub fn list_deleted_foods(&self) -> Result<Vec<Food>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM foods WHERE deleted_at IS NOT NULL ORDER BY name COLLATE NOCASE",
            Self::FOOD_COLUMNS
        ))?;
        let foods = stmt
            .query_map([], Self::food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    /// Case-insensitive exact name lookup among live foods.
    pub fn find_food_by_name(&self, name: &str) -> Result<Option<Food>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM foods
             WHERE deleted_at IS NULL AND name = ?1 COLLATE NOCASE
             ORDER BY id LIMIT 1",
            Self::FOOD_COLUMNS
        ))?;
        let mut rows = stmt.query(params![name.trim()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::food_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn count_foods(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn update_food(&self, id: i64, update: &UpdateFood) -> Result<Food> {
        let existing = self.get_food_by_id(id)?;

        if let Some(ref name) = update.name {
            let name = validate_food_name(name)?;
            self.conn.execute(
                "UPDATE foods SET name = ?1 WHERE id = ?2",
                params![name, id],
            )?;
        }
        if let Some(category) = update.category {
            self.conn.execute(
                "UPDATE foods SET category = ?1 WHERE id = ?2",
                params![category, id],
            )?;
        }
        if let Some(is_allergen) = update.is_allergen {
            self.conn.execute(
                "UPDATE foods SET is_allergen = ?1 WHERE id = ?2",
                params![is_allergen, id],
            )?;
        }
        if let Some(ref emoji) = update.emoji {
            self.conn.execute(
                "UPDATE foods SET emoji = ?1 WHERE id = ?2",
                params![emoji, id],
            )?;
        }

        let updated = self.get_food_by_id(id)?;
        if updated.category == Category::Allergens && !updated.is_allergen {
            // keep the row consistent with the allergens category
            self.conn.execute(
                "UPDATE foods SET is_allergen = 1 WHERE id = ?1",
                params![id],
            )?;
        }
        tracing::info!(id, name = %existing.name, "updated food");
        self.get_food_by_id(id)
    }

    /// Hide a food from the checklist. Its entries and marks are kept.
    pub fn soft_delete_food(&self, id: i64) -> Result<bool> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE foods SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now, id],
        )?;
        if rows > 0 {
            tracing::info!(id, "soft-deleted food");
        }
        Ok(rows > 0)
    }

    pub fn restore_food(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE foods SET deleted_at = NULL WHERE id = ?1 AND deleted_at IS NOT NULL",
            params![id],
        )?;
        if rows > 0 {
            tracing::info!(id, "restored food");
        }
        Ok(rows > 0)
    }

    /// Insert the default food list into an empty household. Returns how many were added.
    pub fn seed_default_foods(&self) -> Result<usize> {
        if self.count_foods()? > 0 {
            tracing::debug!("foods already present, skipping seed");
            return Ok(0);
        }
        let tx = self.conn.unchecked_transaction()?;
        let now = Local::now().to_rfc3339();
        for seed in DEFAULT_FOODS {
            tx.execute(
                "INSERT INTO foods (uuid, name, category, is_allergen, is_default, emoji, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    seed.name,
                    seed.category,
                    seed.is_allergen,
                    seed.emoji,
                    now,
                ],
            )?;
        }
        tx.commit()?;
        tracing::info!(count = DEFAULT_FOODS.len(), "seeded default foods");
        Ok(DEFAULT_FOODS.len())
    }

    // --- Calendar entries ---

    pub fn insert_calendar_entry(&self, entry: &NewCalendarEntry) -> Result<CalendarEntry> {
        self.get_food_by_id(entry.food_id)?;
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO calendar_entries (uuid, food_id, date, texture, notes, reaction, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                uuid,
                entry.food_id,
                dates::local_date_string(entry.date),
                entry.texture,
                entry.notes,
                entry.reaction,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, food_id = entry.food_id, date = %entry.date, "logged calendar entry");
        self.get_calendar_entry(id)
    }

    pub fn get_calendar_entry(&self, id: i64) -> Result<CalendarEntry> {
        self.find_calendar_entry(id)?
            .with_context(|| format!("Calendar entry {id} not found"))
    }

    /// Like `get_calendar_entry`, but a missing id is `Ok(None)` rather than an error.
    pub fn find_calendar_entry(&self, id: i64) -> Result<Option<CalendarEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE ce.id = ?1", Self::ENTRY_SELECT))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::calendar_entry_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn update_calendar_entry(
        &self,
        id: i64,
        update: &UpdateCalendarEntry,
    ) -> Result<CalendarEntry> {
        // Verify existence
        self.get_calendar_entry(id)?;

        if let Some(food_id) = update.food_id {
            self.get_food_by_id(food_id)?;
            self.conn.execute(
                "UPDATE calendar_entries SET food_id = ?1 WHERE id = ?2",
                params![food_id, id],
            )?;
        }
        if let Some(date) = update.date {
            self.conn.execute(
                "UPDATE calendar_entries SET date = ?1 WHERE id = ?2",
                params![dates::local_date_string(date), id],
            )?;
        }
        if let Some(texture) = update.texture {
            self.conn.execute(
                "UPDATE calendar_entries SET texture = ?1 WHERE id = ?2",
                params![texture, id],
            )?;
        }
        if let Some(ref notes) = update.notes {
            self.conn.execute(
                "UPDATE calendar_entries SET notes = ?1 WHERE id = ?2",
                params![notes, id],
            )?;
        }
        if let Some(ref reaction) = update.reaction {
            self.conn.execute(
                "UPDATE calendar_entries SET reaction = ?1 WHERE id = ?2",
                params![reaction, id],
            )?;
        }

        tracing::info!(id, "updated calendar entry");
        self.get_calendar_entry(id)
    }

    pub fn delete_calendar_entry(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM calendar_entries WHERE id = ?1", params![id])?;
        if rows > 0 {
            tracing::info!(id, "deleted calendar entry");
        }
        Ok(rows > 0)
    }

    /// All entries, newest date first. Entries for soft-deleted foods are included.
    pub fn list_calendar_entries(&self) -> Result<Vec<CalendarEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} ORDER BY ce.date DESC, ce.id DESC",
            Self::ENTRY_SELECT
        ))?;
        let entries = stmt
            .query_map([], Self::calendar_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn get_entries_for_date(&self, date: NaiveDate) -> Result<Vec<CalendarEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE ce.date = ?1 ORDER BY ce.id",
            Self::ENTRY_SELECT
        ))?;
        let entries = stmt
            .query_map(
                params![dates::local_date_string(date)],
                Self::calendar_entry_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Entries dated within `start..=end`, oldest first.
    pub fn get_entries_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CalendarEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE ce.date BETWEEN ?1 AND ?2 ORDER BY ce.date, ce.id",
            Self::ENTRY_SELECT
        ))?;
        let entries = stmt
            .query_map(
                params![
                    dates::local_date_string(start),
                    dates::local_date_string(end)
                ],
                Self::calendar_entry_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn get_entries_for_food(&self, food_id: i64) -> Result<Vec<CalendarEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE ce.food_id = ?1 ORDER BY ce.date DESC, ce.id DESC",
            Self::ENTRY_SELECT
        ))?;
        let entries = stmt
            .query_map(params![food_id], Self::calendar_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn count_entries_for_food(&self, food_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM calendar_entries WHERE food_id = ?1",
            params![food_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // --- Manual marks ---

    pub fn add_manual_mark(&self, food_id: i64) -> Result<ManualMark> {
        let mut marks = self.add_multiple_manual_marks(food_id, 1, false)?;
        marks.pop().context("Failed to add mark")
    }

    /// Add `count` marks for a food in one transaction.
    pub fn add_multiple_manual_marks(
        &self,
        food_id: i64,
        count: usize,
        is_auto_complete: bool,
    ) -> Result<Vec<ManualMark>> {
        self.get_food_by_id(food_id)?;
        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            tx.execute(
                "INSERT INTO manual_marks (uuid, food_id, is_auto_complete, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![Uuid::new_v4().to_string(), food_id, is_auto_complete, now],
            )?;
            ids.push(tx.last_insert_rowid());
        }
        tx.commit()?;
        tracing::info!(food_id, count, is_auto_complete, "added manual marks");

        ids.into_iter().map(|id| self.get_manual_mark(id)).collect()
    }

    pub fn get_manual_mark(&self, id: i64) -> Result<ManualMark> {
        self.conn
            .query_row(
                "SELECT id, uuid, food_id, is_auto_complete, created_at
                 FROM manual_marks WHERE id = ?1",
                params![id],
                Self::manual_mark_from_row,
            )
            .with_context(|| format!("Mark {id} not found"))
    }

    /// All marks, newest first.
    pub fn list_manual_marks(&self) -> Result<Vec<ManualMark>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, food_id, is_auto_complete, created_at
             FROM manual_marks ORDER BY created_at DESC, id DESC",
        )?;
        let marks = stmt
            .query_map([], Self::manual_mark_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(marks)
    }

    /// Marks for one food, newest first.
    pub fn list_marks_for_food(&self, food_id: i64) -> Result<Vec<ManualMark>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, food_id, is_auto_complete, created_at
             FROM manual_marks WHERE food_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let marks = stmt
            .query_map(params![food_id], Self::manual_mark_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(marks)
    }

    pub fn delete_manual_mark(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM manual_marks WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Remove the marks added by "mark as done". Manual ticks stay.
    pub fn remove_auto_complete_marks_for_food(&self, food_id: i64) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM manual_marks WHERE food_id = ?1 AND is_auto_complete = 1",
            params![food_id],
        )?;
        tracing::info!(food_id, removed = rows, "removed auto-complete marks");
        Ok(rows)
    }

    // --- User Settings ---

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO user_settings (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM user_settings WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM user_settings WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    pub fn baby_name(&self) -> Result<Option<String>> {
        self.get_setting(BABY_NAME_KEY)
    }

    pub fn set_baby_name(&self, name: Option<&str>) -> Result<()> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => self.set_setting(BABY_NAME_KEY, name),
            None => self.delete_setting(BABY_NAME_KEY).map(|_| ()),
        }
    }

    // --- Export / Import ---

    pub fn export_all(&self) -> Result<ExportData> {
        let foods = self.list_all_foods()?;
        let food_uuids: HashMap<i64, String> =
            foods.iter().map(|f| (f.id, f.uuid.clone())).collect();

        let calendar_entries = self
            .list_calendar_entries()?
            .into_iter()
            .rev()
            .filter_map(|e| {
                Some(ExportCalendarEntry {
                    food_uuid: food_uuids.get(&e.food_id)?.clone(),
                    uuid: e.uuid,
                    date: dates::local_date_string(e.date),
                    texture: e.texture,
                    notes: e.notes,
                    reaction: e.reaction,
                    created_at: e.created_at,
                })
            })
            .collect();

        let manual_marks = self
            .list_manual_marks()?
            .into_iter()
            .rev()
            .filter_map(|m| {
                Some(ExportManualMark {
                    food_uuid: food_uuids.get(&m.food_id)?.clone(),
                    uuid: m.uuid,
                    is_auto_complete: m.is_auto_complete,
                    created_at: m.created_at,
                })
            })
            .collect();

        Ok(ExportData {
            version: EXPORT_VERSION,
            exported_at: Local::now().to_rfc3339(),
            baby_name: self.baby_name()?,
            foods,
            calendar_entries,
            manual_marks,
        })
    }

    /// Merge an export into this database. Rows are matched by uuid: known uuids are left
    /// alone, new ones are inserted with food ids remapped to local rows.
    pub fn import_all(&self, data: &ExportData) -> Result<ImportSummary> {
        if data.version > EXPORT_VERSION {
            bail!(
                "Unsupported export version {} (this build reads up to {EXPORT_VERSION})",
                data.version
            );
        }
        for food in &data.foods {
            validate_food_data(food)?;
        }
        for mark in &data.manual_marks {
            validate_export_manual_mark(mark)?;
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut summary = ImportSummary::default();

        // Step 1: foods, building the uuid -> local id mapping
        let mut food_ids: HashMap<&str, i64> = HashMap::new();
        for food in &data.foods {
            if food.uuid.is_empty() {
                summary.rows_skipped += 1;
                continue;
            }
            if let Some(existing) = self.get_food_by_uuid(&food.uuid)? {
                food_ids.insert(&food.uuid, existing.id);
                continue;
            }
            tx.execute(
                "INSERT INTO foods (uuid, name, category, is_allergen, is_default, emoji, created_at, deleted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    food.uuid,
                    food.name.trim(),
                    food.category,
                    food.is_allergen,
                    food.is_default,
                    food.emoji,
                    food.created_at,
                    food.deleted_at,
                ],
            )?;
            food_ids.insert(&food.uuid, tx.last_insert_rowid());
            summary.foods_imported += 1;
        }

        // Step 2: calendar entries
        for entry in &data.calendar_entries {
            let date = validate_export_calendar_entry(entry)?;
            let Some(&food_id) = food_ids.get(entry.food_uuid.as_str()) else {
                tracing::warn!(uuid = %entry.uuid, food_uuid = %entry.food_uuid, "skipping entry for unknown food");
                summary.rows_skipped += 1;
                continue;
            };
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM calendar_entries WHERE uuid = ?1)",
                params![entry.uuid],
                |row| row.get(0),
            )?;
            if exists {
                continue;
            }
            tx.execute(
                "INSERT INTO calendar_entries (uuid, food_id, date, texture, notes, reaction, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.uuid,
                    food_id,
                    dates::local_date_string(date),
                    entry.texture,
                    entry.notes,
                    entry.reaction,
                    entry.created_at,
                ],
            )?;
            summary.calendar_entries_imported += 1;
        }

        // Step 3: manual marks
        for mark in &data.manual_marks {
            let Some(&food_id) = food_ids.get(mark.food_uuid.as_str()) else {
                tracing::warn!(uuid = %mark.uuid, food_uuid = %mark.food_uuid, "skipping mark for unknown food");
                summary.rows_skipped += 1;
                continue;
            };
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM manual_marks WHERE uuid = ?1)",
                params![mark.uuid],
                |row| row.get(0),
            )?;
            if exists {
                continue;
            }
            tx.execute(
                "INSERT INTO manual_marks (uuid, food_id, is_auto_complete, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![mark.uuid, food_id, mark.is_auto_complete, mark.created_at],
            )?;
            summary.manual_marks_imported += 1;
        }

        if self.baby_name()?.is_none() {
            self.set_baby_name(data.baby_name.as_deref())?;
        }

        tx.commit()?;
        tracing::info!(
            foods = summary.foods_imported,
            entries = summary.calendar_entries_imported,
            marks = summary.manual_marks_imported,
            skipped = summary.rows_skipped,
            "import finished"
        );
        Ok(summary)
    }
}

fn date_from_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    dates::parse_date_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: anyhow::Error| FromSqlError::Other(e.into()))
    }
}

impl ToSql for Texture {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Texture {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: anyhow::Error| FromSqlError::Other(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_food(name: &str, category: Category) -> NewFood {
        NewFood {
            name: name.to_string(),
            category,
            is_allergen: category == Category::Allergens,
            emoji: None,
            is_default: false,
        }
    }

    fn new_entry(food_id: i64, date: &str) -> NewCalendarEntry {
        NewCalendarEntry {
            food_id,
            date: dates::parse_date_str(date).unwrap(),
            texture: Texture::Mashed,
            notes: None,
            reaction: None,
        }
    }

    #[test]
    fn test_insert_and_get_food() {
        let db = Database::open_in_memory().unwrap();
        let food = db
            .insert_food(&NewFood {
                emoji: Some("🥜".to_string()),
                ..new_food("  Peanut ", Category::Allergens)
            })
            .unwrap();

        assert_eq!(food.name, "Peanut");
        assert_eq!(food.category, Category::Allergens);
        assert!(food.is_allergen);
        assert!(!food.is_default);
        assert_eq!(food.emoji.as_deref(), Some("🥜"));
        assert!(!food.uuid.is_empty());

        let fetched = db.get_food_by_id(food.id).unwrap();
        assert_eq!(fetched, food);
        assert!(db.get_food_by_id(999).is_err());
    }

    #[test]
    fn test_insert_food_rejects_blank_name() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.insert_food(&new_food("  ", Category::Fruit)).is_err());
    }

    #[test]
    fn test_list_foods_search_and_order() {
        let db = Database::open_in_memory().unwrap();
        db.insert_food(&new_food("sweet potato", Category::Vegetables))
            .unwrap();
        db.insert_food(&new_food("Carrot", Category::Vegetables))
            .unwrap();
        db.insert_food(&new_food("Potato_50%", Category::Vegetables))
            .unwrap();

        let names: Vec<String> = db
            .list_foods(None)
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["Carrot", "Potato_50%", "sweet potato"]);

        assert_eq!(db.list_foods(Some("POTATO")).unwrap().len(), 2);
        // LIKE wildcards are escaped
        assert_eq!(db.list_foods(Some("_50%")).unwrap().len(), 1);
        assert!(db.list_foods(Some("mango")).unwrap().is_empty());
    }

    #[test]
    fn test_find_food_by_name() {
        let db = Database::open_in_memory().unwrap();
        let kiwi = db.insert_food(&new_food("Kiwi", Category::Fruit)).unwrap();
        assert_eq!(db.find_food_by_name(" kiwi ").unwrap(), Some(kiwi.clone()));
        assert_eq!(db.find_food_by_name("kiw").unwrap(), None);

        db.soft_delete_food(kiwi.id).unwrap();
        assert_eq!(db.find_food_by_name("kiwi").unwrap(), None);
    }

    #[test]
    fn test_update_food() {
        let db = Database::open_in_memory().unwrap();
        let food = db.insert_food(&new_food("Sesame", Category::Other)).unwrap();
        let updated = db
            .update_food(
                food.id,
                &UpdateFood {
                    name: Some("Sesame Seeds".to_string()),
                    category: Some(Category::Allergens),
                    emoji: Some(Some("🫛".to_string())),
                    ..UpdateFood::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Sesame Seeds");
        assert_eq!(updated.category, Category::Allergens);
        // moving into allergens flags the food
        assert!(updated.is_allergen);
        assert_eq!(updated.emoji.as_deref(), Some("🫛"));

        let cleared = db
            .update_food(
                food.id,
                &UpdateFood {
                    emoji: Some(None),
                    ..UpdateFood::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.emoji, None);
        assert!(db.update_food(404, &UpdateFood::default()).is_err());
    }

    #[test]
    fn test_soft_delete_and_restore() {
        let db = Database::open_in_memory().unwrap();
        let tofu = db.insert_food(&new_food("Tofu", Category::Protein)).unwrap();
        db.insert_calendar_entry(&new_entry(tofu.id, "2026-10-01"))
            .unwrap();

        assert!(db.soft_delete_food(tofu.id).unwrap());
        assert!(!db.soft_delete_food(tofu.id).unwrap());
        assert!(db.list_foods(None).unwrap().is_empty());
        assert_eq!(db.list_deleted_foods().unwrap().len(), 1);
        assert_eq!(db.list_all_foods().unwrap().len(), 1);
        // history survives
        assert_eq!(db.list_calendar_entries().unwrap().len(), 1);

        assert!(db.restore_food(tofu.id).unwrap());
        assert!(!db.restore_food(tofu.id).unwrap());
        assert_eq!(db.list_foods(None).unwrap().len(), 1);
    }

    #[test]
    fn test_seed_default_foods_once() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.seed_default_foods().unwrap(), DEFAULT_FOODS.len());
        assert_eq!(db.seed_default_foods().unwrap(), 0);

        let foods = db.list_foods(None).unwrap();
        assert_eq!(foods.len(), DEFAULT_FOODS.len());
        assert!(foods.iter().all(|f| f.is_default));
        assert_eq!(foods.iter().filter(|f| f.is_allergen).count(), 9);
    }

    #[test]
    fn test_seed_skipped_when_household_has_foods() {
        let db = Database::open_in_memory().unwrap();
        db.insert_food(&new_food("Mango", Category::Fruit)).unwrap();
        assert_eq!(db.seed_default_foods().unwrap(), 0);
        assert_eq!(db.count_foods().unwrap(), 1);
    }

    #[test]
    fn test_calendar_entry_crud() {
        let db = Database::open_in_memory().unwrap();
        let pear = db.insert_food(&new_food("Pear", Category::Fruit)).unwrap();
        let plum = db.insert_food(&new_food("Plum", Category::Fruit)).unwrap();

        let entry = db
            .insert_calendar_entry(&NewCalendarEntry {
                notes: Some("loved it".to_string()),
                ..new_entry(pear.id, "2026-10-05")
            })
            .unwrap();
        assert_eq!(entry.food_name.as_deref(), Some("Pear"));
        assert_eq!(entry.date, dates::parse_date_str("2026-10-05").unwrap());
        assert_eq!(entry.texture, Texture::Mashed);
        assert_eq!(entry.notes.as_deref(), Some("loved it"));

        let updated = db
            .update_calendar_entry(
                entry.id,
                &UpdateCalendarEntry {
                    food_id: Some(plum.id),
                    texture: Some(Texture::FingerFood),
                    notes: Some(None),
                    reaction: Some(Some("rash".to_string())),
                    ..UpdateCalendarEntry::default()
                },
            )
            .unwrap();
        assert_eq!(updated.food_id, plum.id);
        assert_eq!(updated.food_name.as_deref(), Some("Plum"));
        assert_eq!(updated.texture, Texture::FingerFood);
        assert_eq!(updated.notes, None);
        assert_eq!(updated.reaction.as_deref(), Some("rash"));

        assert!(
            db.update_calendar_entry(
                entry.id,
                &UpdateCalendarEntry {
                    food_id: Some(999),
                    ..UpdateCalendarEntry::default()
                }
            )
            .is_err()
        );

        assert_eq!(db.find_calendar_entry(entry.id).unwrap(), Some(updated));
        assert!(db.delete_calendar_entry(entry.id).unwrap());
        assert!(!db.delete_calendar_entry(entry.id).unwrap());
        assert!(db.get_calendar_entry(entry.id).is_err());
        assert_eq!(db.find_calendar_entry(entry.id).unwrap(), None);
    }

    #[test]
    fn test_entry_requires_known_food() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.insert_calendar_entry(&new_entry(7, "2026-10-01")).is_err());
    }

    #[test]
    fn test_entry_queries() {
        let db = Database::open_in_memory().unwrap();
        let egg = db.insert_food(&new_food("Egg", Category::Allergens)).unwrap();
        let oats = db.insert_food(&new_food("Oatmeal", Category::Grains)).unwrap();
        db.insert_calendar_entry(&new_entry(egg.id, "2026-09-30"))
            .unwrap();
        db.insert_calendar_entry(&new_entry(oats.id, "2026-10-02"))
            .unwrap();
        db.insert_calendar_entry(&new_entry(egg.id, "2026-10-02"))
            .unwrap();
        db.insert_calendar_entry(&new_entry(egg.id, "2026-11-01"))
            .unwrap();

        let all = db.list_calendar_entries().unwrap();
        assert_eq!(all[0].date, dates::parse_date_str("2026-11-01").unwrap());
        assert_eq!(all.len(), 4);

        let day = db
            .get_entries_for_date(dates::parse_date_str("2026-10-02").unwrap())
            .unwrap();
        let names: Vec<&str> = day.iter().filter_map(|e| e.food_name.as_deref()).collect();
        assert_eq!(names, ["Oatmeal", "Egg"]);

        let october = db
            .get_entries_between(
                dates::parse_date_str("2026-10-01").unwrap(),
                dates::parse_date_str("2026-10-31").unwrap(),
            )
            .unwrap();
        assert_eq!(october.len(), 2);

        assert_eq!(db.count_entries_for_food(egg.id).unwrap(), 3);
        assert_eq!(db.get_entries_for_food(oats.id).unwrap().len(), 1);
    }

    #[test]
    fn test_manual_marks() {
        let db = Database::open_in_memory().unwrap();
        let milk = db.insert_food(&new_food("Milk", Category::Allergens)).unwrap();

        let manual = db.add_manual_mark(milk.id).unwrap();
        assert!(!manual.is_auto_complete);

        let auto = db.add_multiple_manual_marks(milk.id, 2, true).unwrap();
        assert_eq!(auto.len(), 2);
        assert!(auto.iter().all(|m| m.is_auto_complete));
        assert_eq!(db.list_marks_for_food(milk.id).unwrap().len(), 3);

        assert_eq!(db.remove_auto_complete_marks_for_food(milk.id).unwrap(), 2);
        assert_eq!(db.list_marks_for_food(milk.id).unwrap(), vec![manual.clone()]);

        assert!(db.delete_manual_mark(manual.id).unwrap());
        assert!(db.list_manual_marks().unwrap().is_empty());
        assert!(db.add_manual_mark(999).is_err());
    }

    #[test]
    fn test_settings() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_setting("theme").unwrap(), None);
        db.set_setting("theme", "dark").unwrap();
        db.set_setting("theme", "light").unwrap();
        assert_eq!(db.get_setting("theme").unwrap().as_deref(), Some("light"));
        assert!(db.delete_setting("theme").unwrap());
        assert!(!db.delete_setting("theme").unwrap());

        db.set_baby_name(Some(" Ada ")).unwrap();
        assert_eq!(db.baby_name().unwrap().as_deref(), Some("Ada"));
        db.set_baby_name(Some("")).unwrap();
        assert_eq!(db.baby_name().unwrap(), None);
    }

    #[test]
    fn test_export_import_round_trip() {
        let source = Database::open_in_memory().unwrap();
        source.seed_default_foods().unwrap();
        source.set_baby_name(Some("Ada")).unwrap();
        let carrot = source.find_food_by_name("carrot").unwrap().unwrap();
        let egg = source.find_food_by_name("egg").unwrap().unwrap();
        source
            .insert_calendar_entry(&new_entry(carrot.id, "2026-10-03"))
            .unwrap();
        source.add_multiple_manual_marks(egg.id, 3, true).unwrap();
        source.soft_delete_food(carrot.id).unwrap();

        let export = source.export_all().unwrap();
        assert_eq!(export.version, EXPORT_VERSION);
        assert_eq!(export.foods.len(), DEFAULT_FOODS.len());
        assert_eq!(export.calendar_entries.len(), 1);
        assert_eq!(export.manual_marks.len(), 3);

        let json = serde_json::to_string(&export).unwrap();
        let parsed: ExportData = serde_json::from_str(&json).unwrap();

        let target = Database::open_in_memory().unwrap();
        target.insert_food(&new_food("Dragonfruit", Category::Fruit)).unwrap();
        let summary = target.import_all(&parsed).unwrap();
        assert_eq!(summary.foods_imported, DEFAULT_FOODS.len() as i64);
        assert_eq!(summary.calendar_entries_imported, 1);
        assert_eq!(summary.manual_marks_imported, 3);
        assert_eq!(summary.rows_skipped, 0);
        assert_eq!(target.baby_name().unwrap().as_deref(), Some("Ada"));

        // the deleted carrot stays deleted and keeps its entry
        assert!(target.find_food_by_name("carrot").unwrap().is_none());
        let entries = target.list_calendar_entries().unwrap();
        assert_eq!(entries[0].food_name.as_deref(), Some("Carrot"));

        // a second import is a no-op
        let again = target.import_all(&parsed).unwrap();
        assert_eq!(again.foods_imported, 0);
        assert_eq!(again.calendar_entries_imported, 0);
        assert_eq!(again.manual_marks_imported, 0);
    }

    #[test]
    fn test_import_skips_rows_for_unknown_food() {
        let db = Database::open_in_memory().unwrap();
        let data = ExportData {
            version: 1,
            exported_at: String::new(),
            baby_name: None,
            foods: Vec::new(),
            calendar_entries: vec![ExportCalendarEntry {
                uuid: "e1".to_string(),
                food_uuid: "nope".to_string(),
                date: "2026-10-01".to_string(),
                texture: Texture::Puree,
                notes: None,
                reaction: None,
                created_at: String::new(),
            }],
            manual_marks: vec![ExportManualMark {
                uuid: "m1".to_string(),
                food_uuid: "nope".to_string(),
                is_auto_complete: false,
                created_at: "2026-10-01T09:00:00+00:00".to_string(),
            }],
        };
        let summary = db.import_all(&data).unwrap();
        assert_eq!(summary.rows_skipped, 2);
        assert_eq!(summary.calendar_entries_imported, 0);
    }

    #[test]
    fn test_import_rejects_bad_rows() {
        let db = Database::open_in_memory().unwrap();
        let mut data = db.export_all().unwrap();
        data.version = EXPORT_VERSION + 1;
        assert!(db.import_all(&data).is_err());

        data.version = EXPORT_VERSION;
        data.foods.push(Food {
            id: 1,
            uuid: "f".to_string(),
            name: "Peanut".to_string(),
            category: Category::Allergens,
            is_allergen: false,
            is_default: false,
            emoji: None,
            created_at: String::new(),
            deleted_at: None,
        });
        assert!(db.import_all(&data).is_err());
        assert_eq!(db.count_foods().unwrap(), 0);
    }

    #[test]
    fn test_import_rejects_mark_without_timestamp() {
        let source = Database::open_in_memory().unwrap();
        let pear = source.insert_food(&new_food("Pear", Category::Fruit)).unwrap();
        source.add_manual_mark(pear.id).unwrap();
        let mut data = source.export_all().unwrap();
        data.manual_marks[0].created_at = "not a timestamp".to_string();

        let target = Database::open_in_memory().unwrap();
        let err = target.import_all(&data).unwrap_err();
        assert!(err.to_string().contains("not a timestamp"));
        assert_eq!(target.count_foods().unwrap(), 0);
        assert!(target.list_manual_marks().unwrap().is_empty());
    }

    #[test]
    fn test_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nibble.db");
        {
            let db = Database::open(&path).unwrap();
            db.seed_default_foods().unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.count_foods().unwrap(), DEFAULT_FOODS.len() as i64);
        // migrations are idempotent on reopen
        assert_eq!(db.seed_default_foods().unwrap(), 0);
    }
}

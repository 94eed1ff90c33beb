use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates;

/// Times an allergen has to be given before it counts as introduced.
pub const ALLERGEN_DONE_THRESHOLD: usize = 3;

/// An unfinished allergen not given for longer than this many days needs a reminder.
pub const ALLERGEN_REMINDER_DAYS: i64 = 14;

// --- Taxonomy ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Allergens,
    Vegetables,
    Fruit,
    Dairy,
    Grains,
    Protein,
    Other,
}

impl Category {
    /// Display order used by the checklist and summary.
    pub const ALL: [Category; 7] = [
        Category::Allergens,
        Category::Vegetables,
        Category::Fruit,
        Category::Dairy,
        Category::Grains,
        Category::Protein,
        Category::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Allergens => "allergens",
            Category::Vegetables => "vegetables",
            Category::Fruit => "fruit",
            Category::Dairy => "dairy",
            Category::Grains => "grains",
            Category::Protein => "protein",
            Category::Other => "other",
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Category::Allergens => "⚠️",
            Category::Vegetables => "🥕",
            Category::Fruit => "🍎",
            Category::Dairy => "🧀",
            Category::Grains => "🌾",
            Category::Protein => "🍖",
            Category::Other => "🫒",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Category::Allergens => "Allergens",
            Category::Vegetables => "Vegetables",
            Category::Fruit => "Fruit",
            Category::Dairy => "Dairy",
            Category::Grains => "Grains",
            Category::Protein => "Protein",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        // "fruits" and "vegetable" are common enough to accept
        let normalized = match lower.as_str() {
            "allergen" => "allergens",
            "vegetable" | "veg" => "vegetables",
            "fruits" => "fruit",
            "grain" => "grains",
            other => other,
        };
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid category '{s}'. Must be one of: {}",
                    Category::ALL.map(Category::as_str).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Texture {
    #[default]
    #[serde(rename = "puree")]
    Puree,
    #[serde(rename = "paste")]
    Paste,
    #[serde(rename = "mashed")]
    Mashed,
    #[serde(rename = "soft chunks")]
    SoftChunks,
    #[serde(rename = "finger food")]
    FingerFood,
    #[serde(rename = "mixed")]
    Mixed,
}

impl Texture {
    pub const ALL: [Texture; 6] = [
        Texture::Puree,
        Texture::Paste,
        Texture::Mashed,
        Texture::SoftChunks,
        Texture::FingerFood,
        Texture::Mixed,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Texture::Puree => "puree",
            Texture::Paste => "paste",
            Texture::Mashed => "mashed",
            Texture::SoftChunks => "soft chunks",
            Texture::FingerFood => "finger food",
            Texture::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Texture {
    type Err = anyhow::Error;

    /// Accepts the stored form as well as `soft-chunks` / `finger_food` spellings.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        Texture::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid texture '{s}'. Must be one of: {}",
                    Texture::ALL.map(Texture::as_str).join(", ")
                )
            })
    }
}

// --- Stored records ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Food {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub category: Category,
    pub is_allergen: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

impl Food {
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// The food's own emoji, falling back to its category icon.
    #[must_use]
    pub fn display_emoji(&self) -> &str {
        self.emoji
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| self.category.icon())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEntry {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub food_id: i64,
    pub date: NaiveDate,
    pub texture: Texture,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
    pub created_at: String,
    // Joined fields for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_emoji: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualMark {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub food_id: i64,
    pub is_auto_complete: bool,
    pub created_at: String,
}

impl ManualMark {
    /// The day this mark counts as "given".
    #[must_use]
    pub fn given_date(&self) -> Option<NaiveDate> {
        dates::timestamp_date(&self.created_at)
    }
}

#[derive(Debug, Clone)]
pub struct NewFood {
    pub name: String,
    pub category: Category,
    pub is_allergen: bool,
    pub emoji: Option<String>,
    pub is_default: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateFood {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub is_allergen: Option<bool>,
    pub emoji: Option<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct NewCalendarEntry {
    pub food_id: i64,
    pub date: NaiveDate,
    pub texture: Texture,
    pub notes: Option<String>,
    pub reaction: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCalendarEntry {
    pub food_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub texture: Option<Texture>,
    pub notes: Option<Option<String>>,
    pub reaction: Option<Option<String>>,
}

// --- Derived checklist types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntroStatus {
    Nothing,
    Started,
    Done,
}

impl IntroStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IntroStatus::Nothing => "nothing",
            IntroStatus::Started => "started",
            IntroStatus::Done => "done",
        }
    }
}

impl fmt::Display for IntroStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoodStatus {
    pub times_given: usize,
    pub last_given_date: Option<NaiveDate>,
    pub status: IntroStatus,
    pub has_planned: bool,
    pub needs_reminder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistFood {
    #[serde(flatten)]
    pub food: Food,
    pub food_status: FoodStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub category: Category,
    pub foods: Vec<ChecklistFood>,
    pub done_count: usize,
    pub total_count: usize,
}

impl CategoryGroup {
    #[must_use]
    pub fn new(category: Category, foods: Vec<ChecklistFood>) -> Self {
        let done_count = foods
            .iter()
            .filter(|f| f.food_status.status == IntroStatus::Done)
            .count();
        let total_count = foods.len();
        Self {
            category,
            foods,
            done_count,
            total_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStat {
    pub category: Category,
    pub done: usize,
    pub total: usize,
    pub icon: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistSummary {
    pub total_done: usize,
    pub total_count: usize,
    pub category_stats: Vec<CategoryStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Checklist {
    pub groups: Vec<CategoryGroup>,
    pub summary: ChecklistSummary,
}

/// One food with its derived status and its full entry history.
#[derive(Debug, Clone, Serialize)]
pub struct FoodDetail {
    pub food: Food,
    pub food_status: FoodStatus,
    pub entries: Vec<CalendarEntry>,
    pub manual_marks: usize,
    pub auto_complete_marks: usize,
}

// --- Voice ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedVoiceEntry {
    pub food_id: Option<i64>,
    pub food_name: String,
    pub date: NaiveDate,
    pub texture: Texture,
    pub confidence: Confidence,
    pub raw_transcript: String,
}

// --- Default seed list ---

#[derive(Debug, Clone, Copy)]
pub struct SeedFood {
    pub name: &'static str,
    pub category: Category,
    pub is_allergen: bool,
    pub emoji: &'static str,
}

const fn seed(name: &'static str, category: Category, emoji: &'static str) -> SeedFood {
    SeedFood {
        name,
        category,
        is_allergen: matches!(category, Category::Allergens),
        emoji,
    }
}

/// Foods every new household starts with. The nine allergens are the common top-9.
pub const DEFAULT_FOODS: &[SeedFood] = &[
    seed("Peanut", Category::Allergens, "🥜"),
    seed("Tree Nuts", Category::Allergens, "🌰"),
    seed("Milk", Category::Allergens, "🥛"),
    seed("Egg", Category::Allergens, "🥚"),
    seed("Wheat", Category::Allergens, "🌾"),
    seed("Soy", Category::Allergens, "🫘"),
    seed("Fish", Category::Allergens, "🐟"),
    seed("Shellfish", Category::Allergens, "🦐"),
    seed("Sesame", Category::Allergens, "🫛"),
    seed("Carrot", Category::Vegetables, "🥕"),
    seed("Sweet Potato", Category::Vegetables, "🍠"),
    seed("Peas", Category::Vegetables, "🫛"),
    seed("Green Beans", Category::Vegetables, "🫛"),
    seed("Squash", Category::Vegetables, "🎃"),
    seed("Zucchini", Category::Vegetables, "🥒"),
    seed("Broccoli", Category::Vegetables, "🥦"),
    seed("Spinach", Category::Vegetables, "🥬"),
    seed("Avocado", Category::Vegetables, "🥑"),
    seed("Cauliflower", Category::Vegetables, "🥬"),
    seed("Beets", Category::Vegetables, "🫐"),
    seed("Cucumber", Category::Vegetables, "🥒"),
    seed("Bell Pepper", Category::Vegetables, "🫑"),
    seed("Banana", Category::Fruit, "🍌"),
    seed("Apple", Category::Fruit, "🍎"),
    seed("Pear", Category::Fruit, "🍐"),
    seed("Peach", Category::Fruit, "🍑"),
    seed("Mango", Category::Fruit, "🥭"),
    seed("Blueberries", Category::Fruit, "🫐"),
    seed("Strawberries", Category::Fruit, "🍓"),
    seed("Raspberries", Category::Fruit, "🫐"),
    seed("Watermelon", Category::Fruit, "🍉"),
    seed("Cantaloupe", Category::Fruit, "🍈"),
    seed("Papaya", Category::Fruit, "🥭"),
    seed("Plum", Category::Fruit, "🫐"),
    seed("Grapes", Category::Fruit, "🍇"),
    seed("Kiwi", Category::Fruit, "🥝"),
    seed("Yogurt", Category::Dairy, "🥛"),
    seed("Cheese", Category::Dairy, "🧀"),
    seed("Cottage Cheese", Category::Dairy, "🧀"),
    seed("Butter", Category::Dairy, "🧈"),
    seed("Cream Cheese", Category::Dairy, "🧀"),
    seed("Rice Cereal", Category::Grains, "🍚"),
    seed("Oatmeal", Category::Grains, "🥣"),
    seed("Barley", Category::Grains, "🌾"),
    seed("Quinoa", Category::Grains, "🌾"),
    seed("Pasta", Category::Grains, "🍝"),
    seed("Bread", Category::Grains, "🍞"),
    seed("Crackers", Category::Grains, "🥠"),
    seed("Pancakes", Category::Grains, "🥞"),
    seed("Chicken", Category::Protein, "🍗"),
    seed("Turkey", Category::Protein, "🦃"),
    seed("Beef", Category::Protein, "🥩"),
    seed("Pork", Category::Protein, "🥓"),
    seed("Lamb", Category::Protein, "🍖"),
    seed("Salmon", Category::Protein, "🍣"),
    seed("Cod", Category::Protein, "🐟"),
    seed("Tilapia", Category::Protein, "🐟"),
    seed("Tofu", Category::Protein, "🧈"),
    seed("Lentils", Category::Protein, "🫘"),
    seed("Black Beans", Category::Protein, "🫘"),
    seed("Chickpeas", Category::Protein, "🧆"),
    seed("Olive Oil", Category::Other, "🫒"),
    seed("Coconut", Category::Other, "🥥"),
    seed("Hummus", Category::Other, "🧆"),
    seed("Nut Butter", Category::Other, "🥜"),
];

impl SeedFood {
    #[must_use]
    pub fn to_new_food(&self) -> NewFood {
        NewFood {
            name: self.name.to_string(),
            category: self.category,
            is_allergen: self.is_allergen,
            emoji: Some(self.emoji.to_string()),
            is_default: true,
        }
    }
}

// --- Export / Import types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportCalendarEntry {
    pub uuid: String,
    pub food_uuid: String,
    pub date: String,
    pub texture: Texture,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reaction: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManualMark {
    pub uuid: String,
    pub food_uuid: String,
    #[serde(default)]
    pub is_auto_complete: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub version: i64,
    pub exported_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baby_name: Option<String>,
    pub foods: Vec<Food>,
    pub calendar_entries: Vec<ExportCalendarEntry>,
    #[serde(default)]
    pub manual_marks: Vec<ExportManualMark>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub foods_imported: i64,
    pub calendar_entries_imported: i64,
    pub manual_marks_imported: i64,
    pub rows_skipped: i64,
}

// --- Validation ---

/// Trim a food name and reject empty ones.
pub fn validate_food_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("Food name must not be empty");
    }
    Ok(trimmed.to_string())
}

/// Validate an imported food: non-empty name, and allergen foods live in the allergens category.
pub fn validate_food_data(food: &Food) -> Result<()> {
    validate_food_name(&food.name)?;
    if food.category == Category::Allergens && !food.is_allergen {
        bail!(
            "Food '{}' is in the allergens category but is not flagged as an allergen",
            food.name
        );
    }
    Ok(())
}

/// Validate an imported calendar entry: the date must be YYYY-MM-DD.
pub fn validate_export_calendar_entry(entry: &ExportCalendarEntry) -> Result<NaiveDate> {
    dates::parse_date_str(&entry.date).map_err(|_| {
        anyhow::anyhow!(
            "Invalid calendar entry date '{}'. Must be YYYY-MM-DD",
            entry.date
        )
    })
}

/// Validate an imported manual mark: `created_at` must carry a readable date, since it
/// is the day the mark counts for.
pub fn validate_export_manual_mark(mark: &ExportManualMark) -> Result<NaiveDate> {
    dates::timestamp_date(&mark.created_at).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid manual mark timestamp '{}'. Must be RFC 3339",
            mark.created_at
        )
    })
}

/// Turn blank optional text into `None`.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

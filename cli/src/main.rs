mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    cmd_calendar, cmd_checklist, cmd_complete, cmd_day, cmd_delete, cmd_edit, cmd_export,
    cmd_food_add, cmd_food_delete, cmd_food_edit, cmd_food_list, cmd_food_restore, cmd_food_seed,
    cmd_import, cmd_log, cmd_profile, cmd_status, cmd_summary, cmd_tick, cmd_uncomplete,
    cmd_untick, cmd_voice,
};
use crate::commands::{EntryArgs, FoodEditArgs};
use crate::config::Config;
use nibble_core::service::NibbleService;

#[derive(Parser)]
#[command(
    name = "nibble",
    version,
    about = "Track which foods your baby has tried",
    long_about = "\n\n  ███╗   ██╗██╗██████╗ ██████╗ ██╗     ███████╗
  ████╗  ██║██║██╔══██╗██╔══██╗██║     ██╔════╝
  ██╔██╗ ██║██║██████╔╝██████╔╝██║     █████╗
  ██║╚██╗██║██║██╔══██╗██╔══██╗██║     ██╔══╝
  ██║ ╚████║██║██████╔╝██████╔╝███████╗███████╗
  ╚═╝  ╚═══╝╚═╝╚═════╝ ╚═════╝ ╚══════╝╚══════╝
        one spoonful at a time.
"
)]
struct Cli {
    /// Path to the database file
    #[arg(long, global = true, env = "NIBBLE_DB", value_name = "PATH")]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every food grouped by category with its introduction status
    Checklist {
        /// Only show foods whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Per-category progress counts
    Summary {
        #[arg(long)]
        json: bool,
    },
    /// Show one food's status and history
    Status {
        /// Food name
        food: String,
        /// Use a specific food ID instead of searching by name
        #[arg(long)]
        food_id: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Record that a food was given (or plan it on a future date)
    Log {
        /// Food name
        food: String,
        /// Date (YYYY-MM-DD, today, yesterday, tomorrow; defaults to today)
        #[arg(short, long)]
        date: Option<String>,
        /// Texture (puree, paste, mashed, soft chunks, finger food, mixed)
        #[arg(short, long)]
        texture: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Any reaction observed
        #[arg(long)]
        reaction: Option<String>,
        /// Use a specific food ID instead of searching by name
        #[arg(long)]
        food_id: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Edit a calendar entry
    Edit {
        /// Calendar entry ID
        entry_id: i64,
        /// Move the entry to another food
        #[arg(long)]
        food: Option<String>,
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long)]
        texture: Option<String>,
        /// New notes (empty string clears)
        #[arg(long)]
        notes: Option<String>,
        /// New reaction (empty string clears)
        #[arg(long)]
        reaction: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Delete a calendar entry
    Delete {
        /// Calendar entry ID
        entry_id: i64,
        #[arg(long)]
        json: bool,
    },
    /// List the entries for one day
    Day {
        /// Date (YYYY-MM-DD, today, yesterday, tomorrow; defaults to today)
        date: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show a month as a calendar grid
    Calendar {
        /// Month (YYYY-MM, defaults to this month)
        #[arg(short, long)]
        month: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Count one introduction without a calendar entry
    Tick {
        food: String,
        #[arg(long)]
        food_id: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Remove the newest manual mark from a food
    Untick {
        food: String,
        #[arg(long)]
        food_id: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Mark an allergen as fully introduced
    Complete {
        food: String,
        #[arg(long)]
        food_id: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Undo `complete` for an allergen
    Uncomplete {
        food: String,
        #[arg(long)]
        food_id: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Log a food from a spoken sentence, e.g. "mashed banana yesterday"
    Voice {
        /// The transcript
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
        /// Use this food instead of the one heard
        #[arg(long)]
        food: Option<String>,
        /// Use this texture instead of the one heard
        #[arg(short, long)]
        texture: Option<String>,
        /// Save without asking
        #[arg(short, long)]
        yes: bool,
        #[arg(long)]
        json: bool,
    },
    /// Manage the food list
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Show or set the baby's name
    Profile {
        /// Set the baby's name
        #[arg(long)]
        baby_name: Option<String>,
        /// Clear the baby's name
        #[arg(long, conflicts_with = "baby_name")]
        clear: bool,
        #[arg(long)]
        json: bool,
    },
    /// Export all data as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Import a JSON export, merging with existing data
    Import {
        /// Path to the export file
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Add a custom food
    Add {
        name: String,
        /// Category (allergens, vegetables, fruit, dairy, grains, protein, other)
        #[arg(short, long)]
        category: String,
        /// Count this food as an allergen (needs three exposures)
        #[arg(long)]
        allergen: bool,
        #[arg(long)]
        emoji: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List foods
    List {
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,
        /// Show deleted foods instead
        #[arg(long)]
        deleted: bool,
        #[arg(long)]
        json: bool,
    },
    /// Edit a food
    Edit {
        food: String,
        #[arg(long)]
        food_id: Option<i64>,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        allergen: Option<bool>,
        /// New emoji (empty string resets to the category icon)
        #[arg(long)]
        emoji: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Hide a food from the checklist, keeping its history
    Delete {
        food: String,
        #[arg(long)]
        food_id: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Bring back a deleted food
    Restore {
        /// Food ID (see `nibble food list --deleted`)
        food_id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Add the default food list to an empty database
    Seed {
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("NIBBLE_LOG").unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db)?;
    let svc = NibbleService::new(&config.db_path)?;
    tracing::debug!(path = %config.db_path.display(), "opened database");

    match cli.command {
        Commands::Checklist { search, json } => cmd_checklist(&svc, search.as_deref(), json),
        Commands::Summary { json } => cmd_summary(&svc, json),
        Commands::Status {
            food,
            food_id,
            json,
        } => cmd_status(&svc, &food, food_id, json),
        Commands::Log {
            food,
            date,
            texture,
            notes,
            reaction,
            food_id,
            json,
        } => cmd_log(
            &svc,
            &food,
            food_id,
            EntryArgs {
                date,
                texture,
                notes,
                reaction,
            },
            json,
        ),
        Commands::Edit {
            entry_id,
            food,
            date,
            texture,
            notes,
            reaction,
            json,
        } => cmd_edit(
            &svc,
            entry_id,
            food.as_deref(),
            EntryArgs {
                date,
                texture,
                notes,
                reaction,
            },
            json,
        ),
        Commands::Delete { entry_id, json } => cmd_delete(&svc, entry_id, json),
        Commands::Day { date, json } => cmd_day(&svc, date.as_deref(), json),
        Commands::Calendar { month, json } => cmd_calendar(&svc, month.as_deref(), json),
        Commands::Tick {
            food,
            food_id,
            json,
        } => cmd_tick(&svc, &food, food_id, json),
        Commands::Untick {
            food,
            food_id,
            json,
        } => cmd_untick(&svc, &food, food_id, json),
        Commands::Complete {
            food,
            food_id,
            json,
        } => cmd_complete(&svc, &food, food_id, json),
        Commands::Uncomplete {
            food,
            food_id,
            json,
        } => cmd_uncomplete(&svc, &food, food_id, json),
        Commands::Voice {
            words,
            food,
            texture,
            yes,
            json,
        } => cmd_voice(
            &svc,
            &words,
            food.as_deref(),
            texture.as_deref(),
            yes,
            json,
        ),
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                category,
                allergen,
                emoji,
                json,
            } => cmd_food_add(&svc, &name, &category, allergen, emoji, json),
            FoodCommands::List {
                search,
                deleted,
                json,
            } => cmd_food_list(&svc, search.as_deref(), deleted, json),
            FoodCommands::Edit {
                food,
                food_id,
                name,
                category,
                allergen,
                emoji,
                json,
            } => cmd_food_edit(
                &svc,
                &food,
                food_id,
                FoodEditArgs {
                    name,
                    category,
                    allergen,
                    emoji,
                },
                json,
            ),
            FoodCommands::Delete {
                food,
                food_id,
                json,
            } => cmd_food_delete(&svc, &food, food_id, json),
            FoodCommands::Restore { food_id, json } => cmd_food_restore(&svc, food_id, json),
            FoodCommands::Seed { json } => cmd_food_seed(&svc, json),
        },
        Commands::Profile {
            baby_name,
            clear,
            json,
        } => cmd_profile(&svc, baby_name, clear, json),
        Commands::Export { output, json } => cmd_export(&svc, output.as_deref(), json),
        Commands::Import { file, json } => cmd_import(&svc, &file, json),
    }
}

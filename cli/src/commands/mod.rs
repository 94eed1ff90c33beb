mod calendar;
mod checklist;
mod entry;
mod food;
mod helpers;
mod mark;
mod transfer;
mod voice;

use anyhow::{Result, bail};

use nibble_core::models::Food;
use nibble_core::service::NibbleService;

use helpers::{print_food_table, prompt_choice};

pub(crate) use calendar::{cmd_calendar, cmd_day};
pub(crate) use checklist::{cmd_checklist, cmd_status, cmd_summary};
pub(crate) use entry::{EntryArgs, cmd_delete, cmd_edit, cmd_log};
pub(crate) use food::{
    FoodEditArgs, cmd_food_add, cmd_food_delete, cmd_food_edit, cmd_food_list, cmd_food_restore,
    cmd_food_seed,
};
pub(crate) use mark::{cmd_complete, cmd_tick, cmd_uncomplete, cmd_untick};
pub(crate) use transfer::{cmd_export, cmd_import, cmd_profile};
pub(crate) use voice::cmd_voice;

/// Resolve a food argument: exact name first, then a name search with an interactive
/// pick when more than one food matches.
pub(super) fn resolve_food(svc: &NibbleService, food_query: &str) -> Result<Food> {
    if let Some(food) = svc.find_food_by_name(food_query)? {
        return Ok(food);
    }

    let mut matches = svc.list_foods(Some(food_query.trim()))?;
    match matches.len() {
        0 => bail!("No food found for '{food_query}'"),
        1 => Ok(matches.remove(0)),
        n => {
            let refs: Vec<&Food> = matches.iter().collect();
            print_food_table(&refs);
            let idx = prompt_choice(n)?;
            Ok(matches.swap_remove(idx))
        }
    }
}

/// Resolve a food by id when given, otherwise by name.
pub(super) fn resolve_food_arg(
    svc: &NibbleService,
    food_query: &str,
    food_id: Option<i64>,
) -> Result<Food> {
    match food_id {
        Some(id) => svc.get_food(id),
        None => resolve_food(svc, food_query),
    }
}

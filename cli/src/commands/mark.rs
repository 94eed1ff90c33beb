use anyhow::Result;
use std::process;

use nibble_core::models::{Food, FoodStatus};
use nibble_core::service::NibbleService;

use super::helpers::json_error;
use super::resolve_food_arg;

fn resolve_or_exit(
    svc: &NibbleService,
    food_query: &str,
    food_id: Option<i64>,
    json: bool,
) -> Result<Food> {
    match resolve_food_arg(svc, food_query, food_id) {
        Ok(food) => Ok(food),
        Err(e) if json => {
            println!("{}", json_error(&format!("{e:#}")));
            process::exit(2);
        }
        Err(e) => Err(e),
    }
}

fn print_status(food: &Food, status: &FoodStatus, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "food_id": food.id,
            "food_name": food.name,
            "food_status": status,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!(
            "{} {}: {} (given {} time(s))",
            food.display_emoji(),
            food.name,
            status.status,
            status.times_given
        );
    }
    Ok(())
}

pub(crate) fn cmd_tick(
    svc: &NibbleService,
    food_query: &str,
    food_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let food = resolve_or_exit(svc, food_query, food_id, json)?;
    svc.tick_food(food.id)?;
    let status = svc.food_status(food.id)?.food_status;
    print_status(&food, &status, json)
}

pub(crate) fn cmd_untick(
    svc: &NibbleService,
    food_query: &str,
    food_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let food = resolve_or_exit(svc, food_query, food_id, json)?;
    let status = svc.untick_food(food.id)?;
    print_status(&food, &status, json)
}

pub(crate) fn cmd_complete(
    svc: &NibbleService,
    food_query: &str,
    food_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let food = resolve_or_exit(svc, food_query, food_id, json)?;
    let status = svc.complete_allergen(food.id)?;
    print_status(&food, &status, json)
}

pub(crate) fn cmd_uncomplete(
    svc: &NibbleService,
    food_query: &str,
    food_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let food = resolve_or_exit(svc, food_query, food_id, json)?;
    let status = svc.undo_auto_complete(food.id)?;
    print_status(&food, &status, json)
}

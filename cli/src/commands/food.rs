use anyhow::{Result, bail};
use std::process;

use nibble_core::models::{Category, Food, NewFood, UpdateFood, non_blank};
use nibble_core::service::NibbleService;

use super::helpers::{json_error, print_food_table};
use super::resolve_food_arg;

pub(crate) fn cmd_food_add(
    svc: &NibbleService,
    name: &str,
    category: &str,
    allergen: bool,
    emoji: Option<String>,
    json: bool,
) -> Result<()> {
    let category: Category = category.parse()?;
    let food = svc.add_food(&NewFood {
        name: name.to_string(),
        category,
        is_allergen: allergen || category == Category::Allergens,
        emoji: non_blank(emoji),
        is_default: false,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
    } else {
        let name = &food.name;
        let id = food.id;
        println!("Added food: {name} (id: {id})");
    }

    Ok(())
}

pub(crate) fn cmd_food_list(
    svc: &NibbleService,
    search: Option<&str>,
    deleted: bool,
    json: bool,
) -> Result<()> {
    let foods = if deleted {
        svc.list_deleted_foods()?
    } else {
        svc.list_foods(search)?
    };

    if foods.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No foods found");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&foods)?);
    } else {
        let refs: Vec<&Food> = foods.iter().collect();
        print_food_table(&refs);
    }

    Ok(())
}

pub(crate) struct FoodEditArgs {
    pub name: Option<String>,
    pub category: Option<String>,
    pub allergen: Option<bool>,
    pub emoji: Option<String>,
}

pub(crate) fn cmd_food_edit(
    svc: &NibbleService,
    food_query: &str,
    food_id: Option<i64>,
    args: FoodEditArgs,
    json: bool,
) -> Result<()> {
    if args.name.is_none()
        && args.category.is_none()
        && args.allergen.is_none()
        && args.emoji.is_none()
    {
        bail!("Nothing to update. Provide at least one of --name, --category, --allergen, or --emoji");
    }

    let food = resolve_food_arg(svc, food_query, food_id)?;
    let update = UpdateFood {
        name: args.name,
        category: args.category.as_deref().map(str::parse).transpose()?,
        is_allergen: args.allergen,
        // an empty string clears the emoji back to the category icon
        emoji: args.emoji.map(|e| non_blank(Some(e))),
    };

    let updated = svc.edit_food(food.id, &update)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        println!(
            "Updated food: {} {} (id: {})",
            updated.display_emoji(),
            updated.name,
            updated.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_food_delete(
    svc: &NibbleService,
    food_query: &str,
    food_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let food = resolve_food_arg(svc, food_query, food_id)?;
    if svc.delete_food(food.id)? {
        if json {
            println!("{}", serde_json::json!({ "deleted": food.id }));
        } else {
            println!(
                "Deleted {} (id: {}). Its calendar entries are kept; `nibble food restore {}` brings it back",
                food.name, food.id, food.id
            );
        }
        Ok(())
    } else {
        if json {
            println!("{}", json_error(&format!("Food {} not found", food.id)));
        } else {
            eprintln!("Food {} not found", food.id);
        }
        process::exit(2);
    }
}

pub(crate) fn cmd_food_restore(svc: &NibbleService, food_id: i64, json: bool) -> Result<()> {
    if svc.restore_food(food_id)? {
        let food = svc.get_food(food_id)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&food)?);
        } else {
            println!("Restored {} (id: {})", food.name, food.id);
        }
        Ok(())
    } else {
        if json {
            println!("{}", json_error(&format!("No deleted food with id {food_id}")));
        } else {
            eprintln!("No deleted food with id {food_id}");
        }
        process::exit(2);
    }
}

pub(crate) fn cmd_food_seed(svc: &NibbleService, json: bool) -> Result<()> {
    let added = svc.seed_defaults()?;
    if json {
        println!("{}", serde_json::json!({ "added": added }));
    } else if added == 0 {
        println!("Default foods already present");
    } else {
        println!("Added {added} default foods");
    }
    Ok(())
}

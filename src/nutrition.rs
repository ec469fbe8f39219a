//! Nutrition totals for a selection of menu items.

use std::collections::HashMap;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde_json::Value;

use crate::model::{
    DetailedMenu, DetailedMenuItem, NutrientFact, NutritionReport, NutritionTotals, Selections,
};
use crate::ordered::OrderedMap;

static AMOUNT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(-?\d+(?:\.\d+)?)([a-zA-Z]+)$").ok());

/// Split an amount like `"10g"`, `"70 mg"` or `"2MCG"` into a value and a
/// lowercase unit. Whitespace anywhere in the text is ignored.
pub fn parse_amount(text: &str) -> Option<(f64, String)> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let caps = AMOUNT.as_ref()?.captures(&compact)?;
    let value = caps[1].parse::<f64>().ok()?;
    Some((value, caps[2].to_string()))
}

/// Convert a mass to grams. Units without a mass conversion (IU, kcal, …)
/// return `None`.
pub fn to_grams(value: f64, unit: &str) -> Option<f64> {
    match unit.to_lowercase().as_str() {
        "g" => Some(value),
        "mg" => Some(value / 1000.0),
        "mcg" | "µg" | "ug" => Some(value / 1_000_000.0),
        _ => None,
    }
}

/// Render a gram total in the largest unit that keeps it at or above one:
/// grams to 2 places, milligrams to 1 place, else whole micrograms.
pub fn format_grams(grams: f64) -> String {
    if grams >= 1.0 {
        return format!("{}g", trim_decimal(&format!("{grams:.2}")));
    }
    let mg = grams * 1000.0;
    if mg >= 1.0 {
        return format!("{}mg", trim_decimal(&format!("{mg:.1}")));
    }
    format!("{}mcg", (grams * 1_000_000.0).round_ties_even() as i64)
}

fn trim_decimal(text: &str) -> &str {
    text.trim_end_matches('0').trim_end_matches('.')
}

/// Servings from a caller-supplied quantity. Absent, non-numeric and
/// non-positive quantities yield `None`.
pub fn coerce_quantity(value: &Value) -> Option<f64> {
    let quantity = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (quantity.is_finite() && quantity > 0.0).then_some(quantity)
}

/// Lowercased name to item; an item with fetched nutrition beats one without.
fn index_items(menu: &DetailedMenu) -> HashMap<String, &DetailedMenuItem> {
    let mut index: HashMap<String, &DetailedMenuItem> = HashMap::new();
    for item in menu.menu.values().flatten() {
        let key = item.item.name.trim().to_lowercase();
        let keep_existing = index
            .get(&key)
            .is_some_and(|existing| existing.has_nutrition() || !item.has_nutrition());
        if !keep_existing {
            index.insert(key, item);
        }
    }
    index
}

/// Total calories and nutrient mass for `selections` against `menu`.
///
/// Names match case-insensitively. Unknown names are listed in
/// `missing_items`; unusable quantities and nutrients in units without a
/// mass conversion are skipped. Nothing here fails.
pub fn aggregate(menu: &DetailedMenu, selections: &Selections) -> NutritionReport {
    let index = index_items(menu);

    let mut calories = 0.0;
    let mut grams: OrderedMap<f64> = OrderedMap::new();
    let mut items_aggregated = 0;
    let mut missing_items = Vec::new();

    for (raw_name, raw_quantity) in selections.iter() {
        let Some(quantity) = coerce_quantity(raw_quantity) else {
            debug!("Skipping '{}': unusable quantity {}", raw_name, raw_quantity);
            continue;
        };

        let Some(item) = index.get(&raw_name.trim().to_lowercase()) else {
            missing_items.push(raw_name.to_string());
            continue;
        };

        if let Some(label) = &item.nutrition {
            if let Some(kcal) = label.calories.as_ref().and_then(|c| c.as_f64()) {
                calories += kcal * quantity;
            }

            for (nutrient, fact) in label.nutrients.iter() {
                let Some((value, unit)) = parse_amount(&fact.amount) else {
                    continue;
                };
                let Some(value_g) = to_grams(value, &unit) else {
                    debug!("Skipping {} {} for '{}'", nutrient, fact.amount, raw_name);
                    continue;
                };
                *grams.get_or_insert_with(nutrient, || 0.0) += value_g * quantity;
            }
        }
        items_aggregated += 1;
    }

    let nutrition = grams
        .into_iter()
        .map(|(name, total)| {
            (
                name,
                NutrientFact {
                    amount: format_grams(total),
                    daily_value: None,
                },
            )
        })
        .collect();

    NutritionReport {
        metadata: menu.metadata.clone(),
        selections: selections.clone(),
        items_aggregated,
        missing_items,
        totals: NutritionTotals {
            calories: calories.round_ties_even() as i64,
            nutrition,
        },
    }
}

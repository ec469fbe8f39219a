//! Nutrient fact text parsing.
//!
//! Fact rows render the nutrient name and its quantity in one span with no
//! reliable separator: `Total Fat10g`, `<b>Total Fat&nbsp;</b>10g`,
//! `Total Fat 10g`, or indented `    Saturated Fat 3g`. Each known layout is
//! one entry in [`MATCHERS`]; entries are tried in order against the raw
//! markup and then against a markup-free variant, and the first hit wins.

use std::sync::LazyLock;

use html_escape::decode_html_entities;
use log::trace;
use regex::Regex;

use super::collapse_whitespace;
use crate::model::NutrientFact;
use crate::ordered::OrderedMap;

/// Display order of the standard label nutrients.
pub const CANONICAL_ORDER: [&str; 14] = [
    "Total Fat",
    "Saturated Fat",
    "Trans Fat",
    "Cholesterol",
    "Sodium",
    "Total Carbohydrate",
    "Dietary Fiber",
    "Total Sugars",
    "Added Sugars",
    "Protein",
    "Vitamin D",
    "Calcium",
    "Iron",
    "Potassium",
];

/// Names always superseded by a canonical counterpart.
const SUPERSEDED: [&str; 3] = ["Calories", "Fat", "Carbohydrates"];

/// A number immediately followed by an alphabetic unit: `10g`, `3.5mg`, `.5g`.
const AMOUNT: &str = r"(-?(?:\d+(?:\.\d*)?|\.\d+)[a-zA-Z]+)";

/// Ordered layouts. Name groups outside bold markers reject `<`/`>` so raw
/// markup is never captured as part of a name.
static MATCHERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("glued", format!(r"^([^<>]+?){AMOUNT}$")),
        (
            "bold-nbsp",
            format!(r"^(?i:<b>)([^<>]+?)(?:&nbsp;|\s)*(?i:</b>)\s*{AMOUNT}$"),
        ),
        ("bold", format!(r"^(?i:<b>)([^<>]+?)\s*(?i:</b>)\s*{AMOUNT}$")),
        ("spaced", format!(r"^([^<>]+?)\s+{AMOUNT}$")),
        ("indented", format!(r"^\s*([^<>]+?)\s+{AMOUNT}$")),
    ]
    .into_iter()
    .filter_map(|(label, pattern)| Regex::new(&pattern).ok().map(|re| (label, re)))
    .collect()
});

static MARKUP: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());

static PERCENTAGE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\d+%$").ok());

fn is_percentage(text: &str) -> bool {
    PERCENTAGE.as_ref().is_some_and(|re| re.is_match(text))
}

/// Tags removed, entities decoded, whitespace collapsed.
fn strip_markup(text: &str) -> String {
    let without_tags = match MARKUP.as_ref() {
        Some(re) => re.replace_all(text, " ").into_owned(),
        None => text.to_string(),
    };
    collapse_whitespace(&decode_html_entities(&without_tags))
}

/// Split a fact span's content into a canonical nutrient name and its amount.
///
/// Returns `None` for placeholders, bare percentages, sub-line annotations
/// ("Includes 2g Added Sugars") and text no layout recognises.
pub fn parse_nutrient_text(text: &str) -> Option<(String, String)> {
    let raw = text.trim();
    let stripped = strip_markup(raw);
    if stripped.is_empty() || is_percentage(&stripped) {
        return None;
    }

    for variant in [raw, stripped.as_str()] {
        for (label, re) in MATCHERS.iter() {
            let Some(caps) = re.captures(variant) else {
                continue;
            };
            let name = collapse_whitespace(&decode_html_entities(&caps[1]));
            let amount = caps[2].to_string();
            trace!("'{}' matched {} as ({}, {})", variant, label, name, amount);
            return normalize_nutrient_name(&name).map(|name| (name, amount));
        }
    }

    None
}

/// Map label spellings onto canonical names. `None` means the row is an
/// annotation rather than a nutrient.
pub fn normalize_nutrient_name(name: &str) -> Option<String> {
    let name = name.replace("Total Carbohydrate.", "Total Carbohydrate");
    let name = name.trim();
    let lower = name.to_lowercase();

    if name.is_empty() || lower.starts_with("includes") {
        return None;
    }

    let canonical = if lower.contains("trans") && lower.contains("fat") {
        "Trans Fat"
    } else if lower.contains("fatty acid") {
        "Trans Fat"
    } else if name == "Carbohydrates" {
        "Total Carbohydrate"
    } else if lower.contains("vitamin d") {
        "Vitamin D"
    } else {
        name
    };
    Some(canonical.to_string())
}

/// `13%` style daily values only.
pub(super) fn parse_daily_value(text: &str) -> Option<String> {
    let text = text.trim();
    is_percentage(text).then(|| text.to_string())
}

/// Reorder facts canonically, then the remaining names in first-seen order.
pub fn order_nutrients(facts: OrderedMap<NutrientFact>) -> OrderedMap<NutrientFact> {
    let mut ordered = OrderedMap::new();
    for name in CANONICAL_ORDER {
        if let Some(fact) = facts.get(name) {
            ordered.insert(name, fact.clone());
        }
    }
    for (name, fact) in facts {
        if !ordered.contains_key(&name) && !SUPERSEDED.contains(&name.as_str()) {
            ordered.insert(name, fact);
        }
    }
    ordered
}

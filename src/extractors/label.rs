use std::sync::LazyLock;

use log::debug;
use scraper::{ElementRef, Html, Selector};

use super::nutrient::{order_nutrients, parse_daily_value, parse_nutrient_text};
use super::{element_text, selector};
use crate::config::LabelConfig;
use crate::model::{Calories, NutrientFact, NutritionLabel};
use crate::ordered::OrderedMap;

static NAME: LazyLock<Selector> = LazyLock::new(|| selector("div.labelrecipe"));
static SERVING_SIZE: LazyLock<Selector> = LazyLock::new(|| selector("div.nutfactsservsize"));
static CALORIES: LazyLock<Selector> = LazyLock::new(|| selector("td.nutfactscaloriesval"));
static INGREDIENTS: LazyLock<Selector> =
    LazyLock::new(|| selector("span.labelingredientsvalue"));
static FACTS_TABLE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"table[border="1"][align="center"][width="1200"]"#));
static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static FACT_SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span.nutfactstopnutrient"));

/// Parses a single item's nutrition label page.
pub struct LabelExtractor {
    primary_rows: usize,
}

impl Default for LabelExtractor {
    fn default() -> Self {
        Self::new(&LabelConfig::default())
    }
}

impl LabelExtractor {
    pub fn new(config: &LabelConfig) -> Self {
        Self {
            primary_rows: config.primary_rows,
        }
    }

    /// Every field is extracted independently; missing elements leave the
    /// field empty instead of failing the label.
    pub fn extract(&self, document: &Html) -> NutritionLabel {
        let name = document
            .select(&NAME)
            .next()
            .map(element_text)
            .filter(|s| !s.is_empty());

        // The first serving-size element is static caption text
        let serving_size = document.select(&SERVING_SIZE).nth(1).map(element_text);

        let calories = document
            .select(&CALORIES)
            .next()
            .map(element_text)
            .filter(|s| !s.is_empty())
            .map(|s| Calories::parse(&s));

        let ingredients = document
            .select(&INGREDIENTS)
            .next()
            .map(|el| parse_ingredients(&element_text(el)))
            .unwrap_or_default();

        NutritionLabel {
            name,
            serving_size,
            calories,
            ingredients,
            nutrients: self.extract_nutrients(document),
        }
    }

    fn extract_nutrients(&self, document: &Html) -> OrderedMap<NutrientFact> {
        let mut facts = OrderedMap::new();

        let Some(table) = find_facts_table(document) else {
            debug!("No nutrition facts table found");
            return facts;
        };

        // Rows past the primary panel repeat the facts in a summary block
        // whose values disagree with the panel.
        for row in table_rows(table).into_iter().take(self.primary_rows) {
            for cell in row.select(&CELL) {
                if cell.select(&LIST_ITEM).next().is_some() {
                    continue;
                }

                let spans: Vec<ElementRef> = cell.select(&FACT_SPAN).collect();
                for pair in spans.chunks(2) {
                    let Some((name, amount)) = parse_nutrient_text(&pair[0].inner_html()) else {
                        continue;
                    };
                    if facts.contains_key(&name) {
                        continue;
                    }
                    let daily_value = pair
                        .get(1)
                        .and_then(|span| parse_daily_value(&element_text(*span)));
                    facts.insert(
                        name,
                        NutrientFact {
                            amount,
                            daily_value,
                        },
                    );
                }
            }
        }

        order_nutrients(facts)
    }
}

fn find_facts_table(document: &Html) -> Option<ElementRef<'_>> {
    document.select(&FACTS_TABLE).next().or_else(|| {
        document
            .select(&TABLE)
            .find(|table| table.select(&FACT_SPAN).next().is_some())
    })
}

/// Rows belonging to `table` itself, looking through an implicit `tbody`
/// but not into nested tables.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| el.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

/// Split an ingredient statement on commas outside parentheses.
///
/// `Sauce (tomato, basil), Salt` yields `["Sauce (tomato, basil)", "Salt"]`.
pub fn parse_ingredients(text: &str) -> Vec<String> {
    let mut ingredients = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                push_trimmed(&mut ingredients, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    push_trimmed(&mut ingredients, &current);

    ingredients
}

fn push_trimmed(ingredients: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        ingredients.push(text.to_string());
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ordered::OrderedMap;

/// Category name to items, in page order.
pub type Categories<T> = OrderedMap<Vec<T>>;

/// Raw item name to quantity exactly as the caller supplied it.
///
/// Quantities stay as JSON values so the report can echo them back
/// untouched; coercion happens during aggregation.
pub type Selections = OrderedMap<Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuMetadata {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub meal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Set when the detailed menu was truncated per category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    #[serde(default)]
    pub portion: String,
    /// Absolute locator of the item's nutrition label, empty when the row had none
    #[serde(default)]
    pub detail_url: String,
}

/// A parsed listing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuPage {
    pub metadata: MenuMetadata,
    pub menu: Categories<MenuItem>,
}

impl MenuPage {
    pub fn item_count(&self) -> usize {
        self.menu.values().map(Vec::len).sum()
    }
}

/// Calorie cell content: a whole number when it parses, otherwise the raw text.
/// Saved menus from other tools may carry fractional values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Calories {
    Count(i64),
    Number(f64),
    Raw(String),
}

impl Calories {
    pub fn parse(text: &str) -> Self {
        match text.trim().parse::<i64>() {
            Ok(n) => Calories::Count(n),
            Err(_) => Calories::Raw(text.to_string()),
        }
    }

    /// Numeric value, tolerating numeric-looking raw strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Calories::Count(n) => Some(*n as f64),
            Calories::Number(n) => Some(*n).filter(|v| v.is_finite()),
            Calories::Raw(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientFact {
    pub amount: String,
    #[serde(default)]
    pub daily_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionLabel {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub serving_size: Option<String>,
    #[serde(default)]
    pub calories: Option<Calories>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    /// Nutrient facts in canonical order
    #[serde(default, rename = "nutrition")]
    pub nutrients: OrderedMap<NutrientFact>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Success,
    Failed,
    NoUrl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedMenuItem {
    #[serde(flatten)]
    pub item: MenuItem,
    pub nutrition: Option<NutritionLabel>,
    #[serde(rename = "nutrition_fetch_status")]
    pub fetch_status: FetchStatus,
    #[serde(
        rename = "nutrition_error",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
}

impl DetailedMenuItem {
    pub fn has_nutrition(&self) -> bool {
        self.fetch_status == FetchStatus::Success && self.nutrition.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutritionFetchStats {
    pub total_items: usize,
    pub successful_fetches: usize,
    pub failed_fetches: usize,
    pub items_without_urls: usize,
}

impl NutritionFetchStats {
    /// Counts one finished item. Every item lands in exactly one bucket.
    pub fn record(&mut self, status: FetchStatus) {
        self.total_items += 1;
        match status {
            FetchStatus::Success => self.successful_fetches += 1,
            FetchStatus::Failed => self.failed_fetches += 1,
            FetchStatus::NoUrl => self.items_without_urls += 1,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_items == 0 {
            0.0
        } else {
            self.successful_fetches as f64 / self.total_items as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedMenu {
    pub metadata: MenuMetadata,
    pub menu: Categories<DetailedMenuItem>,
    pub nutrition_fetch_stats: NutritionFetchStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    pub calories: i64,
    pub nutrition: OrderedMap<NutrientFact>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionReport {
    pub metadata: MenuMetadata,
    pub selections: Selections,
    pub items_aggregated: usize,
    pub missing_items: Vec<String>,
    pub totals: NutritionTotals,
}

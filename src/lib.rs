//! Scrapes dining hall menu listings and per-item nutrition labels, and
//! totals nutrition for a selection of items.

pub mod builder;
pub mod config;
pub mod error;
pub mod extractors;
pub mod fetchers;
pub mod locator;
pub mod model;
pub mod nutrition;
pub mod ordered;
pub mod pipelines;

use std::fs;
use std::path::Path;

use log::info;
use serde::Serialize;

pub use builder::{MenuScraper, MenuScraperBuilder};
pub use config::{load_config, ScraperConfig};
pub use error::MenuError;
pub use fetchers::{Fetch, HttpFetcher};
pub use locator::{menu_url, Meal};
pub use model::{
    Calories, DetailedMenu, DetailedMenuItem, FetchStatus, MenuItem, MenuMetadata, MenuPage,
    NutrientFact, NutritionFetchStats, NutritionLabel, NutritionReport, NutritionTotals,
    Selections,
};
pub use nutrition::aggregate;
pub use ordered::OrderedMap;

/// Fetch a listing page with the default configuration.
pub fn fetch_menu(url: &str) -> Result<MenuPage, MenuError> {
    MenuScraper::builder().build()?.menu(url)
}

/// Fetch one nutrition label with the default configuration.
pub fn fetch_label(url: &str) -> Result<NutritionLabel, MenuError> {
    MenuScraper::builder().build()?.label(url)
}

/// Fetch a listing page and every item's nutrition label with the default
/// configuration.
pub fn fetch_detailed_menu(url: &str) -> Result<DetailedMenu, MenuError> {
    MenuScraper::builder().build()?.detailed_menu(url)
}

/// Write `value` as pretty-printed UTF-8 JSON.
pub fn save_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<(), MenuError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    info!("Saved {}", path.display());
    Ok(())
}

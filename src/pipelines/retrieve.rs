use log::debug;
use scraper::Html;

use crate::config::ScraperConfig;
use crate::error::MenuError;
use crate::extractors::{extract_metadata, LabelExtractor, MenuExtractor};
use crate::fetchers::{resolve_url, Fetch};
use crate::model::{MenuPage, NutritionLabel};

/// Fetch a listing page and extract its metadata and categories.
///
/// Only a failure to fetch the page is an error; a page without a
/// recognisable menu yields an empty `menu`.
pub fn retrieve_menu<F: Fetch>(
    fetcher: &F,
    config: &ScraperConfig,
    url: &str,
) -> Result<MenuPage, MenuError> {
    let html = fetcher.fetch(url, &config.base_url, config.fetch.menu_timeout())?;
    Ok(parse_menu_page(&html, url, &config.base_url))
}

/// Extract a listing page that has already been fetched.
pub fn parse_menu_page(html: &str, url: &str, base_url: &str) -> MenuPage {
    let document = Html::parse_document(html);
    let page = MenuPage {
        metadata: extract_metadata(&document, url),
        menu: MenuExtractor::new(base_url).extract(&document),
    };
    debug!(
        "Parsed {} categories, {} items from {}",
        page.menu.len(),
        page.item_count(),
        url
    );
    page
}

/// Fetch and extract one nutrition label. Relative locators are resolved
/// against the configured base origin.
pub fn retrieve_label<F: Fetch>(
    fetcher: &F,
    config: &ScraperConfig,
    url: &str,
) -> Result<NutritionLabel, MenuError> {
    let url = resolve_url(&config.base_url, url)?;
    let html = fetcher.fetch(&url, &config.base_url, config.fetch.label_timeout())?;
    Ok(parse_label_page(&html, config))
}

pub fn parse_label_page(html: &str, config: &ScraperConfig) -> NutritionLabel {
    LabelExtractor::new(&config.label).extract(&Html::parse_document(html))
}

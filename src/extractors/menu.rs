use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{collapse_whitespace, element_text, selector};
use crate::config::ScraperConfig;
use crate::fetchers::resolve_url;
use crate::model::{Categories, MenuItem, MenuMetadata};

static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static CATEGORY: LazyLock<Selector> = LazyLock::new(|| selector("div.longmenucolmenucat"));
static ITEM_NAME: LazyLock<Selector> = LazyLock::new(|| selector("div.longmenucoldispname"));
static PORTION: LazyLock<Selector> = LazyLock::new(|| selector("div.longmenucolportions"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static HEADER: LazyLock<Selector> = LazyLock::new(|| selector("div.longmenugridheader"));

static TITLE_DATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\w+day, \w+ \d+, \d{4})").ok());

/// What a single table row declares.
enum RowEvent {
    Category(String),
    Item(MenuItem),
    Ignored,
}

/// Row walker state. Items are only accepted under a heading.
enum ParseState {
    NoCategory,
    InCategory(String),
}

/// Parses a listing page into ordered categories of items.
pub struct MenuExtractor {
    base_url: String,
}

impl Default for MenuExtractor {
    fn default() -> Self {
        Self::new(ScraperConfig::default().base_url)
    }
}

impl MenuExtractor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn extract(&self, document: &Html) -> Categories<MenuItem> {
        let mut menu = Categories::new();

        let Some(table) = document
            .select(&TABLE)
            .find(|table| table.select(&CATEGORY).next().is_some())
        else {
            debug!("No menu table with category headings found");
            return menu;
        };

        let mut state = ParseState::NoCategory;
        for row in table.select(&ROW) {
            state = match (state, self.classify(row)) {
                (_, RowEvent::Category(name)) if name.is_empty() => ParseState::NoCategory,
                (_, RowEvent::Category(name)) => {
                    debug!("Category: {}", name);
                    menu.get_or_insert_with(&name, Vec::new);
                    ParseState::InCategory(name)
                }
                (ParseState::InCategory(category), RowEvent::Item(item)) => {
                    merge_item(menu.get_or_insert_with(&category, Vec::new), item);
                    ParseState::InCategory(category)
                }
                (ParseState::NoCategory, RowEvent::Item(item)) => {
                    debug!("Discarding '{}': no category heading yet", item.name);
                    ParseState::NoCategory
                }
                (state, RowEvent::Ignored) => state,
            };
        }

        menu
    }

    fn classify(&self, row: ElementRef) -> RowEvent {
        if let Some(heading) = row.select(&CATEGORY).next() {
            return RowEvent::Category(clean_category_name(&element_text(heading)));
        }

        let Some(cell) = row.select(&ITEM_NAME).next() else {
            return RowEvent::Ignored;
        };

        let link = cell.select(&LINK).next();
        let name = element_text(link.unwrap_or(cell));
        if name.is_empty() {
            return RowEvent::Ignored;
        }

        let portion = row
            .select(&PORTION)
            .next()
            .map(|el| collapse_whitespace(&element_text(el).replace("&nbsp;", " ")))
            .unwrap_or_default();

        let detail_url = link
            .and_then(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(|href| self.resolve(href))
            .unwrap_or_default();

        RowEvent::Item(MenuItem {
            name,
            portion,
            detail_url,
        })
    }

    fn resolve(&self, href: &str) -> String {
        match resolve_url(&self.base_url, href) {
            Ok(url) => url,
            Err(e) => {
                warn!("Keeping unresolvable detail reference '{}': {}", href, e);
                href.to_string()
            }
        }
    }
}

/// Keep the first row for a name, unless it lacks a portion and the
/// newcomer has one.
fn merge_item(items: &mut Vec<MenuItem>, item: MenuItem) {
    match items.iter_mut().find(|existing| existing.name == item.name) {
        None => items.push(item),
        Some(existing) if existing.portion.is_empty() && !item.portion.is_empty() => {
            debug!("Replacing '{}' with portion-bearing duplicate", item.name);
            *existing = item;
        }
        Some(_) => debug!("Dropping duplicate '{}'", item.name),
    }
}

/// Strip decorative dash and space runs from both ends of a heading.
pub fn clean_category_name(text: &str) -> String {
    text.trim_matches(|c: char| c == '-' || c.is_whitespace())
        .to_string()
}

/// Menu date, meal and location from the listing URL's query string, and
/// the title from the page header.
pub fn extract_metadata(document: &Html, url: &str) -> MenuMetadata {
    let mut metadata = MenuMetadata::default();

    if let Ok(parsed) = Url::parse(url) {
        for (key, value) in parsed.query_pairs() {
            let slot = match &*key {
                "dtdate" => &mut metadata.date,
                "mealName" => &mut metadata.meal,
                "locationName" => &mut metadata.location,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
    }

    if let Some(header) = document.select(&HEADER).next() {
        let title = element_text(header);
        if metadata.date.is_none() {
            metadata.date = TITLE_DATE
                .as_ref()
                .and_then(|re| re.captures(&title))
                .map(|caps| caps[1].to_string());
        }
        if !title.is_empty() {
            metadata.title = Some(title);
        }
    }

    metadata
}

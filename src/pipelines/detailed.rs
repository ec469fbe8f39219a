use std::thread::sleep;
use std::time::Duration;

use log::{debug, info, warn};

use super::retrieve::{retrieve_label, retrieve_menu};
use crate::config::ScraperConfig;
use crate::error::MenuError;
use crate::fetchers::Fetch;
use crate::model::{
    Categories, DetailedMenu, DetailedMenuItem, FetchStatus, MenuItem, MenuPage, NutritionLabel,
    NutritionFetchStats,
};

/// Fetch a listing page, then every item's nutrition label.
pub fn retrieve_detailed_menu<F: Fetch>(
    fetcher: &F,
    config: &ScraperConfig,
    url: &str,
) -> Result<DetailedMenu, MenuError> {
    info!("Fetching menu structure from {}", url);
    let page = retrieve_menu(fetcher, config, url)?;
    Ok(build_detailed_menu(fetcher, config, page))
}

/// Attach nutrition to every item of a parsed listing.
///
/// Items are processed one at a time in page order. A failed item is
/// recorded and the batch moves on; this never returns early.
pub fn build_detailed_menu<F: Fetch>(
    fetcher: &F,
    config: &ScraperConfig,
    page: MenuPage,
) -> DetailedMenu {
    let limit = config.detail.max_items_per_category;
    let mut metadata = page.metadata;
    if let Some(limit) = limit {
        metadata.note = Some(format!("Limited to {limit} items per category"));
    }

    let total: usize = page
        .menu
        .values()
        .map(|items| limit.map_or(items.len(), |l| items.len().min(l)))
        .sum();
    info!("Found {} menu items. Fetching nutrition details...", total);

    let mut stats = NutritionFetchStats::default();
    let mut menu = Categories::new();

    for (category, items) in page.menu {
        debug!("Processing category: {}", category);
        let mut detailed = Vec::with_capacity(items.len());

        for item in items.into_iter().take(limit.unwrap_or(usize::MAX)) {
            debug!("[{}/{}] {}", stats.total_items + 1, total, item.name);
            let detailed_item = detail_item(fetcher, config, item);
            stats.record(detailed_item.fetch_status);
            detailed.push(detailed_item);
        }

        menu.insert(category, detailed);
    }

    info!(
        "Nutrition fetch summary: total {}, successful {}, failed {}, without URL {}, success rate {:.1}%",
        stats.total_items,
        stats.successful_fetches,
        stats.failed_fetches,
        stats.items_without_urls,
        stats.success_rate() * 100.0
    );

    DetailedMenu {
        metadata,
        menu,
        nutrition_fetch_stats: stats,
    }
}

fn detail_item<F: Fetch>(fetcher: &F, config: &ScraperConfig, item: MenuItem) -> DetailedMenuItem {
    if item.detail_url.is_empty() {
        debug!("No nutrition URL for '{}'", item.name);
        return DetailedMenuItem {
            item,
            nutrition: None,
            fetch_status: FetchStatus::NoUrl,
            error: None,
        };
    }

    let result = fetch_label_with_retry(fetcher, config, &item.detail_url);

    let request_delay = Duration::from_millis(config.detail.request_delay_ms);
    if !request_delay.is_zero() {
        sleep(request_delay);
    }

    match result {
        Ok(label) => DetailedMenuItem {
            item,
            nutrition: Some(label),
            fetch_status: FetchStatus::Success,
            error: None,
        },
        Err(e) => {
            warn!("Failed to fetch nutrition for '{}': {}", item.name, e);
            DetailedMenuItem {
                item,
                nutrition: None,
                fetch_status: FetchStatus::Failed,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Retry a label fetch up to `detail.max_attempts` times with a fixed delay
/// between attempts. Errors that cannot improve on retry end the loop early.
fn fetch_label_with_retry<F: Fetch>(
    fetcher: &F,
    config: &ScraperConfig,
    url: &str,
) -> Result<NutritionLabel, MenuError> {
    let max_attempts = config.detail.max_attempts.max(1);
    let delay = Duration::from_millis(config.detail.retry_delay_ms);

    let mut attempt = 1;
    loop {
        match retrieve_label(fetcher, config, url) {
            Ok(label) => return Ok(label),
            Err(e) if attempt < max_attempts && e.is_retryable() => {
                warn!(
                    "Attempt {}/{} for {} failed: {}. Retrying in {:?}",
                    attempt, max_attempts, url, e, delay
                );
                sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MenuMetadata;
    use std::cell::RefCell;
    use std::collections::HashMap;

    const LABEL: &str = r#"
        <div class="labelrecipe">Item</div>
        <table><tr><td class="nutfactscaloriesval">100</td></tr></table>
        <table border="1" align="center" width="1200"><tr><td>
            <span class="nutfactstopnutrient">Protein 5g</span>
            <span class="nutfactstopnutrient">10%</span>
        </td></tr></table>"#;

    /// Answers from a script of responses per URL; the last entry repeats.
    #[derive(Default)]
    struct ScriptedFetcher {
        responses: HashMap<String, Vec<Result<String, u16>>>,
        calls: RefCell<HashMap<String, usize>>,
    }

    impl ScriptedFetcher {
        fn respond(mut self, url: &str, script: Vec<Result<&str, u16>>) -> Self {
            self.responses.insert(
                url.to_string(),
                script.into_iter().map(|r| r.map(String::from)).collect(),
            );
            self
        }

        fn calls(&self, url: &str) -> usize {
            self.calls.borrow().get(url).copied().unwrap_or(0)
        }
    }

    impl Fetch for ScriptedFetcher {
        fn fetch(&self, url: &str, _referer: &str, _timeout: Duration) -> Result<String, MenuError> {
            let mut calls = self.calls.borrow_mut();
            let n = calls.entry(url.to_string()).or_insert(0);
            *n += 1;

            let script = self
                .responses
                .get(url)
                .ok_or_else(|| MenuError::NotFound(url.to_string()))?;
            let idx = (*n - 1).min(script.len() - 1);
            match &script[idx] {
                Ok(body) => Ok(body.clone()),
                Err(status) => Err(MenuError::Status {
                    status: *status,
                    url: url.to_string(),
                }),
            }
        }
    }

    fn fast_config() -> ScraperConfig {
        let mut config = ScraperConfig::default();
        config.detail.retry_delay_ms = 0;
        config
    }

    fn item(name: &str, url: &str) -> MenuItem {
        MenuItem {
            name: name.to_string(),
            portion: "1 each".to_string(),
            detail_url: url.to_string(),
        }
    }

    fn page(categories: Vec<(&str, Vec<MenuItem>)>) -> MenuPage {
        MenuPage {
            metadata: MenuMetadata {
                date: Some("9/29/2025".to_string()),
                meal: Some("Breakfast Menu".to_string()),
                ..Default::default()
            },
            menu: categories.into_iter().collect(),
        }
    }

    fn assert_stats_consistent(stats: &NutritionFetchStats) {
        assert_eq!(
            stats.successful_fetches + stats.failed_fetches + stats.items_without_urls,
            stats.total_items
        );
    }

    #[test]
    fn test_mixed_outcomes() {
        let fetcher = ScriptedFetcher::default()
            .respond("https://a.test/ok", vec![Ok(LABEL)])
            .respond("https://a.test/down", vec![Err(500)]);
        let menu_page = page(vec![
            ("Entrees", vec![item("Eggs", "https://a.test/ok"), item("Toast", "")]),
            ("Sides", vec![item("Fruit", "https://a.test/down")]),
        ]);

        let detailed = build_detailed_menu(&fetcher, &fast_config(), menu_page);
        let stats = detailed.nutrition_fetch_stats;

        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.successful_fetches, 1);
        assert_eq!(stats.failed_fetches, 1);
        assert_eq!(stats.items_without_urls, 1);
        assert_stats_consistent(&stats);

        let entrees = detailed.menu.get("Entrees").unwrap();
        assert_eq!(entrees[0].fetch_status, FetchStatus::Success);
        assert_eq!(
            entrees[0].nutrition.as_ref().unwrap().nutrients.get("Protein").unwrap().amount,
            "5g"
        );
        assert_eq!(entrees[1].fetch_status, FetchStatus::NoUrl);
        assert!(entrees[1].error.is_none());

        let sides = detailed.menu.get("Sides").unwrap();
        assert_eq!(sides[0].fetch_status, FetchStatus::Failed);
        assert_eq!(
            sides[0].error.as_deref(),
            Some("HTTP 500 from https://a.test/down")
        );
        assert_eq!(fetcher.calls("https://a.test/down"), 3);
    }

    #[test]
    fn test_retry_recovers() {
        let fetcher = ScriptedFetcher::default()
            .respond("https://a.test/flaky", vec![Err(503), Ok(LABEL)]);
        let menu_page = page(vec![("Soups", vec![item("Chowder", "https://a.test/flaky")])]);

        let detailed = build_detailed_menu(&fetcher, &fast_config(), menu_page);

        assert_eq!(detailed.nutrition_fetch_stats.successful_fetches, 1);
        assert_eq!(fetcher.calls("https://a.test/flaky"), 2);
    }

    #[test]
    fn test_not_found_is_not_retried() {
        let fetcher = ScriptedFetcher::default();
        let menu_page = page(vec![("Soups", vec![item("Chowder", "https://a.test/gone")])]);

        let detailed = build_detailed_menu(&fetcher, &fast_config(), menu_page);

        assert_eq!(detailed.nutrition_fetch_stats.failed_fetches, 1);
        assert_eq!(fetcher.calls("https://a.test/gone"), 1);
    }

    #[test]
    fn test_attempt_bound_is_configurable() {
        let fetcher = ScriptedFetcher::default().respond("https://a.test/down", vec![Err(502)]);
        let mut config = fast_config();
        config.detail.max_attempts = 5;

        build_detailed_menu(
            &fetcher,
            &config,
            page(vec![("X", vec![item("Y", "https://a.test/down")])]),
        );
        assert_eq!(fetcher.calls("https://a.test/down"), 5);

        config.detail.max_attempts = 0;
        let fetcher = ScriptedFetcher::default().respond("https://a.test/down", vec![Err(502)]);
        build_detailed_menu(
            &fetcher,
            &config,
            page(vec![("X", vec![item("Y", "https://a.test/down")])]),
        );
        assert_eq!(fetcher.calls("https://a.test/down"), 1);
    }

    #[test]
    fn test_empty_menu() {
        let detailed = build_detailed_menu(&ScriptedFetcher::default(), &fast_config(), page(vec![]));
        assert_eq!(detailed.nutrition_fetch_stats, NutritionFetchStats::default());
        assert_eq!(detailed.nutrition_fetch_stats.success_rate(), 0.0);
        assert!(detailed.menu.is_empty());
        assert_eq!(detailed.metadata.date.as_deref(), Some("9/29/2025"));
    }

    #[test]
    fn test_items_per_category_limit() {
        let fetcher = ScriptedFetcher::default().respond("https://a.test/ok", vec![Ok(LABEL)]);
        let mut config = fast_config();
        config.detail.max_items_per_category = Some(1);
        let menu_page = page(vec![
            ("A", vec![item("One", "https://a.test/ok"), item("Two", "https://a.test/ok")]),
            ("B", vec![item("Three", ""), item("Four", "")]),
        ]);

        let detailed = build_detailed_menu(&fetcher, &config, menu_page);

        assert_eq!(detailed.menu.get("A").unwrap().len(), 1);
        assert_eq!(detailed.menu.get("B").unwrap().len(), 1);
        assert_eq!(detailed.nutrition_fetch_stats.total_items, 2);
        assert_eq!(fetcher.calls("https://a.test/ok"), 1);
        assert_eq!(
            detailed.metadata.note.as_deref(),
            Some("Limited to 1 items per category")
        );
        assert_stats_consistent(&detailed.nutrition_fetch_stats);
    }

    #[test]
    fn test_listing_failure_is_an_error() {
        let fetcher = ScriptedFetcher::default().respond("https://a.test/menu", vec![Err(500)]);
        let result = retrieve_detailed_menu(&fetcher, &fast_config(), "https://a.test/menu");
        assert!(matches!(result, Err(MenuError::Status { status: 500, .. })));
    }
}

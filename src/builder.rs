use std::time::Duration;

use chrono::NaiveDate;

use crate::config::ScraperConfig;
use crate::error::MenuError;
use crate::fetchers::{Fetch, HttpFetcher};
use crate::locator::{listing_url, Meal};
use crate::model::{DetailedMenu, MenuPage, NutritionLabel};
use crate::pipelines::{build_detailed_menu, retrieve_detailed_menu, retrieve_label, retrieve_menu};

/// Scrapes listing and nutrition label pages with one configuration and
/// one transport.
///
/// # Example
/// ```no_run
/// use foodpro_nutrition::MenuScraper;
///
/// # fn main() -> Result<(), foodpro_nutrition::MenuError> {
/// let scraper = MenuScraper::builder().request_delay(std::time::Duration::from_millis(250)).build()?;
/// let menu = scraper.detailed_menu("https://www.foodpro.huds.harvard.edu/foodpro/longmenucopy.aspx?dtdate=9%2f29%2f2025&mealName=Lunch+Menu")?;
/// println!("{} items", menu.nutrition_fetch_stats.total_items);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MenuScraper<F = HttpFetcher> {
    config: ScraperConfig,
    fetcher: F,
}

impl MenuScraper {
    pub fn builder() -> MenuScraperBuilder {
        MenuScraperBuilder::default()
    }

    /// HTTP scraper for an already loaded configuration.
    pub fn from_config(config: ScraperConfig) -> Result<Self, MenuError> {
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Ok(Self { config, fetcher })
    }
}

impl<F: Fetch> MenuScraper<F> {
    /// Scraper over a caller-supplied transport.
    pub fn with_fetcher(config: ScraperConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Listing locator for `date` and `meal` on the configured origin.
    pub fn menu_url(&self, date: NaiveDate, meal: Meal) -> String {
        listing_url(&self.config.base_url, date, meal)
    }

    pub fn menu(&self, url: &str) -> Result<MenuPage, MenuError> {
        retrieve_menu(&self.fetcher, &self.config, url)
    }

    pub fn label(&self, url: &str) -> Result<NutritionLabel, MenuError> {
        retrieve_label(&self.fetcher, &self.config, url)
    }

    /// Listing page plus every item's nutrition label.
    pub fn detailed_menu(&self, url: &str) -> Result<DetailedMenu, MenuError> {
        retrieve_detailed_menu(&self.fetcher, &self.config, url)
    }

    /// Same as [`detailed_menu`](Self::detailed_menu) for a listing that
    /// was fetched or parsed elsewhere.
    pub fn build_detailed(&self, page: MenuPage) -> DetailedMenu {
        build_detailed_menu(&self.fetcher, &self.config, page)
    }
}

/// Builder for [`MenuScraper`]. Unset options keep the value from the
/// base configuration (defaults unless [`config`](Self::config) is given).
#[derive(Debug, Default)]
pub struct MenuScraperBuilder {
    config: Option<ScraperConfig>,
    base_url: Option<String>,
    user_agent: Option<String>,
    menu_timeout: Option<Duration>,
    label_timeout: Option<Duration>,
    max_attempts: Option<u32>,
    retry_delay: Option<Duration>,
    request_delay: Option<Duration>,
    max_items_per_category: Option<usize>,
}

impl MenuScraperBuilder {
    /// Start from a loaded configuration instead of the defaults
    ///
    /// # Example
    /// ```no_run
    /// use foodpro_nutrition::{load_config, MenuScraper};
    ///
    /// # fn main() -> Result<(), foodpro_nutrition::MenuError> {
    /// let scraper = MenuScraper::builder().config(load_config()?).build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn config(mut self, config: ScraperConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Origin that relative detail references resolve against
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn menu_timeout(mut self, timeout: Duration) -> Self {
        self.menu_timeout = Some(timeout);
        self
    }

    pub fn label_timeout(mut self, timeout: Duration) -> Self {
        self.label_timeout = Some(timeout);
        self
    }

    /// Attempts per nutrition label, at least one is always made
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Pause after every detail request
    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = Some(delay);
        self
    }

    /// Only fetch nutrition for the first `limit` items of each category
    pub fn max_items_per_category(mut self, limit: usize) -> Self {
        self.max_items_per_category = Some(limit);
        self
    }

    /// Merged configuration without constructing a client.
    pub fn into_config(self) -> ScraperConfig {
        let mut config = self.config.unwrap_or_default();

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(user_agent) = self.user_agent {
            config.fetch.user_agent = user_agent;
        }
        if let Some(timeout) = self.menu_timeout {
            config.fetch.menu_timeout_ms = millis(timeout);
        }
        if let Some(timeout) = self.label_timeout {
            config.fetch.label_timeout_ms = millis(timeout);
        }
        if let Some(attempts) = self.max_attempts {
            config.detail.max_attempts = attempts;
        }
        if let Some(delay) = self.retry_delay {
            config.detail.retry_delay_ms = millis(delay);
        }
        if let Some(delay) = self.request_delay {
            config.detail.request_delay_ms = millis(delay);
        }
        if let Some(limit) = self.max_items_per_category {
            config.detail.max_items_per_category = Some(limit);
        }

        config
    }

    /// Build the HTTP client and return the scraper
    ///
    /// # Errors
    /// Returns `MenuError::HeaderError` if the client identity is not a
    /// valid header value, or `MenuError::Network` if the client cannot be
    /// constructed.
    pub fn build(self) -> Result<MenuScraper, MenuError> {
        MenuScraper::from_config(self.into_config())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticFetcher(&'static str);

    impl Fetch for StaticFetcher {
        fn fetch(&self, _url: &str, _referer: &str, _timeout: Duration) -> Result<String, MenuError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_builder_overrides() {
        let config = MenuScraper::builder()
            .base_url("http://127.0.0.1:8080/foodpro/")
            .user_agent("test-agent")
            .menu_timeout(Duration::from_secs(5))
            .label_timeout(Duration::from_secs(7))
            .max_attempts(1)
            .retry_delay(Duration::from_millis(10))
            .request_delay(Duration::from_millis(20))
            .max_items_per_category(2)
            .into_config();

        assert_eq!(config.base_url, "http://127.0.0.1:8080/foodpro/");
        assert_eq!(config.fetch.user_agent, "test-agent");
        assert_eq!(config.fetch.menu_timeout(), Duration::from_secs(5));
        assert_eq!(config.fetch.label_timeout(), Duration::from_secs(7));
        assert_eq!(config.detail.max_attempts, 1);
        assert_eq!(config.detail.retry_delay_ms, 10);
        assert_eq!(config.detail.request_delay_ms, 20);
        assert_eq!(config.detail.max_items_per_category, Some(2));
    }

    #[test]
    fn test_sub_second_durations_kept() {
        let config = MenuScraper::builder()
            .menu_timeout(Duration::from_millis(500))
            .label_timeout(Duration::from_millis(1500))
            .retry_delay(Duration::from_micros(2500))
            .request_delay(Duration::MAX)
            .into_config();

        assert_eq!(config.fetch.menu_timeout(), Duration::from_millis(500));
        assert_eq!(config.fetch.label_timeout(), Duration::from_millis(1500));
        assert_eq!(config.detail.retry_delay_ms, 2);
        assert_eq!(config.detail.request_delay_ms, u64::MAX);
    }

    #[test]
    fn test_sub_second_timeout_fetches() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/menu")
            .with_status(200)
            .with_body("<html></html>")
            .create();

        let scraper = MenuScraper::builder()
            .menu_timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        let page = scraper.menu(&format!("{}/menu", server.url())).unwrap();

        mock.assert();
        assert!(page.menu.is_empty());
    }

    #[test]
    fn test_builder_keeps_base_config() {
        let mut base = ScraperConfig::default();
        base.detail.max_attempts = 9;
        base.label.primary_rows = 4;

        let config = MenuScraper::builder()
            .config(base)
            .request_delay(Duration::from_millis(1))
            .into_config();

        assert_eq!(config.detail.max_attempts, 9);
        assert_eq!(config.label.primary_rows, 4);
        assert_eq!(config.detail.request_delay_ms, 1);
        assert_eq!(config.fetch.menu_timeout_ms, 15_000);
    }

    #[test]
    fn test_builder_rejects_bad_user_agent() {
        let result = MenuScraper::builder().user_agent("bad\nagent").build();
        assert!(matches!(result, Err(MenuError::HeaderError(_))));
    }

    #[test]
    fn test_with_fetcher() {
        let scraper = MenuScraper::with_fetcher(
            ScraperConfig::default(),
            StaticFetcher(r#"<div class="labelrecipe">Bagel</div>"#),
        );

        let label = scraper.label("label.aspx?RecNumAndPort=1").unwrap();
        assert_eq!(label.name.as_deref(), Some("Bagel"));

        let date = NaiveDate::from_ymd_opt(2025, 9, 29).unwrap();
        assert!(scraper
            .menu_url(date, Meal::Lunch)
            .starts_with("https://www.foodpro.huds.harvard.edu/foodpro/longmenucopy.aspx?"));
    }
}

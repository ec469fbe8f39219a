use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Main scraper configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ScraperConfig {
    /// Origin that relative detail references are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// HTTP client identity and timeouts
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Per-item nutrition retrieval behaviour
    #[serde(default)]
    pub detail: DetailConfig,
    /// Nutrition label parsing
    #[serde(default)]
    pub label: LabelConfig,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            fetch: FetchConfig::default(),
            detail: DetailConfig::default(),
            label: LabelConfig::default(),
        }
    }
}

/// Client identity sent with every request
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept")]
    pub accept: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    /// Timeout for listing pages, in milliseconds
    #[serde(default = "default_menu_timeout_ms")]
    pub menu_timeout_ms: u64,
    /// Timeout for nutrition label pages, in milliseconds
    #[serde(default = "default_label_timeout_ms")]
    pub label_timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept: default_accept(),
            accept_language: default_accept_language(),
            menu_timeout_ms: default_menu_timeout_ms(),
            label_timeout_ms: default_label_timeout_ms(),
        }
    }
}

impl FetchConfig {
    pub fn menu_timeout(&self) -> Duration {
        Duration::from_millis(self.menu_timeout_ms)
    }

    pub fn label_timeout(&self) -> Duration {
        Duration::from_millis(self.label_timeout_ms)
    }
}

/// Configuration for the per-item nutrition pass
#[derive(Debug, Deserialize, Clone)]
pub struct DetailConfig {
    /// Attempts per nutrition label before the item is marked failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts for the same item, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Delay after each item that had a detail reference, in milliseconds
    #[serde(default)]
    pub request_delay_ms: u64,
    /// Only fetch the first N items of every category
    #[serde(default)]
    pub max_items_per_category: Option<usize>,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_delay_ms: 0,
            max_items_per_category: None,
        }
    }
}

/// Configuration for nutrition label extraction
#[derive(Debug, Deserialize, Clone)]
pub struct LabelConfig {
    /// Leading rows of the facts table that form the primary panel;
    /// rows after this belong to the summary block
    #[serde(default = "default_primary_rows")]
    pub primary_rows: usize,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            primary_rows: default_primary_rows(),
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://www.foodpro.huds.harvard.edu/foodpro/".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36".to_string()
}

fn default_accept() -> String {
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
        .to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_menu_timeout_ms() -> u64 {
    15_000
}

fn default_label_timeout_ms() -> u64 {
    20_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_primary_rows() -> usize {
    10
}

impl ScraperConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with FOODPRO__ prefix
    /// 2. foodpro.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: FOODPRO__DETAIL__MAX_ATTEMPTS
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from file and environment variables
///
/// See [`ScraperConfig::load`] for the source priority.
pub fn load_config() -> Result<ScraperConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("foodpro").required(false))
        // Use double underscore for nested: FOODPRO__FETCH__USER_AGENT
        .add_source(
            Environment::with_prefix("FOODPRO")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

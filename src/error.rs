use thiserror::Error;

/// Errors that can occur while retrieving menu and nutrition pages
#[derive(Error, Debug)]
pub enum MenuError {
    /// Transport failure: DNS, connect, timeout or body read
    #[error("Failed to fetch URL: {0}")]
    Network(#[from] reqwest::Error),

    /// The origin answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The origin has no page at this locator
    #[error("Page not found: {0}")]
    NotFound(String),

    /// Input did not have the expected shape
    #[error("Failed to parse input: {0}")]
    Parse(String),

    /// A locator could not be resolved against the base origin
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Meal name outside breakfast/lunch/dinner
    #[error("Unknown meal '{0}', expected Breakfast, Lunch or Dinner")]
    UnknownMeal(String),

    /// Error parsing HTTP headers
    #[error("Header parse error: {0}")]
    HeaderError(#[from] reqwest::header::InvalidHeaderValue),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MenuError {
    /// Whether another attempt at the same request could succeed.
    /// 404 is reported as `NotFound` and never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MenuError::Network(_) | MenuError::Status { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_retryable() {
        let server_error = MenuError::Status {
            status: 503,
            url: "https://example.com".to_string(),
        };
        assert!(server_error.is_retryable());
        assert!(!MenuError::NotFound("x".to_string()).is_retryable());
        assert!(!MenuError::Parse("no table".to_string()).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = MenuError::Status {
            status: 500,
            url: "https://example.com/label".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500 from https://example.com/label");
        assert_eq!(
            MenuError::UnknownMeal("brunch".to_string()).to_string(),
            "Unknown meal 'brunch', expected Breakfast, Lunch or Dinner"
        );
    }
}

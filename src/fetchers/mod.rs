use std::time::Duration;

use url::Url;

use crate::error::MenuError;

mod request;

pub use request::HttpFetcher;

/// Retrieves raw page content.
///
/// Implemented by [`HttpFetcher`] for the real origin; tests substitute
/// in-memory transports.
pub trait Fetch {
    fn fetch(&self, url: &str, referer: &str, timeout: Duration) -> Result<String, MenuError>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn fetch(&self, url: &str, referer: &str, timeout: Duration) -> Result<String, MenuError> {
        (**self).fetch(url, referer, timeout)
    }
}

/// Resolve a possibly relative locator against the base origin.
///
/// Absolute `http(s)` locators are returned unchanged.
pub fn resolve_url(base: &str, reference: &str) -> Result<String, MenuError> {
    let reference = reference.trim();
    let lower = reference.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Ok(reference.to_string());
    }
    let base = Url::parse(base)?;
    Ok(base.join(reference)?.to_string())
}

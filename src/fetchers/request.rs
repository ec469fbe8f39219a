use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;

use super::Fetch;
use crate::config::FetchConfig;
use crate::error::MenuError;

/// Blocking HTTP fetcher with a persistent, browser-like client identity.
///
/// The underlying client keeps its connection pool between requests, so
/// one instance should serve a whole batch.
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, MenuError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_str(&config.accept)?);
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)?,
        );
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

        let client = Client::builder()
            .default_headers(headers)
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.label_timeout().max(config.menu_timeout()))
            .build()?;

        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, referer: &str, timeout: Duration) -> Result<String, MenuError> {
        debug!("GET {} (timeout {:?})", url, timeout);

        let response = self
            .client
            .get(url)
            .header(REFERER, referer)
            .timeout(timeout)
            .send()?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(MenuError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(MenuError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text()?)
    }
}

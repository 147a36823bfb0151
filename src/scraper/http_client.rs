use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use tracing::debug;

use crate::config::ScraperConfig;
use crate::error::ScrapeError;

/// Thin reqwest wrapper with browser-like headers.
///
/// Many municipal listing sites serve 403 to default client user-agents, so
/// the UA and Accept-Language mimic a desktop browser. No retry here: a
/// failed fetch fails the whole target for this run, and the politeness
/// delay lives in the pipeline, between targets.
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        if let Ok(lang) = HeaderValue::from_str(&config.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, lang);
        }

        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()
            .map_err(|e| ScrapeError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { inner })
    }

    /// Fetch a URL as HTML text. Non-2xx is a transport error carrying the
    /// status code; so is a network failure or timeout.
    pub async fn get_text(&self, url: &str) -> Result<String, ScrapeError> {
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|source| ScrapeError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|source| ScrapeError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

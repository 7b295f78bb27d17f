use crate::cache::PageCache;
use crate::crawler::PageFetcher;
use crate::parser::ParseError;

use reqwest::Client;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Page cache error: {0}")]
    CacheError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error("Page not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    cache: Option<PageCache>,
}

impl WebScraper {
    pub fn new(cache: Option<PageCache>) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self { client, cache })
    }

    pub fn cached(cache_dir: &str) -> Result<Self, ScraperError> {
        let cache = PageCache::new(cache_dir)
            .inspect_err(|e| log::error!("Cannot create cache directory {}: {e:?}", cache_dir))?;
        Self::new(Some(cache))
    }

    pub async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        if let Some(body) = self.lookup(url) {
            log::debug!("Cache hit: {}", url);
            return Ok(body);
        }

        log::debug!("Fetching {}", url);
        let html = self.get_html(url).await?;
        if html.trim().is_empty() {
            return Err(ScraperError::NotFound(url.to_string()));
        }
        Ok(self.remember(url, html))
    }

    // cache failures degrade to a network fetch, never to a failed fetch
    fn lookup(&self, url: &str) -> Option<String> {
        self.cache.as_ref()?.get(url).unwrap_or_else(|e| {
            log::warn!("Unreadable cache entry for {}, refetching: {}", url, e);
            None
        })
    }

    fn remember(&self, url: &str, html: String) -> String {
        if let Some(cache) = &self.cache
            && let Err(e) = cache.put(url, &html)
        {
            log::warn!("Cannot cache {}: {}", url, e);
        }
        html
    }

    async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}

impl PageFetcher for WebScraper {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        WebScraper::fetch(self, url).await
    }
}

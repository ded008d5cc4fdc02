// src/fetch/mod.rs
// =============================================================================
// Page fetching.
//
// The crawl engine doesn't talk to reqwest directly. It only knows about the
// Fetcher trait: "give me the body of this URL, or tell me what went wrong".
// That keeps the engine testable with a fake fetcher and lets callers plug in
// their own client.
//
// Submodules:
// - http: the real Fetcher, built on a shared reqwest::Client
//
// Rust concepts:
// - Traits: an interface the engine is generic over
// - async-trait: async methods in a trait whose futures can cross threads
// =============================================================================

mod http;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CrawlConfig;
use crate::error::{ConfigError, FetchError};

pub use http::{is_html_content_type, HttpFetcher, HTML_CONTENT_TYPES};

/// Per-request options the engine passes on every fetch.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub timeout: Duration,
}

impl RequestOptions {
    /// Builds the request headers (User-Agent) and timeout from the config
    pub fn from_config(config: &CrawlConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| ConfigError::InvalidUserAgent(config.user_agent.clone()))?;
        headers.insert(USER_AGENT, agent);

        Ok(Self {
            headers,
            timeout: config.timeout,
        })
    }
}

/// A downloaded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Where the body actually came from, after any redirects
    pub url: String,
    pub body: String,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }
}

/// Something that can download a page.
///
/// Implementations must classify failures into [`FetchError`] kinds; the
/// engine retries only the transient ones. Relative links on the page are
/// resolved against [`FetchedPage::url`], so redirects must be reflected there.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &str, options: &RequestOptions) -> Result<FetchedPage, FetchError>;
}

// Lets a caller keep a handle on the fetcher it gave to a crawl
#[async_trait]
impl<F: Fetcher> Fetcher for Arc<F> {
    async fn fetch(&self, url: &str, options: &RequestOptions) -> Result<FetchedPage, FetchError> {
        (**self).fetch(url, options).await
    }
}

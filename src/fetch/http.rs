// src/fetch/http.rs
// =============================================================================
// This module downloads pages over HTTP and classifies every failure.
//
// Key functionality:
// - One shared reqwest::Client for the whole crawl (connection pooling)
// - Follows a limited number of redirects
// - Only accepts HTML responses
// - Maps reqwest errors and status codes onto FetchError kinds
//
// HTTP status codes:
// - 200-399: fine, keep going (redirects are already followed by reqwest)
// - 400-499: ClientError, the page is broken and retrying won't help
// - 500-599: ServerError, the server may recover, so the worker retries
// =============================================================================

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client};
use tracing::debug;

use super::{FetchedPage, Fetcher, RequestOptions};
use crate::error::FetchError;

/// Content types we are willing to parse for links.
pub const HTML_CONTENT_TYPES: &[&str] = &[
    "text/html",
    "text/xhtml",
    "application/xhtml+xml",
    "application/xhtml",
    "application/html",
];

// Servers that send no Content-Type at all get treated as raw bytes
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// The production fetcher: a thin wrapper around a pooled reqwest client.
///
/// Cloning is cheap and every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a client that follows at most `max_redirects` redirects and
    /// keeps up to `pool_size` idle connections per host.
    ///
    /// `pool_size` should be at least the crawl concurrency so workers don't
    /// queue up again inside the client.
    pub fn new(max_redirects: usize, pool_size: usize) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(redirect::Policy::limited(max_redirects))
            .pool_max_idle_per_host(pool_size)
            .build()?;

        Ok(Self { client })
    }

    /// Wraps an existing client (for callers who need custom TLS, proxies...)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, options: &RequestOptions) -> Result<FetchedPage, FetchError> {
        debug!(url, "fetching");

        let response = self
            .client
            .get(url)
            .headers(options.headers.clone())
            .timeout(options.timeout)
            .send()
            .await
            .map_err(categorize_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(FetchError::ServerError(status.as_u16()));
        }
        if status.is_client_error() {
            return Err(FetchError::ClientError(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(mime_essence)
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        if !is_html_content_type(&content_type) {
            return Err(FetchError::InvalidContentType(content_type));
        }

        // text() consumes the response, so grab the post-redirect URL first
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(categorize_error)?;

        Ok(FetchedPage::new(final_url, body))
    }
}

/// True if the media type (without parameters) is one we parse.
pub fn is_html_content_type(content_type: &str) -> bool {
    HTML_CONTENT_TYPES.contains(&mime_essence(content_type).as_str())
}

// "Text/HTML; charset=utf-8" -> "text/html"
fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

// Categorizes reqwest errors into FetchError kinds
//
// Order matters: a timeout while reading the body is still a timeout,
// so the timeout check comes before the body check.
fn categorize_error(error: reqwest::Error) -> FetchError {
    if error.is_redirect() {
        FetchError::TooManyRedirects
    } else if error.is_timeout() {
        FetchError::ConnectionError("request timed out".to_string())
    } else if error.is_connect() {
        FetchError::ConnectionError(error.to_string())
    } else if error.is_body() || error.is_decode() {
        FetchError::PayloadError(error.to_string())
    } else if error.is_request() {
        FetchError::ConnectionError(error.to_string())
    } else {
        FetchError::Other(error.to_string())
    }
}

// src/error.rs
// =============================================================================
// Error types for the crawler library.
//
// There are two very different kinds of errors here:
// - FetchError: something went wrong with ONE page. The crawl keeps going.
// - CrawlError: something went wrong with the crawl itself (bad seed URL,
//   could not build the HTTP client). The crawl never starts.
//
// Rust concepts:
// - thiserror: derive macro that implements std::error::Error for us
// - Closed enums: the worker must `match` every FetchError variant, so adding
//   a new kind of failure is a compile error until the worker handles it
// =============================================================================

use thiserror::Error;

/// Why a single page fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a 5xx status
    #[error("server error: HTTP {0}")]
    ServerError(u16),

    /// The server answered with a 4xx status
    #[error("client error: HTTP {0}")]
    ClientError(u16),

    /// Could not connect, connection reset, or the request timed out
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// Redirect chain was longer than the configured limit
    #[error("too many redirects")]
    TooManyRedirects,

    /// The body could not be read or decoded
    #[error("payload error: {0}")]
    PayloadError(String),

    /// The response is not an HTML document (holds the content type we got)
    #[error("invalid content type: {0}")]
    InvalidContentType(String),

    /// Anything we could not classify
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Transient failures are worth retrying right away.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::ServerError(_) | FetchError::ConnectionError(_))
    }
}

/// Errors from the task queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("task queue is closed")]
    QueueClosed,

    #[error("mark_done called more times than tasks were enqueued")]
    TooManyDone,
}

/// Invalid crawl configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid seed URL '{url}': {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("user agent is not a valid header value: {0}")]
    InvalidUserAgent(String),
}

/// Errors that stop a crawl from running at all.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

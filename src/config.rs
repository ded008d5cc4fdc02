// src/config.rs
// =============================================================================
// Crawl configuration.
//
// Every knob of a crawl lives in one CrawlConfig value:
// - seed_url: where to start (required)
// - max_depth: pages at depth >= max_depth are never fetched
// - concurrency: number of workers AND capacity of the task queue
// - max_retries: how many times a transient failure is retried
// - user_agent / timeout / max_redirects: passed down to the fetcher
//
// Defaults match what a small site needs: depth 1 (just the seed page),
// 100 workers, 2 retries.
// =============================================================================

use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_MAX_DEPTH: usize = 1;
pub const DEFAULT_CONCURRENCY: usize = 100;
pub const DEFAULT_MAX_RETRIES: usize = 2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_USER_AGENT: &str = concat!("sitemap-crawler/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub seed_url: String,
    pub max_depth: usize,
    pub concurrency: usize,
    pub max_retries: usize,
    pub user_agent: String,
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl CrawlConfig {
    /// Creates a config with default settings for the given seed URL
    pub fn new(seed_url: impl Into<String>) -> Self {
        Self {
            seed_url: seed_url.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Checks the config and returns the parsed seed URL.
    ///
    /// Only http and https seeds with a host are accepted, since the
    /// crawl is restricted to the seed's origin.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let seed = Url::parse(&self.seed_url).map_err(|e| ConfigError::InvalidSeed {
            url: self.seed_url.clone(),
            reason: e.to_string(),
        })?;

        if seed.scheme() != "http" && seed.scheme() != "https" {
            return Err(ConfigError::InvalidSeed {
                url: self.seed_url.clone(),
                reason: format!("unsupported scheme '{}'", seed.scheme()),
            });
        }

        if seed.host_str().is_none() {
            return Err(ConfigError::InvalidSeed {
                url: self.seed_url.clone(),
                reason: "URL has no host".to_string(),
            });
        }

        Ok(seed)
    }
}

// src/lib.rs
// =============================================================================
// sitemap-crawler: a concurrent, depth-bounded, single-site crawler.
//
// Modules:
// - config: CrawlConfig and its defaults
// - error: FetchError and the other error types
// - fetch: the Fetcher trait and the reqwest-based HttpFetcher
// - links: same-origin link extraction from HTML
// - crawl: the engine (queue, frontier, workers, controller)
//
// Quick start:
//
//     let sitemap = sitemap_crawler::crawl("https://example.com", 2, 100, 2).await?;
// =============================================================================

pub mod config;
pub mod crawl;
pub mod error;
pub mod fetch;
pub mod links;

pub use config::CrawlConfig;
pub use crawl::{crawl, CrawlReport, Crawler, SitemapEntry};
pub use error::{CrawlError, FetchError};

// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Both subcommands run the same crawl; they only differ in what they print.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use sitemap_crawler::config::{
    CrawlConfig, DEFAULT_CONCURRENCY, DEFAULT_MAX_DEPTH, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT,
};

#[derive(Parser, Debug)]
#[command(
    name = "sitemap-crawler",
    version,
    about = "Crawl a website and map every page reachable from a start URL",
    long_about = "sitemap-crawler walks a single website breadth-first from a start URL, \
                  using a pool of concurrent workers, and prints which pages link to which."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logs (same as RUST_LOG=debug)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every crawled page with the same-site links it contains
    ///
    /// Example: sitemap-crawler sitemap https://example.com --max-depth 2
    Sitemap(CrawlArgs),

    /// Print the sorted list of every same-site URL that was discovered
    ///
    /// Example: sitemap-crawler urls https://example.com --max-depth 3
    Urls(CrawlArgs),
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Website URL to start from (e.g., https://example.com)
    pub url: String,

    /// Maximum crawl depth
    ///
    /// Depth 1 = just the starting page
    /// Depth 2 = starting page + all pages it links to
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Number of concurrent workers (also the task queue size)
    #[arg(long, short = 'c', default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// How many times to retry a page after a 5xx or connection error
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: usize,

    /// User-Agent header sent with every request
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Output results in JSON format instead of a table
    #[arg(long)]
    pub json: bool,
}

impl CrawlArgs {
    pub fn to_config(&self) -> CrawlConfig {
        CrawlConfig::new(&self.url)
            .with_max_depth(self.max_depth)
            .with_concurrency(self.concurrency)
            .with_max_retries(self.max_retries)
            .with_user_agent(&self.user_agent)
            .with_timeout(Duration::from_secs(self.timeout))
    }
}

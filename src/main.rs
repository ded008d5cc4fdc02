// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing) on stderr
// 3. Run the crawl
// 4. Print the sitemap or the URL list
// 5. Exit with proper code (0 = success, 1 = seed page failed, 2 = error)
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeSet;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, CrawlArgs};
use sitemap_crawler::crawl::{CrawlFailure, CrawlReport, Crawler, SitemapEntry};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so `--json` output on stdout stays parseable.
// RUST_LOG wins over --verbose when both are set.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Returns:
//   Ok(0) = the seed page was crawled
//   Ok(1) = not even the seed page could be crawled
//   Err = invalid arguments or client setup failure
async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Sitemap(args) => {
            let report = crawl_site(&args).await?;
            print_sitemap(&report, args.json)?;
            Ok(exit_code(&report))
        }
        Commands::Urls(args) => {
            let report = crawl_site(&args).await?;
            print_urls(&report, args.json)?;
            Ok(exit_code(&report))
        }
    }
}

async fn crawl_site(args: &CrawlArgs) -> Result<CrawlReport<SitemapEntry>> {
    println!("🔍 Crawling website: {}", args.url);
    println!("📊 Max depth: {}, workers: {}", args.max_depth, args.concurrency);

    let crawler = Crawler::new(args.to_config()).context("could not set up the crawler")?;
    let report = crawler
        .run()
        .await
        .with_context(|| format!("crawl of {} failed", args.url))?;

    println!(
        "📄 Crawled {} page(s) in {:.1}s\n",
        report.stats.pages_crawled,
        report.stats.elapsed.as_secs_f64()
    );
    Ok(report)
}

fn exit_code(report: &CrawlReport<SitemapEntry>) -> i32 {
    if report.is_empty() {
        1
    } else {
        0
    }
}

fn print_sitemap(report: &CrawlReport<SitemapEntry>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let mut entries: Vec<&SitemapEntry> = report.results.iter().collect();
    entries.sort_by(|a, b| a.url.cmp(&b.url));

    println!("{:<70} {:<10}", "PAGE", "LINKS");
    println!("{}", "=".repeat(80));
    for entry in entries {
        println!("{:<70} {:<10}", truncate(&entry.url, 67), entry.links.len());
        for link in &entry.links {
            println!("    -> {}", link);
        }
    }
    println!();

    print_failures(&report.failures);
    print_summary(report);
    Ok(())
}

fn print_urls(report: &CrawlReport<SitemapEntry>, json: bool) -> Result<()> {
    let urls = discovered_urls(&report.results);

    if json {
        println!("{}", serde_json::to_string_pretty(&urls)?);
        return Ok(());
    }

    for url in &urls {
        println!("{}", url);
    }
    println!();

    print_failures(&report.failures);
    print_summary(report);
    Ok(())
}

// Crawled pages plus every link found on them
fn discovered_urls(entries: &[SitemapEntry]) -> BTreeSet<String> {
    entries
        .iter()
        .flat_map(|entry| std::iter::once(&entry.url).chain(entry.links.iter()))
        .cloned()
        .collect()
}

fn print_failures(failures: &[CrawlFailure]) {
    if failures.is_empty() {
        return;
    }

    println!("{:<60} {:<10} {:<30}", "FAILED URL", "ATTEMPTS", "REASON");
    println!("{}", "=".repeat(100));
    for failure in failures {
        println!(
            "{:<60} {:<10} {:<30}",
            truncate(&failure.url, 57),
            failure.attempts,
            failure.message
        );
    }
    println!();
}

fn print_summary(report: &CrawlReport<SitemapEntry>) {
    let stats = &report.stats;
    println!("📊 Summary:");
    println!("   ✅ Pages crawled: {}", stats.pages_crawled);
    println!("   ❌ Failed: {}", stats.failures);
    println!("   🔁 Retries: {}", stats.retries);
    println!("   🌐 Requests: {}", stats.fetch_attempts);
}

fn truncate(url: &str, max: usize) -> String {
    if url.chars().count() > max {
        let cut: String = url.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        url.to_string()
    }
}

// src/crawl/controller.rs
// =============================================================================
// The crawl controller: sets up one crawl, runs it, tears it down.
//
// How a crawl runs:
// 1. Validate the config and build the shared context (queue, frontier...)
// 2. Admit the seed URL and put it in the queue at depth 0
// 3. Spawn exactly `concurrency` workers
// 4. Wait until the queue is drained (nothing pending, nothing in flight)
// 5. Close the queue and cancel the workers (they are all idle by now)
// 6. Drop the context, which closes the HTTP connection pool
// 7. Hand back the results
//
// Because step 4 waits for every task to be marked done, and workers only
// mark a task done after they stored its result, no worker can still be
// touching the results when crawl() returns.
// =============================================================================

use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::context::CrawlContext;
use super::report::CrawlReport;
use super::task::Task;
use super::transform::{PageTransform, SitemapEntry, SitemapTransform};
use super::worker::Worker;
use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::fetch::{Fetcher, HttpFetcher, RequestOptions};

/// A configured crawl, ready to run.
pub struct Crawler<F, T> {
    config: CrawlConfig,
    fetcher: F,
    transform: T,
}

impl Crawler<HttpFetcher, SitemapTransform> {
    /// Crawler with the real HTTP fetcher and the sitemap transform.
    pub fn new(config: CrawlConfig) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(config.max_redirects, config.concurrency)?;
        Ok(Self {
            config,
            fetcher,
            transform: SitemapTransform,
        })
    }
}

impl<F: Fetcher, T: PageTransform> Crawler<F, T> {
    /// Crawler with a caller-supplied fetcher and transform.
    pub fn with_parts(config: CrawlConfig, fetcher: F, transform: T) -> Self {
        Self {
            config,
            fetcher,
            transform,
        }
    }

    /// Swaps the transform, keeping config and fetcher.
    pub fn with_transform<U: PageTransform>(self, transform: U) -> Crawler<F, U> {
        Crawler {
            config: self.config,
            fetcher: self.fetcher,
            transform,
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Runs the crawl and returns only the results.
    pub async fn crawl(self) -> Result<Vec<T::Output>, CrawlError> {
        Ok(self.run().await?.results)
    }

    /// Runs the crawl and returns results, failures and counters.
    pub async fn run(self) -> Result<CrawlReport<T::Output>, CrawlError> {
        let mut seed = self.config.validate()?;
        seed.set_fragment(None);
        let options = RequestOptions::from_config(&self.config)?;
        let concurrency = self.config.concurrency;

        info!(
            seed = %seed,
            max_depth = self.config.max_depth,
            concurrency,
            max_retries = self.config.max_retries,
            "starting crawl"
        );

        let ctx = Arc::new(CrawlContext::new(
            seed.clone(),
            self.config.max_depth,
            self.config.max_retries,
            concurrency,
            options,
            self.fetcher,
            self.transform,
        ));

        let seed_task = Task::seed(seed.to_string());
        ctx.frontier.try_admit(&seed_task.url, seed_task.depth);
        ctx.queue.enqueue(seed_task).await?;

        // Dropping the JoinSet aborts every worker, so a caller that gives up
        // on this future (timeout, select!) doesn't leave workers crawling
        let mut workers = JoinSet::new();
        for id in 0..concurrency {
            workers.spawn(Worker::new(id, Arc::clone(&ctx)).run());
        }

        ctx.queue.drain().await;
        debug!("queue drained, stopping workers");

        ctx.queue.close();
        workers.abort_all();
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                if !e.is_cancelled() {
                    error!(error = %e, "worker ended abnormally");
                }
            }
        }

        let stats = ctx.counters.snapshot(ctx.frontier.len(), ctx.started.elapsed());
        let (results, failures) = ctx.take_collections();

        // Last reference: this drops the fetcher and its connection pool
        drop(ctx);

        info!(
            pages = stats.pages_crawled,
            failures = stats.failures,
            fetch_attempts = stats.fetch_attempts,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "crawl finished"
        );

        Ok(CrawlReport {
            results,
            failures,
            stats,
        })
    }
}

/// Crawls `seed_url` over HTTP and returns its sitemap.
///
/// Shorthand for building a [`CrawlConfig`] and running a [`Crawler`].
pub async fn crawl(
    seed_url: &str,
    max_depth: usize,
    concurrency: usize,
    max_retries: usize,
) -> Result<Vec<SitemapEntry>, CrawlError> {
    let config = CrawlConfig::new(seed_url)
        .with_max_depth(max_depth)
        .with_concurrency(concurrency)
        .with_max_retries(max_retries);

    Crawler::new(config)?.crawl().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::report::FailureKind;
    use crate::crawl::testing::ScriptedFetcher;
    use crate::crawl::transform::PageRecordTransform;
    use crate::error::{ConfigError, FetchError};
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn config(seed: &str) -> CrawlConfig {
        CrawlConfig::new(seed).with_concurrency(4)
    }

    fn crawler(
        config: CrawlConfig,
        fetcher: &Arc<ScriptedFetcher>,
    ) -> Crawler<Arc<ScriptedFetcher>, SitemapTransform> {
        Crawler::with_parts(config, Arc::clone(fetcher), SitemapTransform)
    }

    #[tokio::test]
    async fn test_depth_one_fetches_only_the_seed() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .page(
                    "https://x.test/",
                    r#"<a href="/a">A</a><a href="https://other.test/b">B</a>"#,
                )
                .page("https://x.test/a", "<p>never fetched</p>"),
        );

        let results = crawler(config("https://x.test/").with_max_depth(1), &fetcher)
            .crawl()
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://x.test/");
        let expected: BTreeSet<String> = ["https://x.test/a".to_string()].into_iter().collect();
        assert_eq!(results[0].links, expected);
        assert_eq!(fetcher.attempts("https://x.test/a"), 0);
    }

    #[tokio::test]
    async fn test_depth_zero_fetches_nothing() {
        let fetcher = Arc::new(ScriptedFetcher::new().page("https://x.test/", "<p></p>"));

        let report = crawler(config("https://x.test/").with_max_depth(0), &fetcher)
            .run()
            .await
            .unwrap();

        assert!(report.results.is_empty());
        assert_eq!(report.stats.fetch_attempts, 0);
        assert_eq!(report.stats.skipped_depth, 1);
    }

    #[tokio::test]
    async fn test_breadth_first_expansion_to_max_depth() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .page("https://x.test/", r#"<a href="/a">A</a><a href="/b">B</a>"#)
                .page("https://x.test/a", r#"<a href="/c">C</a><a href="/">home</a>"#)
                .page("https://x.test/b", r#"<a href="/c">C</a><a href="/a">A</a>"#)
                .page("https://x.test/c", r#"<a href="/d">D</a>"#)
                .page("https://x.test/d", "<p>too deep</p>"),
        );

        let report = crawler(config("https://x.test/").with_max_depth(3), &fetcher)
            .run()
            .await
            .unwrap();

        let crawled: BTreeSet<String> = report.results.iter().map(|e| e.url.clone()).collect();
        let expected: BTreeSet<String> = [
            "https://x.test/",
            "https://x.test/a",
            "https://x.test/b",
            "https://x.test/c",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(crawled, expected);

        // Every page fetched exactly once, /d (depth 3) never
        for url in &expected {
            assert_eq!(fetcher.attempts(url), 1, "{}", url);
        }
        assert_eq!(fetcher.attempts("https://x.test/d"), 0);
        assert_eq!(report.stats.pages_crawled, 4);
    }

    #[tokio::test]
    async fn test_server_error_twice_then_success() {
        let fetcher = Arc::new(ScriptedFetcher::new().script(
            "https://x.test/",
            vec![
                Err(FetchError::ServerError(503)),
                Err(FetchError::ServerError(503)),
                Ok("<p>finally</p>".to_string()),
            ],
        ));

        let report = crawler(config("https://x.test/").with_max_retries(2), &fetcher)
            .run()
            .await
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].url, "https://x.test/");
        assert_eq!(fetcher.attempts("https://x.test/"), 3);
        assert_eq!(report.stats.retries, 2);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_forever_gives_up() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .script("https://x.test/", vec![Err(FetchError::ServerError(500))]),
        );

        let report = crawler(config("https://x.test/").with_max_retries(2), &fetcher)
            .run()
            .await
            .unwrap();

        assert!(report.results.is_empty());
        assert_eq!(fetcher.attempts("https://x.test/"), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, FailureKind::RetriesExhausted);
        assert_eq!(report.failures[0].attempts, 3);
    }

    #[tokio::test]
    async fn test_connection_errors_are_retried() {
        let fetcher = Arc::new(ScriptedFetcher::new().script(
            "https://x.test/",
            vec![
                Err(FetchError::ConnectionError("reset".to_string())),
                Ok("<p>ok</p>".to_string()),
            ],
        ));

        let results = crawler(config("https://x.test/"), &fetcher).crawl().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(fetcher.attempts("https://x.test/"), 2);
    }

    #[tokio::test]
    async fn test_permanent_failures_are_not_retried() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .page(
                    "https://x.test/",
                    r#"
                    <a href="/missing">404</a>
                    <a href="/image">png</a>
                    <a href="/loop">loop</a>
                    <a href="/garbled">gzip</a>
                    <a href="/weird">?</a>
                    "#,
                )
                .script("https://x.test/missing", vec![Err(FetchError::ClientError(404))])
                .script(
                    "https://x.test/image",
                    vec![Err(FetchError::InvalidContentType("image/png".to_string()))],
                )
                .script("https://x.test/loop", vec![Err(FetchError::TooManyRedirects)])
                .script(
                    "https://x.test/garbled",
                    vec![Err(FetchError::PayloadError("bad gzip".to_string()))],
                )
                .script("https://x.test/weird", vec![Err(FetchError::Other("??".to_string()))]),
        );

        let report = crawler(config("https://x.test/").with_max_depth(2), &fetcher)
            .run()
            .await
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.failures.len(), 5);
        assert_eq!(report.stats.retries, 0);
        for path in ["missing", "image", "loop", "garbled", "weird"] {
            assert_eq!(fetcher.attempts(&format!("https://x.test/{}", path)), 1);
        }

        let unclassified = report
            .failures
            .iter()
            .find(|f| f.url == "https://x.test/weird")
            .unwrap();
        assert_eq!(unclassified.kind, FailureKind::Unclassified);
        assert!(report
            .failures
            .iter()
            .filter(|f| f.url != "https://x.test/weird")
            .all(|f| f.kind == FailureKind::Permanent));
    }

    #[tokio::test]
    async fn test_concurrency_one_with_wide_fan_out() {
        let links: String = (0..50)
            .map(|i| format!(r#"<a href="/p{}">p{}</a>"#, i, i))
            .collect();
        let mut fetcher = ScriptedFetcher::new()
            .page("https://x.test/", &links)
            .with_delay(Duration::from_millis(1));
        for i in 0..50 {
            fetcher = fetcher.page(&format!("https://x.test/p{}", i), "<p>leaf</p>");
        }
        let fetcher = Arc::new(fetcher);

        let report = tokio::time::timeout(
            Duration::from_secs(10),
            crawler(
                CrawlConfig::new("https://x.test/")
                    .with_concurrency(1)
                    .with_max_depth(2),
                &fetcher,
            )
            .run(),
        )
        .await
        .expect("a single worker must not deadlock on a wide page")
        .unwrap();

        assert_eq!(report.results.len(), 51);
        assert_eq!(fetcher.max_active(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_duplicate_fetches_under_concurrency() {
        // Every page links to every other page
        let urls: Vec<String> = (0..20).map(|i| format!("https://x.test/n{}", i)).collect();
        let all_links: String = urls
            .iter()
            .map(|u| format!(r#"<a href="{}">x</a>"#, u))
            .collect();

        let mut fetcher = ScriptedFetcher::new()
            .page("https://x.test/", &all_links)
            .with_delay(Duration::from_millis(2));
        for url in &urls {
            fetcher = fetcher.page(url, &all_links);
        }
        let fetcher = Arc::new(fetcher);

        let report = crawler(
            CrawlConfig::new("https://x.test/")
                .with_concurrency(8)
                .with_max_depth(4),
            &fetcher,
        )
        .run()
        .await
        .unwrap();

        assert_eq!(report.results.len(), 21);
        assert_eq!(fetcher.attempts("https://x.test/"), 1);
        for url in &urls {
            assert_eq!(fetcher.attempts(url), 1, "{}", url);
        }
        assert!(fetcher.max_active() <= 8);
    }

    #[tokio::test]
    async fn test_panicking_transform_does_not_kill_worker() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .page("https://x.test/", r#"<a href="/boom">boom</a><a href="/ok">ok</a>"#)
                .page("https://x.test/boom", "<p>boom</p>")
                .page("https://x.test/ok", "<p>fine</p>"),
        );

        let transform = crate::crawl::FnTransform(
            |url: &str, _links: &BTreeSet<String>, _body: &str| {
                if url.ends_with("/boom") {
                    panic!("transform exploded");
                }
                url.to_string()
            },
        );

        let report = Crawler::with_parts(
            CrawlConfig::new("https://x.test/")
                .with_concurrency(1)
                .with_max_depth(2),
            Arc::clone(&fetcher),
            transform,
        )
        .run()
        .await
        .unwrap();

        let mut results = report.results.clone();
        results.sort();
        assert_eq!(results, vec!["https://x.test/", "https://x.test/ok"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, FailureKind::Panicked);
        assert!(report.failures[0].message.contains("transform exploded"));
    }

    #[tokio::test]
    async fn test_page_records_keep_body() {
        let fetcher = Arc::new(ScriptedFetcher::new().page("https://x.test/", "<p>body</p>"));

        let records = Crawler::with_parts(config("https://x.test/"), fetcher, SitemapTransform)
            .with_transform(PageRecordTransform)
            .crawl()
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].body, "<p>body</p>");
    }

    #[tokio::test]
    async fn test_seed_is_normalized() {
        let fetcher = Arc::new(ScriptedFetcher::new().page("https://x.test/", "<p></p>"));

        let results = crawler(config("https://x.test#top"), &fetcher).crawl().await.unwrap();
        assert_eq!(results[0].url, "https://x.test/");
    }

    #[tokio::test]
    async fn test_invalid_config_fails_fast() {
        let fetcher = Arc::new(ScriptedFetcher::new());

        let result = crawler(config("https://x.test/").with_concurrency(0), &fetcher)
            .run()
            .await;
        assert!(matches!(
            result,
            Err(CrawlError::Config(ConfigError::ZeroConcurrency))
        ));
    }

    #[tokio::test]
    async fn test_independent_crawls_run_side_by_side() {
        let first = Arc::new(
            ScriptedFetcher::new()
                .page("https://x.test/", r#"<a href="/a">A</a>"#)
                .page("https://x.test/a", "<p></p>"),
        );
        let second = Arc::new(
            ScriptedFetcher::new()
                .page("https://y.test/", r#"<a href="/a">A</a>"#)
                .page("https://y.test/a", "<p></p>"),
        );

        let (a, b) = tokio::join!(
            crawler(config("https://x.test/").with_max_depth(2), &first).crawl(),
            crawler(config("https://y.test/").with_max_depth(2), &second).crawl(),
        );

        assert_eq!(a.unwrap().len(), 2);
        assert_eq!(b.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_links_resolve_against_redirect_target() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .page("https://x.test/", r#"<a href="/docs">Docs</a>"#)
                .page("https://x.test/docs", r#"<a href="intro">Intro</a>"#)
                .redirect("https://x.test/docs", "https://x.test/docs/")
                .page("https://x.test/docs/intro", "<p>intro</p>"),
        );

        let results = crawler(config("https://x.test/").with_max_depth(3), &fetcher)
            .crawl()
            .await
            .unwrap();

        let docs = results
            .iter()
            .find(|entry| entry.url == "https://x.test/docs")
            .unwrap();
        let expected: BTreeSet<String> =
            ["https://x.test/docs/intro".to_string()].into_iter().collect();
        assert_eq!(docs.links, expected);
        assert_eq!(fetcher.attempts("https://x.test/docs/intro"), 1);
        assert_eq!(fetcher.attempts("https://x.test/intro"), 0);
    }

    #[tokio::test]
    async fn test_redirect_off_site_keeps_seed_origin() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .page("https://x.test/", r#"<a href="/out">Out</a>"#)
                .page(
                    "https://x.test/out",
                    r#"<a href="next">Next</a><a href="https://x.test/back">Back</a>"#,
                )
                .redirect("https://x.test/out", "https://other.test/landing/")
                .page("https://x.test/back", "<p>back</p>"),
        );

        let results = crawler(config("https://x.test/").with_max_depth(3), &fetcher)
            .crawl()
            .await
            .unwrap();

        let out = results
            .iter()
            .find(|entry| entry.url == "https://x.test/out")
            .unwrap();
        let expected: BTreeSet<String> = ["https://x.test/back".to_string()].into_iter().collect();
        assert_eq!(out.links, expected);
        assert_eq!(fetcher.attempts("https://other.test/landing/next"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_relinked_url_after_server_error_succeeds_once() {
        // A sibling page links back to a URL whose first fetch failed. Whether
        // the retry or the sibling's link schedules it again, it must be
        // fetched once more and stored once.
        for _ in 0..50 {
            let siblings: Vec<String> =
                (0..8).map(|i| format!("https://x.test/b{}", i)).collect();
            let seed_links: String = std::iter::once("https://x.test/a".to_string())
                .chain(siblings.iter().cloned())
                .map(|u| format!(r#"<a href="{}">x</a>"#, u))
                .collect();

            let mut fetcher = ScriptedFetcher::new()
                .page("https://x.test/", &seed_links)
                .script(
                    "https://x.test/a",
                    vec![
                        Err(FetchError::ServerError(503)),
                        Ok("<p>a</p>".to_string()),
                    ],
                );
            for sibling in &siblings {
                fetcher = fetcher.page(sibling, r#"<a href="/a">back to a</a>"#);
            }
            let fetcher = Arc::new(fetcher);

            let report = crawler(
                config("https://x.test/").with_concurrency(8).with_max_depth(3),
                &fetcher,
            )
            .run()
            .await
            .unwrap();

            let stored = report
                .results
                .iter()
                .filter(|entry| entry.url == "https://x.test/a")
                .count();
            assert_eq!(stored, 1);
            assert_eq!(fetcher.attempts("https://x.test/a"), 2);
            assert!(report.failures.is_empty());
            assert_eq!(report.results.len(), 10);
        }
    }

    #[tokio::test]
    async fn test_dropping_the_crawl_stops_the_workers() {
        let links: String = (0..200)
            .map(|i| format!(r#"<a href="/p{}">x</a>"#, i))
            .collect();
        let mut fetcher = ScriptedFetcher::new()
            .page("https://x.test/", &links)
            .with_delay(Duration::from_millis(5));
        for i in 0..200 {
            fetcher = fetcher.page(&format!("https://x.test/p{}", i), "<p></p>");
        }
        let fetcher = Arc::new(fetcher);

        let run = crawler(
            config("https://x.test/").with_concurrency(2).with_max_depth(2),
            &fetcher,
        )
        .run();
        let timed_out = tokio::time::timeout(Duration::from_millis(30), run).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        let fetched = fetcher.total_attempts();
        assert!(fetched < 201);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fetcher.total_attempts(), fetched);
        // Workers are gone, and with them the context holding the fetcher
        assert_eq!(Arc::strong_count(&fetcher), 1);
    }
}

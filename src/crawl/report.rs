// src/crawl/report.rs
// =============================================================================
// What a finished crawl hands back: the results, every page that failed for
// good, and a few counters.
//
// Failed pages never show up in `results`. They are logged as they happen and
// collected in `failures` so callers don't have to scrape the logs.
// =============================================================================

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Why a page ended up in `failures`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 4xx, wrong content type, redirect loop, unreadable body
    Permanent,
    /// Transient failure that kept happening after every retry
    RetriesExhausted,
    /// An error the fetcher couldn't classify
    Unclassified,
    /// The fetcher, extractor or transform panicked
    Panicked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlFailure {
    pub url: String,
    pub depth: usize,
    pub attempts: usize,
    pub kind: FailureKind,
    pub message: String,
}

/// Snapshot of the crawl counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub fetch_attempts: usize,
    pub pages_crawled: usize,
    pub retries: usize,
    pub failures: usize,
    pub skipped_depth: usize,
    pub urls_admitted: usize,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(elapsed: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(elapsed.as_millis())
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport<O> {
    pub results: Vec<O>,
    pub failures: Vec<CrawlFailure>,
    pub stats: CrawlStats,
}

impl<O> CrawlReport<O> {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

// Live counters, bumped by workers while the crawl runs
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub fetch_attempts: AtomicUsize,
    pub pages_crawled: AtomicUsize,
    pub retries: AtomicUsize,
    pub failures: AtomicUsize,
    pub skipped_depth: AtomicUsize,
}

impl Counters {
    pub fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, urls_admitted: usize, elapsed: Duration) -> CrawlStats {
        CrawlStats {
            fetch_attempts: self.fetch_attempts.load(Ordering::Relaxed),
            pages_crawled: self.pages_crawled.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            skipped_depth: self.skipped_depth.load(Ordering::Relaxed),
            urls_admitted,
            elapsed,
        }
    }
}

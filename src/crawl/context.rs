// src/crawl/context.rs
// =============================================================================
// Everything one crawl shares between its workers.
//
// A new CrawlContext is built for every crawl and handed to workers behind an
// Arc. There is no global state, so several crawls can run side by side in
// the same process.
// =============================================================================

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use url::Url;

use super::frontier::Frontier;
use super::queue::TaskQueue;
use super::report::{Counters, CrawlFailure};
use super::transform::PageTransform;
use crate::fetch::RequestOptions;

pub(crate) struct CrawlContext<F, T: PageTransform> {
    /// Links are only followed when they share this URL's origin
    pub seed: Url,
    pub max_depth: usize,
    pub max_retries: usize,
    pub options: RequestOptions,
    pub fetcher: F,
    pub transform: T,
    pub queue: TaskQueue,
    pub frontier: Frontier,
    pub counters: Counters,
    pub started: Instant,
    results: Mutex<Vec<T::Output>>,
    failures: Mutex<Vec<CrawlFailure>>,
}

impl<F, T: PageTransform> CrawlContext<F, T> {
    pub fn new(
        seed: Url,
        max_depth: usize,
        max_retries: usize,
        concurrency: usize,
        options: RequestOptions,
        fetcher: F,
        transform: T,
    ) -> Self {
        Self {
            seed,
            max_depth,
            max_retries,
            options,
            fetcher,
            transform,
            queue: TaskQueue::new(concurrency),
            frontier: Frontier::new(),
            counters: Counters::default(),
            started: Instant::now(),
            results: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn push_result(&self, output: T::Output) {
        lock(&self.results).push(output);
        Counters::bump(&self.counters.pages_crawled);
    }

    pub fn push_failure(&self, failure: CrawlFailure) {
        lock(&self.failures).push(failure);
        Counters::bump(&self.counters.failures);
    }

    /// Takes the collected results and failures out of the context.
    pub fn take_collections(&self) -> (Vec<T::Output>, Vec<CrawlFailure>) {
        let results = std::mem::take(&mut *lock(&self.results));
        let failures = std::mem::take(&mut *lock(&self.failures));
        (results, failures)
    }
}

// Vec pushes can't leave the collections half-written, so ignore poisoning
fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// src/crawl/mod.rs
// =============================================================================
// This module is the concurrent crawl engine.
//
// Features:
// - Breadth-first crawling from a seed URL, bounded by depth
// - A fixed pool of workers pulling from one bounded task queue
// - Each URL is scheduled at most once (the frontier)
// - Transient failures (5xx, connection problems) are retried right away
// - The crawl ends when the queue is drained: nothing pending, nothing running
//
// Submodules:
// - task: one unit of work (url, depth, retry count)
// - queue: bounded multi-consumer queue with drain detection
// - frontier: the "already scheduled" set
// - worker: the fetch / extract / expand loop
// - controller: seeds the crawl, runs workers, collects results
// - transform: what to keep for each page
// - report: results, failures and counters returned to the caller
// =============================================================================

mod context;
mod controller;
mod frontier;
mod queue;
mod report;
mod task;
mod transform;
mod worker;

#[cfg(test)]
mod testing;

pub use controller::{crawl, Crawler};
pub use frontier::Frontier;
pub use queue::{TaskQueue, TryEnqueueError};
pub use report::{CrawlFailure, CrawlReport, CrawlStats, FailureKind};
pub use task::Task;
pub use transform::{
    FnTransform, PageRecord, PageRecordTransform, PageTransform, SitemapEntry, SitemapTransform,
};

// src/crawl/worker.rs
// =============================================================================
// A crawl worker: one long-running tokio task that keeps pulling work.
//
// Each loop iteration:
// 1. Take the next task (own backlog first, then the shared queue)
// 2. Skip it if it is at or past the depth limit
// 3. Fetch the page
// 4. On success: extract links, store the transformed result, and schedule
//    every newly admitted link one level deeper
// 5. On a transient failure: retry (up to max_retries)
// 6. On any other failure: log it and record it
// 7. Mark the task done. This happens on EVERY path, including panics
//
// About the backlog:
// The shared queue is bounded. If every worker blocked while pushing links
// into a full queue, nobody would be left to pull from it and the crawl would
// hang forever (with one worker this happens on the very first page that has
// two links). So a worker never blocks on push: links that don't fit are
// kept in the worker's own backlog, counted as unfinished work, and the
// worker crawls them itself whenever the shared queue is still full.
// =============================================================================

use futures::FutureExt;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};
use url::Url;

use super::context::CrawlContext;
use super::queue::TryEnqueueError;
use super::report::{Counters, CrawlFailure, FailureKind};
use super::task::Task;
use super::transform::PageTransform;
use crate::error::FetchError;
use crate::fetch::{FetchedPage, Fetcher};
use crate::links::extract_links_within;

pub(crate) struct Worker<F, T: PageTransform> {
    id: usize,
    ctx: Arc<CrawlContext<F, T>>,
    backlog: VecDeque<Task>,
}

impl<F: Fetcher, T: PageTransform> Worker<F, T> {
    pub fn new(id: usize, ctx: Arc<CrawlContext<F, T>>) -> Self {
        Self {
            id,
            ctx,
            backlog: VecDeque::new(),
        }
    }

    /// Runs until the queue is closed (or the task is aborted).
    pub async fn run(mut self) {
        loop {
            self.flush_backlog();

            let task = match self.backlog.pop_front() {
                Some(task) => task,
                None => match self.ctx.queue.dequeue().await {
                    Some(task) => task,
                    None => break,
                },
            };

            let url = task.url.clone();
            let depth = task.depth;
            let attempts = task.attempts();

            let outcome = AssertUnwindSafe(self.process(task)).catch_unwind().await;
            if let Err(panic) = outcome {
                let message = panic_message(panic.as_ref());
                error!(worker = self.id, %url, %message, "worker caught a panic");
                self.ctx.push_failure(CrawlFailure {
                    url,
                    depth,
                    attempts,
                    kind: FailureKind::Panicked,
                    message,
                });
            }

            if let Err(e) = self.ctx.queue.mark_done() {
                error!(worker = self.id, error = %e, "task bookkeeping is off");
            }
        }

        debug!(worker = self.id, "worker stopped");
    }

    async fn process(&mut self, task: Task) {
        let ctx = Arc::clone(&self.ctx);

        if task.depth >= ctx.max_depth {
            debug!(url = %task.url, depth = task.depth, "max depth reached, skipping");
            Counters::bump(&ctx.counters.skipped_depth);
            return;
        }

        debug!(worker = self.id, url = %task.url, depth = task.depth, "working on task");
        Counters::bump(&ctx.counters.fetch_attempts);

        match ctx.fetcher.fetch(&task.url, &ctx.options).await {
            Ok(page) => self.handle_page(&task, &page),
            Err(error @ (FetchError::ServerError(_) | FetchError::ConnectionError(_))) => {
                self.retry(task, error)
            }
            Err(error @ FetchError::ClientError(status)) => {
                error!(url = %task.url, status, "client error");
                self.record_failure(&task, FailureKind::Permanent, &error);
            }
            Err(error @ FetchError::InvalidContentType(_)) => {
                error!(url = %task.url, %error, "non html content type received");
                self.record_failure(&task, FailureKind::Permanent, &error);
            }
            Err(error @ FetchError::TooManyRedirects) => {
                error!(url = %task.url, "redirected too many times");
                self.record_failure(&task, FailureKind::Permanent, &error);
            }
            Err(error @ FetchError::PayloadError(_)) => {
                error!(url = %task.url, %error, "invalid compression or encoding");
                self.record_failure(&task, FailureKind::Permanent, &error);
            }
            Err(error @ FetchError::Other(_)) => {
                error!(url = %task.url, %error, "unhandled fetch error");
                self.record_failure(&task, FailureKind::Unclassified, &error);
            }
        }
    }

    fn handle_page(&mut self, task: &Task, page: &FetchedPage) {
        let ctx = Arc::clone(&self.ctx);

        // Relative links resolve against where the body was served from,
        // which differs from task.url after a redirect
        let base = match Url::parse(&page.url) {
            Ok(base) => base,
            Err(e) => {
                let error = FetchError::Other(format!("unparseable page URL: {}", e));
                error!(url = %task.url, final_url = %page.url, %error, "cannot extract links");
                self.record_failure(task, FailureKind::Unclassified, &error);
                return;
            }
        };

        let links = extract_links_within(&page.body, &base, &ctx.seed);
        if page.url != task.url {
            debug!(url = %task.url, final_url = %page.url, "followed redirect");
        }
        debug!(url = %task.url, links = links.len(), "page crawled");

        ctx.push_result(ctx.transform.transform(&task.url, &links, &page.body));

        let child_depth = task.depth + 1;
        if child_depth >= ctx.max_depth {
            // Children would be skipped by the depth check anyway
            return;
        }

        for link in links {
            if ctx.frontier.try_admit(&link, child_depth) {
                self.submit(task.child(link));
            }
        }
    }

    fn retry(&mut self, task: Task, error: FetchError) {
        let ctx = Arc::clone(&self.ctx);

        if task.retry_count >= ctx.max_retries {
            error!(url = %task.url, attempts = task.attempts(), %error, "max retries exceeded");
            self.record_failure(&task, FailureKind::RetriesExhausted, &error);
            return;
        }

        ctx.frontier.release(&task.url);
        if !ctx.frontier.try_admit(&task.url, task.depth) {
            // Someone rediscovered it in the meantime and already scheduled it
            debug!(
                url = %task.url,
                depth = ?ctx.frontier.depth_of(&task.url),
                "retry superseded by a fresh task"
            );
            return;
        }

        warn!(
            url = %task.url,
            retry = task.retry_count + 1,
            max_retries = ctx.max_retries,
            %error,
            "transient failure, retrying"
        );
        Counters::bump(&ctx.counters.retries);
        self.submit(task.retry());
    }

    fn record_failure(&self, task: &Task, kind: FailureKind, error: &FetchError) {
        self.ctx.push_failure(CrawlFailure {
            url: task.url.clone(),
            depth: task.depth,
            attempts: task.attempts(),
            kind,
            message: error.to_string(),
        });
    }

    // Hands a task to the shared queue, or keeps it in the backlog if the
    // queue is full. Never blocks.
    fn submit(&mut self, task: Task) {
        if !self.backlog.is_empty() {
            self.defer(task);
            return;
        }

        match self.ctx.queue.try_enqueue(task) {
            Ok(()) => {}
            Err(TryEnqueueError::Full(task)) => self.defer(task),
            Err(TryEnqueueError::Closed(task)) => {
                warn!(url = %task.url, "queue closed, dropping task");
            }
        }
    }

    fn defer(&mut self, task: Task) {
        self.ctx.queue.track_deferred();
        self.backlog.push_back(task);
    }

    // Moves as much of the backlog as fits into the shared queue, so idle
    // workers can pick it up
    fn flush_backlog(&mut self) {
        while let Some(task) = self.backlog.pop_front() {
            match self.ctx.queue.try_enqueue_deferred(task) {
                Ok(()) => {}
                Err(TryEnqueueError::Full(task)) | Err(TryEnqueueError::Closed(task)) => {
                    self.backlog.push_front(task);
                    break;
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// src/crawl/testing.rs
// =============================================================================
// An in-memory Fetcher for engine tests.
//
// Each URL gets a script of responses. Fetch N returns the N-th entry; once
// the script runs out the last entry repeats. Unknown URLs are 404s.
// A URL can also be marked as redirecting, in which case its body is reported
// as served from the redirect target.
// The fetcher also counts attempts per URL and the highest number of fetches
// that were running at the same time.
// =============================================================================

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::FetchError;
use crate::fetch::{FetchedPage, Fetcher, RequestOptions};

#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    scripts: HashMap<String, Vec<Result<String, FetchError>>>,
    redirects: HashMap<String, String>,
    attempts: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page that always loads
    pub fn page(self, url: &str, html: &str) -> Self {
        self.script(url, vec![Ok(html.to_string())])
    }

    pub fn script(mut self, url: &str, responses: Vec<Result<String, FetchError>>) -> Self {
        self.scripts.insert(url.to_string(), responses);
        self
    }

    /// Serves `url`'s script as if the server had redirected to `final_url`
    pub fn redirect(mut self, url: &str, final_url: &str) -> Self {
        self.redirects.insert(url.to_string(), final_url.to_string());
        self
    }

    /// Makes every fetch take a little while, so fetches overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn attempts(&self, url: &str) -> usize {
        self.attempts.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_attempts(&self) -> usize {
        self.attempts.lock().unwrap().values().sum()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _options: &RequestOptions) -> Result<FetchedPage, FetchError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = match self.scripts.get(url) {
            Some(script) => {
                let index = (attempt - 1).min(script.len().saturating_sub(1));
                script
                    .get(index)
                    .cloned()
                    .unwrap_or(Err(FetchError::ClientError(404)))
            }
            None => Err(FetchError::ClientError(404)),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);

        let final_url = self.redirects.get(url).map(String::as_str).unwrap_or(url);
        response.map(|body| FetchedPage::new(final_url, body))
    }
}

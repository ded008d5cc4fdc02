// src/crawl/frontier.rs
// =============================================================================
// The frontier: every URL that has been admitted to the crawl queue.
//
// try_admit() is the single most important operation of the crawler. It
// checks and inserts under one lock, so when two workers find the same link
// at the same moment exactly one of them schedules it.
//
// We also remember the depth a URL was first admitted at.
// =============================================================================

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct Frontier {
    admitted: Mutex<HashMap<String, usize>>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    // The map is always left consistent, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        self.admitted.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits `url` at `depth` if nobody has yet. Returns true only for the
    /// caller that did the admitting.
    pub fn try_admit(&self, url: &str, depth: usize) -> bool {
        let mut admitted = self.lock();
        if admitted.contains_key(url) {
            return false;
        }
        admitted.insert(url.to_string(), depth);
        true
    }

    /// Forgets `url`, so it can be admitted again (used for retries).
    pub fn release(&self, url: &str) -> bool {
        self.lock().remove(url).is_some()
    }

    /// Depth the URL was admitted at, if it is currently admitted
    pub fn depth_of(&self, url: &str) -> Option<usize> {
        self.lock().get(url).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_admit_once() {
        let frontier = Frontier::new();
        assert!(frontier.try_admit("https://x.test/", 0));
        assert!(!frontier.try_admit("https://x.test/", 3));
        assert_eq!(frontier.depth_of("https://x.test/"), Some(0));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_release_allows_readmission() {
        let frontier = Frontier::new();
        assert!(frontier.try_admit("https://x.test/a", 1));
        assert!(frontier.release("https://x.test/a"));
        assert_eq!(frontier.depth_of("https://x.test/a"), None);
        assert!(frontier.try_admit("https://x.test/a", 1));

        assert!(!frontier.release("https://x.test/never"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admission_has_one_winner() {
        let frontier = Arc::new(Frontier::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                let winners = Arc::clone(&winners);
                tokio::spawn(async move {
                    if frontier.try_admit("https://x.test/shared", 1) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}

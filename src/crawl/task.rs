// src/crawl/task.rs
// =============================================================================
// One unit of crawl work: a URL, how deep it was found, and how many times
// it has already been retried.
// =============================================================================

/// A page waiting to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub url: String,
    /// Link hops from the seed (the seed is depth 0)
    pub depth: usize,
    /// 0 for a fresh task, +1 for each transient-failure retry
    pub retry_count: usize,
}

impl Task {
    /// The first task of every crawl
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
            retry_count: 0,
        }
    }

    /// A link discovered on this task's page, one level deeper
    pub fn child(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: self.depth + 1,
            retry_count: 0,
        }
    }

    /// The same page, scheduled again after a transient failure
    pub fn retry(&self) -> Self {
        Self {
            url: self.url.clone(),
            depth: self.depth,
            retry_count: self.retry_count + 1,
        }
    }

    /// Fetches made for this URL so far, counting the current one
    pub fn attempts(&self) -> usize {
        self.retry_count + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_and_retry() {
        let seed = Task::seed("https://x.test/");
        assert_eq!(seed.depth, 0);

        let child = seed.child("https://x.test/a");
        assert_eq!(child.depth, 1);
        assert_eq!(child.retry_count, 0);

        let again = child.retry().retry();
        assert_eq!(again.url, "https://x.test/a");
        assert_eq!(again.depth, 1);
        assert_eq!(again.retry_count, 2);
        assert_eq!(again.attempts(), 3);
    }
}

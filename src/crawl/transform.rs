// src/crawl/transform.rs
// =============================================================================
// What the crawler keeps for each page it fetched successfully.
//
// The engine doesn't decide that. It calls a PageTransform with the URL, the
// links found on the page and the raw body, and stores whatever comes back.
//
// Provided transforms:
// - SitemapTransform: (url, links), the default
// - PageRecordTransform: (url, links, body)
// - FnTransform: wrap any closure
// =============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub trait PageTransform: Send + Sync + 'static {
    type Output: Send + 'static;

    fn transform(&self, url: &str, links: &BTreeSet<String>, body: &str) -> Self::Output;
}

/// One line of a sitemap: a page and the same-site pages it links to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapEntry {
    pub url: String,
    pub links: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SitemapTransform;

impl PageTransform for SitemapTransform {
    type Output = SitemapEntry;

    fn transform(&self, url: &str, links: &BTreeSet<String>, _body: &str) -> SitemapEntry {
        SitemapEntry {
            url: url.to_string(),
            links: links.clone(),
        }
    }
}

/// Everything we know about a fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub links: BTreeSet<String>,
    pub body: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PageRecordTransform;

impl PageTransform for PageRecordTransform {
    type Output = PageRecord;

    fn transform(&self, url: &str, links: &BTreeSet<String>, body: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            links: links.clone(),
            body: body.to_string(),
        }
    }
}

/// Adapts a closure into a PageTransform.
///
/// ```
/// use sitemap_crawler::crawl::FnTransform;
///
/// let sizes = FnTransform(|url: &str, _links: &std::collections::BTreeSet<String>, body: &str| {
///     (url.to_string(), body.len())
/// });
/// # let _ = sizes;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnTransform<F>(pub F);

impl<F, O> PageTransform for FnTransform<F>
where
    F: Fn(&str, &BTreeSet<String>, &str) -> O + Send + Sync + 'static,
    O: Send + 'static,
{
    type Output = O;

    fn transform(&self, url: &str, links: &BTreeSet<String>, body: &str) -> O {
        (self.0)(url, links, body)
    }
}

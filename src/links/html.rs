// src/links/html.rs
// =============================================================================
// This module extracts same-origin links from HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// We also use the `url` crate to:
// - Resolve relative URLs against the page they appear on
// - Compare origins (scheme + host + port) so we never leave the site
//
// Rust concepts:
// - Option<T>: for links that can't be resolved
// - BTreeSet: a sorted set, so output order is stable between runs
// =============================================================================

use scraper::{Html, Selector};
use std::collections::BTreeSet;
use url::Url;

// Extracts every link on the page that stays on the page's own origin
//
// Parameters:
//   html: the HTML content to parse
//   base_url: the URL the page was served from
//
// Returns: sorted set of absolute URLs, fragments removed
//
// Example:
//   html = "<a href='/docs'>Docs</a><a href='https://other.com/'>X</a>"
//   base_url = "https://example.com/page"
//   result = {"https://example.com/docs"}
pub fn extract_links(html: &str, base_url: &Url) -> BTreeSet<String> {
    extract_links_within(html, base_url, base_url)
}

// Like extract_links, but relative links resolve against `base_url` while
// only links on `site`'s origin are kept.
//
// The crawler needs both: after a redirect (/docs -> /docs/) the page's
// base is the final URL, but the crawl is still limited to the seed's site.
pub fn extract_links_within(html: &str, base_url: &Url, site: &Url) -> BTreeSet<String> {
    let mut links = BTreeSet::new();

    let document = Html::parse_document(html);

    // "a[href]" is a constant selector and always parses
    let selector = Selector::parse("a[href]").expect("static selector is valid");

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(absolute) = resolve_link(base_url, href) else {
            continue;
        };

        if is_same_origin(site, &absolute) {
            links.insert(absolute.to_string());
        }
    }

    links
}

// Resolves a (possibly relative) href against the page URL
//
// Returns None for anchors, non-web schemes and anything unparseable.
// The fragment is dropped: "/docs#intro" and "/docs" are the same page.
fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    Some(url)
}

// Same origin = identical scheme, host and port. Subdomains don't count.
fn is_same_origin(base: &Url, candidate: &Url) -> bool {
    base.origin() == candidate.origin()
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why compare origin() instead of domain()?
//    - origin() covers scheme + host + port in one value
//    - http://example.com and https://example.com are different sites here
//    - A test server on 127.0.0.1:1234 is different from 127.0.0.1:5678
//
// 2. What does url.join() do with absolute hrefs?
//    - If href already has a scheme it replaces the base entirely
//    - So one join() handles both relative and absolute links
// -----------------------------------------------------------------------------

// src/links/mod.rs
// =============================================================================
// Link extraction.
//
// Submodules:
// - html: pulls <a href> links out of an HTML page and keeps the ones that
//   stay on the page's origin
// =============================================================================

mod html;

pub use html::{extract_links, extract_links_within};

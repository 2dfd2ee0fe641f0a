//! Hyperlink extraction.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static CSS selector is valid"));

/// First hyperlink whose target contains `marker`, in document order,
/// absolutized against `base`.
pub fn find_link(doc: &Html, marker: &str, base: &str) -> Option<String> {
    doc.select(&ANCHOR)
        .filter_map(|el| el.value().attr("href"))
        .find(|href| href.contains(marker))
        .map(|href| absolutize(base, href))
}

/// All hyperlinks whose targets contain `marker`, absolutized against `base`.
pub fn find_links(doc: &Html, marker: &str, base: &str) -> Vec<String> {
    doc.select(&ANCHOR)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| href.contains(marker))
        .map(|href| absolutize(base, href))
        .collect()
}

/// Resolve a possibly-relative link against the base origin.
pub fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix('/') {
        format!("{}/{}", base.trim_end_matches('/'), rest)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), href)
    }
}

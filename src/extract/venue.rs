//! Venue extraction.

use crate::rules::SiteRules;
use scraper::Html;

use super::element_text;

/// Scan the heading-like selectors in priority order for a known venue name.
///
/// Returns the first vocabulary member contained in any matching element's
/// text, or `None` if no selector yields one.
pub fn extract_venue(rules: &SiteRules, doc: &Html) -> Option<String> {
    for selector in &rules.venue_selectors {
        for el in doc.select(selector) {
            let text = element_text(el);
            if text.is_empty() {
                continue;
            }
            for venue in &rules.venues {
                if text.contains(venue.as_str()) {
                    return Some(venue.clone());
                }
            }
        }
    }
    None
}

//! Candidate page discovery.
//!
//! For one calendar date, tries every listing URL template in the rules and
//! unions the detail-page links found on whichever listings load. Template
//! failures are silent and non-fatal; the result is a sorted, deduplicated
//! URL set, which fixes the per-date processing order.

use crate::extract::links;
use crate::fetcher::PageFetcher;
use crate::rules::SiteRules;
use chrono::NaiveDate;
use scraper::Html;
use std::collections::BTreeSet;
use tracing::debug;

/// Discover candidate detail-page URLs for one date.
///
/// Returns an empty set if every listing template fails. No retry beyond
/// what the fetcher itself performs.
pub async fn discover_candidates(
    rules: &SiteRules,
    fetcher: &dyn PageFetcher,
    date: NaiveDate,
) -> BTreeSet<String> {
    let mut candidates = BTreeSet::new();

    for listing_url in rules.listing_urls(date) {
        let Some(page) = fetcher.fetch(&listing_url).await else {
            debug!(url = %listing_url, "Listing template failed");
            continue;
        };
        let found = scan_listing(rules, page.body());
        debug!(url = %listing_url, links = found.len(), "Scanned listing");
        candidates.extend(found);
    }

    debug!(%date, candidates = candidates.len(), "Discovery complete");
    candidates
}

/// Scan one listing body for detail-page links.
fn scan_listing(rules: &SiteRules, body: &str) -> Vec<String> {
    let doc = Html::parse_document(body);
    links::find_links(&doc, &rules.detail_marker, &rules.base_url)
}

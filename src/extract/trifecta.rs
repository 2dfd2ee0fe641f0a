//! Trifecta payout extraction.

use crate::rules::SiteRules;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::{element_text, flat_text, normalize_digits};

static ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("static CSS selector is valid"));

/// Extract the trifecta combination and payout from a payout page.
///
/// First pass: a single pattern over the flattened page text (marker,
/// dash-separated combination, yen amount). Fallback: scan each table row's
/// concatenated text for the marker with separately captured combination
/// and amount. Returns `(None, None)` when neither pass matches; the two
/// values are always present together or absent together.
pub fn extract_trifecta(rules: &SiteRules, doc: &Html) -> (Option<String>, Option<u64>) {
    let text = normalize_digits(&flat_text(doc));

    if let Some(caps) = rules.trifecta_line.captures(&text) {
        if let (Some(combo), Some(amount)) = (caps.get(1), caps.get(2)) {
            if let Some(pay) = parse_amount(amount.as_str()) {
                return (Some(combo.as_str().to_string()), Some(pay));
            }
        }
    }

    for row in doc.select(&ROW) {
        let row_text = normalize_digits(&element_text(row));
        if !row_text.contains(rules.trifecta_marker.as_str()) {
            continue;
        }
        let combo = rules
            .trifecta_combo
            .find(&row_text)
            .map(|m| m.as_str().to_string());
        let pay = rules
            .trifecta_amount
            .captures(&row_text)
            .and_then(|c| c.get(1))
            .and_then(|m| parse_amount(m.as_str()));
        if let (Some(combo), Some(pay)) = (combo, pay) {
            return (Some(combo), Some(pay));
        }
    }

    (None, None)
}

/// Strip thousands separators and parse a yen amount.
fn parse_amount(s: &str) -> Option<u64> {
    s.replace(',', "").parse().ok()
}

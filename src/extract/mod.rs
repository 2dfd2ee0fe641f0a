//! Page extractors.
//!
//! Every extractor is a pure function from parsed markup to an optional
//! partial result. They are best-effort heuristics and must never raise:
//! a missing element or unparseable number becomes "field absent", never an
//! error. The pipeline calls the string-based entry points below so that no
//! parsed document is ever held across an await point.

use crate::rules::SiteRules;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html};
use std::str::FromStr;

pub mod links;
pub mod meta;
pub mod odds;
pub mod trifecta;
pub mod venue;

pub use meta::RaceMeta;
pub use odds::OddsRow;

/// Everything the pipeline needs from one detail page.
#[derive(Debug, Clone)]
pub struct DetailAnalysis {
    /// Venue name, if one of the known venues was found
    pub venue: Option<String>,
    /// Absolute URL of the win-odds page, if linked
    pub odds_url: Option<String>,
    /// Absolute URL of the payout page, if linked
    pub dividend_url: Option<String>,
    /// Heading-derived race metadata
    pub meta: RaceMeta,
}

/// Analyze a detail page body in one pass.
pub fn analyze_detail(rules: &SiteRules, body: &str) -> DetailAnalysis {
    let doc = Html::parse_document(body);
    let heading = heading_text(rules, &doc);
    let text = flat_text(&doc);

    DetailAnalysis {
        venue: venue::extract_venue(rules, &doc),
        odds_url: links::find_link(&doc, &rules.odds_marker, &rules.base_url),
        dividend_url: links::find_link(&doc, &rules.dividend_marker, &rules.base_url),
        meta: meta::extract_meta(rules, &heading, &text),
    }
}

/// Extract the win-odds table from an odds page body,
/// sorted by ascending popularity.
pub fn odds_rows(body: &str) -> Vec<OddsRow> {
    odds::extract_odds(&Html::parse_document(body))
}

/// Extract the trifecta result from a payout page body.
/// Both values are present or both are absent.
pub fn trifecta_result(rules: &SiteRules, body: &str) -> (Option<String>, Option<u64>) {
    trifecta::extract_trifecta(rules, &Html::parse_document(body))
}

/// First non-empty heading text in selector priority order.
fn heading_text(rules: &SiteRules, doc: &Html) -> String {
    for selector in &rules.heading_selectors {
        for el in doc.select(selector) {
            let text = element_text(el);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

/// Text content of an element, nodes joined with single spaces.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text content of a whole document, nodes joined with single spaces.
pub(crate) fn flat_text(doc: &Html) -> String {
    doc.root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize fullwidth digits and punctuation to their ASCII forms.
pub(crate) fn normalize_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            '－' | '−' | '‐' | '―' => '-',
            '，' => ',',
            '．' => '.',
            _ => c,
        })
        .collect()
}

/// Parse the digits embedded in a cell, ignoring everything else.
/// "1着" parses to 1, "３" to 3; a cell without digits yields `None`.
pub(crate) fn digits_only(s: &str) -> Option<u32> {
    let digits: String = normalize_digits(s)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Parse a positive decimal from a cell, tolerating surrounding noise.
pub(crate) fn parse_decimal(s: &str) -> Option<Decimal> {
    let cleaned: String = normalize_digits(s)
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    Decimal::from_str(&cleaned)
        .ok()
        .filter(|d| *d > Decimal::ZERO)
}

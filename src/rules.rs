//! Site-specific scraping rules.
//!
//! Every heuristic the extractors and discovery rely on - listing URL
//! templates, link path markers, selector priority lists, the venue
//! vocabulary and the field regexes - lives in one [`SiteRules`] value.
//! The defaults target the Rakuten Keiba local-racing site; a different
//! site layout is a different `SiteRules`, not different code.

use crate::{CourseDir, Going, Surface};
use chrono::NaiveDate;
use regex::Regex;
use scraper::Selector;

/// The 15 local (NAR) venues the default rules recognize.
pub const VENUES: [&str; 15] = [
    "門別", "盛岡", "水沢", "浦和", "船橋", "大井", "川崎", "金沢", "笠松", "名古屋", "園田",
    "姫路", "高知", "佐賀", "帯広",
];

/// Strategy table for one target site.
///
/// Selector lists are priority-ordered: extractors take the first match in
/// list order. Listing templates are redundant discovery strategies whose
/// results are unioned, not alternatives.
#[derive(Debug, Clone)]
pub struct SiteRules {
    /// Base origin used to absolutize relative links, without trailing slash
    pub base_url: String,
    /// Listing page URL templates; `{base}` and `{date}` (YYYYMMDD) are
    /// substituted per date
    pub listing_templates: Vec<String>,
    /// Path marker identifying race detail pages in listing links
    pub detail_marker: String,
    /// Path marker identifying the win-odds page in detail links
    pub odds_marker: String,
    /// Path marker identifying the payout page in detail links
    pub dividend_marker: String,
    /// Priority-ordered selectors scanned for the venue name
    pub venue_selectors: Vec<Selector>,
    /// Priority-ordered selectors scanned for the race heading
    pub heading_selectors: Vec<Selector>,
    /// Closed venue vocabulary
    pub venues: Vec<String>,
    /// Captures the stable race key from a detail URL
    pub race_key: Regex,
    /// Captures the distance digits before the meters marker
    pub distance: Regex,
    /// Captures the race number digits before the race marker
    pub race_no: Regex,
    /// Captures a labeled going value ("馬場: 良")
    pub going_label: Regex,
    /// Text marker labeling the trifecta payout
    pub trifecta_marker: String,
    /// Single-pass trifecta pattern over flattened page text
    pub trifecta_line: Regex,
    /// Combination pattern for the per-row trifecta fallback
    pub trifecta_combo: Regex,
    /// Amount pattern for the per-row trifecta fallback
    pub trifecta_amount: Regex,
    /// Surface terms in priority order, specific before general
    pub surface_terms: Vec<(String, Surface)>,
    /// Single-character course direction markers
    pub direction_chars: Vec<(char, CourseDir)>,
    /// Closed going vocabulary
    pub going_terms: Vec<(String, Going)>,
}

impl SiteRules {
    /// Listing page URLs to try for one date, in template order.
    pub fn listing_urls(&self, date: NaiveDate) -> Vec<String> {
        let ymd = date.format("%Y%m%d").to_string();
        self.listing_templates
            .iter()
            .map(|t| t.replace("{base}", &self.base_url).replace("{date}", &ymd))
            .collect()
    }

    /// Stable race identifier for a detail URL, falling back to the URL.
    pub fn race_key_for(&self, url: &str) -> String {
        self.race_key
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| url.to_string())
    }

    /// Map a going term from the closed vocabulary to its enum value.
    pub fn going_of(&self, term: &str) -> Option<Going> {
        self.going_terms
            .iter()
            .find(|(t, _)| t == term)
            .map(|(_, g)| *g)
    }

    /// Replace the trifecta marker, rebuilding the single-pass pattern so
    /// both extraction passes stay keyed to the same label.
    pub fn with_trifecta_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        self.trifecta_line = trifecta_line_for(&marker);
        self.trifecta_marker = marker;
        self
    }
}

fn selectors(css: &[&str]) -> Vec<Selector> {
    css.iter()
        .map(|s| Selector::parse(s).expect("static CSS selector is valid"))
        .collect()
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex is valid")
}

/// Single-pass trifecta pattern for a marker: label, dash-separated
/// combination, comma-grouped yen amount.
fn trifecta_line_for(marker: &str) -> Regex {
    regex(&format!(
        r"(?s){}.*?([0-9]+-[0-9]+-[0-9]+).*?([0-9][0-9,]*)円",
        regex::escape(marker)
    ))
}

impl Default for SiteRules {
    fn default() -> Self {
        Self {
            base_url: "https://keiba.rakuten.co.jp".to_string(),
            listing_templates: vec![
                "{base}/schedule/list/{date}".to_string(),
                "{base}/race_card/list/{date}".to_string(),
                "{base}/race_performance/list/{date}".to_string(),
            ],
            detail_marker: "/race_card/list/RACEID/".to_string(),
            odds_marker: "/odds/tanfuku/".to_string(),
            dividend_marker: "/race_performance/list/RACEID/".to_string(),
            venue_selectors: selectors(&["h1", "h2", ".racecourse", "title"]),
            heading_selectors: selectors(&["h2", ".race-data", "h1"]),
            venues: VENUES.iter().map(|v| v.to_string()).collect(),
            race_key: regex(r"RACEID/(\d+)"),
            distance: regex(r"(\d+)\s*[mｍ]"),
            race_no: regex(r"(\d+)\s*[RＲ]"),
            going_label: regex(r"馬場(?:状態)?\s*[:：]\s*(不良|稍重|重|良)"),
            trifecta_marker: "3連単".to_string(),
            trifecta_line: trifecta_line_for("3連単"),
            trifecta_combo: regex(r"[0-9]+-[0-9]+-[0-9]+"),
            trifecta_amount: regex(r"([0-9][0-9,]*)円"),
            surface_terms: vec![
                ("ダート".to_string(), Surface::Dirt),
                ("ダ".to_string(), Surface::Dirt),
                ("芝".to_string(), Surface::Turf),
            ],
            direction_chars: vec![
                ('右', CourseDir::Right),
                ('左', CourseDir::Left),
                ('直', CourseDir::Straight),
            ],
            going_terms: vec![
                ("良".to_string(), Going::Good),
                ("稍重".to_string(), Going::SlightlyHeavy),
                ("重".to_string(), Going::Heavy),
                ("不良".to_string(), Going::Bad),
            ],
        }
    }
}

//! Win-odds table extraction.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use scraper::{Html, Selector};

use super::{digits_only, element_text, parse_decimal};

static TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("static CSS selector is valid"));
static ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("static CSS selector is valid"));
static CELL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td, th").expect("static CSS selector is valid"));

/// One starter's entry from the win-odds table.
#[derive(Debug, Clone, PartialEq)]
pub struct OddsRow {
    /// Popularity rank (1 = favorite)
    pub popularity: u32,
    /// Starter (saddlecloth) number
    pub horse_no: u32,
    /// Win odds
    pub win_odds: Decimal,
}

/// Extract starter rows from the first table of an odds page.
///
/// A row needs at least 4 cells: popularity digits in the first, starter
/// number digits in the second, a decimal in the fourth. Rows that fail any
/// numeric conversion are dropped silently, never the whole table. Output is
/// sorted by ascending popularity; this is the canonical horse-row order.
pub fn extract_odds(doc: &Html) -> Vec<OddsRow> {
    let Some(table) = doc.select(&TABLE).next() else {
        return Vec::new();
    };

    let mut rows: Vec<OddsRow> = table
        .select(&ROW)
        .filter_map(|row| {
            let cells: Vec<String> = row.select(&CELL).map(element_text).collect();
            if cells.len() < 4 {
                return None;
            }
            Some(OddsRow {
                popularity: digits_only(&cells[0])?,
                horse_no: digits_only(&cells[1])?,
                win_odds: parse_decimal(&cells[3])?,
            })
        })
        .collect();

    rows.sort_by_key(|r| r.popularity);
    rows
}

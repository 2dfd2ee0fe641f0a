//! Race metadata extraction from heading text.

use crate::rules::SiteRules;
use crate::{CourseDir, Going, Surface};

use super::normalize_digits;

/// Partial race metadata from a heading string.
///
/// Each field is independently optional; a miss on one never blocks the
/// others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceMeta {
    /// Race number within the day's card
    pub race_no: Option<u32>,
    /// Distance in meters
    pub distance_m: Option<u32>,
    /// Racing surface
    pub surface: Option<Surface>,
    /// Course direction
    pub course_dir: Option<CourseDir>,
    /// Going (track condition)
    pub going: Option<Going>,
}

/// Extract race metadata from a heading, with the full page text as the
/// fallback source for the going.
pub fn extract_meta(rules: &SiteRules, heading: &str, page_text: &str) -> RaceMeta {
    let h = normalize_digits(heading);

    let race_no = rules
        .race_no
        .captures(&h)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    let distance_m = rules
        .distance
        .captures(&h)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    // Priority-ordered so the more specific term wins
    let surface = rules
        .surface_terms
        .iter()
        .find(|(term, _)| h.contains(term.as_str()))
        .map(|(_, s)| *s);

    let course_dir = h
        .chars()
        .find_map(|c| {
            rules
                .direction_chars
                .iter()
                .find(|(marker, _)| *marker == c)
        })
        .map(|(_, d)| *d);

    let going = extract_going(rules, &h, page_text);

    RaceMeta {
        race_no,
        distance_m,
        surface,
        course_dir,
        going,
    }
}

/// Going lookup: labeled pattern in the heading, then a bare vocabulary
/// token in the heading, then the labeled pattern over the full page text.
fn extract_going(rules: &SiteRules, heading: &str, page_text: &str) -> Option<Going> {
    if let Some(g) = going_label(rules, heading) {
        return Some(g);
    }

    for token in heading.split_whitespace() {
        if let Some(g) = rules.going_of(token) {
            return Some(g);
        }
    }

    going_label(rules, page_text)
}

fn going_label(rules: &SiteRules, text: &str) -> Option<Going> {
    rules
        .going_label
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| rules.going_of(m.as_str()))
}

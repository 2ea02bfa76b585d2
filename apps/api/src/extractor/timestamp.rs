//! Relative-timestamp markers ("3 Monate", "vor 2 Wochen", "5d").
//!
//! The marker is the structural delimiter of an exported post: everything
//! before it is the author header, everything after it is the body.

use chrono::{Days, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeUnit {
    Hours,
    Days,
    Weeks,
    Months,
}

impl RelativeUnit {
    fn from_token(token: &str) -> Option<Self> {
        let token = token.to_lowercase();
        if token == "mo" || token.starts_with("monat") {
            Some(RelativeUnit::Months)
        } else if token == "w" || token.starts_with("woche") {
            Some(RelativeUnit::Weeks)
        } else if token == "d" || token.starts_with("tag") {
            Some(RelativeUnit::Days)
        } else if token == "h" || token.starts_with("stunde") {
            Some(RelativeUnit::Hours)
        } else {
            None
        }
    }
}

/// A located marker. `start..end` is the byte span in the searched text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampMarker {
    pub start: usize,
    pub end: usize,
    pub amount: u32,
    pub unit: RelativeUnit,
    /// `"{amount} {unit as written}"`, e.g. `"3 Monate"`.
    pub label: String,
}

impl TimestampMarker {
    /// Date the post was published, counted back from `reference`.
    /// Falls back to `reference` itself if the offset is out of range.
    pub fn approximate_date(&self, reference: NaiveDate) -> NaiveDate {
        let amount = u64::from(self.amount);
        let shifted = match self.unit {
            RelativeUnit::Hours => reference.checked_sub_days(Days::new(amount / 24)),
            RelativeUnit::Days => reference.checked_sub_days(Days::new(amount)),
            RelativeUnit::Weeks => reference.checked_sub_days(Days::new(amount.saturating_mul(7))),
            RelativeUnit::Months => reference.checked_sub_months(Months::new(self.amount)),
        };
        shifted.unwrap_or(reference)
    }
}

static BULLETED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d+)\s+(Monat(?:en|e)?|Wochen?|Tag(?:en|e)?|Stunden?)(?:\s*[•·])?")
        .expect("valid regex")
});
static PLAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+)\s+(Monat(?:en|e)?|Wochen?|Tag(?:en|e)?|Stunden?)")
        .expect("valid regex")
});
static WITH_VOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bvor\s+(\d+)\s+(Monat(?:en|e)?|Wochen?|Tag(?:en|e)?|Stunden?)")
        .expect("valid regex")
});
static ABBREVIATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*(mo|w|d|h)\b").expect("valid regex"));

fn capture_marker(re: &Regex, text: &str) -> Option<TimestampMarker> {
    let caps = re.captures(text)?;
    let whole = caps.get(0)?;
    let amount_str = caps.get(1)?.as_str();
    let unit_str = caps.get(2)?.as_str();
    Some(TimestampMarker {
        start: whole.start(),
        end: whole.end(),
        amount: amount_str.parse().ok()?,
        unit: RelativeUnit::from_token(unit_str)?,
        label: format!("{amount_str} {unit_str}"),
    })
}

fn match_bulleted(text: &str) -> Option<TimestampMarker> {
    capture_marker(&BULLETED, text)
}

fn match_plain(text: &str) -> Option<TimestampMarker> {
    capture_marker(&PLAIN, text)
}

fn match_with_vor(text: &str) -> Option<TimestampMarker> {
    capture_marker(&WITH_VOR, text)
}

fn match_abbreviated(text: &str) -> Option<TimestampMarker> {
    capture_marker(&ABBREVIATED, text)
}

type Matcher = fn(&str) -> Option<TimestampMarker>;

/// Tried in order; the first hit wins.
const TIMESTAMP_MATCHERS: [Matcher; 4] =
    [match_bulleted, match_plain, match_with_vor, match_abbreviated];

pub fn find_marker(text: &str) -> Option<TimestampMarker> {
    TIMESTAMP_MATCHERS.iter().find_map(|matcher| matcher(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_primary_marker_consumes_bullet() {
        let text = "Jane Doe 3 Monate • Hello";
        let marker = find_marker(text).unwrap();
        assert_eq!(marker.label, "3 Monate");
        assert_eq!(&text[marker.end..], " Hello");
        assert_eq!(marker.unit, RelativeUnit::Months);
    }

    #[test]
    fn test_lowercase_unit_uses_case_insensitive_fallback() {
        let marker = find_marker("Posted 2 wochen ago").unwrap();
        assert_eq!(marker.amount, 2);
        assert_eq!(marker.unit, RelativeUnit::Weeks);
    }

    #[test]
    fn test_vor_marker() {
        let text = "Header vor 5 Tagen Body";
        let marker = find_marker(text).unwrap();
        assert_eq!(marker.amount, 5);
        assert_eq!(marker.unit, RelativeUnit::Days);
        assert_eq!(marker.label, "5 Tagen");
        assert_eq!(&text[marker.end..], " Body");
    }

    #[test]
    fn test_abbreviated_marker() {
        let marker = find_marker("Jane Doe 5d Text").unwrap();
        assert_eq!(marker.label, "5 d");
        assert_eq!(marker.unit, RelativeUnit::Days);
        let marker = find_marker("Jane Doe 2mo Text").unwrap();
        assert_eq!(marker.unit, RelativeUnit::Months);
    }

    #[test]
    fn test_no_marker() {
        assert!(find_marker("Just some words without any time reference").is_none());
        assert!(find_marker("We have 500 Follower and 12 days").is_none());
    }

    #[test]
    fn test_first_match_wins_in_text_order() {
        let marker = find_marker("1 Woche und 3 Monate").unwrap();
        assert_eq!(marker.start, 0);
        assert_eq!(marker.unit, RelativeUnit::Weeks);
    }

    #[test]
    fn test_approximate_date_units() {
        let reference = date("2024-05-31");
        let m = find_marker("3 Monate").unwrap();
        assert_eq!(m.approximate_date(reference), date("2024-02-29"));
        let w = find_marker("2 Wochen").unwrap();
        assert_eq!(w.approximate_date(reference), date("2024-05-17"));
        let h = find_marker("5 Stunden").unwrap();
        assert_eq!(h.approximate_date(reference), reference);
    }
}

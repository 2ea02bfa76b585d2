//! Boilerplate stripping and whitespace repair for extracted page text.

use once_cell::sync::Lazy;
use regex::Regex;

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("boilerplate pattern must compile"))
        .collect()
}

/// Print headers and legal footers, removed before any other normalization.
/// Order matters: the timestamp header must go before the generic footers.
static PAGE_CHROME: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"(?is)\d{2}\.\d{2}\.\d{2}, \d{2}:\d{2}.*?LinkedIn\n",
        r"(?is)LinkedIn Corporation.*?\d{4}",
        r"(?is)Info Barrierefreiheit.*?Mehr",
        r"(?is)Nutzungsrichtlinien.*?Mehr",
        r"(?is)Cookie-Richtlinie.*?Mehr",
        r"(?is)Anzeigenauswahl.*?herunterladen",
        r"(?is)Zugang zu exklusiven.*?testen",
        r"(?is)Jetzt Premium.*?EUR",
        r"(?i)Region [^\n]+\n",
    ])
});

/// UI elements that survive the first pass, often with letters split apart
/// by the extractor ("t esten", "Pr emium").
static UI_CHROME: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"(?is)Zugang zu exklusiven.*?t ?esten",
        r"(?is)Jetzt Pr ?emium.*?EUR",
        r"(?i)Profilbesuche \d+",
        r"(?i)Impr ?essions v ?on Beiträgen \d+",
        r"(?i)Region [^\n]+",
        r"(?is)LinkedIn Corporation.*?\d{4}",
        r"(?is)Info Barrierefreiheit.*?Mehr",
        r"(?is)Anzeigenauswahl.*?herunterladen",
    ])
});

static CAMEL_JOIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zäöüß]{2,})([A-ZÄÖÜ][a-zäöüß]{2,})").expect("valid regex"));
static HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

fn remove_all(text: &str, patterns: &[Regex]) -> String {
    patterns.iter().fold(text.to_string(), |acc, re| {
        re.replace_all(&acc, "").into_owned()
    })
}

/// Collapses horizontal whitespace, trims every line and keeps at most one
/// blank line between paragraphs.
pub fn normalize_whitespace(text: &str) -> String {
    let collapsed = HORIZONTAL_WS.replace_all(text, " ");
    let joined = collapsed
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

/// Re-inserts the space the extractor dropped between two words
/// (`"meinPost"` → `"mein Post"`). Short mixed-case tokens such as `GmbH`
/// or `LinkedIn` are left alone.
pub fn repair_camel_case(text: &str) -> String {
    CAMEL_JOIN.replace_all(text, "$1 $2").into_owned()
}

/// Removes UI chrome (upsell banners, counters, footers) from a text block.
pub fn strip_ui_chrome(text: &str) -> String {
    remove_all(text, &UI_CHROME)
}

/// Full cleaning pass applied to every page before segmentation.
pub fn clean_page(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    let without_chrome = remove_all(&decoded, &PAGE_CHROME);
    let repaired = repair_camel_case(&without_chrome);
    let normalized = normalize_whitespace(&repaired);
    normalize_whitespace(&strip_ui_chrome(&normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_html_entities() {
        assert_eq!(clean_page("Tom &amp; Jerry"), "Tom & Jerry");
    }

    #[test]
    fn test_removes_linkedin_corporation_footer() {
        let cleaned = clean_page("Post text\nLinkedIn Corporation © 2024\nmore");
        assert!(!cleaned.contains("LinkedIn Corporation"));
        assert!(cleaned.contains("Post text"));
        assert!(cleaned.contains("more"));
    }

    #[test]
    fn test_removes_print_header() {
        let cleaned = clean_page("12.03.24, 14:22 (20) Beitrag | LinkedIn\nActual content");
        assert_eq!(cleaned, "Actual content");
    }

    #[test]
    fn test_removes_premium_upsell() {
        let cleaned = clean_page("Hallo\nJetzt Premium für 0 EUR testen\nWelt");
        assert!(!cleaned.contains("Premium"));
    }

    #[test]
    fn test_removes_profile_counters() {
        let cleaned = clean_page("Profilbesuche 42\nImpressions von Beiträgen 1200\nText");
        assert_eq!(cleaned, "Text");
    }

    #[test]
    fn test_camel_case_repair() {
        assert_eq!(repair_camel_case("meinPost ist da"), "mein Post ist da");
    }

    #[test]
    fn test_camel_case_keeps_entity_suffixes() {
        assert_eq!(repair_camel_case("Acme GmbH"), "Acme GmbH");
        assert_eq!(repair_camel_case("LinkedIn"), "LinkedIn");
    }

    #[test]
    fn test_normalize_whitespace_keeps_line_structure() {
        let normalized = normalize_whitespace("  a   b \n\n\n\n  c\t d  ");
        assert_eq!(normalized, "a b\n\nc d");
    }
}

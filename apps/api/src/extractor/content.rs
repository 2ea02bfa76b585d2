use once_cell::sync::Lazy;
use regex::Regex;

use crate::extractor::cleaning::strip_ui_chrome;
use crate::extractor::models::{
    truncate_chars, truncate_with_ellipsis, MAX_CONTENT_CHARS, MAX_TITLE_CHARS,
};

pub const DEFAULT_TITLE: &str = "LinkedIn Post";

/// The company suffix is only appended while the title stays shorter than this.
const COMPANY_SUFFIX_LIMIT: usize = 80;

/// Lines mentioning any of these are UI residue, not post text.
const UI_LINE_KEYWORDS: &[&str] = &[
    "impressions",
    "profilbesuche",
    "premium",
    "linkedin corporation",
];

static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\w+").expect("valid regex"));

/// Post body: UI chrome and blank lines dropped, capped at 3000 characters.
pub fn clean_content(raw: &str) -> String {
    let stripped = strip_ui_chrome(raw);
    let lines: Vec<&str> = stripped
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let lower = line.to_lowercase();
            !UI_LINE_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .collect();
    truncate_chars(&lines.join("\n"), MAX_CONTENT_CHARS)
}

/// First sentence when it is a question, otherwise the first line; then
/// `" - {company}"` if that stays under 80 characters; capped at 150.
pub fn derive_title(content: &str, company: Option<&str>) -> String {
    let content = content.trim();
    if content.is_empty() {
        return DEFAULT_TITLE.to_string();
    }

    let base = leading_question(content).unwrap_or_else(|| first_line(content));
    let mut title = base.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Some(company) = company.filter(|c| !c.trim().is_empty()) {
        let combined = format!("{title} - {company}");
        if combined.chars().count() < COMPANY_SUFFIX_LIMIT {
            title = combined;
        }
    }

    let title = truncate_with_ellipsis(&title, MAX_TITLE_CHARS);
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    }
}

fn leading_question(content: &str) -> Option<&str> {
    let end = content.find(['.', '!', '?'])?;
    content[end..]
        .starts_with('?')
        .then(|| content[..=end].trim())
}

fn first_line(content: &str) -> &str {
    content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or(content)
}

pub fn extract_hashtags(content: &str) -> String {
    HASHTAG
        .find_iter(content)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

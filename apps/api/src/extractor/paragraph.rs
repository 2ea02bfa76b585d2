//! Format-agnostic splitter for PDFs that are not LinkedIn exports: blank-line
//! separated sections are accumulated into posts of a reasonable size.

use std::sync::Arc;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::extractor::backend::{collect_pages, PdfTextBackend};
use crate::extractor::content::extract_hashtags;
use crate::extractor::models::{truncate_chars, ExtractedPost, MAX_CONTENT_CHARS};
use crate::extractor::{posts_or_placeholder, ExtractError, ExtractPosts};

const MAX_PAGES: usize = 50;
const MAX_POSTS: usize = 20;
const MAX_FALLBACK_PARAGRAPHS: usize = 10;

/// A section run becomes a post once it is longer than this and ends a sentence.
const MIN_POST_CHARS: usize = 200;
/// Leftovers and fallback paragraphs must be longer than this.
const MIN_REMAINDER_CHARS: usize = 100;

const MAX_TITLE_LINE_CHARS: usize = 100;
const UNTITLED: &str = "Untitled Post";
const SAMPLE_CHARS: usize = 500;

static METADATA_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:\d{1,2}\.\d{1,2}\.\d{4}|\d+\s+(?:Likes?|Kommentare?|Comments?)|Veröffentlicht|Published|Posted|Bearbeitet|Edited)",
    )
    .expect("valid regex")
});
static GERMAN_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}\.\d{1,2}\.\d{4}\b").expect("valid regex"));
static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("valid regex"));
static ENGAGEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s+(Likes?|Kommentare?|Comments?)\b").expect("valid regex")
});

pub struct ParagraphExtractor {
    backend: Arc<dyn PdfTextBackend>,
    max_text_chars: usize,
}

impl ParagraphExtractor {
    pub fn new(backend: Arc<dyn PdfTextBackend>, max_text_chars: usize) -> Self {
        ParagraphExtractor {
            backend,
            max_text_chars,
        }
    }

    pub fn try_extract(&self, bytes: &[u8]) -> Result<Vec<ExtractedPost>, ExtractError> {
        let pages = collect_pages(self.backend.as_ref(), bytes, MAX_PAGES, self.max_text_chars)?;
        let full_text = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if full_text.trim().is_empty() {
            return Err(ExtractError::NoText);
        }

        let posts: Vec<ExtractedPost> = split_into_posts(&full_text)
            .iter()
            .take(MAX_POSTS)
            .map(|section| section_to_post(section))
            .collect();
        info!(pages = pages.len(), posts = posts.len(), "Split PDF into paragraphs");

        if posts.is_empty() {
            return Ok(vec![imported_content(&full_text)]);
        }
        Ok(posts)
    }
}

impl ExtractPosts for ParagraphExtractor {
    fn extract(&self, bytes: &[u8]) -> Vec<ExtractedPost> {
        posts_or_placeholder(self.try_extract(bytes))
    }
}

/// Groups blank-line separated sections into posts. When no group qualifies,
/// falls back to single long lines.
pub fn split_into_posts(text: &str) -> Vec<String> {
    let ends_sentence = |s: &str| s.ends_with(['.', '!', '?']);

    let mut posts = Vec::new();
    let mut current = String::new();

    for section in text.split("\n\n").map(str::trim).filter(|s| !s.is_empty()) {
        current.push_str(section);
        current.push_str("\n\n");

        if current.chars().count() > MIN_POST_CHARS && ends_sentence(section) {
            posts.push(current.trim().to_string());
            current.clear();
            if posts.len() >= MAX_POSTS {
                break;
            }
        }
    }

    let rest = current.trim();
    if rest.chars().count() > MIN_REMAINDER_CHARS {
        posts.push(rest.to_string());
    }

    if posts.is_empty() {
        return text
            .lines()
            .map(str::trim)
            .filter(|p| p.chars().count() > MIN_REMAINDER_CHARS)
            .take(MAX_FALLBACK_PARAGRAPHS)
            .map(str::to_string)
            .collect();
    }
    posts
}

fn section_to_post(section: &str) -> ExtractedPost {
    let engagement = extract_engagement(section);
    ExtractedPost {
        title: section_title(section),
        content: section_content(section),
        hashtags: extract_hashtags(section),
        date: extract_date(section),
        engagement: (!engagement.is_empty()).then_some(engagement),
        ..Default::default()
    }
}

fn section_title(section: &str) -> String {
    match section.lines().map(str::trim).find(|l| !l.is_empty()) {
        Some(line) if line.chars().count() > MAX_TITLE_LINE_CHARS => {
            format!("{}...", truncate_chars(line, MAX_TITLE_LINE_CHARS))
        }
        Some(line) => line.to_string(),
        None => UNTITLED.to_string(),
    }
}

fn section_content(section: &str) -> String {
    let lines: Vec<&str> = section
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !METADATA_LINE.is_match(l))
        .collect();
    truncate_chars(&lines.join("\n"), MAX_CONTENT_CHARS)
}

/// First `dd.mm.yyyy` (normalised to ISO) or `yyyy-mm-dd` date in the text.
pub fn extract_date(text: &str) -> Option<String> {
    let german = GERMAN_DATE
        .find_iter(text)
        .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%d.%m.%Y").ok());
    if let Some(date) = german {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    ISO_DATE
        .find_iter(text)
        .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Every `N Likes` / `N Kommentare` / `N Comments` mention, comma joined.
pub fn extract_engagement(text: &str) -> String {
    ENGAGEMENT
        .captures_iter(text)
        .map(|c| format!("{} {}", &c[1], &c[2]))
        .collect::<Vec<_>>()
        .join(", ")
}

fn imported_content(full_text: &str) -> ExtractedPost {
    let content = if full_text.chars().count() > SAMPLE_CHARS {
        format!("{}...", truncate_chars(full_text, SAMPLE_CHARS))
    } else {
        full_text.to_string()
    };
    ExtractedPost {
        title: "Imported content".to_string(),
        content,
        ..Default::default()
    }
}

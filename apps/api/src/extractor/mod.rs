//! PDF post extractor: turns an exported LinkedIn PDF into post-like records.
//!
//! Pipeline: per-page text (backend) → boilerplate stripping → reactions /
//! content page split → timestamp marker → header metadata + body content.
//! Everything after text extraction is a pure function of the page texts and
//! `ExtractorOptions`; failures never reach the caller, they become a
//! placeholder post tagged `#import #error`.
//!
//! Extraction is CPU-bound and synchronous: callers on the async runtime must
//! run it inside `tokio::task::spawn_blocking`.

pub mod backend;
pub mod cleaning;
pub mod content;
pub mod engagement;
pub mod legacy;
pub mod metadata;
pub mod models;
pub mod paragraph;
pub mod timestamp;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::extractor::backend::{collect_pages, BackendError, PageText, PdfTextBackend};
use crate::extractor::cleaning::clean_page;
use crate::extractor::content::{clean_content, derive_title, extract_hashtags};
use crate::extractor::engagement::{
    is_reactions_page, merge_engagement, summarize_engagement, EngagementMerge, PageEngagement,
};
use crate::extractor::legacy::LegacyExtractor;
use crate::extractor::metadata::{parse_metadata, PostMetadata};
use crate::extractor::models::{truncate_chars, ExtractedPost};
use crate::extractor::paragraph::ParagraphExtractor;
use crate::extractor::timestamp::find_marker;

pub const DEFAULT_MAX_PAGES: usize = 10;
pub const DEFAULT_MAX_TEXT_CHARS: usize = 100_000;

/// Characters of raw text kept in the "nothing recognised" sample post.
const SAMPLE_POST_CHARS: usize = 1000;

/// A header found after the marker (marker-first layout) is only accepted
/// when the separator appears within this many bytes.
const MAX_TRAILING_HEADER_BYTES: usize = 200;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("PDF contains no extractable text")]
    NoText,

    #[error("could not read PDF file: {0}")]
    Io(#[from] std::io::Error),
}

/// Which segmentation strategy an upload goes through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportParser {
    /// LinkedIn-specific marker-based pipeline.
    #[default]
    Linkedin,
    /// LinkedIn pipeline plus a simplified second attempt before giving up.
    Legacy,
    /// Format-agnostic paragraph splitter.
    Paragraph,
}

impl FromStr for ImportParser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linkedin" => Ok(ImportParser::Linkedin),
            "legacy" => Ok(ImportParser::Legacy),
            "paragraph" => Ok(ImportParser::Paragraph),
            other => Err(format!(
                "unknown import parser '{other}' (expected linkedin, legacy or paragraph)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorOptions {
    pub max_pages: usize,
    pub max_text_chars: usize,
    pub engagement_merge: EngagementMerge,
    /// "Today" for turning relative markers into dates. Injected so the same
    /// input always produces the same output.
    pub reference_date: NaiveDate,
}

impl ExtractorOptions {
    pub fn new(reference_date: NaiveDate) -> Self {
        ExtractorOptions {
            max_pages: DEFAULT_MAX_PAGES,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            engagement_merge: EngagementMerge::default(),
            reference_date,
        }
    }
}

/// Anything that turns PDF bytes into a non-empty list of posts.
pub trait ExtractPosts: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Vec<ExtractedPost>;

    /// Reads a spooled upload from disk. An unreadable file becomes the error
    /// placeholder like any other failure.
    fn extract_file(&self, path: &Path) -> Vec<ExtractedPost> {
        match std::fs::read(path) {
            Ok(bytes) => self.extract(&bytes),
            Err(e) => posts_or_placeholder(Err(ExtractError::Io(e))),
        }
    }
}

/// Builds the extractor selected by configuration.
pub fn build_extractor(
    parser: ImportParser,
    backend: Arc<dyn PdfTextBackend>,
    options: ExtractorOptions,
) -> Box<dyn ExtractPosts> {
    match parser {
        ImportParser::Linkedin => Box::new(PostExtractor::new(backend, options)),
        // Legacy pairs its own pdf-extract and lopdf paths.
        ImportParser::Legacy => Box::new(LegacyExtractor::new(options)),
        ImportParser::Paragraph => {
            Box::new(ParagraphExtractor::new(backend, options.max_text_chars))
        }
    }
}

/// Collapses any pipeline failure into the single diagnostic placeholder.
pub fn posts_or_placeholder(result: Result<Vec<ExtractedPost>, ExtractError>) -> Vec<ExtractedPost> {
    match result {
        Ok(posts) if !posts.is_empty() => posts,
        Ok(_) => vec![ExtractedPost::error_placeholder(&ExtractError::NoText.to_string())],
        Err(e) => {
            warn!(error = %e, "PDF extraction failed, returning placeholder post");
            vec![ExtractedPost::error_placeholder(&e.to_string())]
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LinkedIn pipeline
// ────────────────────────────────────────────────────────────────────────────

pub struct PostExtractor {
    backend: Arc<dyn PdfTextBackend>,
    options: ExtractorOptions,
}

impl PostExtractor {
    pub fn new(backend: Arc<dyn PdfTextBackend>, options: ExtractorOptions) -> Self {
        PostExtractor { backend, options }
    }

    pub fn try_extract(&self, bytes: &[u8]) -> Result<Vec<ExtractedPost>, ExtractError> {
        let pages = collect_pages(
            self.backend.as_ref(),
            bytes,
            self.options.max_pages,
            self.options.max_text_chars,
        )?;
        if pages.is_empty() {
            return Err(ExtractError::NoText);
        }

        let posts = segment_pages(&pages, &self.options);
        info!(
            backend = self.backend.name(),
            pages = pages.len(),
            posts = posts.len(),
            "Segmented PDF into posts"
        );

        if posts.is_empty() {
            return Ok(vec![sample_post(&pages)]);
        }
        Ok(posts)
    }
}

impl ExtractPosts for PostExtractor {
    fn extract(&self, bytes: &[u8]) -> Vec<ExtractedPost> {
        posts_or_placeholder(self.try_extract(bytes))
    }
}

/// Splits page texts into posts. Pages without a timestamp marker yield
/// nothing; reactions pages only contribute engagement.
pub fn segment_pages(pages: &[PageText], options: &ExtractorOptions) -> Vec<ExtractedPost> {
    let mut posts = Vec::new();
    let mut engagement = Vec::new();

    for page in pages {
        let cleaned = clean_page(&page.text);
        if cleaned.is_empty() {
            continue;
        }

        if is_reactions_page(&cleaned) {
            if let Some(summary) = summarize_engagement(&cleaned) {
                engagement.push(PageEngagement {
                    posts_before: posts.len(),
                    summary,
                });
            }
            continue;
        }

        match extract_post(&cleaned, page.number, options.reference_date) {
            Some(post) => posts.push(post),
            None => debug!(page = page.number, "No timestamp marker, page skipped"),
        }
    }

    merge_engagement(&mut posts, &engagement, options.engagement_merge);
    posts
}

fn extract_post(cleaned: &str, page_number: usize, reference_date: NaiveDate) -> Option<ExtractedPost> {
    let marker = find_marker(cleaned)?;
    let (header, body) = split_header_body(cleaned, marker.start, marker.end);

    let meta = parse_metadata(header);
    let content = clean_content(body);
    let title = derive_title(&content, meta.company.as_deref());
    let hashtags = extract_hashtags(&content);
    let notes = build_notes(page_number, &meta, &marker.label);

    Some(ExtractedPost {
        title,
        content,
        hashtags,
        author: meta.author,
        company: meta.company,
        followers: meta.followers,
        date: Some(
            marker
                .approximate_date(reference_date)
                .format("%Y-%m-%d")
                .to_string(),
        ),
        timestamp: Some(marker.label),
        engagement: None,
        notes: Some(notes),
    })
}

/// Text before the marker is the header. When the marker leads the page, the
/// header instead runs up to the first `·`/`•` separator after it.
fn split_header_body(text: &str, marker_start: usize, marker_end: usize) -> (&str, &str) {
    let header = strip_trailing_vor(text[..marker_start].trim_end());
    let body = &text[marker_end..];

    if !header.trim().is_empty() {
        return (header, body);
    }

    match body.find(['·', '•']) {
        Some(sep) if sep <= MAX_TRAILING_HEADER_BYTES => {
            let sep_len = body[sep..].chars().next().map_or(1, char::len_utf8);
            (&body[..sep], &body[sep + sep_len..])
        }
        _ => (header, body),
    }
}

/// `"Jane Doe vor"` → `"Jane Doe"` when the marker was written "vor N Tagen".
fn strip_trailing_vor(header: &str) -> &str {
    let Some(split) = header.len().checked_sub(3) else {
        return header;
    };
    match (header.get(split..), header.get(..split)) {
        (Some(tail), Some(rest))
            if tail.eq_ignore_ascii_case("vor")
                && rest.chars().last().map_or(true, char::is_whitespace) =>
        {
            rest.trim_end()
        }
        _ => header,
    }
}

fn build_notes(page_number: usize, meta: &PostMetadata, timestamp: &str) -> String {
    let mut parts = vec![format!("Imported from PDF page {page_number}")];
    if let Some(author) = &meta.author {
        parts.push(format!("Author: {author}"));
    }
    if let Some(company) = &meta.company {
        parts.push(format!("Company: {company}"));
    }
    if let Some(followers) = &meta.followers {
        parts.push(format!("Followers: {followers}"));
    }
    parts.push(format!("Posted: {timestamp} ago"));
    parts.join(" | ")
}

/// Used when text was extracted but no page had a recognisable post.
fn sample_post(pages: &[PageText]) -> ExtractedPost {
    let full_text = pages
        .iter()
        .map(|p| clean_page(&p.text))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    let content = if full_text.chars().count() > SAMPLE_POST_CHARS {
        format!("{}...", truncate_chars(&full_text, SAMPLE_POST_CHARS))
    } else {
        full_text
    };

    ExtractedPost {
        title: "Imported LinkedIn content".to_string(),
        content,
        ..Default::default()
    }
}

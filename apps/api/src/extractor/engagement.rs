//! Reactions pages: detection, counter extraction and attachment to posts.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extractor::models::ExtractedPost;

static LIKES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Gefällt mir[·•]*\s*(\d+(?:[.,]\d+)*)").expect("valid regex"));
static COMMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)*)\s*(?:Antw?orten|Kommentare?)").expect("valid regex")
});
static IMPRESSIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)*)\s+Impressions?").expect("valid regex"));

/// Where engagement found on a reactions page ends up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementMerge {
    /// Every reactions page is merged into the first post; the last page wins.
    #[default]
    FirstPost,
    /// Each reactions page goes to the post extracted just before it, or to
    /// the first post when none precedes it.
    PrecedingPost,
}

impl FromStr for EngagementMerge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first_post" | "first" => Ok(EngagementMerge::FirstPost),
            "preceding_post" | "preceding" => Ok(EngagementMerge::PrecedingPost),
            other => Err(format!(
                "unknown engagement merge mode '{other}' (expected first_post or preceding_post)"
            )),
        }
    }
}

/// Engagement summary taken from one reactions page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEngagement {
    /// Number of content posts extracted before this page.
    pub posts_before: usize,
    pub summary: String,
}

pub fn is_reactions_page(text: &str) -> bool {
    text.contains("Reaktionen") || text.contains("Gefällt mir")
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// `"12 Likes, 3 Kommentare, 1.024 Impressions"`, or `None` when no counter
/// matched. Labels follow the German export, as the paragraph parser does.
pub fn summarize_engagement(text: &str) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(likes) = capture(&LIKES, text) {
        parts.push(format!("{likes} Likes"));
    }
    if let Some(comments) = capture(&COMMENTS, text) {
        parts.push(format!("{comments} Kommentare"));
    }
    if let Some(impressions) = capture(&IMPRESSIONS, text) {
        parts.push(format!("{impressions} Impressions"));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

pub fn merge_engagement(
    posts: &mut [ExtractedPost],
    found: &[PageEngagement],
    mode: EngagementMerge,
) {
    if posts.is_empty() {
        return;
    }
    match mode {
        EngagementMerge::FirstPost => {
            if let Some(last) = found.last() {
                posts[0].engagement = Some(last.summary.clone());
            }
        }
        EngagementMerge::PrecedingPost => {
            for page in found {
                let target = page.posts_before.saturating_sub(1).min(posts.len() - 1);
                posts[target].engagement = Some(page.summary.clone());
            }
        }
    }
}

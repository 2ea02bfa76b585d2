use serde::{Deserialize, Serialize};

/// Maximum characters kept in a post body.
pub const MAX_CONTENT_CHARS: usize = 3000;

/// Maximum characters of a derived title, including the `...` suffix.
pub const MAX_TITLE_CHARS: usize = 150;

/// Hashtags carried by every diagnostic placeholder post.
pub const ERROR_HASHTAGS: &str = "#import #error";

/// A post-like record recovered from a PDF, pending user confirmation.
///
/// Never persisted directly: the import flow keeps these in the pending-import
/// store until the user picks which ones become `posts` rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPost {
    pub title: String,
    pub content: String,
    /// Space-joined `#token`s, empty when the post has none.
    pub hashtags: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub followers: Option<String>,
    /// Relative marker as found in the export, e.g. `"3 Monate"`.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Approximate ISO date derived from `timestamp`.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub engagement: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ExtractedPost {
    /// Diagnostic placeholder returned when the whole pipeline fails.
    pub fn error_placeholder(message: &str) -> Self {
        ExtractedPost {
            title: "LinkedIn PDF import failed".to_string(),
            content: format!("The PDF file could not be processed. Error: {message}"),
            hashtags: ERROR_HASHTAGS.to_string(),
            ..Default::default()
        }
    }

    pub fn is_error_placeholder(&self) -> bool {
        self.hashtags == ERROR_HASHTAGS
    }
}

/// Truncates to at most `max` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Truncates to `max` characters, replacing the tail with `...` when cut.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    format!("{}...", truncate_chars(text, keep))
}

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const MAX_STORED_TITLE_CHARS: usize = 200;
pub const MAX_STORED_CONTENT_CHARS: usize = 3000;
pub const MAX_STORED_HASHTAGS_CHARS: usize = 500;
pub const MAX_STORED_NOTES_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Posted,
    Imported,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Posted => "posted",
            PostStatus::Imported => "imported",
        }
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "scheduled" => Ok(PostStatus::Scheduled),
            "posted" => Ok(PostStatus::Posted),
            "imported" => Ok(PostStatus::Imported),
            other => Err(format!("unknown post status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostRow {
    pub id: i64,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub hashtags: String,
    pub notes: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub status: String,
    pub engagement_stats: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostRow {
    pub fn character_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// A post as the API returns it: the row plus its content length, which the
/// editor shows against LinkedIn's 3000 character limit.
#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    #[serde(flatten)]
    pub post: PostRow,
    pub character_count: usize,
}

impl From<PostRow> for PostResponse {
    fn from(post: PostRow) -> Self {
        PostResponse {
            character_count: post.character_count(),
            post,
        }
    }
}

/// Fields a user writes when creating or editing a post.
#[derive(Debug, Clone, Deserialize)]
pub struct PostInput {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub hashtags: String,
    pub notes: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    /// Defaults to `draft` on create and to the current status on edit.
    pub status: Option<PostStatus>,
}

impl PostInput {
    /// Returns the first violated field rule.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".to_string());
        }
        if self.content.trim().is_empty() {
            return Err("content is required".to_string());
        }
        let limits = [
            ("title", self.title.as_str(), MAX_STORED_TITLE_CHARS),
            ("content", self.content.as_str(), MAX_STORED_CONTENT_CHARS),
            ("hashtags", self.hashtags.as_str(), MAX_STORED_HASHTAGS_CHARS),
            ("notes", self.notes.as_deref().unwrap_or(""), MAX_STORED_NOTES_CHARS),
        ];
        for (field, value, max) in limits {
            if value.chars().count() > max {
                return Err(format!("{field} must be at most {max} characters"));
            }
        }
        Ok(())
    }
}

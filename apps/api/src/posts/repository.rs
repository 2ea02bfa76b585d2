use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::extractor::models::{truncate_with_ellipsis, ExtractedPost};
use crate::models::post::{PostInput, PostRow, PostStatus, MAX_STORED_TITLE_CHARS};

pub const PAGE_SIZE: i64 = 10;

const COPY_TITLE_PREFIX: &str = "Kopie von ";

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub query: Option<String>,
    pub status: Option<PostStatus>,
    /// 1-based.
    pub page: i64,
}

impl PostFilter {
    fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * PAGE_SIZE
    }

    fn pattern(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(q)))
    }
}

/// Escapes LIKE wildcards so user input only matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Inserts the selected extracted posts with status `imported`.
pub async fn insert_imported_posts(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    posts: &[&ExtractedPost],
) -> Result<Vec<i64>, sqlx::Error> {
    let mut ids = Vec::with_capacity(posts.len());
    for post in posts {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts
                (user_id, title, content, hashtags, notes, status, engagement_stats)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(truncate_with_ellipsis(&post.title, MAX_STORED_TITLE_CHARS))
        .bind(&post.content)
        .bind(&post.hashtags)
        .bind(post.notes.as_deref())
        .bind(PostStatus::Imported.as_str())
        .bind(post.engagement.as_deref())
        .fetch_one(&mut **tx)
        .await?;
        ids.push(id);
    }

    info!(user_id = %user_id, count = ids.len(), "Inserted imported posts");
    Ok(ids)
}

/// Newest first, `PAGE_SIZE` per page. Returns the page and the total match count.
pub async fn list_posts(
    pool: &PgPool,
    user_id: Uuid,
    filter: &PostFilter,
) -> Result<(Vec<PostRow>, i64), sqlx::Error> {
    let pattern = filter.pattern();
    let status = filter.status.map(|s| s.as_str());

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM posts
        WHERE user_id = $1
          AND ($2::TEXT IS NULL OR title ILIKE $2 OR content ILIKE $2 OR hashtags ILIKE $2)
          AND ($3::TEXT IS NULL OR status = $3)
        "#,
    )
    .bind(user_id)
    .bind(pattern.as_deref())
    .bind(status)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, PostRow>(
        r#"
        SELECT * FROM posts
        WHERE user_id = $1
          AND ($2::TEXT IS NULL OR title ILIKE $2 OR content ILIKE $2 OR hashtags ILIKE $2)
          AND ($3::TEXT IS NULL OR status = $3)
        ORDER BY created_at DESC, id DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(user_id)
    .bind(pattern.as_deref())
    .bind(status)
    .bind(PAGE_SIZE)
    .bind(filter.offset())
    .fetch_all(pool)
    .await?;

    Ok((rows, total))
}

pub async fn get_post(pool: &PgPool, user_id: Uuid, id: i64) -> Result<Option<PostRow>, sqlx::Error> {
    sqlx::query_as::<_, PostRow>("SELECT * FROM posts WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn create_post(pool: &PgPool, input: &PostInput) -> Result<PostRow, sqlx::Error> {
    let status = input.status.unwrap_or(PostStatus::Draft);
    let post = sqlx::query_as::<_, PostRow>(
        r#"
        INSERT INTO posts
            (user_id, title, content, hashtags, notes, scheduled_date, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(input.user_id)
    .bind(input.title.trim())
    .bind(&input.content)
    .bind(input.hashtags.trim())
    .bind(input.notes.as_deref())
    .bind(input.scheduled_date)
    .bind(status.as_str())
    .fetch_one(pool)
    .await?;

    info!(user_id = %input.user_id, post_id = post.id, status = status.as_str(), "Post created");
    Ok(post)
}

/// Overwrites the editable fields. A missing status keeps the current one.
pub async fn update_post(
    pool: &PgPool,
    id: i64,
    input: &PostInput,
) -> Result<Option<PostRow>, sqlx::Error> {
    sqlx::query_as::<_, PostRow>(
        r#"
        UPDATE posts
        SET title = $3,
            content = $4,
            hashtags = $5,
            notes = $6,
            scheduled_date = $7,
            status = COALESCE($8, status),
            updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(input.user_id)
    .bind(input.title.trim())
    .bind(&input.content)
    .bind(input.hashtags.trim())
    .bind(input.notes.as_deref())
    .bind(input.scheduled_date)
    .bind(input.status.map(|s| s.as_str()))
    .fetch_optional(pool)
    .await
}

/// Returns whether a post was deleted.
pub async fn delete_post(pool: &PgPool, user_id: Uuid, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Duplicates a post as a new unscheduled draft titled `Kopie von …`.
pub async fn copy_post(pool: &PgPool, user_id: Uuid, id: i64) -> Result<Option<PostRow>, sqlx::Error> {
    sqlx::query_as::<_, PostRow>(
        r#"
        INSERT INTO posts (user_id, title, content, hashtags, notes, status)
        SELECT user_id, LEFT($3 || title, $4), content, hashtags, notes, $5
        FROM posts
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(COPY_TITLE_PREFIX)
    .bind(MAX_STORED_TITLE_CHARS as i32)
    .bind(PostStatus::Draft.as_str())
    .fetch_optional(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_is_one_based_and_clamped() {
        let mut filter = PostFilter::default();
        assert_eq!(filter.offset(), 0);
        filter.page = 1;
        assert_eq!(filter.offset(), 0);
        filter.page = 3;
        assert_eq!(filter.offset(), 20);
    }

    #[test]
    fn test_pattern_escapes_wildcards() {
        let filter = PostFilter {
            query: Some(" 100%_done ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.pattern().as_deref(), Some(r"%100\%\_done%"));
    }

    #[test]
    fn test_blank_query_means_no_filter() {
        let filter = PostFilter {
            query: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(filter.pattern().is_none());
    }
}

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extractor::models::ExtractedPost;
use crate::extractor::{build_extractor, ExtractPosts, ExtractorOptions};
use crate::imports::pending::PendingImport;
use crate::posts::repository::insert_imported_posts;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PreviewPost {
    pub index: usize,
    #[serde(flatten)]
    pub post: ExtractedPost,
}

#[derive(Debug, Serialize)]
pub struct ImportPreviewResponse {
    pub import_id: Uuid,
    pub filename: String,
    pub created_at: chrono::DateTime<Utc>,
    pub posts: Vec<PreviewPost>,
}

impl From<PendingImport> for ImportPreviewResponse {
    fn from(import: PendingImport) -> Self {
        ImportPreviewResponse {
            import_id: import.import_id,
            filename: import.filename,
            created_at: import.created_at,
            posts: import
                .posts
                .into_iter()
                .enumerate()
                .map(|(index, post)| PreviewPost { index, post })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportConfirmRequest {
    pub user_id: Uuid,
    /// When given, must match the pending import; guards against confirming
    /// a preview that a newer upload already replaced.
    pub import_id: Option<Uuid>,
    pub selected: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct ImportConfirmResponse {
    pub imported: usize,
    pub post_ids: Vec<i64>,
}

pub fn validate_upload(filename: &str, size: usize, max_bytes: usize) -> Result<(), AppError> {
    if filename.trim().is_empty() {
        return Err(AppError::Validation("No file selected".to_string()));
    }
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(AppError::Validation(
            "Only PDF files are accepted".to_string(),
        ));
    }
    if size > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File is {size} bytes, the limit is {max_bytes} bytes"
        )));
    }
    Ok(())
}

fn request_extractor(state: &AppState) -> Box<dyn ExtractPosts> {
    let config = &state.config;
    let mut options = ExtractorOptions::new(Utc::now().date_naive());
    options.max_pages = config.extract_max_pages;
    options.max_text_chars = config.extract_max_chars;
    options.engagement_merge = config.engagement_merge;
    build_extractor(config.import_parser, state.pdf_backend.clone(), options)
}

/// Writes the upload to a temporary `.pdf` in `dir` and extracts from that
/// file. The file is removed when this returns, whatever the outcome.
fn extract_spooled(
    extractor: &dyn ExtractPosts,
    dir: &Path,
    data: &[u8],
) -> std::io::Result<Vec<ExtractedPost>> {
    let mut file = tempfile::Builder::new()
        .prefix("postforge-")
        .suffix(".pdf")
        .tempfile_in(dir)?;
    file.write_all(data)?;
    file.flush()?;
    Ok(extractor.extract_file(file.path()))
}

/// Extracts posts from an uploaded PDF and stores them as the user's pending
/// import, replacing any previous one.
pub async fn stage_upload(
    state: &AppState,
    user_id: Uuid,
    filename: String,
    data: Bytes,
) -> Result<PendingImport, AppError> {
    validate_upload(&filename, data.len(), state.config.max_pdf_bytes)?;

    let extractor = request_extractor(state);
    let upload_dir = state.config.pdf_upload_dir.clone();
    let posts = tokio::task::spawn_blocking(move || {
        extract_spooled(extractor.as_ref(), &upload_dir, &data)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("extraction task failed: {e}")))?
    .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("failed to spool upload")))?;

    let failed = posts.iter().any(ExtractedPost::is_error_placeholder);
    info!(
        user_id = %user_id,
        filename = %filename,
        posts = posts.len(),
        failed,
        "PDF import staged"
    );

    let import = PendingImport::new(user_id, filename, posts);
    state.pending.save(&import).await?;
    Ok(import)
}

/// Resolves selected indices against the pending posts. Out-of-range indices
/// are ignored and duplicates collapse.
pub fn select_posts<'a>(
    import: &'a PendingImport,
    selected: &[usize],
) -> Result<Vec<&'a ExtractedPost>, AppError> {
    if selected.is_empty() {
        return Err(AppError::Validation("No posts selected".to_string()));
    }
    let chosen: Vec<&ExtractedPost> = selected
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter_map(|i| import.posts.get(i))
        .collect();
    if chosen.is_empty() {
        return Err(AppError::Validation(
            "None of the selected posts exist in the pending import".to_string(),
        ));
    }
    Ok(chosen)
}

/// Imports the selected posts. The pending import is taken out of the store
/// first, so a second confirm racing this one finds nothing; any failure
/// after that puts it back.
pub async fn confirm_import(
    state: &AppState,
    req: &ImportConfirmRequest,
) -> Result<ImportConfirmResponse, AppError> {
    if req.selected.is_empty() {
        return Err(AppError::Validation("No posts selected".to_string()));
    }

    let import = state
        .pending
        .take(req.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No pending import found".to_string()))?;

    match persist_selection(state, req, &import).await {
        Ok(post_ids) => {
            info!(
                user_id = %req.user_id,
                import_id = %import.import_id,
                imported = post_ids.len(),
                "PDF import confirmed"
            );
            Ok(ImportConfirmResponse {
                imported: post_ids.len(),
                post_ids,
            })
        }
        Err(e) => {
            if let Err(restore_err) = state.pending.restore(&import).await {
                warn!(
                    user_id = %req.user_id,
                    error = %restore_err,
                    "Confirm failed and pending import could not be restored"
                );
            }
            Err(e)
        }
    }
}

async fn persist_selection(
    state: &AppState,
    req: &ImportConfirmRequest,
    import: &PendingImport,
) -> Result<Vec<i64>, AppError> {
    if let Some(import_id) = req.import_id {
        if import_id != import.import_id {
            return Err(AppError::Conflict(format!(
                "Import {import_id} was replaced by a newer upload"
            )));
        }
    }

    let chosen = select_posts(import, &req.selected)?;

    let mut tx = state.db.begin().await?;
    let post_ids = match insert_imported_posts(&mut tx, req.user_id, &chosen).await {
        Ok(ids) => ids,
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback after failed import also failed");
            }
            return Err(e.into());
        }
    };
    tx.commit().await?;
    Ok(post_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(titles: &[&str]) -> PendingImport {
        PendingImport::new(
            Uuid::new_v4(),
            "export.pdf",
            titles
                .iter()
                .map(|t| ExtractedPost {
                    title: t.to_string(),
                    ..Default::default()
                })
                .collect(),
        )
    }

    #[test]
    fn test_validate_upload() {
        assert!(validate_upload("export.PDF", 10, 100).is_ok());
        assert!(matches!(
            validate_upload("", 10, 100),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_upload("notes.txt", 10, 100),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_upload("big.pdf", 101, 100),
            Err(AppError::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn test_select_posts_ignores_out_of_range_and_duplicates() {
        let import = pending(&["a", "b", "c"]);
        let chosen = select_posts(&import, &[2, 7, 0, 2]).unwrap();
        let titles: Vec<&str> = chosen.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);
    }

    #[test]
    fn test_select_posts_rejects_empty_selection() {
        let import = pending(&["a"]);
        assert!(matches!(
            select_posts(&import, &[]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            select_posts(&import, &[5]),
            Err(AppError::Validation(_))
        ));
    }

    struct RecordingExtractor;

    impl ExtractPosts for RecordingExtractor {
        fn extract(&self, bytes: &[u8]) -> Vec<ExtractedPost> {
            vec![ExtractedPost {
                content: String::from_utf8_lossy(bytes).into_owned(),
                ..Default::default()
            }]
        }
    }

    #[test]
    fn test_spooled_upload_is_read_then_removed() {
        let dir = tempfile::tempdir().unwrap();
        let posts = extract_spooled(&RecordingExtractor, dir.path(), b"%PDF-1.4 body").unwrap();
        assert_eq!(posts[0].content, "%PDF-1.4 body");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_spooling_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(extract_spooled(&RecordingExtractor, &missing, b"x").is_err());
    }

    #[test]
    fn test_preview_numbers_posts() {
        let preview = ImportPreviewResponse::from(pending(&["a", "b"]));
        assert_eq!(preview.posts[1].index, 1);
        assert_eq!(preview.posts[1].post.title, "b");
        let json = serde_json::to_value(&preview).unwrap();
        assert_eq!(json["posts"][0]["title"], "a");
        assert_eq!(json["posts"][0]["index"], 0);
    }
}

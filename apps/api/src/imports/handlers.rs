use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::imports::service::{
    confirm_import, stage_upload, ImportConfirmRequest, ImportConfirmResponse,
    ImportPreviewResponse,
};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload exceeds the size limit".to_string())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// POST /api/v1/imports
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportPreviewResponse>, AppError> {
    let mut user_id: Option<Uuid> = None;
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_id" => {
                let raw = field.text().await.map_err(multipart_error)?;
                let parsed = Uuid::parse_str(raw.trim())
                    .map_err(|_| AppError::Validation(format!("Invalid user_id '{raw}'")))?;
                user_id = Some(parsed);
            }
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some((filename, data));
            }
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| AppError::Validation("user_id is required".to_string()))?;
    let (filename, data) =
        file.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;

    let import = stage_upload(&state, user_id, filename, data).await?;
    Ok(Json(import.into()))
}

/// GET /api/v1/imports/pending
pub async fn handle_get_pending(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ImportPreviewResponse>, AppError> {
    let import = state
        .pending
        .load(params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No pending import found".to_string()))?;
    Ok(Json(import.into()))
}

/// DELETE /api/v1/imports/pending
pub async fn handle_discard_pending(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    state.pending.discard(params.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/imports/confirm
pub async fn handle_confirm(
    State(state): State<AppState>,
    Json(req): Json<ImportConfirmRequest>,
) -> Result<Json<ImportConfirmResponse>, AppError> {
    let response = confirm_import(&state, &req).await?;
    Ok(Json(response))
}

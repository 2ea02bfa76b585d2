use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::post::{PostInput, PostResponse, PostStatus};
use crate::posts::repository::{
    copy_post, create_post, delete_post, get_post, list_posts, update_post, PostFilter, PAGE_SIZE,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub user_id: Uuid,
    pub query: Option<String>,
    /// A status name, or `all` for no filter.
    pub status: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

fn status_filter(raw: Option<&str>) -> Result<Option<PostStatus>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(AppError::Validation),
    }
}

/// GET /api/v1/posts
pub async fn handle_list_posts(
    State(state): State<AppState>,
    Query(params): Query<ListPostsQuery>,
) -> Result<Json<PostListResponse>, AppError> {
    let filter = PostFilter {
        query: params.query,
        status: status_filter(params.status.as_deref())?,
        page: params.page.unwrap_or(1).max(1),
    };
    let (posts, total) = list_posts(&state.db, params.user_id, &filter).await?;
    Ok(Json(PostListResponse {
        posts: posts.into_iter().map(PostResponse::from).collect(),
        page: filter.page,
        per_page: PAGE_SIZE,
        total,
    }))
}

/// GET /api/v1/posts/:id
pub async fn handle_get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<PostResponse>, AppError> {
    let post = get_post(&state.db, params.user_id, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(post.into()))
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Post {id} not found"))
}

/// POST /api/v1/posts
pub async fn handle_create_post(
    State(state): State<AppState>,
    Json(input): Json<PostInput>,
) -> Result<(StatusCode, Json<PostResponse>), AppError> {
    input.validate().map_err(AppError::Validation)?;
    let post = create_post(&state.db, &input).await?;
    Ok((StatusCode::CREATED, Json(post.into())))
}

/// PUT /api/v1/posts/:id
pub async fn handle_update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<PostInput>,
) -> Result<Json<PostResponse>, AppError> {
    input.validate().map_err(AppError::Validation)?;
    let post = update_post(&state.db, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(post.into()))
}

/// DELETE /api/v1/posts/:id
pub async fn handle_delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    if !delete_post(&state.db, params.user_id, id).await? {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/posts/:id/copy
pub async fn handle_copy_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<UserIdQuery>,
) -> Result<(StatusCode, Json<PostResponse>), AppError> {
    let copy = copy_post(&state.db, params.user_id, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok((StatusCode::CREATED, Json(copy.into())))
}

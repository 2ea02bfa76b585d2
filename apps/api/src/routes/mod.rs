pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::imports::handlers as imports;
use crate::posts::handlers as posts;
use crate::state::AppState;

/// Room for multipart boundaries and the `user_id` field on top of the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_pdf_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Imports
        .route("/api/v1/imports", post(imports::handle_upload))
        .route(
            "/api/v1/imports/pending",
            get(imports::handle_get_pending).delete(imports::handle_discard_pending),
        )
        .route("/api/v1/imports/confirm", post(imports::handle_confirm))
        // Posts
        .route(
            "/api/v1/posts",
            get(posts::handle_list_posts).post(posts::handle_create_post),
        )
        .route(
            "/api/v1/posts/:id",
            get(posts::handle_get_post)
                .put(posts::handle_update_post)
                .delete(posts::handle_delete_post),
        )
        .route("/api/v1/posts/:id/copy", post(posts::handle_copy_post))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

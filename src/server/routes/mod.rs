//! API routes

pub mod ask;
pub mod documents;
pub mod jobs;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::Router;

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Document management
        .route("/documents", get(documents::list_documents))
        .route("/documents", patch(documents::update_document))
        .route(
            "/documents/upload",
            post(documents::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Q&A
        .route("/ask", post(ask::ask))
        // Queue introspection
        .route("/queue-status", get(jobs::queue_status))
}

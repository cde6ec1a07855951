//! Question answering endpoint

use axum::extract::State;
use axum::Json;

use crate::error::Result;
use crate::server::auth::AuthUser;
use crate::server::state::AppState;
use crate::types::request::AskRequest;
use crate::types::response::AskResponse;

/// POST /api/ask - answer a question against one of the caller's documents
pub async fn ask(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let response = state.answers().ask(user_id, request).await?;
    Ok(Json(response))
}

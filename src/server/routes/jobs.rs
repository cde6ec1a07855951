//! Queue introspection endpoint

use axum::extract::State;
use axum::Json;

use crate::error::Result;
use crate::processing::QueueStats;
use crate::server::auth::AuthUser;
use crate::server::state::AppState;

/// GET /api/queue-status - worker and job statistics
pub async fn queue_status(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> Result<Json<QueueStats>> {
    Ok(Json(state.queue().stats()))
}

//! Feedback handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::models::feedback::CreateFeedbackRequest;
use crate::state::AppState;

/// Post feedback on a completed ride
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ride_id): Path<Uuid>,
    Json(payload): Json<CreateFeedbackRequest>,
) -> ApiResult<impl IntoResponse> {
    let feedback = state.feedback.create(ride_id, user.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// List feedback received by a user, with aggregate statistics
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let summary = state.feedback.list_for_user(user_id).await?;
    Ok(Json(summary))
}

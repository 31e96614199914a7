//! Profile handlers

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::models::user::UpdateProfileRequest;
use crate::state::AppState;

/// Fetch the caller's profile
pub async fn get_me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let profile = state.profiles.find_by_id(user.id).await?;
    Ok(Json(profile))
}

/// Update the caller's profile
pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let profile = state.profiles.update(user.id, &payload).await?;
    Ok(Json(profile))
}

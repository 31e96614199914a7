//! Address book handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::address::CreateAddressRequest;
use crate::state::AppState;

/// List the caller's saved addresses
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let addresses = state.addresses.list(user.id).await?;
    Ok(Json(addresses))
}

/// Save a new address
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateAddressRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.label.trim().is_empty() {
        return Err(ApiError::BadRequest("Label is required".to_string()));
    }
    payload.location.validate().map_err(ApiError::BadRequest)?;

    let address = state.addresses.create(user.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// Delete one of the caller's addresses
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(address_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.addresses.delete(address_id, user.id).await?;
    Ok(Json(json!({ "message": "Address deleted" })))
}

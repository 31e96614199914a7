//! Ride lifecycle handlers

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::ride::{CreateRideRequest, RideListResponse, RideQuery};
use crate::notifier::{Audience, EventKind};
use crate::state::AppState;

/// Create a ride offer
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateRideRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.start.validate().map_err(ApiError::BadRequest)?;
    payload.end.validate().map_err(ApiError::BadRequest)?;

    let ride = state.rides.create(user.id, &payload).await?;

    state.notifier.notify(
        EventKind::RideCreated,
        Audience::AllExcept(user.id),
        &ride,
    );

    Ok((StatusCode::CREATED, Json(ride)))
}

/// Browse rides with filters and pagination
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<RideQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let offset = query.offset.unwrap_or(0);

    let (items, total) = state.rides.list(&query, Some(user.id)).await?;

    Ok(Json(RideListResponse {
        items,
        total,
        limit,
        offset,
    }))
}

/// Fetch a single ride with the `has_requested` annotation
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ride_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let ride = state.rides.get(ride_id, Some(user.id)).await?;
    Ok(Json(ride))
}

/// Complete a matched ride
pub async fn complete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ride_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let ride = state.rides.complete(ride_id, user.id).await?;

    state.notifier.notify(
        EventKind::RideCompleted,
        Audience::AllExcept(user.id),
        &ride,
    );

    Ok(Json(ride))
}

/// Cancel an open ride (hard delete, cascading its requests)
pub async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ride_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let ride = state.rides.cancel(ride_id, user.id).await?;

    state.notifier.notify(
        EventKind::RideCancelled,
        Audience::AllExcept(user.id),
        json!({ "ride_id": ride.id }),
    );

    Ok(Json(json!({ "message": "Ride cancelled" })))
}

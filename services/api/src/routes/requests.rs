//! Request matching handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::models::request::CreateRequestBody;
use crate::notifier::{Audience, EventKind};
use crate::state::AppState;

/// Create a pending request against an open ride
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ride_id): Path<Uuid>,
    Json(payload): Json<CreateRequestBody>,
) -> ApiResult<impl IntoResponse> {
    let request = state
        .requests
        .create(ride_id, user.id, payload.note.as_deref())
        .await?;

    // Only the ride's rider is told about a new request.
    let ride = state.rides.find(ride_id).await?;
    state.notifier.notify(
        EventKind::RequestCreated,
        Audience::User(ride.rider_id),
        &request,
    );

    Ok((StatusCode::CREATED, Json(request)))
}

/// List all requests for a ride (owning rider only)
pub async fn list_for_ride(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ride_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let requests = state.requests.list_for_ride(ride_id, user.id).await?;
    Ok(Json(requests))
}

/// List the caller's own requests, each with its parent ride
pub async fn list_mine(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let requests = state.requests.list_for_user(user.id).await?;
    Ok(Json(requests))
}

/// Accept a request: the atomic matching operation.
///
/// Exactly one request per ride can ever be accepted; siblings are
/// rejected in the same transaction. Only the accepted passenger is
/// pushed an event; passengers rejected as siblings observe the change
/// through their own request list.
pub async fn accept(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.requests.accept(request_id, user.id).await?;

    state.notifier.notify(
        EventKind::RequestAccepted,
        Audience::User(outcome.request.passenger_id),
        &outcome,
    );

    Ok(Json(outcome))
}

/// Reject a pending request (owning rider only)
pub async fn reject(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let request = state.requests.reject(request_id, user.id).await?;

    state.notifier.notify(
        EventKind::RequestRejected,
        Audience::User(request.passenger_id),
        &request,
    );

    Ok(Json(request))
}

/// Cancel the caller's own pending request (hard delete)
pub async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let request = state.requests.cancel(request_id, user.id).await?;

    let ride = state.rides.find(request.ride_id).await.ok();
    if let Some(ride) = ride {
        state.notifier.notify(
            EventKind::RequestCancelled,
            Audience::User(ride.rider_id),
            json!({ "request_id": request.id, "ride_id": request.ride_id }),
        );
    }

    Ok(Json(json!({ "message": "Request cancelled" })))
}

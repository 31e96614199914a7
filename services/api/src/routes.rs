//! API service routes

use axum::{
    Json, Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;

use crate::{middleware::auth_middleware, notifier, state::AppState};

pub mod addresses;
pub mod feedback;
pub mod profile;
pub mod requests;
pub mod rides;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/me", get(profile::get_me).put(profile::update_me))
        .route("/addresses", get(addresses::list).post(addresses::create))
        .route("/addresses/:id", delete(addresses::remove))
        .route("/rides", post(rides::create).get(rides::list))
        .route("/rides/:id", get(rides::get).delete(rides::cancel))
        .route("/rides/:id/complete", post(rides::complete))
        .route(
            "/rides/:id/requests",
            get(requests::list_for_ride).post(requests::create),
        )
        .route("/rides/:id/feedback", post(feedback::create))
        .route("/requests", get(requests::list_mine))
        .route("/requests/:id", delete(requests::cancel))
        .route("/requests/:id/accept", post(requests::accept))
        .route("/requests/:id/reject", post(requests::reject))
        .route("/users/:id/feedback", get(feedback::list_for_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(notifier::ws_handler))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint reporting store reachability
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .is_ok();
    let redis = state.redis_pool.health_check().await.unwrap_or(false);

    Json(json!({
        "status": if database && redis { "ok" } else { "degraded" },
        "service": "api-service",
        "database": database,
        "redis": redis,
    }))
}

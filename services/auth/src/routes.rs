//! Authentication service routes
//!
//! Phone/OTP login: a client requests a code for its phone number, then
//! exchanges the code for a JWT pair. First-time numbers get a user row
//! with an empty profile; the API service handles profile completion.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{error, info};

use crate::AppState;
use crate::jwt::TokenType;
use crate::models::{
    OtpIssuedResponse, OtpRequest, OtpVerifyRequest, RefreshTokenRequest, RefreshTokenResponse,
    TokenResponse,
};
use crate::validation::{validate_otp_code, validate_phone};

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/otp/request", post(request_otp))
        .route("/auth/otp/verify", post(verify_otp))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Issue a one-time login code for a phone number
pub async fn request_otp(
    State(state): State<AppState>,
    Json(payload): Json<OtpRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate_phone(&payload.phone).map_err(AuthError::BadRequest)?;

    let allowed = state
        .rate_limiter
        .is_allowed(&payload.phone)
        .await
        .map_err(|e| {
            error!("Rate limiter failure: {}", e);
            AuthError::InternalServerError
        })?;
    if !allowed {
        return Err(AuthError::TooManyRequests);
    }

    let expires_in = state.otp_service.issue(&payload.phone).await.map_err(|e| {
        error!("Failed to issue OTP: {}", e);
        AuthError::InternalServerError
    })?;

    Ok((
        StatusCode::OK,
        Json(OtpIssuedResponse {
            message: "Code sent".to_string(),
            expires_in,
        }),
    ))
}

/// Exchange a one-time code for a JWT pair
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<OtpVerifyRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate_phone(&payload.phone).map_err(AuthError::BadRequest)?;
    validate_otp_code(&payload.code).map_err(AuthError::BadRequest)?;

    let valid = state
        .otp_service
        .verify(&payload.phone, &payload.code)
        .await
        .map_err(|e| {
            error!("Failed to verify OTP: {}", e);
            AuthError::InternalServerError
        })?;
    if !valid {
        return Err(AuthError::Unauthorized);
    }

    // First login creates the user with an empty profile.
    let user = state
        .user_repository
        .upsert_by_phone(&payload.phone)
        .await
        .map_err(|e| {
            error!("Failed to upsert user: {}", e);
            AuthError::InternalServerError
        })?;

    info!("Login for user {}", user.id);

    let access_token = state.jwt_service.generate_access_token(&user).map_err(|e| {
        error!("Failed to generate access token: {}", e);
        AuthError::InternalServerError
    })?;

    let refresh_token = state
        .jwt_service
        .generate_refresh_token(&user)
        .map_err(|e| {
            error!("Failed to generate refresh token: {}", e);
            AuthError::InternalServerError
        })?;

    // Track the live session in Redis
    let session_key = format!("session:{}", user.id);
    state
        .redis_pool
        .set(
            &session_key,
            &refresh_token,
            Some(state.jwt_service.refresh_token_expiry()),
        )
        .await
        .map_err(|e| {
            error!("Failed to store session in Redis: {}", e);
            AuthError::InternalServerError
        })?;

    let response = TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
        user,
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Refresh token endpoint
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let claims = state
        .jwt_service
        .validate_token(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthorized)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::Unauthorized);
    }

    let is_blacklisted = state
        .jwt_service
        .is_token_blacklisted(&state.redis_pool, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to check token blacklist: {}", e);
            AuthError::InternalServerError
        })?;
    if is_blacklisted {
        return Err(AuthError::Unauthorized);
    }

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to fetch user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::Unauthorized)?;

    let access_token = state.jwt_service.generate_access_token(&user).map_err(|e| {
        error!("Failed to generate access token: {}", e);
        AuthError::InternalServerError
    })?;

    let new_refresh_token = state
        .jwt_service
        .rotate_refresh_token(&state.redis_pool, &user, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to rotate refresh token: {}", e);
            AuthError::InternalServerError
        })?;

    let session_key = format!("session:{}", user.id);
    state
        .redis_pool
        .set(
            &session_key,
            &new_refresh_token,
            Some(state.jwt_service.refresh_token_expiry()),
        )
        .await
        .map_err(|e| {
            error!("Failed to update session in Redis: {}", e);
            AuthError::InternalServerError
        })?;

    let response = RefreshTokenResponse {
        access_token,
        refresh_token: new_refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let claims = state
        .jwt_service
        .validate_token(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthorized)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::Unauthorized);
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| {
            error!("Failed to get current time: {}", e);
            AuthError::InternalServerError
        })?
        .as_secs();

    let expiry = claims.exp.saturating_sub(now);
    state
        .jwt_service
        .blacklist_token(&state.redis_pool, &payload.refresh_token, expiry)
        .await
        .map_err(|e| {
            error!("Failed to blacklist token: {}", e);
            AuthError::InternalServerError
        })?;

    let session_key = format!("session:{}", claims.sub);
    state.redis_pool.delete(&session_key).await.map_err(|e| {
        error!("Failed to remove session from Redis: {}", e);
        AuthError::InternalServerError
    })?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"message": "Logged out successfully"})),
    ))
}

/// Custom error type for authentication errors
#[derive(Debug)]
pub enum AuthError {
    Unauthorized,
    TooManyRequests,
    BadRequest(String),
    InternalServerError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AuthError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many attempts, try again later".to_string(),
            ),
            AuthError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AuthError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

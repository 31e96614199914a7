//! Application state shared across handlers

use common::cache::RedisPool;
use sqlx::PgPool;

use crate::middleware::TokenVerifier;
use crate::notifier::Notifier;
use crate::repositories::feedback::FeedbackRepository;
use crate::repositories::request::RequestRepository;
use crate::repositories::ride::RideRepository;
use crate::repositories::{AddressRepository, ProfileRepository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_pool: RedisPool,
    pub rides: RideRepository,
    pub requests: RequestRepository,
    pub feedback: FeedbackRepository,
    pub profiles: ProfileRepository,
    pub addresses: AddressRepository,
    pub notifier: Notifier,
    pub verifier: TokenVerifier,
}

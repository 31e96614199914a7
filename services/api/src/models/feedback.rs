//! Feedback models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One-directional rating from one ride participant to the other,
/// written at most once per (ride, author) pair after completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for posting feedback on a completed ride
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFeedbackRequest {
    /// Rating from 1 to 5
    pub rating: i32,
    pub comment: Option<String>,
}

/// A user's received feedback with aggregate statistics
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackSummary {
    pub items: Vec<Feedback>,
    pub count: i64,
    /// Average rating, absent when no feedback exists
    pub average: Option<f64>,
}

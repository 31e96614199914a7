//! Saved address models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Location;

/// A saved location in a user's address book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: String,
    pub location: Location,
    pub created_at: DateTime<Utc>,
}

/// Payload for saving an address
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAddressRequest {
    pub label: String,
    pub location: Location,
}

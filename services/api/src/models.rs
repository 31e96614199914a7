//! API models for request and response payloads

use serde::{Deserialize, Serialize};

pub mod address;
pub mod feedback;
pub mod request;
pub mod ride;
pub mod user;

/// A geographic point with its human-readable address.
///
/// Locations arrive as typed records and are stored as flat columns; the
/// core never handles free-form location blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

impl Location {
    /// Validate coordinate bounds at the boundary.
    pub fn validate(&self) -> Result<(), String> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("Latitude out of range: {}", self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(format!("Longitude out of range: {}", self.lng));
        }
        if self.address.trim().is_empty() {
            return Err("Address text is required".to_string());
        }
        Ok(())
    }
}

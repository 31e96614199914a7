//! Ride models and the ride status state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::Location;

/// Ride lifecycle status.
///
/// `Open` and `Matched` are the only states that permit further
/// transitions; `Completed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RideStatus {
    Open,
    Matched,
    Completed,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Open => "OPEN",
            RideStatus::Matched => "MATCHED",
            RideStatus::Completed => "COMPLETED",
        }
    }

    /// A ride may only be cancelled (hard-deleted) while it is open.
    pub fn can_cancel(&self) -> bool {
        matches!(self, RideStatus::Open)
    }

    /// Manual completion requires a matched passenger.
    pub fn can_complete(&self) -> bool {
        matches!(self, RideStatus::Matched)
    }

    /// Requests can only be created or accepted against an open ride.
    pub fn accepts_requests(&self) -> bool {
        matches!(self, RideStatus::Open)
    }
}

impl FromStr for RideStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(RideStatus::Open),
            "MATCHED" => Ok(RideStatus::Matched),
            "COMPLETED" => Ok(RideStatus::Completed),
            other => Err(format!("Unknown ride status: {}", other)),
        }
    }
}

/// Ride entity.
///
/// `passenger_id` is set if and only if the ride has been matched; it is
/// null while the ride is open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub passenger_id: Option<Uuid>,
    pub start: Location,
    pub end: Location,
    pub departure_at: DateTime<Utc>,
    pub note: Option<String>,
    pub status: RideStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A ride annotated for a browse listing.
#[derive(Debug, Clone, Serialize)]
pub struct RideSummary {
    #[serde(flatten)]
    pub ride: Ride,
    /// Whether the requesting user already has a request against this ride
    pub has_requested: bool,
    /// Great-circle distance from the proximity filter point, if one was given
    pub distance_meters: Option<f64>,
}

/// Payload for creating a ride
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRideRequest {
    pub start: Location,
    pub end: Location,
    pub departure_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Query parameters for ride listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RideQuery {
    /// Filter by status (default: OPEN)
    pub status: Option<RideStatus>,
    /// Earliest departure time
    pub departure_from: Option<DateTime<Utc>>,
    /// Latest departure time
    pub departure_to: Option<DateTime<Utc>>,
    /// Proximity filter point; both must be present to take effect
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Number of items to return (default 20, max 100)
    pub limit: Option<u32>,
    /// Number of items to skip
    pub offset: Option<u32>,
}

impl RideQuery {
    /// Proximity point, if both coordinates were supplied.
    pub fn proximity(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Response for ride listing with pagination
#[derive(Debug, Clone, Serialize)]
pub struct RideListResponse {
    pub items: Vec<RideSummary>,
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [RideStatus::Open, RideStatus::Matched, RideStatus::Completed] {
            assert_eq!(status.as_str().parse::<RideStatus>(), Ok(status));
        }
        assert!("DELETED".parse::<RideStatus>().is_err());
    }

    #[test]
    fn test_transition_gates() {
        assert!(RideStatus::Open.can_cancel());
        assert!(!RideStatus::Matched.can_cancel());
        assert!(!RideStatus::Completed.can_cancel());

        assert!(!RideStatus::Open.can_complete());
        assert!(RideStatus::Matched.can_complete());
        assert!(!RideStatus::Completed.can_complete());

        assert!(RideStatus::Open.accepts_requests());
        assert!(!RideStatus::Matched.accepts_requests());
        assert!(!RideStatus::Completed.accepts_requests());
    }

    #[test]
    fn test_proximity_requires_both_coordinates() {
        let mut query = RideQuery::default();
        assert_eq!(query.proximity(), None);

        query.lat = Some(12.9);
        assert_eq!(query.proximity(), None);

        query.lng = Some(77.6);
        assert_eq!(query.proximity(), Some((12.9, 77.6)));
    }
}

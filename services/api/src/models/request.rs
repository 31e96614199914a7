//! Ride request models and the request status state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::ride::Ride;

/// Request lifecycle status.
///
/// `Accepted` and `Rejected` are terminal; a request that has left
/// `Pending` is never mutated again. Passenger cancellation deletes the
/// row instead, which frees the (ride, passenger) uniqueness slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Accepted => "ACCEPTED",
            RequestStatus::Rejected => "REJECTED",
        }
    }

    /// Accept, reject, and passenger cancel all require a pending request.
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RequestStatus::Pending),
            "ACCEPTED" => Ok(RequestStatus::Accepted),
            "REJECTED" => Ok(RequestStatus::Rejected),
            other => Err(format!("Unknown request status: {}", other)),
        }
    }
}

/// One passenger's bid to join one ride
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideRequest {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    pub note: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a ride request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequestBody {
    pub note: Option<String>,
}

/// A request annotated with its parent ride, for a passenger's own view
#[derive(Debug, Clone, Serialize)]
pub struct RequestWithRide {
    #[serde(flatten)]
    pub request: RideRequest,
    pub ride: Ride,
}

/// Result of the atomic accept operation
#[derive(Debug, Clone, Serialize)]
pub struct AcceptOutcome {
    pub request: RideRequest,
    pub ride: Ride,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Accepted,
            RequestStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<RequestStatus>(), Ok(status));
        }
        assert!("CANCELLED".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_only_pending_is_mutable() {
        assert!(RequestStatus::Pending.is_pending());
        assert!(!RequestStatus::Accepted.is_pending());
        assert!(!RequestStatus::Rejected.is_pending());
    }
}

//! Pillion API service: ride lifecycle, request matching, feedback,
//! profiles, and the notification relay.

pub mod error;
pub mod geo;
pub mod middleware;
pub mod models;
pub mod notifier;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod sweeper;

//! Common library for the Pillion ride-matching backend
//!
//! This crate provides shared infrastructure used by the Pillion services:
//! PostgreSQL connection pooling, Redis access with TTL support, and the
//! shared database error type.

pub mod cache;
pub mod database;
pub mod error;

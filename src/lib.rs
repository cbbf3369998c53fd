//! seatpulse — licensing heartbeat and seat-concurrency service.
//!
//! The interesting part is the heartbeat path: per call, decide whether a
//! device sits within its license's concurrent-device window, reconcile
//! trial vs. licensed state, resolve shared organization licenses, and bind
//! devices to verified identities so request bodies can't spoof ownership.
//! Billing, email, and identity-provider wiring live elsewhere; this service
//! consumes verified tokens and a record store.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod heartbeat;
pub mod license_key;
pub mod models;
pub mod rate_limit;
pub mod resolve;
pub mod util;
pub mod versioning;

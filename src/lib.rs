#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]

//! Receive-only MAVLink telemetry ingestion.
//!
//! A [`TelemetryClient`] opens a TCP link to a flight-control unit, parses
//! MAVLink v1/v2 frames, and folds the eight telemetry message kinds it
//! understands into one immutable [`TelemetrySnapshot`] per update. Consumers
//! register a [`TelemetryEvents`] implementation or poll
//! [`TelemetryClient::latest`] at their own cadence. The client reconnects
//! with capped exponential backoff until stopped and never issues commands to
//! the vehicle.

pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod framing;
pub mod log_history;
pub mod modes;
pub mod snapshot;

pub use client::{TelemetryClient, TelemetryEvents};
pub use config::LinkConfig;
pub use error::{LinkError, Result};
pub use snapshot::TelemetrySnapshot;

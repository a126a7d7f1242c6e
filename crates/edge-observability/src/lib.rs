//! Observability infrastructure for the edge render gateway.
//!
//! This crate provides:
//! - `RequestLogger` - Logger bound to one request's id, workload and route
//! - `LogEvent` - Event builder carrying extra structured fields

mod logging;

pub use logging::*;

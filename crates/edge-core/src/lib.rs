//! Core abstractions for the edge render gateway.
//!
//! This crate provides the fundamental types shared by every gateway crate:
//! - `GatewayConfig` - Directories, bundle settings, error exposure
//! - `RenderRequest` - Per-request render options merged over defaults
//! - `RequestContext` - Typed view of an inbound HTTP request
//! - `GatewayError` - The failure taxonomy of the render pipeline
//! - `DispatchPhase` - Request lifecycle tracking

mod config;
mod context;
mod error;
mod lifecycle;
mod request;

pub use config::*;
pub use context::*;
pub use error::*;
pub use lifecycle::*;
pub use request::*;

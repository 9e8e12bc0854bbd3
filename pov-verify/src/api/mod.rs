//! HTTP API handlers for pov-verify
//!
//! GET /health, POST /verify

pub mod health;
pub mod verify;

pub use health::health_routes;
pub use verify::verify_routes;

//! # POV Common Library
//!
//! Shared code for the proof-of-visit services:
//! - Common error type
//! - TOML configuration model and file resolution
//! - Shared HTTP response bodies

pub mod api;
pub mod config;
pub mod error;

pub use error::{Error, Result};

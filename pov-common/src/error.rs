//! Common error types for POV services

use thiserror::Error;

/// Common result type for POV operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across POV services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

//! Chronicle admin — error types.

use chronicle_core::error::DomainError;
use thiserror::Error;

/// Startup and runtime errors for the admin tool.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A store or decoding failure.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Writing output failed.
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding output failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

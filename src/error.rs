//! Error types for branch-locator

use thiserror::Error;

/// Main error type for branch-locator operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid radius: {0}")]
    InvalidRadius(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Geo error: {0}")]
    Geo(String),

    /// Branch directory or inventory query failed; fatal to the current request
    #[error("Branch directory error: {0}")]
    Directory(String),
}

/// Result type alias for branch-locator operations
pub type Result<T> = std::result::Result<T, Error>;

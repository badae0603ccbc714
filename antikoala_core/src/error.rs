//! Error types for the antikoala_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for antikoala_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV snapshot error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Drink catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Rejected user input (profile values, session names, times)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The profile has not been set up yet
    #[error("No profile found; run `antikoala profile set` first")]
    ProfileMissing,

    /// A session id (or prefix) did not resolve
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Store-level failure that is not plain IO
    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// True for errors raised while writing or reading persisted records.
    ///
    /// The CLI reports these as a non-fatal notice instead of a hard failure.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Json(_) | Error::Csv(_) | Error::Store(_)
        )
    }
}

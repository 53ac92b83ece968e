//! Error types for guidepair.
//!
//! Validation rejections are deliberately not part of this enum: a refused
//! pairing is an expected, recoverable outcome and is modelled by
//! [`crate::validator::Rejection`]. Everything here is either a storage,
//! configuration or input fault.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for guidepair operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Data Errors ===
    /// The requested event does not exist.
    #[error("event not found: {0}")]
    EventNotFound(String),

    /// The requested person does not exist.
    #[error("person not found: {0}")]
    PersonNotFound(String),

    /// A pace string could not be parsed.
    #[error("invalid pace '{input}': expected M:SS")]
    InvalidPace {
        /// The rejected input.
        input: String,
    },

    /// A stored or supplied value could not be interpreted.
    #[error("invalid {field}: {value}")]
    InvalidValue {
        /// Which field was being parsed.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    // === Persistence Errors ===
    /// Saving an event's pairings failed. The in-memory assignment is untouched.
    #[error("failed to save pairings for event '{event_id}': {message}")]
    SaveFailed {
        /// The event whose pairings were being saved.
        event_id: String,
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for guidepair operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a save failure for the given event.
    #[must_use]
    pub fn save_failed(event_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SaveFailed {
            event_id: event_id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid value error.
    #[must_use]
    pub fn invalid_value(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
        }
    }

    /// Check if this error came from the persistence layer and is worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SaveFailed { .. } | Self::DatabaseQuery(_) | Self::Io(_)
        )
    }

    /// Check if this error indicates a missing event or person.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EventNotFound(_) | Self::PersonNotFound(_))
    }
}

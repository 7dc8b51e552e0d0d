//! Domain error types
//!
//! This module defines the error hierarchy for the GAR export. Errors raised
//! here are always fatal for the run: per-entity degradations (missing
//! attributes, unresolvable profiles, restricted entities) are modelled as
//! skip outcomes by the builders and never travel through this type.
//! Boundary errors don't expose third-party types.

use thiserror::Error;

/// Main export error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum GarError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// External code index errors
    #[error("Code index error: {0}")]
    Index(#[from] IndexError),

    /// Staging store errors
    #[error("Staging store error: {0}")]
    Staging(#[from] StagingError),

    /// A record failed the output schema rules
    #[error("Schema violation in {file}: {message}")]
    Schema { file: String, message: String },

    /// Input snapshot errors (unreadable or malformed source files)
    #[error("Input error: {0}")]
    Input(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// External code index errors
///
/// Any of these aborts the run: a code that cannot be checked is never
/// treated as valid or invalid.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Failed to reach the index
    #[error("Failed to connect to code index: {0}")]
    ConnectionFailed(String),

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// The response could not be understood
    #[error("Invalid response from code index: {0}")]
    InvalidResponse(String),

    /// The request itself is malformed
    #[error("Invalid search request: {0}")]
    InvalidRequest(String),
}

impl IndexError {
    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IndexError::ConnectionFailed(_) | IndexError::Timeout(_) | IndexError::ServerError { .. }
        )
    }
}

/// Staging store errors
#[derive(Debug, Error)]
pub enum StagingError {
    /// Failed to connect to the backing database
    #[error("Failed to connect to staging database: {0}")]
    ConnectionFailed(String),

    /// Schema preparation failed
    #[error("Failed to prepare staging schema: {0}")]
    Schema(String),

    /// Query failed
    #[error("Staging query failed: {0}")]
    Query(String),

    /// Transaction could not be committed
    #[error("Staging transaction failed: {0}")]
    Transaction(String),

    /// Stored data could not be decoded
    #[error("Invalid staged data: {0}")]
    InvalidData(String),
}

/// A mandatory attribute is absent or blank on an input record.
///
/// Builders turn this into a skip outcome; it is never a run failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing mandatory attribute '{attribute}'")]
pub struct MissingAttribute {
    /// Name of the missing attribute
    pub attribute: String,
}

impl MissingAttribute {
    /// Creates a new missing attribute error
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

impl From<std::io::Error> for GarError {
    fn from(err: std::io::Error) -> Self {
        GarError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for GarError {
    fn from(err: serde_json::Error) -> Self {
        GarError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for GarError {
    fn from(err: toml::de::Error) -> Self {
        GarError::Configuration(format!("TOML parsing error: {err}"))
    }
}

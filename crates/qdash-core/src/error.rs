//! Error types for the dashboard data layer.

use thiserror::Error;

/// Result type for dashboard operations.
pub type DashResult<T> = Result<T, DashError>;

/// Errors that can occur while sourcing dashboard data.
///
/// Remote-path variants (`Configuration`, `Authentication`, `RemoteRequest`,
/// `AccessBlocked`) never escape the read API: the orchestrator converts them
/// into a synthetic snapshot. Local variants are returned to callers of the
/// credential and configuration operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashError {
    /// Credentials are missing or incomplete.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Exchanging the API key for a bearer token failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A listing request failed (non-success status or transport failure).
    #[error("Remote request failed: {message}")]
    RemoteRequest {
        /// HTTP status, if a response was received.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// The identity exchange succeeded but the service refused the client.
    #[error("Remote access blocked: {0}")]
    AccessBlocked(String),

    /// Reading or writing the local credential file failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A job status string that is not one of the known statuses.
    #[error("Unknown job status '{0}' (expected queued, running, completed or error)")]
    InvalidStatus(String),

    /// Invalid configuration file or values.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DashError {
    /// Create a remote request error without an HTTP status.
    pub fn remote(message: impl Into<String>) -> Self {
        DashError::RemoteRequest {
            status: None,
            message: message.into(),
        }
    }

    /// Whether this error should raise the access-blocked advisory.
    pub fn is_access_blocked(&self) -> bool {
        matches!(self, DashError::AccessBlocked(_))
    }

    /// Whether this error means no usable credentials were configured.
    pub fn is_configuration(&self) -> bool {
        matches!(self, DashError::Configuration(_))
    }
}

//! Error types for the IBM Quantum data source.

use qdash_core::DashError;
use thiserror::Error;

/// Result type for IBM operations.
pub type IbmResult<T> = Result<T, IbmError>;

/// Errors that can occur when talking to IBM Quantum.
#[derive(Debug, Error)]
pub enum IbmError {
    /// No API key configured.
    #[error("IBM Quantum API key not configured")]
    MissingApiKey,

    /// No service CRN configured.
    #[error("IBM Quantum service CRN not configured")]
    MissingServiceCrn,

    /// IAM token exchange failed.
    #[error("IAM token exchange failed: {0}")]
    IamTokenExchange(String),

    /// HTTP transport failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("IBM Quantum API error ({status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// The API gateway refused this client.
    #[error("IBM Quantum API refused access: {0}")]
    AccessBlocked(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<IbmError> for DashError {
    fn from(e: IbmError) -> Self {
        match e {
            IbmError::MissingApiKey | IbmError::MissingServiceCrn | IbmError::InvalidParameter(_) => {
                DashError::Configuration(e.to_string())
            }
            IbmError::IamTokenExchange(_) => DashError::Authentication(e.to_string()),
            IbmError::AccessBlocked(_) => DashError::AccessBlocked(e.to_string()),
            IbmError::ApiError { status, .. } => DashError::RemoteRequest {
                status: Some(status),
                message: e.to_string(),
            },
            IbmError::HttpError(ref inner) => DashError::RemoteRequest {
                status: inner.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            IbmError::JsonError(_) => DashError::remote(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_display() {
        assert!(IbmError::MissingApiKey.to_string().contains("API key"));
        assert!(IbmError::MissingServiceCrn.to_string().contains("CRN"));
    }

    #[test]
    fn test_api_error_display() {
        let err = IbmError::ApiError {
            status: 502,
            message: "Bad Gateway".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("502"));
        assert!(msg.contains("Bad Gateway"));
    }

    // -- DashError conversion tests --

    #[test]
    fn test_missing_credentials_to_configuration() {
        let dash: DashError = IbmError::MissingApiKey.into();
        assert!(dash.is_configuration());
        let dash: DashError = IbmError::MissingServiceCrn.into();
        assert!(dash.is_configuration());
    }

    #[test]
    fn test_iam_failure_to_authentication() {
        let dash: DashError = IbmError::IamTokenExchange("401 Unauthorized".into()).into();
        assert!(matches!(dash, DashError::Authentication(msg) if msg.contains("401")));
    }

    #[test]
    fn test_api_error_keeps_status() {
        let dash: DashError = IbmError::ApiError {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert!(matches!(
            dash,
            DashError::RemoteRequest {
                status: Some(500),
                ..
            }
        ));
    }

    #[test]
    fn test_access_blocked_to_dash() {
        let dash: DashError = IbmError::AccessBlocked("HTTP 403".into()).into();
        assert!(dash.is_access_blocked());
    }

    #[test]
    fn test_json_error_to_remote() {
        let json_err = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let dash: DashError = IbmError::JsonError(json_err).into();
        assert!(matches!(dash, DashError::RemoteRequest { status: None, .. }));
    }
}

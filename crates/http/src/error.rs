//! Client error types

use http::StatusCode;
use thiserror::Error;

/// Network-level failure performing a request
#[derive(Debug, Error)]
pub enum TransportError {
    /// Error raised by the reqwest client
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Connection could not be established or was lost
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Request could not be built (bad URL, header, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Classify a reqwest send failure, separating unreachable hosts
    pub(crate) fn from_send(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Request(err)
        }
    }
}

/// Why a refresh attempt did not produce a new token
///
/// Never returned to callers: it is logged and turned into a cleared
/// session plus a single user notification.
#[derive(Debug, Error)]
pub enum RefreshFailure {
    /// Refresh endpoint answered with a non-success status
    #[error("Refresh rejected with status {0}")]
    Rejected(StatusCode),

    /// Success response without a usable `accessToken`
    #[error("Refresh response did not contain an access token")]
    MissingToken,

    /// Refresh endpoint could not be reached
    #[error("Refresh request failed: {0}")]
    Transport(#[from] TransportError),
}

impl RefreshFailure {
    /// User-facing description for the failure notification
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Rejected(_) | Self::MissingToken => "Session expired",
            Self::Transport(_) => "Error: Couldn't connect to authentication servers.",
        }
    }
}

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed (after any refresh attempt)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether the error means the session is gone and the user must log in again
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        assert!(matches!(
            ClientError::from_status(StatusCode::BAD_REQUEST, "x".into()),
            ClientError::BadRequest(_)
        ));
        assert!(
            ClientError::from_status(StatusCode::UNAUTHORIZED, "x".into()).is_auth_expired()
        );
        assert!(matches!(
            ClientError::from_status(StatusCode::FORBIDDEN, "x".into()),
            ClientError::Forbidden(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::NOT_FOUND, "x".into()),
            ClientError::NotFound(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::BAD_GATEWAY, "x".into()),
            ClientError::ServerError { status: 502, .. }
        ));
    }

    #[test]
    fn refresh_failure_messages() {
        assert_eq!(
            RefreshFailure::Rejected(StatusCode::UNAUTHORIZED).user_message(),
            "Session expired"
        );
        assert_eq!(RefreshFailure::MissingToken.user_message(), "Session expired");
        assert!(
            RefreshFailure::Transport(TransportError::Connection("refused".into()))
                .user_message()
                .contains("Couldn't connect")
        );
    }
}

//! Core error types

use thiserror::Error;

/// Failure to decode an access token payload
///
/// Always recovered locally: callers treat it as "no session".
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Token did not have the header.payload.signature shape
    #[error("Malformed token: expected 3 segments, found {0}")]
    Segments(usize),

    /// Payload segment was not valid base64url
    #[error("Invalid payload encoding: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Payload bytes were not UTF-8
    #[error("Payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Payload was not the expected JSON document
    #[error("Invalid payload: {0}")]
    Json(#[from] serde_json::Error),
}

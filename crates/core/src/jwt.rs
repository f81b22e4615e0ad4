//! Access token payload decoding
//!
//! This decodes the payload of a JWT **without verifying its signature**.
//! The result is only good for display and UX decisions (who is logged in,
//! when does the token expire). Authorization is enforced by the server.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// base64url, accepting payloads with or without trailing padding
///
/// Standard-alphabet `+` and `/` are mapped onto `-` and `_` before
/// decoding, so either alphabet is accepted.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Kind of token the payload was issued for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Display preferences carried in the access token
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default, rename = "dateFormat")]
    pub date_format: Option<String>,
    #[serde(default, rename = "firstDay")]
    pub first_day: Option<String>,
}

/// Decoded (untrusted) access token payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub username: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Expiry, seconds since the Unix epoch
    #[serde(default)]
    pub exp: Option<i64>,
    /// Token identifier
    #[serde(default)]
    pub jti: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "profilePicture")]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<i64>,
    #[serde(default)]
    pub admin: Option<i64>,
    #[serde(default)]
    pub internal: Option<i64>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

impl SessionPayload {
    /// Whether `exp` lies strictly after `now` (seconds since epoch)
    pub fn is_live_at(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp > now)
    }
}

/// Decode the payload segment of `token`
pub fn decode(token: &str) -> Result<SessionPayload, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::Segments(segments.len()));
    }

    let payload: String = segments[1]
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    let bytes = PAYLOAD_ENGINE.decode(payload)?;
    let json = String::from_utf8(bytes)?;
    Ok(serde_json::from_str(&json)?)
}

//! Correlation ID for request tracing
//!
//! The identifier is opaque to this layer: it is supplied by the caller,
//! attached to every outbound request and otherwise left alone.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Header carrying the correlation ID on outbound requests
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// A caller-supplied identifier threaded through outbound requests
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Create a new random correlation ID (UUID v4)
    pub fn new() -> Self {
        Self::from_string(&uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier without interpreting it
    pub fn from_string(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// The identifier as sent on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CorrelationId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_string(s))
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

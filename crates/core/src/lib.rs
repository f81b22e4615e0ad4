//! sessionkit core types
//!
//! In-memory access token storage, untrusted JWT payload decoding and the
//! session accessors built on top of them. Nothing in this crate performs
//! network I/O; see `sessionkit-http` for the refresh and fetch layers.

pub mod correlation;
pub mod error;
pub mod jwt;
pub mod session;
pub mod token;

#[cfg(feature = "tracing-init")]
pub mod tracing;

pub use correlation::{CORRELATION_HEADER, CorrelationId};
pub use error::DecodeError;
pub use jwt::{Preferences, SessionPayload, TokenType, decode};
pub use session::Session;
pub use token::TokenStore;

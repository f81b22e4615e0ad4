//! sessionkit HTTP layer
//!
//! Wraps outbound requests with bearer authentication and, on a 401,
//! refreshes the access token through a cookie-authenticated endpoint and
//! retries once. Concurrent requests that hit a 401 together share a single
//! refresh call and all observe its outcome.
//!
//! The network and the user interface are reached through two injected
//! capabilities, [`Transport`] and [`Notifier`].

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod notifier;
pub mod refresh;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{AuthClient, AuthClientBuilder};
pub use config::AuthClientConfig;
pub use error::{ClientError, RefreshFailure, TransportError};
pub use fetch::{AuthFetch, RequestOptions};
pub use notifier::{CallbackNotifier, Notification, Notifier, Severity, TracingNotifier};
pub use refresh::RefreshCoordinator;
pub use transport::{
    Credentials, ReqwestTransport, Transport, TransportRequest, TransportResponse,
};

pub use sessionkit_core::{CorrelationId, Session, SessionPayload, TokenStore};

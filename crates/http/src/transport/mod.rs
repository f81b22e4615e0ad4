//! Transport capability
//!
//! The refresh and fetch layers never talk to the network directly; they
//! hand a [`TransportRequest`] to a [`Transport`] and inspect the
//! [`TransportResponse`]. Production code uses [`ReqwestTransport`], tests
//! substitute their own implementation.

mod reqwest_transport;

pub use reqwest_transport::ReqwestTransport;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use sessionkit_core::{CORRELATION_HEADER, CorrelationId};

use crate::error::TransportError;

/// Whether session cookies ride along with a request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Credentials {
    /// Send and accept cookies
    #[default]
    Include,
    /// No cookies
    Omit,
}

/// A single outbound request
#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub credentials: Credentials,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            credentials: Credentials::default(),
        }
    }

    /// Set a header, replacing any existing value
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Response as seen by the auth layer, body fully buffered
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as text, lossy for invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Performs HTTP requests on behalf of the auth layer
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// `x-correlation-id` header for `id`
pub(crate) fn correlation_header(
    id: &CorrelationId,
) -> Result<(HeaderName, HeaderValue), TransportError> {
    let value = HeaderValue::from_str(id.as_str()).map_err(|_| {
        TransportError::InvalidRequest(format!("correlation id {id:?} is not a valid header value"))
    })?;
    Ok((HeaderName::from_static(CORRELATION_HEADER), value))
}

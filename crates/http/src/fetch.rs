//! Authenticated fetch with one refresh-and-retry on 401

use std::sync::Arc;

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sessionkit_core::{CorrelationId, TokenStore};
use tracing::debug;

use crate::error::{ClientError, TransportError};
use crate::notifier::{Notification, Notifier};
use crate::refresh::RefreshCoordinator;
use crate::transport::{
    Credentials, Transport, TransportRequest, TransportResponse, correlation_header,
};

/// Per-request options: method, extra headers and body
///
/// `Authorization` and `x-correlation-id` are owned by [`AuthFetch`] and
/// are overwritten (or removed) on every attempt.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body))
    }
}

/// Wraps requests with bearer auth, correlation id and 401 handling
#[derive(Clone)]
pub struct AuthFetch {
    transport: Arc<dyn Transport>,
    coordinator: RefreshCoordinator,
    notifier: Arc<dyn Notifier>,
    base_url: Option<String>,
}

impl AuthFetch {
    pub fn new(
        transport: Arc<dyn Transport>,
        coordinator: RefreshCoordinator,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            transport,
            coordinator,
            notifier,
            base_url: None,
        }
    }

    /// Resolve relative targets against `base_url`
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn store(&self) -> &TokenStore {
        self.coordinator.store()
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Perform `options` against `target`
    ///
    /// On a 401 the token is refreshed and the request retried exactly once
    /// with the new token. If the refresh fails the original 401 response is
    /// returned as-is. Network failures of either attempt are returned as
    /// errors.
    pub async fn request(
        &self,
        target: &str,
        correlation_id: &CorrelationId,
        options: RequestOptions,
    ) -> Result<TransportResponse, TransportError> {
        let (response, _) = self.send_authenticated(target, correlation_id, options).await?;
        Ok(response)
    }

    /// The response, plus whether a refresh was attempted and failed
    async fn send_authenticated(
        &self,
        target: &str,
        correlation_id: &CorrelationId,
        options: RequestOptions,
    ) -> Result<(TransportResponse, bool), TransportError> {
        let url = self.resolve(target)?;

        let token = self.store().get();
        let request = Self::build(&url, correlation_id, &options, token.as_deref())?;
        let response = self.transport.send(request).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok((response, false));
        }

        debug!(
            url = %url,
            correlation_id = %correlation_id,
            "Request unauthorized; refreshing access token"
        );
        if !self.coordinator.refresh(correlation_id).await {
            return Ok((response, true));
        }

        // Re-read: the retry must carry the token the refresh just stored
        let token = self.store().get();
        let retry = Self::build(&url, correlation_id, &options, token.as_deref())?;
        debug!(url = %url, correlation_id = %correlation_id, "Retrying request with refreshed token");
        let response = self.transport.send(retry).await?;
        Ok((response, false))
    }

    /// Like [`AuthFetch::request`], decoding a JSON success body
    ///
    /// Non-success statuses become a [`ClientError`] and raise one
    /// "Fetch Error" notification, except for a 401 left by a failed
    /// refresh, which the coordinator has already reported.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        target: &str,
        correlation_id: &CorrelationId,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let (response, refresh_failed) = self
            .send_authenticated(target, correlation_id, options)
            .await?;
        let status = response.status;
        if status.is_success() {
            return Ok(response.json()?);
        }

        if !(refresh_failed && status == StatusCode::UNAUTHORIZED) {
            self.notifier.notify(Notification::danger(
                "Fetch Error",
                format!(
                    "Error: {} | {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            ));
        }
        let text = response.text();
        let message = if text.is_empty() {
            status.to_string()
        } else {
            text
        };
        Err(ClientError::from_status(status, message))
    }

    fn resolve(&self, target: &str) -> Result<String, TransportError> {
        if target.starts_with("http://") || target.starts_with("https://") {
            return Ok(target.to_string());
        }
        let base = self.base_url.as_deref().ok_or_else(|| {
            TransportError::InvalidRequest(format!(
                "relative target '{target}' requires a base URL"
            ))
        })?;
        if target.starts_with('/') {
            Ok(format!("{base}{target}"))
        } else {
            Ok(format!("{base}/{target}"))
        }
    }

    fn build(
        url: &str,
        correlation_id: &CorrelationId,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> Result<TransportRequest, TransportError> {
        let mut headers = options.headers.clone();
        headers.remove(AUTHORIZATION);
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                TransportError::InvalidRequest("access token is not a valid header value".into())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let (name, value) = correlation_header(correlation_id)?;
        headers.insert(name, value);

        Ok(TransportRequest {
            method: options.method.clone(),
            url: url.to_string(),
            headers,
            body: options.body.clone(),
            credentials: Credentials::Include,
        })
    }
}

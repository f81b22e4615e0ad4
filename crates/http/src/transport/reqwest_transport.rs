//! reqwest-backed transport

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::{Client, ClientBuilder};
use tracing::trace;

use super::{Credentials, Transport, TransportRequest, TransportResponse};
use crate::error::TransportError;

const DEFAULT_USER_AGENT: &str = concat!("sessionkit/", env!("CARGO_PKG_VERSION"));

/// Transport over reqwest
///
/// Requests with [`Credentials::Include`] go through a client backed by a
/// shared cookie jar, so a refresh cookie set by the server is replayed on
/// later calls. [`Credentials::Omit`] requests use a cookie-less client.
#[derive(Clone)]
pub struct ReqwestTransport {
    with_cookies: Client,
    without_cookies: Client,
    jar: Arc<Jar>,
}

impl ReqwestTransport {
    /// Create a transport with default settings
    pub fn new() -> Result<Self, TransportError> {
        Self::with_options(None, None)
    }

    /// Create a transport with optional timeout and user agent
    pub fn with_options(
        timeout: Option<Duration>,
        user_agent: Option<&str>,
    ) -> Result<Self, TransportError> {
        let jar = Arc::new(Jar::default());
        let user_agent = user_agent.unwrap_or(DEFAULT_USER_AGENT);

        let with_cookies = Self::client_builder(timeout, user_agent)
            .cookie_provider(Arc::clone(&jar))
            .build()?;
        let without_cookies = Self::client_builder(timeout, user_agent).build()?;

        Ok(Self {
            with_cookies,
            without_cookies,
            jar,
        })
    }

    fn client_builder(timeout: Option<Duration>, user_agent: &str) -> ClientBuilder {
        let mut builder = ClientBuilder::new().user_agent(user_agent);

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        #[cfg(target_arch = "wasm32")]
        let _ = timeout; // Timeouts not supported on WASM

        builder
    }

    /// Cookie jar shared by all credentialed requests
    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.jar
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let client = match request.credentials {
            Credentials::Include => &self.with_cookies,
            Credentials::Omit => &self.without_cookies,
        };

        trace!(method = %request.method, url = %request.url, "Sending request");
        let mut builder = client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(TransportError::from_send)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

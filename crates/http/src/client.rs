//! Wired-up client: token store, refresh coordinator and authenticated fetch

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use sessionkit_core::{CorrelationId, Session, TokenStore};
use tracing::debug;

use crate::config::AuthClientConfig;
use crate::error::{ClientError, TransportError};
use crate::fetch::{AuthFetch, RequestOptions};
use crate::notifier::{Notifier, TracingNotifier};
use crate::refresh::RefreshCoordinator;
use crate::transport::{ReqwestTransport, Transport, TransportResponse};

/// Client that keeps an access token in memory and refreshes it on demand
#[derive(Clone)]
pub struct AuthClient {
    fetch: AuthFetch,
    session: Session,
}

impl AuthClient {
    /// Create a new client builder
    pub fn builder() -> AuthClientBuilder {
        AuthClientBuilder::default()
    }

    /// Build a client from loaded configuration
    pub fn from_config(config: &AuthClientConfig) -> Result<Self, ClientError> {
        Self::builder().config(config.clone()).build()
    }

    /// Install a token obtained from a login flow
    pub fn login(&self, access_token: impl Into<String>) {
        self.session.store().set(Some(access_token.into()));
        debug!("Access token installed");
    }

    /// Drop the local session
    pub fn logout(&self) {
        self.session.logout();
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &TokenStore {
        self.session.store()
    }

    /// Refresh the access token now
    pub async fn refresh(&self, correlation_id: &CorrelationId) -> bool {
        self.fetch.coordinator().refresh(correlation_id).await
    }

    /// See [`AuthFetch::request`]
    pub async fn request(
        &self,
        target: &str,
        correlation_id: &CorrelationId,
        options: RequestOptions,
    ) -> Result<TransportResponse, TransportError> {
        self.fetch.request(target, correlation_id, options).await
    }

    /// See [`AuthFetch::request_json`]
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        target: &str,
        correlation_id: &CorrelationId,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        self.fetch
            .request_json(target, correlation_id, options)
            .await
    }

    /// The underlying fetch wrapper
    pub fn fetch(&self) -> &AuthFetch {
        &self.fetch
    }
}

/// Builder for [`AuthClient`]
///
/// Defaults to a [`ReqwestTransport`] and a [`TracingNotifier`]; both can
/// be replaced, e.g. with a UI toast notifier or a test transport.
#[derive(Default)]
pub struct AuthClientBuilder {
    config: Option<AuthClientConfig>,
    base_url: Option<String>,
    auth_api_url: Option<String>,
    refresh_path: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    notifier: Option<Arc<dyn Notifier>>,
    store: Option<TokenStore>,
}

impl AuthClientBuilder {
    /// Start from a loaded configuration; explicit setters override it
    pub fn config(mut self, config: AuthClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the base URL for relative request targets
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the authentication API URL (the refresh endpoint lives under it)
    pub fn auth_api_url(mut self, url: impl Into<String>) -> Self {
        self.auth_api_url = Some(url.into());
        self
    }

    /// Set the refresh endpoint path
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = Some(path.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Share an existing token store
    pub fn store(mut self, store: TokenStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<AuthClient, ClientError> {
        let has_config = self.config.is_some();
        let mut config = self.config.unwrap_or_default();
        match self.auth_api_url {
            Some(url) => config.auth_api_url = url,
            None if !has_config => {
                return Err(ClientError::Configuration(
                    "auth_api_url is required".into(),
                ));
            }
            None => {}
        }
        if let Some(url) = self.base_url {
            config.base_url = Some(url);
        }
        if let Some(path) = self.refresh_path {
            config.refresh_path = path;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = Some(timeout.as_secs());
        }
        if let Some(agent) = self.user_agent {
            config.user_agent = Some(agent);
        }
        config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_options(
                config.timeout(),
                config.user_agent.as_deref(),
            )?),
        };
        let notifier: Arc<dyn Notifier> = match self.notifier {
            Some(notifier) => notifier,
            None => Arc::new(TracingNotifier),
        };
        let store = self.store.unwrap_or_default();

        let refresh_url = config.refresh_url();
        debug!(refresh_url = %refresh_url, "Building auth client");
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&notifier),
            store.clone(),
            refresh_url,
        );
        let mut fetch = AuthFetch::new(transport, coordinator, notifier);
        if let Some(base_url) = &config.base_url {
            fetch = fetch.with_base_url(base_url.as_str());
        }

        Ok(AuthClient {
            fetch,
            session: Session::new(store),
        })
    }
}

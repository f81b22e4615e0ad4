//! Single-flight access token refresh
//!
//! Any number of callers may ask for a refresh at the same time (typically
//! every request that just got a 401). Only the first one issues the call to
//! the refresh endpoint; everyone else awaits the same pending handle and
//! observes the same outcome. The handle is dropped as soon as the call
//! settles, so the next request after that starts a brand-new attempt.
//!
//! The refresh itself runs as a spawned task: once issued it completes even
//! if every waiter goes away. Calling [`RefreshCoordinator::refresh`]
//! therefore requires a tokio runtime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use http::header::{CONTENT_TYPE, HeaderValue};
use http::Method;
use serde::Deserialize;
use sessionkit_core::{CorrelationId, TokenStore};
use tracing::{debug, info, warn};

use crate::error::RefreshFailure;
use crate::notifier::{Notification, Notifier};
use crate::transport::{Credentials, Transport, TransportRequest, correlation_header};

/// Title of the notification shown when a refresh fails
pub const REFRESH_FAILED_TITLE: &str = "Authentication Failed";

type RefreshHandle = Shared<BoxFuture<'static, bool>>;

/// The in-flight refresh, if any
struct Pending {
    attempt: u64,
    handle: RefreshHandle,
}

#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken", default)]
    access_token: Option<String>,
}

/// Deduplicates concurrent refresh attempts
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    store: TokenStore,
    refresh_url: String,
    pending: Mutex<Option<Pending>>,
    attempts: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
        store: TokenStore,
        refresh_url: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                notifier,
                store,
                refresh_url: refresh_url.into(),
                pending: Mutex::new(None),
                attempts: AtomicU64::new(0),
            }),
        }
    }

    /// Obtain a new access token
    ///
    /// Returns `true` when a new token was stored. On `false` the token
    /// store has been cleared and the user notified (once per attempt, not
    /// once per waiter).
    pub async fn refresh(&self, correlation_id: &CorrelationId) -> bool {
        // Check-and-create happens under the lock with no await in between
        let handle = {
            let mut pending = self.inner.lock_pending();
            match pending.as_ref() {
                Some(in_flight) => {
                    debug!(
                        attempt = in_flight.attempt,
                        correlation_id = %correlation_id,
                        "Joining in-flight token refresh"
                    );
                    in_flight.handle.clone()
                }
                None => {
                    let attempt = self.inner.attempts.fetch_add(1, Ordering::Relaxed) + 1;
                    let handle = Inner::start(Arc::clone(&self.inner), attempt, correlation_id.clone());
                    *pending = Some(Pending {
                        attempt,
                        handle: handle.clone(),
                    });
                    handle
                }
            }
        };

        handle.await
    }

    /// Whether a refresh is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.inner.lock_pending().is_some()
    }

    /// Token store updated by this coordinator
    pub fn store(&self) -> &TokenStore {
        &self.inner.store
    }

    /// URL of the refresh endpoint
    pub fn refresh_url(&self) -> &str {
        &self.inner.refresh_url
    }
}

impl Inner {
    fn lock_pending(&self) -> MutexGuard<'_, Option<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start(inner: Arc<Self>, attempt: u64, correlation_id: CorrelationId) -> RefreshHandle {
        // Moved into the task so dropping it unpolled still settles
        let settle = SettleOnDrop {
            inner: Arc::clone(&inner),
            attempt,
        };
        let task = tokio::spawn(async move {
            let _settle = settle;
            inner.run(attempt, &correlation_id).await
        });

        async move {
            task.await.unwrap_or_else(|err| {
                warn!(attempt, error = %err, "Token refresh task did not complete");
                false
            })
        }
        .boxed()
        .shared()
    }

    async fn run(&self, attempt: u64, correlation_id: &CorrelationId) -> bool {
        debug!(attempt, correlation_id = %correlation_id, "Refreshing access token");
        match self.exchange(correlation_id).await {
            Ok(token) => {
                self.store.set(Some(token));
                info!(attempt, correlation_id = %correlation_id, "Access token refreshed");
                true
            }
            Err(failure) => {
                warn!(
                    attempt,
                    correlation_id = %correlation_id,
                    error = %failure,
                    "Token refresh failed; clearing session"
                );
                self.store.clear();
                self.notifier.notify(Notification::danger(
                    REFRESH_FAILED_TITLE,
                    failure.user_message(),
                ));
                false
            }
        }
    }

    async fn exchange(&self, correlation_id: &CorrelationId) -> Result<String, RefreshFailure> {
        let (name, value) = correlation_header(correlation_id)?;
        // Cookie-authenticated: no bearer header on purpose
        let request = TransportRequest::new(Method::POST, self.refresh_url.as_str())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(name, value)
            .credentials(Credentials::Include);

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(RefreshFailure::Rejected(response.status));
        }

        let body: RefreshResponse = response
            .json()
            .map_err(|_| RefreshFailure::MissingToken)?;
        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or(RefreshFailure::MissingToken)
    }

    /// Clear the pending handle if it still belongs to `attempt`
    fn settle(&self, attempt: u64) {
        let mut pending = self.lock_pending();
        if pending.as_ref().is_some_and(|p| p.attempt == attempt) {
            *pending = None;
        }
    }
}

/// Clears the pending handle when the refresh task ends, even on panic
struct SettleOnDrop {
    inner: Arc<Inner>,
    attempt: u64,
}

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        self.inner.settle(self.attempt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::notifier::{CallbackNotifier, MockNotifier};
    use crate::testing::{FakeTransport, reply};
    use futures::future::join_all;
    use http::header::AUTHORIZATION;
    use std::sync::atomic::AtomicUsize;

    const REFRESH_URL: &str = "http://auth.test/refresh";

    fn counting_notifier() -> (Arc<dyn Notifier>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let notifier = CallbackNotifier::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (Arc::new(notifier), count)
    }

    fn coordinator(
        transport: &Arc<FakeTransport>,
        notifier: Arc<dyn Notifier>,
        store: &TokenStore,
    ) -> RefreshCoordinator {
        let transport: Arc<dyn Transport> = transport.clone();
        RefreshCoordinator::new(transport, notifier, store.clone(), REFRESH_URL)
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_share_one_call() {
        let transport = Arc::new(FakeTransport::new(|_| reply(200, r#"{"accessToken":"t2"}"#)));
        let (notifier, notified) = counting_notifier();
        let store = TokenStore::with_token("t1");
        let coordinator = coordinator(&transport, notifier, &store);

        let cid = CorrelationId::from_string("cid-1");
        let results = join_all((0..8).map(|_| coordinator.refresh(&cid))).await;

        assert_eq!(results, vec![true; 8]);
        assert_eq!(transport.requests_to(REFRESH_URL).len(), 1);
        assert_eq!(store.get().as_deref(), Some("t2"));
        assert_eq!(notified.load(Ordering::SeqCst), 0);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_failures_notify_once() {
        let transport = Arc::new(FakeTransport::new(|_| reply(401, "expired")));
        let (notifier, notified) = counting_notifier();
        let store = TokenStore::with_token("stale");
        let coordinator = coordinator(&transport, notifier, &store);

        let cid = CorrelationId::new();
        let results = join_all((0..5).map(|_| coordinator.refresh(&cid))).await;

        assert_eq!(results, vec![false; 5]);
        assert_eq!(transport.requests_to(REFRESH_URL).len(), 1);
        assert_eq!(store.get(), None);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_on_other_tasks_share_the_outcome() {
        let transport = Arc::new(FakeTransport::new(|_| reply(200, r#"{"accessToken":"t9"}"#)));
        let (notifier, _) = counting_notifier();
        let store = TokenStore::new();
        let coordinator = coordinator(&transport, notifier, &store);

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                        let cid = CorrelationId::new();
                        coordinator.refresh(&cid).await
                    })
        };
        // Let the first task create the handle before the second arrives
        tokio::task::yield_now().await;
        assert!(coordinator.is_refreshing());
        let second = coordinator.refresh(&CorrelationId::new()).await;

        assert!(second);
        assert!(first.await.unwrap());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn settled_refresh_is_not_reused() {
        let transport = Arc::new(FakeTransport::new(|_| reply(200, r#"{"accessToken":"fresh"}"#)));
        let (notifier, _) = counting_notifier();
        let store = TokenStore::new();
        let coordinator = coordinator(&transport, notifier, &store);

        let cid = CorrelationId::new();
        assert!(coordinator.refresh(&cid).await);
        assert!(!coordinator.is_refreshing());
        assert!(coordinator.refresh(&cid).await);

        assert_eq!(transport.requests_to(REFRESH_URL).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_request_shape() {
        let transport = Arc::new(FakeTransport::new(|_| reply(200, r#"{"accessToken":"t2"}"#)));
        let (notifier, _) = counting_notifier();
        let store = TokenStore::with_token("old");
        let coordinator = coordinator(&transport, notifier, &store);

        coordinator.refresh(&CorrelationId::from_string("trace-7")).await;

        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, REFRESH_URL);
        assert_eq!(request.credentials, Credentials::Include);
        assert_eq!(request.headers["x-correlation-id"], "trace-7");
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert!(request.headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn success_without_token_is_failure() {
        for body in [r#"{}"#, r#"{"accessToken":""}"#, r#"{"accessToken":42}"#, "not json"] {
            let transport = Arc::new(FakeTransport::new(move |_| reply(200, body)));
            let mut notifier = MockNotifier::new();
            notifier
                .expect_notify()
                .withf(|n| n.title == REFRESH_FAILED_TITLE && n.description == "Session expired")
                .times(1)
                .return_const(());
            let store = TokenStore::with_token("old");
            let coordinator = coordinator(&transport, Arc::new(notifier), &store);

            assert!(!coordinator.refresh(&CorrelationId::new()).await, "body: {body}");
            assert_eq!(store.get(), None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_is_failure() {
        let transport = Arc::new(FakeTransport::new(|_| {
            Err(TransportError::Connection("connection refused".into()))
        }));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|n| n.description.contains("Couldn't connect"))
            .times(1)
            .return_const(());
        let store = TokenStore::with_token("old");
        let coordinator = coordinator(&transport, Arc::new(notifier), &store);

        let cid = CorrelationId::new();
        let results = join_all((0..3).map(|_| coordinator.refresh(&cid))).await;

        assert_eq!(results, vec![false; 3]);
        assert_eq!(store.get(), None);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_correlation_id_fails_without_network() {
        let transport = Arc::new(FakeTransport::new(|_| reply(200, r#"{"accessToken":"t"}"#)));
        let (notifier, notified) = counting_notifier();
        let store = TokenStore::with_token("old");
        let coordinator = coordinator(&transport, notifier, &store);

        assert!(!coordinator.refresh(&CorrelationId::from_string("bad\r\nid")).await);
        assert!(transport.requests().is_empty());
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn task_dropped_before_first_poll_clears_handle() {
        let transport = Arc::new(FakeTransport::new(|_| reply(200, r#"{"accessToken":"t"}"#)));
        let (notifier, notified) = counting_notifier();
        let store = TokenStore::with_token("old");
        let coordinator = coordinator(&transport, notifier, &store);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome = runtime.block_on(async {
            let cid = CorrelationId::new();
            coordinator.refresh(&cid).now_or_never()
        });
        assert_eq!(outcome, None);
        assert!(coordinator.is_refreshing());

        // Shutdown drops the spawned refresh without ever polling it
        drop(runtime);

        assert!(!coordinator.is_refreshing());
        assert!(transport.requests().is_empty());
        assert_eq!(store.get().as_deref(), Some("old"));
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_flight_holds_across_worker_threads() {
        let transport = Arc::new(FakeTransport::new(|_| reply(401, "expired")));
        let (notifier, notified) = counting_notifier();
        let store = TokenStore::new();
        let coordinator = coordinator(&transport, notifier, &store);

        for round in 0..20 {
            store.set(Some(format!("t{round}")));
            let tasks: Vec<_> = (0..32)
                .map(|_| {
                    let coordinator = coordinator.clone();
                    tokio::spawn(async move {
                        let cid = CorrelationId::new();
                        coordinator.refresh(&cid).await
                    })
                })
                .collect();
            for outcome in join_all(tasks).await {
                assert!(!outcome.unwrap());
            }

            assert_eq!(store.get(), None);
            assert!(!coordinator.is_refreshing());
            assert_eq!(
                transport.requests_to(REFRESH_URL).len(),
                notified.load(Ordering::SeqCst)
            );
        }
    }
}

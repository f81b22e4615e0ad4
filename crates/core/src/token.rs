//! In-memory access token store
//!
//! Holds the current bearer token, or nothing when unauthenticated. The
//! store is never persisted; a process restart always starts empty.

use tokio::sync::watch;

/// Shared, observable holder of the current access token
///
/// Clones share the same underlying state. Construct a new store with
/// [`TokenStore::new`] to get an isolated one (e.g. per test).
#[derive(Clone, Debug)]
pub struct TokenStore {
    tx: watch::Sender<Option<String>>,
}

impl TokenStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Create a store that already holds a token
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(Some(token.into()));
        store
    }

    /// Current token, if any
    pub fn get(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Replace the current token. No validation is performed.
    pub fn set(&self, token: Option<String>) {
        self.tx.send_replace(token);
    }

    /// Remove the current token
    pub fn clear(&self) {
        self.set(None);
    }

    /// Whether a token is currently held
    pub fn is_present(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Observe changes to the token
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

//! Session accessors derived from the token store
//!
//! Every answer here is recomputed from the current token on demand and is
//! a purely local, optimistic view: the signature is never checked and the
//! server is never consulted. Use it to decide what to render, not what the
//! user is allowed to do.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::jwt::{self, SessionPayload};
use crate::token::TokenStore;

/// Read-only view over the session held in a [`TokenStore`]
#[derive(Clone, Debug)]
pub struct Session {
    store: TokenStore,
}

impl Session {
    pub fn new(store: TokenStore) -> Self {
        Self { store }
    }

    /// The underlying token store
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Decoded payload of the current token, `None` if there is no token
    /// or it cannot be decoded
    pub fn current(&self) -> Option<SessionPayload> {
        let token = self.store.get()?;
        match jwt::decode(&token) {
            Ok(payload) => Some(payload),
            Err(err) => {
                debug!(error = %err, "Stored token could not be decoded; treating as no session");
                None
            }
        }
    }

    /// Whether a token is held at all, without decoding it
    pub fn has_token(&self) -> bool {
        self.store.is_present()
    }

    /// Whether a decodable, unexpired session exists right now
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now().timestamp())
    }

    /// Like [`Session::is_authenticated`] against an explicit clock
    pub fn is_authenticated_at(&self, now: i64) -> bool {
        self.current()
            .is_some_and(|payload| payload.is_live_at(now))
    }

    pub fn user_id(&self) -> Option<i64> {
        self.current().map(|payload| payload.user_id)
    }

    pub fn username(&self) -> Option<String> {
        self.current().map(|payload| payload.username)
    }

    /// Expiry of the current token as a timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.current()
            .and_then(|payload| payload.exp)
            .and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// Drop the local session
    pub fn logout(&self) {
        // TODO: invalidate the refresh cookie server-side once a logout endpoint exists
        self.store.clear();
        debug!("Local session cleared");
    }
}

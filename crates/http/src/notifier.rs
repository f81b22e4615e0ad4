//! User-facing notifications
//!
//! The auth layer reports failures the user should see (an expired session,
//! an unreachable auth server) through a [`Notifier`]. Delivery is
//! fire-and-forget: the caller never waits on or inspects the outcome.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

/// How prominently a notification should be shown
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

/// A message for the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn danger(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Danger,
        }
    }
}

/// Shows notifications to the user
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Notifier that writes notifications to the log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let Notification {
            title,
            description,
            severity,
        } = notification;
        match severity {
            Severity::Info => info!(%title, %description, "User notification"),
            Severity::Warning => warn!(%title, %description, "User notification"),
            Severity::Danger => error!(%title, %description, "User notification"),
        }
    }
}

/// Notifier that forwards to a callback, e.g. a UI toast hook
#[derive(Clone)]
pub struct CallbackNotifier {
    callback: Arc<dyn Fn(Notification) + Send + Sync>,
}

impl CallbackNotifier {
    pub fn new(callback: impl Fn(Notification) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl fmt::Debug for CallbackNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackNotifier").finish_non_exhaustive()
    }
}

impl Notifier for CallbackNotifier {
    fn notify(&self, notification: Notification) {
        (self.callback)(notification);
    }
}

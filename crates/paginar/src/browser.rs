//! Seam to the browser-automation collaborator.
//!
//! Paginar never drives a browser itself. It consumes the current
//! location as a plain string, issues navigations through one method,
//! and probes the driver's configured wait time through two optional
//! capability getters. Everything else about the driver is opaque.

use std::sync::Mutex;
use std::time::Duration;

use crate::result::PaginarResult;

/// The browser session a page descriptor operates against.
pub trait Session {
    /// Current location of the page under test.
    fn current_url(&self) -> String;

    /// Navigate the session to the given URL.
    ///
    /// # Errors
    ///
    /// Returns `PaginarError::Navigation` when the driver rejects the
    /// navigation.
    fn visit(&self, url: &str) -> PaginarResult<()>;

    /// The driver's configured wait time, when it exposes one.
    fn default_max_wait_time(&self) -> Option<Duration> {
        None
    }

    /// Older drivers expose the wait time under a legacy name; probed
    /// only when `default_max_wait_time` reports nothing.
    fn default_wait_time(&self) -> Option<Duration> {
        None
    }
}

/// In-memory session double for tests and examples.
#[derive(Debug, Default)]
pub struct MockSession {
    current_url: Mutex<String>,
    visited: Mutex<Vec<String>>,
    max_wait_time: Option<Duration>,
    legacy_wait_time: Option<Duration>,
}

impl MockSession {
    /// Create a session with an empty location.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session already showing `url`.
    #[must_use]
    pub fn at(url: impl Into<String>) -> Self {
        let session = Self::default();
        session.set_current_url(url);
        session
    }

    /// Advertise a primary configured wait time.
    #[must_use]
    pub fn with_max_wait_time(mut self, timeout: Duration) -> Self {
        self.max_wait_time = Some(timeout);
        self
    }

    /// Advertise a legacy configured wait time.
    #[must_use]
    pub fn with_legacy_wait_time(mut self, timeout: Duration) -> Self {
        self.legacy_wait_time = Some(timeout);
        self
    }

    /// Move the session to a new location without recording a visit.
    pub fn set_current_url(&self, url: impl Into<String>) {
        *self
            .current_url
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = url.into();
    }

    /// URLs navigated to through `visit`, in order.
    #[must_use]
    pub fn visited(&self) -> Vec<String> {
        self.visited
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Session for MockSession {
    fn current_url(&self) -> String {
        self.current_url
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn visit(&self, url: &str) -> PaginarResult<()> {
        self.visited
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(url.to_string());
        self.set_current_url(url);
        Ok(())
    }

    fn default_max_wait_time(&self) -> Option<Duration> {
        self.max_wait_time
    }

    fn default_wait_time(&self) -> Option<Duration> {
        self.legacy_wait_time
    }
}

//! Result and error types for Paginar.

use std::time::Duration;
use thiserror::Error;

/// Result type for Paginar operations
pub type PaginarResult<T> = Result<T, PaginarError>;

/// Errors that can occur in Paginar
#[derive(Debug, Error)]
pub enum PaginarError {
    /// Pattern is not a usable URL matcher
    #[error("Invalid URL matcher: {message}")]
    InvalidMatcher {
        /// Why the pattern was rejected
        message: String,
    },

    /// Malformed URI template syntax
    #[error("URI template error: {message}")]
    Template {
        /// Parse failure description
        message: String,
    },

    /// Condition did not become true before the deadline
    #[error("Timed out after {timeout:?} waiting for condition")]
    Timeout {
        /// Timeout that was exhausted
        timeout: Duration,
    },

    /// Page operation needs a URL but none was declared
    #[error("No URL declared for page")]
    NoUrl,

    /// Readiness check needs a URL matcher but none was declared
    #[error("No URL matcher declared for page")]
    NoUrlMatcher,

    /// Navigation failure propagated from the browser session
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed to load
        url: String,
        /// Driver-reported failure
        message: String,
    },
}

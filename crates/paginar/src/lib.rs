//! Paginar: page-object readiness primitives for browser tests.
//!
//! Paginar (Spanish: "to page") answers one question for a declared
//! page of a UI: is it currently displayed, and with what URL
//! parameters? Pages declare a URL pattern once — a plain string, a URI
//! template, or a regular expression — and readiness checks match the
//! browser's current location against it, extracting template bindings
//! on the way. A bounded waiter turns the same check into a poll with a
//! deadline.
//!
//! The browser itself stays behind the [`Session`] seam: Paginar only
//! reads the current location as a string and issues navigations.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                     PAGINAR Architecture                        │
//! ├────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌──────────────┐    ┌────────────┐         │
//! │   │ Page       │───►│ UrlMatcher / │    │ Session    │         │
//! │   │ descriptor │    │ UriTemplate  │◄───│ (driver)   │         │
//! │   └────────────┘    └──────────────┘    └────────────┘         │
//! │         │                                     ▲                │
//! │         └──────► Waiter (bounded polling) ────┘                │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::bool_assert_comparison))]

/// Browser session seam and in-memory test double
pub mod browser;

/// URL matchers: literal, template, and regex variants
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod matcher;

/// Page descriptors combining a URL, matcher, and default expansion
pub mod page;

mod result;

/// URI templates: expansion and extraction
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
pub mod template;

mod uri;

/// Bounded polling and wait-time configuration
pub mod wait;

pub use browser::{MockSession, Session};
pub use matcher::{CaptureSet, Literal, UrlMatcher, UrlMatches};
pub use page::{Page, PageBuilder};
pub use result::{PaginarError, PaginarResult};
pub use template::{Expansion, ParamValue, UriTemplate};
pub use wait::{
    default_wait_time, set_default_wait_time, wait_settings, wait_until_true, WaitSettings,
    Waiter, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};

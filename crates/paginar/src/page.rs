//! Page descriptors: a declared URL, matcher, and default expansion.
//!
//! A `Page` bundles everything declared once for a logical page of the
//! UI: where it lives (a URI template), how to recognize it (a
//! `UrlMatcher`), and which bindings to expand with when the caller
//! supplies none. The descriptor itself is immutable after `build`.

use std::time::Duration;

use tracing::debug;

use crate::browser::Session;
use crate::matcher::{UrlMatcher, UrlMatches};
use crate::result::{PaginarError, PaginarResult};
use crate::template::{Expansion, UriTemplate};
use crate::wait::Waiter;

/// Builder for `Page` descriptors.
#[derive(Debug, Default)]
pub struct PageBuilder {
    url: Option<String>,
    matcher: Option<UrlMatcher>,
    default_expansion: Expansion,
}

impl PageBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the page's URL. Template expressions are allowed.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Declare an explicit URL matcher.
    #[must_use]
    pub fn with_matcher(mut self, matcher: UrlMatcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Declare default bindings used by URL expansion when a call
    /// supplies none of its own.
    #[must_use]
    pub fn with_default_expansion(mut self, expansion: Expansion) -> Self {
        self.default_expansion = expansion;
        self
    }

    /// Build the descriptor. A declared URL doubles as the matcher
    /// unless one was set explicitly.
    ///
    /// # Errors
    ///
    /// Returns a template or matcher declaration error when the URL or
    /// matcher pattern is malformed.
    pub fn build(self) -> PaginarResult<Page> {
        let matcher = match self.matcher {
            Some(matcher) => Some(matcher),
            None => self.url.as_deref().map(UrlMatcher::parse).transpose()?,
        };
        let url = self.url.as_deref().map(UriTemplate::parse).transpose()?;
        Ok(Page {
            url,
            matcher,
            default_expansion: self.default_expansion,
        })
    }
}

/// A logical page or section of the UI under test.
///
/// # Example
///
/// ```
/// use paginar::{Expansion, MockSession, Page};
///
/// let page = Page::builder()
///     .with_url("/users{/username}")
///     .build()
///     .unwrap();
/// let session = MockSession::at("http://localhost:3000/users/ada");
/// assert!(page.displayed(&session, &Expansion::new()).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct Page {
    url: Option<UriTemplate>,
    matcher: Option<UrlMatcher>,
    default_expansion: Expansion,
}

impl Page {
    /// Start declaring a page.
    #[must_use]
    pub fn builder() -> PageBuilder {
        PageBuilder::new()
    }

    /// The declared URL template, if any.
    #[must_use]
    pub fn url_template(&self) -> Option<&UriTemplate> {
        self.url.as_ref()
    }

    /// The matcher used by readiness checks, if any.
    #[must_use]
    pub fn url_matcher(&self) -> Option<&UrlMatcher> {
        self.matcher.as_ref()
    }

    /// The declared default expansion bindings.
    #[must_use]
    pub fn default_expansion(&self) -> &Expansion {
        &self.default_expansion
    }

    /// Concrete URL for this page. Explicit bindings disable the
    /// declared defaults wholesale; defaults apply only to a call with
    /// no bindings at all.
    ///
    /// # Errors
    ///
    /// Returns `PaginarError::NoUrl` when no URL was declared.
    pub fn url(&self, bindings: &Expansion) -> PaginarResult<String> {
        let template = self.url.as_ref().ok_or(PaginarError::NoUrl)?;
        Ok(template.expand_or_defaults(bindings, &self.default_expansion))
    }

    /// Expand the URL and navigate the session to it.
    ///
    /// # Errors
    ///
    /// Returns `PaginarError::NoUrl` when no URL was declared, or the
    /// session's navigation error.
    pub fn load(&self, session: &dyn Session, bindings: &Expansion) -> PaginarResult<()> {
        let url = self.url(bindings)?;
        debug!(%url, "loading page");
        session.visit(&url)
    }

    /// Whether the session currently shows this page, optionally
    /// requiring extracted bindings to equal `expected`.
    ///
    /// # Errors
    ///
    /// Returns `PaginarError::NoUrlMatcher` when neither a matcher nor a
    /// URL was declared.
    pub fn displayed(&self, session: &dyn Session, expected: &Expansion) -> PaginarResult<bool> {
        let matcher = self.matcher.as_ref().ok_or(PaginarError::NoUrlMatcher)?;
        Ok(matcher.matches_with(&session.current_url(), expected))
    }

    /// Extraction form of `displayed`: the match result for the current
    /// location, or `None` when it does not match.
    ///
    /// # Errors
    ///
    /// Returns `PaginarError::NoUrlMatcher` when neither a matcher nor a
    /// URL was declared.
    pub fn url_matches(&self, session: &dyn Session) -> PaginarResult<Option<UrlMatches>> {
        let matcher = self.matcher.as_ref().ok_or(PaginarError::NoUrlMatcher)?;
        Ok(matcher.find(&session.current_url()))
    }

    /// Poll until the page is displayed. A `None` timeout resolves
    /// through the configured default chain, probing the session.
    ///
    /// # Errors
    ///
    /// Returns `PaginarError::NoUrlMatcher` when no matcher was declared
    /// and `PaginarError::Timeout` when the deadline passes first.
    pub fn wait_until_displayed(
        &self,
        session: &dyn Session,
        timeout: Option<Duration>,
        expected: &Expansion,
    ) -> PaginarResult<()> {
        let matcher = self.matcher.as_ref().ok_or(PaginarError::NoUrlMatcher)?;
        let waiter = Waiter::new();
        let timeout = timeout.unwrap_or_else(|| waiter.default_wait_time(Some(session)));
        waiter.wait_until_true(timeout, || {
            matcher.matches_with(&session.current_url(), expected)
        })?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! Bounded polling: re-evaluate a predicate until true or a deadline.
//!
//! The deadline is fixed when polling begins. Sleeps between evaluations
//! are clamped to the time remaining, so the observed overrun stays
//! below one poll interval.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::browser::Session;
use crate::result::{PaginarError, PaginarResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Fallback wait timeout when neither an override nor a session default
/// is configured (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// WAIT SETTINGS
// =============================================================================

/// Wait-time configuration.
///
/// One process-wide instance backs the free-function API; tests can build
/// private instances and hand them to `Waiter::with_settings` instead of
/// mutating global state.
#[derive(Debug, Default)]
pub struct WaitSettings {
    override_wait: Mutex<Option<Duration>>,
}

impl WaitSettings {
    /// Create settings with no override configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the default wait time unconditionally. Takes effect for
    /// every subsequent call that does not pass an explicit timeout.
    pub fn set_default_wait_time(&self, timeout: Duration) {
        *self
            .override_wait
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(timeout);
    }

    /// Remove the override, restoring session-derived defaults.
    pub fn clear_default_wait_time(&self) {
        *self
            .override_wait
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The explicitly-configured override, if any.
    #[must_use]
    pub fn override_wait_time(&self) -> Option<Duration> {
        *self
            .override_wait
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve the default wait time: the explicit override wins, then
    /// the session's primary wait-time capability, then its legacy one,
    /// then the crate fallback. The two-step session probe keeps waits in
    /// sync with the driver's own timeout unless explicitly decoupled.
    #[must_use]
    pub fn default_wait_time(&self, session: Option<&dyn Session>) -> Duration {
        if let Some(timeout) = self.override_wait_time() {
            return timeout;
        }
        if let Some(session) = session {
            if let Some(timeout) = session.default_max_wait_time() {
                return timeout;
            }
            if let Some(timeout) = session.default_wait_time() {
                return timeout;
            }
        }
        Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS)
    }
}

/// The process-wide wait settings backing the free-function API.
#[must_use]
pub fn wait_settings() -> Arc<WaitSettings> {
    static SETTINGS: OnceLock<Arc<WaitSettings>> = OnceLock::new();
    Arc::clone(SETTINGS.get_or_init(|| Arc::new(WaitSettings::new())))
}

// =============================================================================
// WAITER
// =============================================================================

/// Polls caller-supplied predicates against a deadline.
#[derive(Debug, Clone)]
pub struct Waiter {
    settings: Arc<WaitSettings>,
    poll_interval: Duration,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Waiter {
    /// Create a waiter backed by the process-wide settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(wait_settings())
    }

    /// Create a waiter backed by a private settings instance.
    #[must_use]
    pub fn with_settings(settings: Arc<WaitSettings>) -> Self {
        Self {
            settings,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Set the polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Resolve the effective default timeout for this waiter.
    #[must_use]
    pub fn default_wait_time(&self, session: Option<&dyn Session>) -> Duration {
        self.settings.default_wait_time(session)
    }

    /// Re-evaluate `predicate` until it returns true or `timeout`
    /// elapses. Returns on the first truthy result with no further
    /// evaluations.
    ///
    /// A zero timeout evaluates the predicate exactly once and raises
    /// without blocking when it is false.
    ///
    /// # Errors
    ///
    /// Returns `PaginarError::Timeout` carrying `timeout` when the
    /// deadline passes without a truthy result.
    pub fn wait_until_true<F>(&self, timeout: Duration, mut predicate: F) -> PaginarResult<bool>
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if predicate() {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                trace!(?timeout, "condition did not become true before the deadline");
                return Err(PaginarError::Timeout { timeout });
            }
            std::thread::sleep(self.poll_interval.min(deadline - now));
        }
    }

    /// `wait_until_true` with the resolved default timeout.
    ///
    /// # Errors
    ///
    /// Returns `PaginarError::Timeout` when the deadline passes without a
    /// truthy result.
    pub fn wait_until_true_with_default<F>(
        &self,
        session: Option<&dyn Session>,
        predicate: F,
    ) -> PaginarResult<bool>
    where
        F: FnMut() -> bool,
    {
        let timeout = self.default_wait_time(session);
        self.wait_until_true(timeout, predicate)
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Wait for a predicate with an explicit timeout.
///
/// # Errors
///
/// Returns `PaginarError::Timeout` when the deadline passes without a
/// truthy result.
pub fn wait_until_true<F>(timeout: Duration, predicate: F) -> PaginarResult<bool>
where
    F: FnMut() -> bool,
{
    Waiter::new().wait_until_true(timeout, predicate)
}

/// Overwrite the process-wide default wait time.
pub fn set_default_wait_time(timeout: Duration) {
    wait_settings().set_default_wait_time(timeout);
}

/// The process-wide default wait time. No session is probed; callers
/// with a session in hand should ask a `Waiter` instead.
#[must_use]
pub fn default_wait_time() -> Duration {
    wait_settings().default_wait_time(None)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::browser::MockSession;

    fn fresh_waiter() -> Waiter {
        Waiter::with_settings(Arc::new(WaitSettings::new()))
    }

    // =========================================================================
    // WaitSettings Tests
    // =========================================================================

    mod settings_tests {
        use super::*;

        #[test]
        fn test_uses_session_primary_wait_time_when_unset() {
            let settings = WaitSettings::new();
            let session = MockSession::new()
                .with_max_wait_time(Duration::from_secs(1))
                .with_legacy_wait_time(Duration::from_secs(2));
            assert_eq!(
                settings.default_wait_time(Some(&session)),
                Duration::from_secs(1)
            );
        }

        #[test]
        fn test_falls_back_to_legacy_wait_time() {
            let settings = WaitSettings::new();
            let session = MockSession::new().with_legacy_wait_time(Duration::from_secs(2));
            assert_eq!(
                settings.default_wait_time(Some(&session)),
                Duration::from_secs(2)
            );
        }

        #[test]
        fn test_falls_back_to_crate_default() {
            let settings = WaitSettings::new();
            assert_eq!(
                settings.default_wait_time(None),
                Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS)
            );
            assert_eq!(
                settings.default_wait_time(Some(&MockSession::new())),
                Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS)
            );
        }

        #[test]
        fn test_override_beats_session_capabilities() {
            let settings = WaitSettings::new();
            settings.set_default_wait_time(Duration::from_secs(123));
            let session = MockSession::new()
                .with_max_wait_time(Duration::from_secs(1))
                .with_legacy_wait_time(Duration::from_secs(2));
            assert_eq!(
                settings.default_wait_time(Some(&session)),
                Duration::from_secs(123)
            );
        }

        #[test]
        fn test_override_can_be_overwritten_and_cleared() {
            let settings = WaitSettings::new();
            settings.set_default_wait_time(Duration::from_secs(5));
            settings.set_default_wait_time(Duration::from_secs(7));
            assert_eq!(settings.override_wait_time(), Some(Duration::from_secs(7)));
            settings.clear_default_wait_time();
            assert_eq!(settings.override_wait_time(), None);
        }

        #[test]
        fn test_global_settings_back_the_free_functions() {
            set_default_wait_time(Duration::from_secs(123));
            assert_eq!(default_wait_time(), Duration::from_secs(123));
            wait_settings().clear_default_wait_time();
        }
    }

    // =========================================================================
    // Waiter Tests
    // =========================================================================

    mod waiter_tests {
        use super::*;

        #[test]
        fn test_true_predicate_returns_immediately() {
            let start = Instant::now();
            let result = fresh_waiter().wait_until_true(Duration::from_secs(5), || true);
            assert_eq!(result.unwrap(), true);
            assert!(start.elapsed() < Duration::from_millis(50));
        }

        #[test]
        fn test_zero_timeout_evaluates_exactly_once() {
            let mut evaluations = 0u32;
            let start = Instant::now();
            let result = fresh_waiter().wait_until_true(Duration::ZERO, || {
                evaluations += 1;
                false
            });
            match result {
                Err(PaginarError::Timeout { timeout }) => assert_eq!(timeout, Duration::ZERO),
                other => panic!("expected timeout, got {other:?}"),
            }
            assert_eq!(evaluations, 1);
            assert!(start.elapsed() < Duration::from_millis(50));
        }

        #[test]
        fn test_zero_timeout_with_true_predicate() {
            let result = fresh_waiter().wait_until_true(Duration::ZERO, || true);
            assert_eq!(result.unwrap(), true);
        }

        #[test]
        fn test_overrun_is_bounded() {
            let timeout = Duration::from_millis(100);
            let start = Instant::now();
            let result = fresh_waiter()
                .with_poll_interval(Duration::from_millis(10))
                .wait_until_true(timeout, || false);
            let elapsed = start.elapsed();
            assert!(result.is_err());
            assert!(elapsed >= timeout);
            assert!(elapsed < timeout + Duration::from_millis(100));
        }

        #[test]
        fn test_stops_evaluating_after_first_truth() {
            let mut evaluations = 0u32;
            let result = fresh_waiter()
                .with_poll_interval(Duration::from_millis(5))
                .wait_until_true(Duration::from_secs(1), || {
                    evaluations += 1;
                    evaluations >= 3
                });
            assert!(result.is_ok());
            assert_eq!(evaluations, 3);
        }

        #[test]
        fn test_timeout_error_carries_configured_timeout() {
            let timeout = Duration::from_millis(20);
            let err = fresh_waiter()
                .with_poll_interval(Duration::from_millis(5))
                .wait_until_true(timeout, || false)
                .unwrap_err();
            match err {
                PaginarError::Timeout { timeout: carried } => assert_eq!(carried, timeout),
                other => panic!("expected timeout, got {other:?}"),
            }
        }

        #[test]
        fn test_default_timeout_comes_from_settings_chain() {
            let settings = Arc::new(WaitSettings::new());
            settings.set_default_wait_time(Duration::ZERO);
            let waiter = Waiter::with_settings(settings);
            let result = waiter.wait_until_true_with_default(None, || false);
            assert!(matches!(result, Err(PaginarError::Timeout { .. })));
        }

        #[test]
        fn test_default_timeout_probes_session() {
            let waiter = fresh_waiter();
            let session = MockSession::new().with_max_wait_time(Duration::ZERO);
            let result = waiter.wait_until_true_with_default(Some(&session), || false);
            assert!(matches!(result, Err(PaginarError::Timeout { .. })));
        }
    }

    // =========================================================================
    // Integration Tests
    // =========================================================================

    mod integration_tests {
        use super::*;
        use std::sync::atomic::{AtomicBool, Ordering};

        #[test]
        fn test_wait_for_condition_becomes_true() {
            let flag = Arc::new(AtomicBool::new(false));
            let flag_clone = Arc::clone(&flag);

            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                flag_clone.store(true, Ordering::SeqCst);
            });

            let result = fresh_waiter()
                .with_poll_interval(Duration::from_millis(10))
                .wait_until_true(Duration::from_secs(2), || flag.load(Ordering::SeqCst));
            assert!(result.is_ok());
        }
    }
}

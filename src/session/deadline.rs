//! Caller-supplied time bound for store work.

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Longest span a deadline is allowed to cover. `Instant` arithmetic panics on
/// overflow, so absurdly large timeouts are clamped to this.
const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// A point in time after which in-flight store work must be abandoned,
/// optionally paired with a cancellation token that ends it early.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    cancellation: Option<CancellationToken>,
}

impl Deadline {
    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self::at(Instant::now() + timeout.min(MAX_TIMEOUT))
    }

    pub fn at(at: Instant) -> Self {
        Self {
            at,
            cancellation: None,
        }
    }

    /// Also treat the deadline as expired as soon as `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Time left before expiry, zero once expired or cancelled.
    pub fn remaining(&self) -> Duration {
        if self.is_cancelled() {
            return Duration::ZERO;
        }
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    pub fn is_expired(&self) -> bool {
        self.is_cancelled() || Instant::now() >= self.at
    }

    /// Builds the callback SQLite polls while executing statements; returning
    /// `true` interrupts the running statement.
    pub(crate) fn interrupt_check(&self) -> impl FnMut() -> bool + Send + 'static {
        let at = self.at;
        let cancellation = self.cancellation.clone();
        move || {
            Instant::now() >= at
                || cancellation
                    .as_ref()
                    .is_some_and(CancellationToken::is_cancelled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_deadline_is_not_expired() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(!deadline.is_expired());
        assert!(deadline.remaining() > Duration::from_secs(50));
    }

    #[test]
    fn zero_timeout_is_expired() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[test]
    fn cancellation_expires_deadline() {
        let token = CancellationToken::new();
        let deadline = Deadline::after(Duration::from_secs(60)).with_cancellation(token.clone());
        let mut check = deadline.interrupt_check();
        assert!(!check());

        token.cancel();

        assert!(deadline.is_cancelled());
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
        assert!(check());
    }

    #[test]
    fn huge_timeout_is_clamped() {
        let deadline = Deadline::after(Duration::MAX);
        assert!(!deadline.is_expired());
        assert!(deadline.remaining() <= MAX_TIMEOUT);
    }
}

//! Cancellation scopes and poll pacing.
//!
//! Every page carries a [`Scope`]; operations rooted on the page observe
//! it at each suspension point. Scopes form a tree: cancelling a parent
//! cancels all children, cancelling a child leaves the parent untouched.
//! Cancellation is cooperative: it detaches waiters and observers, it
//! never aborts work the browser already accepted.
//!
//! [`Sleeper`] is the back-off policy used by poll-based waits such as
//! [`Page::wait`](crate::page::Page::wait).

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

// ============================================================================
// Scope
// ============================================================================

/// A cancellation boundary carrying a cancel signal and optional deadline.
///
/// Cheap to clone; clones share the same signal. Use [`Scope::child`] to
/// derive a narrower scope.
#[derive(Debug, Clone)]
pub struct Scope {
    token: CancellationToken,
}

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

impl Scope {
    /// Creates a new root scope.
    #[must_use]
    pub fn root() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Derives a child scope.
    ///
    /// Cancelling the child does not affect this scope; cancelling this
    /// scope cancels the child.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Derives a child scope that auto-cancels after `timeout`.
    #[must_use]
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let child = self.token.child_token();

        let watchdog = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => watchdog.cancel(),
                _ = watchdog.cancelled() => {}
            }
        });

        Self { token: child }
    }

    /// Cancels this scope and all scopes derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` if this scope has been cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when this scope is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Returns [`Error::Cancelled`] if this scope has been cancelled.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `d`, waking early with [`Error::Cancelled`] if the scope
    /// ends.
    pub async fn sleep(&self, d: Duration) -> Result<()> {
        tokio::select! {
            _ = self.token.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(d) => Ok(()),
        }
    }

    /// Runs `fut` until completion or scope cancellation.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            _ = self.token.cancelled() => Err(Error::Cancelled),
            out = fut => Ok(out),
        }
    }
}

// ============================================================================
// Sleeper
// ============================================================================

/// Back-off policy for poll-based waits.
///
/// The default is exponential starting at 30ms, doubling up to a 3s cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sleeper {
    /// First pause duration.
    pub initial: Duration,
    /// Growth factor applied after each pause.
    pub factor: f64,
    /// Upper bound on a single pause.
    pub max: Duration,
}

impl Default for Sleeper {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(30),
            factor: 2.0,
            max: Duration::from_secs(3),
        }
    }
}

impl Sleeper {
    /// Creates a fixed-interval sleeper (factor 1).
    #[must_use]
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial: interval,
            factor: 1.0,
            max: interval,
        }
    }

    /// Starts a back-off sequence following this policy.
    #[must_use]
    pub fn start(&self) -> Backoff {
        Backoff {
            policy: *self,
            next: self.initial,
        }
    }
}

/// Mutable state of one back-off sequence.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: Sleeper,
    next: Duration,
}

impl Backoff {
    /// Pauses for the current interval, then grows it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the scope ends during the pause.
    pub async fn pause(&mut self, scope: &Scope) -> Result<()> {
        scope.sleep(self.next).await?;
        self.next = self.next.mul_f64(self.policy.factor).min(self.policy.max);
        Ok(())
    }

    /// Returns the upcoming pause duration.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> Duration {
        self.next
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_child_cancel_does_not_affect_parent() {
        let parent = Scope::root();
        let child = parent.child();

        child.cancel();

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_parent_cancel_propagates() {
        let parent = Scope::root();
        let child = parent.child();

        parent.cancel();

        assert!(child.is_cancelled());
        assert!(matches!(child.check(), Err(Error::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_auto_cancels() {
        let scope = Scope::root().child_with_timeout(Duration::from_millis(50));

        scope.cancelled().await;
        assert!(scope.is_cancelled());
    }

    #[tokio::test]
    async fn test_sleep_interrupted_by_cancel() {
        let scope = Scope::root();
        let sleeper = scope.clone();

        let handle = tokio::spawn(async move { sleeper.sleep(Duration::from_secs(60)).await });

        scope.cancel();
        let result = handle.await.expect("join");
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_growth_is_capped() {
        let scope = Scope::root();
        let policy = Sleeper {
            initial: Duration::from_millis(100),
            factor: 10.0,
            max: Duration::from_secs(1),
        };

        let mut backoff = policy.start();
        assert_eq!(backoff.peek(), Duration::from_millis(100));

        backoff.pause(&scope).await.expect("pause");
        assert_eq!(backoff.peek(), Duration::from_secs(1));

        backoff.pause(&scope).await.expect("pause");
        assert_eq!(backoff.peek(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_run_returns_output() {
        let scope = Scope::root();
        let value = scope.run(async { 7 }).await.expect("not cancelled");
        assert_eq!(value, 7);
    }
}

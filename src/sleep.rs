//! Suspension primitives used for the Waiting state.
//!
//! The executor never sleeps on its own: it delegates every wait to a
//! [`Sleeper`] (blocking executions) or an [`AsyncSleeper`] (async executions).
//! Swap in [`RecordingSleeper`](crate::testing::RecordingSleeper) to test retry
//! logic without real time passing.

use std::time::Duration;

use futures::future::BoxFuture;

use crate::cancel::CancellationToken;

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The full delay elapsed.
    Elapsed,
    /// The cancellation token fired first.
    Cancelled,
}

/// Blocking suspension for synchronous executions.
pub trait Sleeper: Send + Sync {
    /// Block for `delay`, returning early with [`Wake::Cancelled`] if `cancel`
    /// fires.
    fn sleep(&self, delay: Duration, cancel: &CancellationToken) -> Wake;
}

/// Sleeps on the current thread, interruptible by the cancellation token.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration, cancel: &CancellationToken) -> Wake {
        if cancel.wait_timeout(delay) {
            Wake::Cancelled
        } else {
            Wake::Elapsed
        }
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, delay: Duration, cancel: &CancellationToken) -> Wake {
        (**self).sleep(delay, cancel)
    }
}

impl<S: Sleeper + ?Sized> Sleeper for std::sync::Arc<S> {
    fn sleep(&self, delay: Duration, cancel: &CancellationToken) -> Wake {
        (**self).sleep(delay, cancel)
    }
}

/// Non-blocking suspension for async executions.
///
/// Only the delay itself is delegated; the async executor races the returned
/// future against the cancellation token.
pub trait AsyncSleeper: Send + Sync {
    /// A future that completes after `delay`.
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()>;
}

impl<S: AsyncSleeper + ?Sized> AsyncSleeper for &S {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        (**self).sleep(delay)
    }
}

impl<S: AsyncSleeper + ?Sized> AsyncSleeper for std::sync::Arc<S> {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        (**self).sleep(delay)
    }
}

/// Tokio timer based sleeper.
#[cfg(feature = "async")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[cfg(feature = "async")]
impl AsyncSleeper for TokioSleeper {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        use futures::FutureExt;
        tokio::time::sleep(delay).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn thread_sleeper_waits_full_delay() {
        let start = Instant::now();
        let wake = ThreadSleeper.sleep(Duration::from_millis(5), &CancellationToken::new());
        assert_eq!(wake, Wake::Elapsed);
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn thread_sleeper_returns_immediately_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let start = Instant::now();
        let wake = ThreadSleeper.sleep(Duration::from_secs(60), &token);
        assert_eq!(wake, Wake::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn tokio_sleeper_completes() {
        let start = Instant::now();
        TokioSleeper.sleep(Duration::from_millis(5)).await;
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}

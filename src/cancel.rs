//! Cancellation of a pending wait.
//!
//! A [`CancellationToken`] is the external handle a caller uses to stop an
//! execution that is sleeping between attempts. Cancelling is one-way: once
//! cancelled a token stays cancelled. Clones share state, so hand one clone to
//! the executor and keep another to call [`CancellationToken::cancel`].
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use steadfast::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let remote = token.clone();
//!
//! let waiter = std::thread::spawn(move || token.wait_timeout(Duration::from_secs(30)));
//! remote.cancel();
//!
//! assert!(waiter.join().unwrap(), "wait ends early once cancelled");
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

/// Shared, clonable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    condvar: Condvar,
}

#[derive(Debug, Default)]
struct State {
    cancelled: bool,
    next_slot: u64,
    // One entry per pending `Cancellation`, removed when it is dropped.
    wakers: Vec<(u64, Waker)>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every execution observing this token.
    ///
    /// Wakes blocked threads and pending futures. Calling it again is a no-op.
    pub fn cancel(&self) {
        let wakers = {
            let mut state = self.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            std::mem::take(&mut state.wakers)
        };
        self.inner.condvar.notify_all();
        for (_, waker) in wakers {
            waker.wake();
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Block the current thread for up to `timeout`.
    ///
    /// Returns `true` if the token was cancelled before the timeout elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        loop {
            if state.cancelled {
                return true;
            }
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                // A timeout beyond the clock's range: wait in large slices.
                None => Duration::from_secs(u32::MAX as u64),
            };
            if remaining.is_zero() {
                return false;
            }
            state = self
                .inner
                .condvar
                .wait_timeout(state, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    /// A future that resolves once the token is cancelled.
    ///
    /// The future registers its waker while pending and deregisters it when
    /// dropped, so a token can outlive any number of uncancelled waits.
    pub fn cancelled(&self) -> Cancellation {
        Cancellation {
            token: self.clone(),
            slot: None,
        }
    }

    /// Number of async waiters currently registered.
    #[cfg(test)]
    pub(crate) fn waiters(&self) -> usize {
        self.lock().wakers.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Future returned by [`CancellationToken::cancelled`].
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Cancellation {
    token: CancellationToken,
    slot: Option<u64>,
}

impl Future for Cancellation {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        let mut state = this.token.lock();
        if state.cancelled {
            return Poll::Ready(());
        }
        match this.slot {
            Some(slot) => {
                if let Some((_, waker)) = state.wakers.iter_mut().find(|(id, _)| *id == slot) {
                    if !waker.will_wake(cx.waker()) {
                        *waker = cx.waker().clone();
                    }
                }
            }
            None => {
                let slot = state.next_slot;
                state.next_slot = state.next_slot.wrapping_add(1);
                state.wakers.push((slot, cx.waker().clone()));
                this.slot = Some(slot);
            }
        }
        Poll::Pending
    }
}

impl Drop for Cancellation {
    fn drop(&mut self) {
        if let Some(slot) = self.slot {
            self.token.lock().wakers.retain(|(id, _)| *id != slot);
        }
    }
}

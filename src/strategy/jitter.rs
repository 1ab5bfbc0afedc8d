//! Randomised delays (feature `jitter`).
//!
//! Jitter spreads out retries from many clients that failed at the same moment.
//! The random stream belongs to the strategy: two `Jitter` values built with the
//! same seed and queried with the same contexts yield the same delays.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Decision, Strategy};
use crate::context::AttemptContext;
use crate::error::ContractViolation;

/// How a delay is randomised.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JitterMode {
    /// Uniform in `[0, delay]` (AWS "full jitter").
    Full,
    /// Uniform in `[delay * (1 - f), delay * (1 + f)]`, `f` in `[0, 1]`.
    Proportional(f64),
}

/// Wraps a strategy and randomises the delay of its `Retry` decisions.
///
/// `Stop` decisions pass through untouched. The RNG is guarded by a mutex so a
/// single `Jitter` can be shared by concurrent executions; the interleaving of
/// those executions then decides who draws which number.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use steadfast::{AttemptContext, Outcome, Strategy};
/// use steadfast::strategy::{FixedDelay, Jitter};
///
/// let strategy = Jitter::full(FixedDelay::new(Duration::from_millis(100))).with_seed(7);
///
/// let failed = Outcome::<(), &str>::Failure("busy");
/// let delay = strategy.decide(&AttemptContext::new(1, &failed)).unwrap().delay().unwrap();
/// assert!(delay <= Duration::from_millis(100));
/// ```
pub struct Jitter<S> {
    inner: S,
    mode: JitterMode,
    rng: Mutex<StdRng>,
}

impl<S> Jitter<S> {
    /// Jitter `inner` with `mode`, seeded from the operating system.
    pub fn new(inner: S, mode: JitterMode) -> Self {
        Self {
            inner,
            mode,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Full jitter around `inner`.
    pub fn full(inner: S) -> Self {
        Self::new(inner, JitterMode::Full)
    }

    /// ±`factor` proportional jitter around `inner`.
    pub fn proportional(inner: S, factor: f64) -> Self {
        Self::new(inner, JitterMode::Proportional(factor))
    }

    /// Replace the random stream with one seeded by `seed`.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// The jitter mode.
    pub fn mode(&self) -> JitterMode {
        self.mode
    }

    /// The wrapped strategy.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn apply(&self, delay: Duration) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        match self.mode {
            JitterMode::Full => {
                let max = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
                if max == 0 {
                    Duration::ZERO
                } else {
                    Duration::from_nanos(rng.random_range(0..=max))
                }
            }
            JitterMode::Proportional(factor) if (0.0..=1.0).contains(&factor) => {
                let base = delay.as_secs_f64();
                let low = (base * (1.0 - factor)).max(0.0);
                let high = base * (1.0 + factor);
                if high <= low {
                    return delay;
                }
                let secs = rng.random_range(low..=high);
                Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
            }
            // Rejected by validate; leave the delay alone rather than panic.
            JitterMode::Proportional(_) => delay,
        }
    }
}

impl<T, E, S: Strategy<T, E>> Strategy<T, E> for Jitter<S> {
    fn decide(&self, ctx: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
        match self.inner.decide(ctx)? {
            Decision::Retry(delay) => Ok(Decision::Retry(self.apply(delay))),
            Decision::Stop => Ok(Decision::Stop),
        }
    }

    fn validate(&self) -> Result<(), ContractViolation> {
        if let JitterMode::Proportional(factor) = self.mode {
            if !(0.0..=1.0).contains(&factor) {
                return Err(ContractViolation::InvalidJitter { factor });
            }
        }
        Strategy::<T, E>::validate(&self.inner)
    }
}

impl<S: fmt::Debug> fmt::Debug for Jitter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jitter")
            .field("inner", &self.inner)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

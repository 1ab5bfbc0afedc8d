//! Built-in strategies.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{Decision, Strategy};
use crate::context::AttemptContext;
use crate::error::ContractViolation;
use crate::outcome::Retryable;

/// Shared prologue of every built-in: reject attempt 0, stop on success.
fn settled<T, E>(ctx: &AttemptContext<'_, T, E>) -> Result<Option<Decision>, ContractViolation> {
    if ctx.attempt == 0 {
        return Err(ContractViolation::ZeroAttempt);
    }
    if ctx.is_success() {
        return Ok(Some(Decision::Stop));
    }
    Ok(None)
}

fn duration_from_secs(secs: f64) -> Result<Duration, ContractViolation> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ContractViolation::InvalidDelay { secs });
    }
    Duration::try_from_secs_f64(secs).map_err(|_| ContractViolation::InvalidDelay { secs })
}

/// Stop once `attempt >= n`; otherwise retry immediately.
///
/// The zero delay defers timing to whatever it is composed with.
///
/// # Examples
///
/// ```rust
/// use steadfast::{AttemptContext, Decision, Outcome, Strategy};
/// use steadfast::strategy::MaxAttempts;
///
/// let failed = Outcome::<(), &str>::Failure("boom");
/// let strategy = MaxAttempts::new(3);
///
/// assert_eq!(strategy.decide(&AttemptContext::new(2, &failed)), Ok(Decision::RETRY_NOW));
/// assert_eq!(strategy.decide(&AttemptContext::new(3, &failed)), Ok(Decision::Stop));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaxAttempts {
    attempts: u32,
}

impl MaxAttempts {
    /// Allow at most `attempts` attempts in total, including the first.
    pub fn new(attempts: u32) -> Self {
        Self { attempts }
    }

    /// The attempt budget.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl<T, E> Strategy<T, E> for MaxAttempts {
    fn decide(&self, ctx: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
        if let Some(decision) = settled(ctx)? {
            return Ok(decision);
        }
        if ctx.attempt >= self.attempts {
            Ok(Decision::Stop)
        } else {
            Ok(Decision::RETRY_NOW)
        }
    }

    fn validate(&self) -> Result<(), ContractViolation> {
        if self.attempts == 0 {
            Err(ContractViolation::ZeroMaxAttempts)
        } else {
            Ok(())
        }
    }
}

/// Retry after the same delay every time.
///
/// Never stops on its own; compose it with [`MaxAttempts`] or another
/// stopping strategy to bound the execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Retry after `delay`.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Retry after `secs` seconds.
    ///
    /// Negative, NaN and infinite values are rejected.
    ///
    /// ```rust
    /// use steadfast::strategy::FixedDelay;
    /// use steadfast::ContractViolation;
    ///
    /// assert!(FixedDelay::from_secs_f64(0.25).is_ok());
    /// assert_eq!(
    ///     FixedDelay::from_secs_f64(-1.0),
    ///     Err(ContractViolation::InvalidDelay { secs: -1.0 })
    /// );
    /// ```
    pub fn from_secs_f64(secs: f64) -> Result<Self, ContractViolation> {
        duration_from_secs(secs).map(Self::new)
    }

    /// The configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<T, E> Strategy<T, E> for FixedDelay {
    fn decide(&self, ctx: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
        if let Some(decision) = settled(ctx)? {
            return Ok(decision);
        }
        Ok(Decision::Retry(self.delay))
    }
}

/// Retry after `min(base * factor^(attempt - 1), max_delay)`.
///
/// Arithmetic saturates: once the product no longer fits a `Duration` the
/// delay is `max_delay`.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use steadfast::strategy::ExponentialBackoff;
///
/// let backoff = ExponentialBackoff::new(Duration::from_millis(100), 2, Duration::from_secs(1));
///
/// // 100ms, 200ms, 400ms, 800ms, then capped at 1s
/// assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(100));
/// assert_eq!(backoff.delay_for_attempt(4), Duration::from_millis(800));
/// assert_eq!(backoff.delay_for_attempt(5), Duration::from_secs(1));
/// assert_eq!(backoff.delay_for_attempt(u32::MAX), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExponentialBackoff {
    base: Duration,
    factor: u32,
    max_delay: Duration,
}

impl ExponentialBackoff {
    /// Create a backoff starting at `base`, growing by `factor`, capped at `max_delay`.
    pub fn new(base: Duration, factor: u32, max_delay: Duration) -> Self {
        Self {
            base,
            factor,
            max_delay,
        }
    }

    /// Like [`new`](Self::new) with delays given in seconds.
    pub fn from_secs_f64(
        base: f64,
        factor: u32,
        max_delay: f64,
    ) -> Result<Self, ContractViolation> {
        Ok(Self::new(
            duration_from_secs(base)?,
            factor,
            duration_from_secs(max_delay)?,
        ))
    }

    /// Delay requested after attempt `attempt` (1-indexed) fails.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.factor
            .checked_pow(exponent)
            .and_then(|multiplier| self.base.checked_mul(multiplier))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// The first delay.
    pub fn base(&self) -> Duration {
        self.base
    }

    /// Growth factor per attempt.
    pub fn factor(&self) -> u32 {
        self.factor
    }

    /// Upper bound on any delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }
}

impl<T, E> Strategy<T, E> for ExponentialBackoff {
    fn decide(&self, ctx: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
        if let Some(decision) = settled(ctx)? {
            return Ok(decision);
        }
        Ok(Decision::Retry(self.delay_for_attempt(ctx.attempt)))
    }

    fn validate(&self) -> Result<(), ContractViolation> {
        if self.factor == 0 {
            Err(ContractViolation::ZeroFactor)
        } else {
            Ok(())
        }
    }
}

/// Retry after `base * attempt`, optionally capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearBackoff {
    base: Duration,
    max_delay: Option<Duration>,
}

impl LinearBackoff {
    /// Delay grows by `base` after every failed attempt.
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            max_delay: None,
        }
    }

    /// Cap every delay at `max_delay`.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Delay requested after attempt `attempt` (1-indexed) fails.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        cap(self.base.saturating_mul(attempt), self.max_delay)
    }
}

impl<T, E> Strategy<T, E> for LinearBackoff {
    fn decide(&self, ctx: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
        if let Some(decision) = settled(ctx)? {
            return Ok(decision);
        }
        Ok(Decision::Retry(self.delay_for_attempt(ctx.attempt)))
    }
}

/// Retry after `base * fib(attempt)`: 1, 1, 2, 3, 5, 8... times `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FibonacciBackoff {
    base: Duration,
    max_delay: Option<Duration>,
}

impl FibonacciBackoff {
    /// Delay follows the Fibonacci sequence scaled by `base`.
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            max_delay: None,
        }
    }

    /// Cap every delay at `max_delay`.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Delay requested after attempt `attempt` (1-indexed) fails.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        cap(self.base.saturating_mul(fibonacci(attempt)), self.max_delay)
    }
}

impl<T, E> Strategy<T, E> for FibonacciBackoff {
    fn decide(&self, ctx: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
        if let Some(decision) = settled(ctx)? {
            return Ok(decision);
        }
        Ok(Decision::Retry(self.delay_for_attempt(ctx.attempt)))
    }
}

fn cap(delay: Duration, max_delay: Option<Duration>) -> Duration {
    match max_delay {
        Some(max) => delay.min(max),
        None => delay,
    }
}

/// Calculate the nth Fibonacci number, saturating at `u32::MAX`.
fn fibonacci(n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    let mut a = 0u32;
    let mut b = 1u32;
    for _ in 1..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
        if b == u32::MAX {
            break;
        }
    }
    b
}

/// Stop at the first failure the predicate does not consider retryable.
///
/// Retryable failures get an immediate retry; compose with a delay strategy
/// for timing and with [`MaxAttempts`] for a bound.
///
/// # Examples
///
/// ```rust
/// use steadfast::{AttemptContext, Decision, Outcome, Strategy};
/// use steadfast::strategy::RetryIf;
///
/// #[derive(Debug)]
/// enum ApiError { RateLimited, BadRequest }
///
/// let strategy = RetryIf::new(|e: &ApiError| matches!(e, ApiError::RateLimited));
///
/// let limited = Outcome::<(), _>::Failure(ApiError::RateLimited);
/// let bad = Outcome::<(), _>::Failure(ApiError::BadRequest);
///
/// assert!(strategy.decide(&AttemptContext::new(1, &limited)).unwrap().is_retry());
/// assert!(strategy.decide(&AttemptContext::new(1, &bad)).unwrap().is_stop());
/// ```
pub struct RetryIf<E> {
    predicate: Arc<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E> RetryIf<E> {
    /// Retry only failures for which `predicate` returns `true`.
    pub fn new<P>(predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Returns `true` if `error` would be retried.
    pub fn should_retry(&self, error: &E) -> bool {
        (self.predicate)(error)
    }
}

impl<E: Retryable + 'static> RetryIf<E> {
    /// Retry failures whose error reports [`Retryable::is_retryable`].
    pub fn retryable() -> Self {
        Self::new(E::is_retryable)
    }
}

impl<E> Clone for RetryIf<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<E> fmt::Debug for RetryIf<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryIf").finish_non_exhaustive()
    }
}

impl<T, E> Strategy<T, E> for RetryIf<E> {
    fn decide(&self, ctx: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
        if let Some(decision) = settled(ctx)? {
            return Ok(decision);
        }
        match ctx.failure() {
            Some(error) if self.should_retry(error) => Ok(Decision::RETRY_NOW),
            _ => Ok(Decision::Stop),
        }
    }
}

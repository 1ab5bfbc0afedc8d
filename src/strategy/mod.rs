//! Retry strategies: the decision layer of an execution.
//!
//! After every attempt the executor asks its [`Strategy`] for a [`Decision`]:
//! either [`Decision::Retry`] with a delay, or [`Decision::Stop`] to hand the
//! current outcome back to the caller.
//!
//! - **Pure data**: built-in strategies are plain values, easy to inspect and test
//! - **Composable**: [`compose`] chains strategies; the first `Stop` wins and
//!   otherwise the longest delay is taken
//! - **Open**: implement [`Strategy`] for your own policy and wrap it in
//!   [`Policy::custom`] to mix it with the built-ins
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use steadfast::strategy::{compose, exponential_backoff, max_attempts, Composite};
//!
//! let policy: Composite<String, std::io::Error> = compose([
//!     max_attempts(5).into(),
//!     exponential_backoff(Duration::from_millis(100), 2, Duration::from_secs(1)).into(),
//! ]);
//!
//! assert_eq!(policy.len(), 2);
//! ```
//!
//! # Built-in strategies
//!
//! - [`MaxAttempts`]: stop once the attempt budget is spent
//! - [`FixedDelay`]: same delay before every retry
//! - [`ExponentialBackoff`]: `base * factor^(attempt - 1)`, capped
//! - [`LinearBackoff`]: `base * attempt`
//! - [`FibonacciBackoff`]: `base * fib(attempt)`
//! - [`RetryIf`]: stop at the first failure a predicate rejects
//! - `Jitter` (feature `jitter`): randomise another strategy's delays
//!
//! Every built-in returns `Stop` for a successful outcome, so composites never
//! special-case success.

mod builtin;
mod composite;
#[cfg(feature = "jitter")]
mod jitter;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::context::AttemptContext;
use crate::error::ContractViolation;

pub use builtin::{
    ExponentialBackoff, FibonacciBackoff, FixedDelay, LinearBackoff, MaxAttempts, RetryIf,
};
pub use composite::Composite;
#[cfg(feature = "jitter")]
pub use jitter::{Jitter, JitterMode};

/// A strategy's verdict for the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Decision {
    /// Wait for the delay, then run another attempt.
    Retry(Duration),
    /// Give up; the outcome of this attempt is final.
    Stop,
}

impl Decision {
    /// Retry immediately.
    pub const RETRY_NOW: Decision = Decision::Retry(Duration::ZERO);

    /// Returns `true` for [`Decision::Retry`].
    pub fn is_retry(&self) -> bool {
        matches!(self, Decision::Retry(_))
    }

    /// Returns `true` for [`Decision::Stop`].
    pub fn is_stop(&self) -> bool {
        matches!(self, Decision::Stop)
    }

    /// The requested delay, if this is a retry.
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Decision::Retry(delay) => Some(*delay),
            Decision::Stop => None,
        }
    }
}

/// A policy deciding whether to retry and how long to wait.
///
/// Implementations must be deterministic for a given history of contexts and
/// must not panic for any context with `attempt >= 1`. The executor never
/// queries a strategy again after it returned `Stop` in the same execution.
///
/// Strategies are shared read-only between concurrent executions; any internal
/// state has to synchronise itself.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use steadfast::{AttemptContext, ContractViolation, Decision, Strategy};
///
/// /// Retry only on even attempts, one second apart.
/// struct EvenOnly;
///
/// impl<T, E> Strategy<T, E> for EvenOnly {
///     fn decide(&self, ctx: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
///         if ctx.is_success() || ctx.attempt % 2 == 1 {
///             Ok(Decision::Stop)
///         } else {
///             Ok(Decision::Retry(Duration::from_secs(1)))
///         }
///     }
/// }
/// ```
pub trait Strategy<T, E>: Send + Sync {
    /// Decide what happens after the attempt described by `ctx`.
    fn decide(&self, ctx: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation>;

    /// Check static configuration before the first attempt.
    fn validate(&self) -> Result<(), ContractViolation> {
        Ok(())
    }
}

impl<T, E, S: Strategy<T, E> + ?Sized> Strategy<T, E> for Box<S> {
    fn decide(&self, ctx: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
        (**self).decide(ctx)
    }

    fn validate(&self) -> Result<(), ContractViolation> {
        (**self).validate()
    }
}

impl<T, E, S: Strategy<T, E> + ?Sized> Strategy<T, E> for Arc<S> {
    fn decide(&self, ctx: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
        (**self).decide(ctx)
    }

    fn validate(&self) -> Result<(), ContractViolation> {
        (**self).validate()
    }
}

/// The closed set of built-in strategies plus an open extension point.
///
/// Built-ins dispatch by `match`; [`Policy::Custom`] goes through a trait
/// object. Every built-in converts into a `Policy` with `.into()`.
pub enum Policy<T, E> {
    /// See [`MaxAttempts`].
    MaxAttempts(MaxAttempts),
    /// See [`FixedDelay`].
    FixedDelay(FixedDelay),
    /// See [`ExponentialBackoff`].
    Exponential(ExponentialBackoff),
    /// See [`LinearBackoff`].
    Linear(LinearBackoff),
    /// See [`FibonacciBackoff`].
    Fibonacci(FibonacciBackoff),
    /// See [`RetryIf`].
    RetryIf(RetryIf<E>),
    /// See [`Composite`].
    Composite(Composite<T, E>),
    /// See [`Jitter`].
    #[cfg(feature = "jitter")]
    Jitter(Box<Jitter<Policy<T, E>>>),
    /// A user-defined strategy.
    Custom(Box<dyn Strategy<T, E>>),
}

impl<T, E> Policy<T, E> {
    /// Wrap a user-defined strategy.
    pub fn custom<S>(strategy: S) -> Self
    where
        S: Strategy<T, E> + 'static,
    {
        Policy::Custom(Box::new(strategy))
    }
}

impl<T, E> Strategy<T, E> for Policy<T, E> {
    fn decide(&self, ctx: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
        match self {
            Policy::MaxAttempts(s) => s.decide(ctx),
            Policy::FixedDelay(s) => s.decide(ctx),
            Policy::Exponential(s) => s.decide(ctx),
            Policy::Linear(s) => s.decide(ctx),
            Policy::Fibonacci(s) => s.decide(ctx),
            Policy::RetryIf(s) => s.decide(ctx),
            Policy::Composite(s) => s.decide(ctx),
            #[cfg(feature = "jitter")]
            Policy::Jitter(s) => s.decide(ctx),
            Policy::Custom(s) => s.decide(ctx),
        }
    }

    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            Policy::MaxAttempts(s) => Strategy::<T, E>::validate(s),
            Policy::FixedDelay(s) => Strategy::<T, E>::validate(s),
            Policy::Exponential(s) => Strategy::<T, E>::validate(s),
            Policy::Linear(s) => Strategy::<T, E>::validate(s),
            Policy::Fibonacci(s) => Strategy::<T, E>::validate(s),
            Policy::RetryIf(s) => Strategy::<T, E>::validate(s),
            Policy::Composite(s) => Strategy::<T, E>::validate(s),
            #[cfg(feature = "jitter")]
            Policy::Jitter(s) => Strategy::<T, E>::validate(s),
            Policy::Custom(s) => Strategy::<T, E>::validate(s),
        }
    }
}

impl<T, E> fmt::Debug for Policy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::MaxAttempts(s) => fmt::Debug::fmt(s, f),
            Policy::FixedDelay(s) => fmt::Debug::fmt(s, f),
            Policy::Exponential(s) => fmt::Debug::fmt(s, f),
            Policy::Linear(s) => fmt::Debug::fmt(s, f),
            Policy::Fibonacci(s) => fmt::Debug::fmt(s, f),
            Policy::RetryIf(s) => fmt::Debug::fmt(s, f),
            Policy::Composite(s) => fmt::Debug::fmt(s, f),
            #[cfg(feature = "jitter")]
            Policy::Jitter(s) => fmt::Debug::fmt(s, f),
            Policy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

macro_rules! impl_into_policy {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl<T, E> From<$ty> for Policy<T, E> {
                fn from(strategy: $ty) -> Self {
                    Policy::$variant(strategy)
                }
            }
        )*
    };
}

impl_into_policy!(
    MaxAttempts(MaxAttempts),
    FixedDelay(FixedDelay),
    Exponential(ExponentialBackoff),
    Linear(LinearBackoff),
    Fibonacci(FibonacciBackoff),
    RetryIf(RetryIf<E>),
    Composite(Composite<T, E>),
);

#[cfg(feature = "jitter")]
impl<T, E> From<Jitter<Policy<T, E>>> for Policy<T, E> {
    fn from(strategy: Jitter<Policy<T, E>>) -> Self {
        Policy::Jitter(Box::new(strategy))
    }
}

/// Stop after `n` attempts. See [`MaxAttempts`].
pub fn max_attempts(n: u32) -> MaxAttempts {
    MaxAttempts::new(n)
}

/// Retry after a constant delay. See [`FixedDelay`].
pub fn fixed_delay(delay: Duration) -> FixedDelay {
    FixedDelay::new(delay)
}

/// Retry after `min(base * factor^(attempt - 1), max)`. See [`ExponentialBackoff`].
pub fn exponential_backoff(base: Duration, factor: u32, max: Duration) -> ExponentialBackoff {
    ExponentialBackoff::new(base, factor, max)
}

/// Chain strategies in declaration order. See [`Composite`].
pub fn compose<T, E, I>(strategies: I) -> Composite<T, E>
where
    I: IntoIterator<Item = Policy<T, E>>,
{
    strategies.into_iter().collect()
}

#[cfg(test)]
mod tests;

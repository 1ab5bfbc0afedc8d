//! The driver loop.
//!
//! An executor pairs a strategy with a hook set and a suspension primitive. Each
//! call to `run` is one independent execution: attempts restart at 1, and the
//! configuration is only read, so one executor can serve many concurrent runs.
//!
//! Per attempt the loop:
//!
//! 1. fires before-hooks and invokes the operation
//! 2. wraps the result in an [`Outcome`] and fires success- or failure-hooks
//! 3. asks the strategy for a [`Decision`](crate::Decision)
//! 4. on `Retry(delay)` suspends for `delay`, then loops; on `Stop` returns
//!
//! Only step 4 suspends. There is no built-in attempt ceiling: a strategy that
//! never stops retries forever.
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use steadfast::executor::Executor;
//! use steadfast::strategy::{compose, fixed_delay, max_attempts};
//! use steadfast::{HookSet, Outcome};
//!
//! let executor = Executor::builder(compose([
//!     max_attempts(5).into(),
//!     fixed_delay(Duration::from_millis(1)).into(),
//! ]))
//! .hooks(HookSet::new())
//! .build()
//! .unwrap();
//!
//! let mut calls = 0;
//! let report = executor
//!     .run(|| {
//!         calls += 1;
//!         if calls < 3 { Err("not yet") } else { Ok(calls) }
//!     })
//!     .unwrap();
//!
//! assert_eq!(report.attempts, 3);
//! assert_eq!(report.outcome, Outcome::Success(3));
//! ```

mod driver;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, Either};

use crate::cancel::CancellationToken;
use crate::error::{ContractViolation, ExecuteError};
use crate::hooks::HookSet;
use crate::outcome::Outcome;
use crate::sleep::{AsyncSleeper, Sleeper, ThreadSleeper, Wake};
use crate::strategy::Strategy;
use driver::{Driver, Step};

/// Summary of a finished execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report<T, E> {
    /// Outcome of the last attempt.
    pub outcome: Outcome<T, E>,
    /// Number of attempts made.
    pub attempts: u32,
    /// Sum of all delays waited.
    pub total_delay: Duration,
    /// Wall time from the first attempt to the final decision.
    pub elapsed: Duration,
}

impl<T, E> Report<T, E> {
    /// Discard the metadata, keeping the final outcome.
    pub fn into_outcome(self) -> Outcome<T, E> {
        self.outcome
    }

    /// Discard the metadata, converting the final outcome into a `Result`.
    pub fn into_result(self) -> Result<T, E> {
        self.outcome.into_result()
    }

    /// Returns `true` if the final attempt succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Configuration shared by [`Executor`] and [`AsyncExecutor`].
pub struct ExecutorBuilder<T, E, S> {
    strategy: S,
    hooks: HookSet<T, E>,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl<T, E, S: Strategy<T, E>> ExecutorBuilder<T, E, S> {
    /// Start from a strategy, no hooks and the thread sleeper.
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            hooks: HookSet::new(),
            sleeper: None,
        }
    }

    /// Use `hooks` for every execution.
    pub fn hooks(mut self, hooks: HookSet<T, E>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Use `sleeper` for the waits of blocking executions.
    pub fn sleeper<Z>(mut self, sleeper: Z) -> Self
    where
        Z: Sleeper + 'static,
    {
        self.sleeper = Some(Arc::new(sleeper));
        self
    }

    /// Validate the strategy and build a blocking executor.
    pub fn build(self) -> Result<Executor<T, E, S>, ContractViolation> {
        Strategy::<T, E>::validate(&self.strategy)?;
        Ok(Executor {
            strategy: self.strategy,
            hooks: self.hooks,
            sleeper: self.sleeper.unwrap_or_else(|| Arc::new(ThreadSleeper)),
        })
    }

    /// Validate the strategy and build an async executor suspending through `sleeper`.
    pub fn build_async<Z>(self, sleeper: Z) -> Result<AsyncExecutor<T, E, S>, ContractViolation>
    where
        Z: AsyncSleeper + 'static,
    {
        Strategy::<T, E>::validate(&self.strategy)?;
        Ok(AsyncExecutor {
            strategy: self.strategy,
            hooks: self.hooks,
            sleeper: Arc::new(sleeper),
        })
    }
}

/// Blocking executor: waits by blocking the calling thread.
pub struct Executor<T, E, S> {
    strategy: S,
    hooks: HookSet<T, E>,
    sleeper: Arc<dyn Sleeper>,
}

impl<T, E, S: Strategy<T, E>> Executor<T, E, S> {
    /// Start configuring an executor around `strategy`.
    pub fn builder(strategy: S) -> ExecutorBuilder<T, E, S> {
        ExecutorBuilder::new(strategy)
    }

    /// The configured strategy.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// The configured hooks.
    pub fn hooks(&self) -> &HookSet<T, E> {
        &self.hooks
    }

    /// Run `operation` until the strategy stops.
    pub fn run<F>(&self, operation: F) -> Result<Report<T, E>, ExecuteError<T, E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.run_with_cancel(operation, &CancellationToken::new())
    }

    /// Run `operation`, abandoning a pending wait once `cancel` fires.
    pub fn run_with_cancel<F>(
        &self,
        mut operation: F,
        cancel: &CancellationToken,
    ) -> Result<Report<T, E>, ExecuteError<T, E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        let mut driver = Driver::new(&self.strategy, &self.hooks);
        loop {
            driver.begin()?;
            let outcome = Outcome::from(operation());
            match driver.settle(outcome)? {
                Step::Done(report) => return Ok(report),
                Step::Wait(pending) => match self.sleeper.sleep(pending.delay(), cancel) {
                    Wake::Elapsed => driver.resume(pending),
                    Wake::Cancelled => return Err(driver.cancel(pending)),
                },
            }
        }
    }
}

/// Async executor: waits by awaiting its [`AsyncSleeper`].
pub struct AsyncExecutor<T, E, S> {
    strategy: S,
    hooks: HookSet<T, E>,
    sleeper: Arc<dyn AsyncSleeper>,
}

impl<T, E, S: Strategy<T, E>> AsyncExecutor<T, E, S> {
    /// Executor suspending on the tokio timer.
    #[cfg(feature = "async")]
    pub fn tokio(strategy: S, hooks: HookSet<T, E>) -> Result<Self, ContractViolation> {
        ExecutorBuilder::new(strategy)
            .hooks(hooks)
            .build_async(crate::sleep::TokioSleeper)
    }

    /// The configured strategy.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Run `operation` until the strategy stops.
    pub async fn run<F, Fut>(&self, operation: F) -> Result<Report<T, E>, ExecuteError<T, E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_with_cancel(operation, &CancellationToken::new())
            .await
    }

    /// Run `operation`, abandoning a pending wait once `cancel` fires.
    pub async fn run_with_cancel<F, Fut>(
        &self,
        mut operation: F,
        cancel: &CancellationToken,
    ) -> Result<Report<T, E>, ExecuteError<T, E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut driver = Driver::new(&self.strategy, &self.hooks);
        loop {
            driver.begin()?;
            let outcome = Outcome::from(operation().await);
            match driver.settle(outcome)? {
                Step::Done(report) => return Ok(report),
                Step::Wait(pending) => {
                    if cancel.is_cancelled() {
                        return Err(driver.cancel(pending));
                    }
                    let sleep = self.sleeper.sleep(pending.delay());
                    match future::select(sleep, cancel.cancelled()).await {
                        Either::Left(_) => driver.resume(pending),
                        Either::Right(_) => return Err(driver.cancel(pending)),
                    }
                }
            }
        }
    }
}

impl<T, E, S: fmt::Debug> fmt::Debug for ExecutorBuilder<T, E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorBuilder")
            .field("strategy", &self.strategy)
            .field("hooks", &self.hooks)
            .field("custom_sleeper", &self.sleeper.is_some())
            .finish()
    }
}

impl<T, E, S: fmt::Debug> fmt::Debug for Executor<T, E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("strategy", &self.strategy)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl<T, E, S: fmt::Debug> fmt::Debug for AsyncExecutor<T, E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncExecutor")
            .field("strategy", &self.strategy)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Run `operation` under `strategy` and `hooks`, blocking between attempts.
///
/// Returns the final outcome once the strategy stops. Hook errors, contract
/// violations and cancellation surface as [`ExecuteError`].
///
/// # Examples
///
/// ```rust
/// use steadfast::{execute, HookSet, Outcome};
/// use steadfast::strategy::MaxAttempts;
///
/// let outcome = execute(|| Err::<(), _>("still down"), MaxAttempts::new(3), HookSet::new());
/// assert_eq!(outcome.unwrap(), Outcome::Failure("still down"));
/// ```
pub fn execute<T, E, S, F>(
    operation: F,
    strategy: S,
    hooks: HookSet<T, E>,
) -> Result<Outcome<T, E>, ExecuteError<T, E>>
where
    S: Strategy<T, E>,
    F: FnMut() -> Result<T, E>,
{
    let executor = Executor::builder(strategy).hooks(hooks).build()?;
    executor.run(operation).map(Report::into_outcome)
}

/// Async variant of [`execute`] waiting on the tokio timer.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use steadfast::{execute_async, HookSet, Outcome};
/// use steadfast::strategy::{compose, fixed_delay, max_attempts};
///
/// # tokio_test::block_on(async {
/// let outcome = execute_async(
///     || async { Ok::<_, String>(42) },
///     compose([max_attempts(3).into(), fixed_delay(Duration::from_millis(1)).into()]),
///     HookSet::new(),
/// )
/// .await;
///
/// assert_eq!(outcome.unwrap(), Outcome::Success(42));
/// # });
/// ```
#[cfg(feature = "async")]
pub async fn execute_async<T, E, S, F, Fut>(
    operation: F,
    strategy: S,
    hooks: HookSet<T, E>,
) -> Result<Outcome<T, E>, ExecuteError<T, E>>
where
    S: Strategy<T, E>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let executor = AsyncExecutor::tokio(strategy, hooks)?;
    executor.run(operation).await.map(Report::into_outcome)
}

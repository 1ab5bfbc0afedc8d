//! Testing utilities for retry logic
//!
//! Retry code is awkward to test against real time and real failures. This
//! module provides deterministic stand-ins for both, plus assertion macros and
//! property-based testing support.
//!
//! # Examples
//!
//! ## Recording waits instead of sleeping
//!
//! ```rust
//! use std::time::Duration;
//! use steadfast::executor::Executor;
//! use steadfast::strategy::{compose, fixed_delay, max_attempts};
//! use steadfast::testing::{RecordingSleeper, Script};
//!
//! let sleeper = RecordingSleeper::new();
//! let script = Script::new(Err("busy")).then(Err("busy")).then(Ok(7));
//!
//! let executor = Executor::builder(compose([
//!     max_attempts(5).into(),
//!     fixed_delay(Duration::from_secs(30)).into(),
//! ]))
//! .sleeper(sleeper.clone())
//! .build()
//! .unwrap();
//!
//! let report = executor.run(|| script.call()).unwrap();
//! assert_eq!(report.attempts, 3);
//! assert_eq!(sleeper.delays(), vec![Duration::from_secs(30); 2]);
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use steadfast::{assert_failure, assert_success, Outcome};
//!
//! assert_success!(Outcome::<_, String>::Success(42));
//! assert_failure!(Outcome::<i32, _>::Failure("timeout"));
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};

use crate::cancel::CancellationToken;
use crate::error::HookPhase;
use crate::hooks::HookSet;
use crate::sleep::{AsyncSleeper, Sleeper, Wake};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sleeper that records requested delays and returns immediately.
///
/// Clones share the same record, so keep one handle for assertions and give
/// another to the executor. Implements both [`Sleeper`] and [`AsyncSleeper`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use steadfast::sleep::{Sleeper, Wake};
/// use steadfast::testing::RecordingSleeper;
/// use steadfast::CancellationToken;
///
/// let sleeper = RecordingSleeper::new();
/// let wake = sleeper.sleep(Duration::from_millis(250), &CancellationToken::new());
///
/// assert_eq!(wake, Wake::Elapsed);
/// assert_eq!(sleeper.total(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
    cancel_on: Option<usize>,
}

impl RecordingSleeper {
    /// Create a sleeper with an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the `n`-th wait (1-based) as cancelled instead of elapsed.
    ///
    /// Only affects blocking executions; async executions observe the token.
    pub fn cancelling_on(mut self, n: usize) -> Self {
        self.cancel_on = Some(n);
        self
    }

    /// Every delay requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        lock(&self.delays).clone()
    }

    /// Number of waits requested so far.
    pub fn count(&self) -> usize {
        lock(&self.delays).len()
    }

    /// Sum of all requested delays.
    pub fn total(&self) -> Duration {
        lock(&self.delays)
            .iter()
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(*d))
    }

    fn record(&self, delay: Duration) -> usize {
        let mut delays = lock(&self.delays);
        delays.push(delay);
        delays.len()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration, cancel: &CancellationToken) -> Wake {
        let n = self.record(delay);
        if cancel.is_cancelled() || self.cancel_on == Some(n) {
            Wake::Cancelled
        } else {
            Wake::Elapsed
        }
    }
}

impl AsyncSleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        self.record(delay);
        future::ready(()).boxed()
    }
}

/// A scripted operation: replays results in order, then repeats the last one.
///
/// # Example
///
/// ```rust
/// use steadfast::testing::Script;
///
/// let script = Script::new(Err("refused")).then(Ok(1));
///
/// assert_eq!(script.call(), Err("refused"));
/// assert_eq!(script.call(), Ok(1));
/// assert_eq!(script.call(), Ok(1));
/// assert_eq!(script.calls(), 3);
/// ```
#[derive(Debug)]
pub struct Script<T, E> {
    results: Vec<Result<T, E>>,
    calls: AtomicU32,
}

impl<T: Clone, E: Clone> Script<T, E> {
    /// Start a script whose first call returns `first`.
    pub fn new(first: Result<T, E>) -> Self {
        Self {
            results: vec![first],
            calls: AtomicU32::new(0),
        }
    }

    /// Fail with `error` for `failures` calls, then succeed with `value` forever.
    pub fn fail_times(failures: usize, error: E, value: T) -> Self {
        let mut results: Vec<Result<T, E>> = vec![Err(error); failures];
        results.push(Ok(value));
        Self {
            results,
            calls: AtomicU32::new(0),
        }
    }

    /// Append the result of the next call.
    pub fn then(mut self, next: Result<T, E>) -> Self {
        self.results.push(next);
        self
    }

    /// Run the next step of the script.
    pub fn call(&self) -> Result<T, E> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        let last = self.results.len() - 1;
        self.results[n.min(last)].clone()
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Counts hook invocations and records the order they fired in.
///
/// # Example
///
/// ```rust
/// use steadfast::strategy::MaxAttempts;
/// use steadfast::testing::HookProbe;
/// use steadfast::{execute, HookPhase};
///
/// let probe = HookProbe::new();
/// let _ = execute(|| Err::<(), _>("down"), MaxAttempts::new(2), probe.hooks());
///
/// assert_eq!(probe.before_count(), 2);
/// assert_eq!(probe.failure_count(), 2);
/// assert_eq!(
///     probe.events(),
///     vec![
///         (HookPhase::Before, 1),
///         (HookPhase::Failure, 1),
///         (HookPhase::Before, 2),
///         (HookPhase::Failure, 2),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct HookProbe {
    events: Arc<Mutex<Vec<(HookPhase, u32)>>>,
}

impl HookProbe {
    /// Create a probe with no recorded events.
    pub fn new() -> Self {
        Self::default()
    }

    /// A hook set reporting every lifecycle point to this probe.
    pub fn hooks<T: 'static, E: 'static>(&self) -> HookSet<T, E> {
        let (before, success, failure) = (self.clone(), self.clone(), self.clone());
        HookSet::new()
            .on_before(move |b| {
                before.push(HookPhase::Before, b.attempt);
                Ok(())
            })
            .on_success(move |ctx| {
                success.push(HookPhase::Success, ctx.attempt);
                Ok(())
            })
            .on_failure(move |ctx| {
                failure.push(HookPhase::Failure, ctx.attempt);
                Ok(())
            })
    }

    /// Every `(phase, attempt)` pair seen so far, in firing order.
    pub fn events(&self) -> Vec<(HookPhase, u32)> {
        lock(&self.events).clone()
    }

    /// Number of before-hook invocations.
    pub fn before_count(&self) -> usize {
        self.count(HookPhase::Before)
    }

    /// Number of on-success invocations.
    pub fn success_count(&self) -> usize {
        self.count(HookPhase::Success)
    }

    /// Number of on-failure invocations.
    pub fn failure_count(&self) -> usize {
        self.count(HookPhase::Failure)
    }

    fn push(&self, phase: HookPhase, attempt: u32) {
        lock(&self.events).push((phase, attempt));
    }

    fn count(&self, phase: HookPhase) -> usize {
        lock(&self.events).iter().filter(|(p, _)| *p == phase).count()
    }
}

/// Assert that an outcome is a success.
///
/// This macro will panic if the outcome is a `Failure`.
///
/// # Example
///
/// ```rust
/// use steadfast::{Outcome, assert_success};
///
/// let outcome = Outcome::<_, String>::Success(42);
/// assert_success!(outcome);
/// ```
#[macro_export]
macro_rules! assert_success {
    ($outcome:expr) => {
        match $outcome {
            $crate::Outcome::Success(_) => {}
            $crate::Outcome::Failure(e) => {
                panic!("Expected Success, got Failure: {:?}", e);
            }
        }
    };
}

/// Assert that an outcome is a failure.
///
/// This macro will panic if the outcome is a `Success`.
///
/// # Example
///
/// ```rust
/// use steadfast::{Outcome, assert_failure};
///
/// let outcome = Outcome::<i32, _>::Failure("refused");
/// assert_failure!(outcome);
/// ```
#[macro_export]
macro_rules! assert_failure {
    ($outcome:expr) => {
        match $outcome {
            $crate::Outcome::Failure(_) => {}
            $crate::Outcome::Success(v) => {
                panic!("Expected Failure, got Success: {:?}", v);
            }
        }
    };
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl<T, E> Arbitrary for crate::Outcome<T, E>
where
    T: Arbitrary + 'static,
    E: Arbitrary + 'static,
{
    type Parameters = (T::Parameters, E::Parameters);
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        let (t_params, e_params) = args;
        prop_oneof![
            any_with::<T>(t_params).prop_map(crate::Outcome::Success),
            any_with::<E>(e_params).prop_map(crate::Outcome::Failure),
        ]
        .boxed()
    }
}

//! Lifecycle observers.
//!
//! A [`HookSet`] holds three ordered lists of callbacks: before each attempt,
//! after a successful attempt and after a failed attempt. Hooks observe; they
//! cannot change what the strategy decides. A hook that returns `Err` aborts the
//! execution with [`ExecuteError::Hook`](crate::ExecuteError::Hook).
//!
//! # Examples
//!
//! ```
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//! use steadfast::HookSet;
//!
//! let failures = Arc::new(AtomicU32::new(0));
//! let counter = failures.clone();
//!
//! let hooks: HookSet<String, std::io::Error> = HookSet::new()
//!     .on_before(|before| {
//!         println!("attempt {}", before.attempt);
//!         Ok(())
//!     })
//!     .on_failure(move |ctx| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!         println!("attempt {} failed: {:?}", ctx.attempt, ctx.outcome);
//!         Ok(())
//!     });
//!
//! assert_eq!(hooks.len(), 2);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::context::{AttemptContext, BeforeAttempt};
use crate::error::{HookError, HookPhase};

type BeforeHook<T, E> =
    Arc<dyn Fn(&BeforeAttempt<'_, T, E>) -> Result<(), HookError> + Send + Sync>;
type OutcomeHook<T, E> =
    Arc<dyn Fn(&AttemptContext<'_, T, E>) -> Result<(), HookError> + Send + Sync>;

/// Ordered before / on-success / on-failure callbacks.
///
/// Built once with the `on_*` builder methods and then shared read-only by any
/// number of executions. Cloning is cheap: callbacks are reference counted.
pub struct HookSet<T, E> {
    before: Vec<BeforeHook<T, E>>,
    on_success: Vec<OutcomeHook<T, E>>,
    on_failure: Vec<OutcomeHook<T, E>>,
}

/// Error from one hook, tagged with where it was registered.
#[derive(Debug)]
pub(crate) struct FiredError {
    pub(crate) phase: HookPhase,
    pub(crate) error: HookError,
}

impl<T, E> HookSet<T, E> {
    /// Create an empty hook set.
    pub fn new() -> Self {
        Self {
            before: Vec::new(),
            on_success: Vec::new(),
            on_failure: Vec::new(),
        }
    }

    /// Register a callback fired before every attempt.
    pub fn on_before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&BeforeAttempt<'_, T, E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.before.push(Arc::new(hook));
        self
    }

    /// Register a callback fired after every successful attempt.
    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AttemptContext<'_, T, E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.on_success.push(Arc::new(hook));
        self
    }

    /// Register a callback fired after every failed attempt.
    pub fn on_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AttemptContext<'_, T, E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.on_failure.push(Arc::new(hook));
        self
    }

    /// Total number of registered callbacks.
    pub fn len(&self) -> usize {
        self.before.len() + self.on_success.len() + self.on_failure.len()
    }

    /// Returns `true` if no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run before-hooks in registration order, stopping at the first error.
    pub(crate) fn fire_before(&self, before: &BeforeAttempt<'_, T, E>) -> Result<(), FiredError> {
        for hook in &self.before {
            hook(before).map_err(|error| FiredError {
                phase: HookPhase::Before,
                error,
            })?;
        }
        Ok(())
    }

    /// Run success-hooks in registration order, stopping at the first error.
    pub(crate) fn fire_on_success(&self, ctx: &AttemptContext<'_, T, E>) -> Result<(), FiredError> {
        Self::fire(&self.on_success, HookPhase::Success, ctx)
    }

    /// Run failure-hooks in registration order, stopping at the first error.
    pub(crate) fn fire_on_failure(&self, ctx: &AttemptContext<'_, T, E>) -> Result<(), FiredError> {
        Self::fire(&self.on_failure, HookPhase::Failure, ctx)
    }

    /// Dispatch on the outcome held by `ctx`.
    pub(crate) fn fire_outcome(&self, ctx: &AttemptContext<'_, T, E>) -> Result<(), FiredError> {
        if ctx.is_success() {
            self.fire_on_success(ctx)
        } else {
            self.fire_on_failure(ctx)
        }
    }

    fn fire(
        hooks: &[OutcomeHook<T, E>],
        phase: HookPhase,
        ctx: &AttemptContext<'_, T, E>,
    ) -> Result<(), FiredError> {
        for hook in hooks {
            hook(ctx).map_err(|error| FiredError { phase, error })?;
        }
        Ok(())
    }
}

impl<T, E> Default for HookSet<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for HookSet<T, E> {
    fn clone(&self) -> Self {
        Self {
            before: self.before.clone(),
            on_success: self.on_success.clone(),
            on_failure: self.on_failure.clone(),
        }
    }
}

impl<T, E> fmt::Debug for HookSet<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("before", &self.before.len())
            .field("on_success", &self.on_success.len())
            .field("on_failure", &self.on_failure.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Outcome;
    use std::sync::Mutex;
    use std::time::Duration;

    fn before(attempt: u32) -> BeforeAttempt<'static, i32, &'static str> {
        BeforeAttempt {
            attempt,
            previous: None,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn hooks_fire_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (log.clone(), log.clone());

        let hooks = HookSet::<i32, &str>::new()
            .on_before(move |_| {
                a.lock().unwrap().push("first");
                Ok(())
            })
            .on_before(move |_| {
                b.lock().unwrap().push("second");
                Ok(())
            });

        hooks.fire_before(&before(1)).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn first_error_stops_remaining_hooks() {
        let reached = Arc::new(Mutex::new(false));
        let flag = reached.clone();

        let hooks = HookSet::<i32, &str>::new()
            .on_failure(|_| Err("broken".into()))
            .on_failure(move |_| {
                *flag.lock().unwrap() = true;
                Ok(())
            });

        let outcome = Outcome::Failure("down");
        let err = hooks
            .fire_outcome(&AttemptContext::new(1, &outcome))
            .unwrap_err();
        assert_eq!(err.phase, HookPhase::Failure);
        assert_eq!(err.error.to_string(), "broken");
        assert!(!*reached.lock().unwrap());
    }

    #[test]
    fn fire_outcome_routes_by_variant() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (s, f) = (seen.clone(), seen.clone());
        let hooks = HookSet::<i32, &str>::new()
            .on_success(move |_| {
                s.lock().unwrap().push("success");
                Ok(())
            })
            .on_failure(move |_| {
                f.lock().unwrap().push("failure");
                Ok(())
            });

        let ok = Outcome::Success(1);
        let err = Outcome::Failure("x");
        hooks.fire_outcome(&AttemptContext::new(1, &ok)).unwrap();
        hooks.fire_outcome(&AttemptContext::new(2, &err)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["success", "failure"]);
    }

    #[test]
    fn debug_shows_counts() {
        let hooks = HookSet::<(), ()>::new().on_success(|_| Ok(()));
        let debug = format!("{:?}", hooks);
        assert!(debug.contains("on_success: 1"));
        assert!(!hooks.is_empty());
        assert_eq!(hooks.clone().len(), 1);
    }
}

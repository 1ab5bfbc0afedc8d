//! Read-only views handed to strategies and hooks.

use std::time::Duration;

use crate::outcome::Outcome;

/// Everything a strategy or outcome hook may know about the current attempt.
///
/// Built fresh by the executor for every attempt and borrowed for the length
/// of one decision. `attempt` is 1-indexed and never zero when produced by the
/// executor.
#[derive(Debug)]
pub struct AttemptContext<'a, T, E> {
    /// Which attempt produced `outcome` (1-indexed).
    pub attempt: u32,
    /// Outcome of this attempt.
    pub outcome: &'a Outcome<T, E>,
    /// Wall time since the first attempt started.
    pub elapsed: Duration,
    /// Sum of all delays waited so far in this execution.
    pub total_delay: Duration,
}

impl<'a, T, E> AttemptContext<'a, T, E> {
    /// Build a context for `attempt` with zero elapsed time and delay.
    ///
    /// Useful when driving a strategy by hand:
    ///
    /// ```
    /// use steadfast::{AttemptContext, Decision, Outcome, Strategy};
    /// use steadfast::strategy::MaxAttempts;
    ///
    /// let failed = Outcome::<(), &str>::Failure("nope");
    /// let ctx = AttemptContext::new(2, &failed);
    /// assert_eq!(MaxAttempts::new(2).decide(&ctx), Ok(Decision::Stop));
    /// ```
    pub fn new(attempt: u32, outcome: &'a Outcome<T, E>) -> Self {
        Self {
            attempt,
            outcome,
            elapsed: Duration::ZERO,
            total_delay: Duration::ZERO,
        }
    }

    /// Returns `true` if this attempt succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// The failure of this attempt, if it failed.
    pub fn failure(&self) -> Option<&'a E> {
        self.outcome.failure()
    }
}

// Manual impls: a derive would require `T: Clone, E: Clone` for a struct that
// only holds a reference.
impl<T, E> Clone for AttemptContext<'_, T, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, E> Copy for AttemptContext<'_, T, E> {}

/// What before-attempt hooks see.
///
/// No outcome exists yet for the attempt about to start; `previous` holds the
/// outcome that caused this retry (`None` on the first attempt).
#[derive(Debug)]
pub struct BeforeAttempt<'a, T, E> {
    /// Which attempt is about to start (1-indexed).
    pub attempt: u32,
    /// Outcome of the preceding attempt.
    pub previous: Option<&'a Outcome<T, E>>,
    /// Wall time since the first attempt started.
    pub elapsed: Duration,
}

impl<T, E> Clone for BeforeAttempt<'_, T, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, E> Copy for BeforeAttempt<'_, T, E> {}

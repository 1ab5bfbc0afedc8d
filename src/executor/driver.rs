//! The state machine shared by the blocking and async executors.
//!
//! `Attempting -> Deciding -> { Waiting -> Attempting | Done }`
//!
//! The driver owns the per-execution state (attempt counter, timings, the
//! outcome carried into a wait) and performs every synchronous step. The
//! surrounding loop only invokes the operation and suspends.

use std::time::{Duration, Instant};

use super::Report;
use crate::context::{AttemptContext, BeforeAttempt};
use crate::error::{Cancelled, ContractViolation, ExecuteError, HookFailure};
use crate::hooks::{FiredError, HookSet};
use crate::outcome::Outcome;
use crate::strategy::{Decision, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Attempting,
    Deciding,
    Waiting,
}

/// What the loop does after an attempt settled.
#[derive(Debug)]
pub(crate) enum Step<T, E> {
    /// Suspend, then call [`Driver::resume`] or [`Driver::cancel`].
    Wait(Pending<T, E>),
    /// The strategy stopped; hand the report to the caller.
    Done(Report<T, E>),
}

/// A retry waiting for its delay. Holds the outcome that caused it.
#[derive(Debug)]
pub(crate) struct Pending<T, E> {
    delay: Duration,
    outcome: Outcome<T, E>,
}

impl<T, E> Pending<T, E> {
    pub(crate) fn delay(&self) -> Duration {
        self.delay
    }
}

pub(crate) struct Driver<'a, T, E, S: ?Sized> {
    strategy: &'a S,
    hooks: &'a HookSet<T, E>,
    phase: Phase,
    attempt: u32,
    started: Instant,
    total_delay: Duration,
    previous: Option<Outcome<T, E>>,
}

impl<'a, T, E, S> Driver<'a, T, E, S>
where
    S: Strategy<T, E> + ?Sized,
{
    pub(crate) fn new(strategy: &'a S, hooks: &'a HookSet<T, E>) -> Self {
        Self {
            strategy,
            hooks,
            phase: Phase::Attempting,
            attempt: 1,
            started: Instant::now(),
            total_delay: Duration::ZERO,
            previous: None,
        }
    }

    /// Enter `Attempting`: fire before-hooks for the current attempt.
    pub(crate) fn begin(&mut self) -> Result<(), ExecuteError<T, E>> {
        debug_assert_eq!(self.phase, Phase::Attempting);
        trace_event!(debug, attempt = self.attempt, "starting attempt");

        let before = BeforeAttempt {
            attempt: self.attempt,
            previous: self.previous.as_ref(),
            elapsed: self.started.elapsed(),
        };
        if let Err(fired) = self.hooks.fire_before(&before) {
            let last = self.previous.take();
            return Err(self.hook_failure(fired, last));
        }
        Ok(())
    }

    /// Enter `Deciding` with the outcome of the current attempt.
    pub(crate) fn settle(
        &mut self,
        outcome: Outcome<T, E>,
    ) -> Result<Step<T, E>, ExecuteError<T, E>> {
        debug_assert_eq!(self.phase, Phase::Attempting);
        self.phase = Phase::Deciding;
        self.previous = None;

        let ctx = self.context(&outcome);
        trace_event!(
            debug,
            attempt = ctx.attempt,
            success = ctx.is_success(),
            "attempt finished"
        );
        let fired = self.hooks.fire_outcome(&ctx);
        if let Err(fired) = fired {
            return Err(self.hook_failure(fired, Some(outcome)));
        }

        let ctx = self.context(&outcome);
        match self.strategy.decide(&ctx) {
            Err(violation) => Err(self.violation(violation)),
            Ok(Decision::Stop) => Ok(Step::Done(self.finish(outcome))),
            Ok(Decision::Retry(delay)) => {
                if self.attempt == u32::MAX {
                    return Err(self.violation(ContractViolation::AttemptOverflow));
                }
                trace_event!(
                    debug,
                    attempt = self.attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "retrying after delay"
                );
                self.phase = Phase::Waiting;
                Ok(Step::Wait(Pending { delay, outcome }))
            }
        }
    }

    /// Leave `Waiting` after the full delay: next attempt.
    pub(crate) fn resume(&mut self, pending: Pending<T, E>) {
        debug_assert_eq!(self.phase, Phase::Waiting);
        self.total_delay = self.total_delay.saturating_add(pending.delay);
        self.previous = Some(pending.outcome);
        self.attempt += 1;
        self.phase = Phase::Attempting;
    }

    /// Leave `Waiting` because the wait was cancelled.
    pub(crate) fn cancel(self, pending: Pending<T, E>) -> ExecuteError<T, E> {
        debug_assert_eq!(self.phase, Phase::Waiting);
        trace_event!(warn, attempts = self.attempt, "execution cancelled while waiting");
        ExecuteError::Cancelled(Cancelled {
            attempts: self.attempt,
            last_outcome: pending.outcome,
        })
    }

    fn context<'o>(&self, outcome: &'o Outcome<T, E>) -> AttemptContext<'o, T, E> {
        AttemptContext {
            attempt: self.attempt,
            outcome,
            elapsed: self.started.elapsed(),
            total_delay: self.total_delay,
        }
    }

    fn finish(&self, outcome: Outcome<T, E>) -> Report<T, E> {
        let report = Report {
            outcome,
            attempts: self.attempt,
            total_delay: self.total_delay,
            elapsed: self.started.elapsed(),
        };
        if report.attempts > 1 {
            trace_event!(
                info,
                attempts = report.attempts,
                success = report.outcome.is_success(),
                total_delay_ms = u64::try_from(report.total_delay.as_millis()).unwrap_or(u64::MAX),
                "execution finished after retries"
            );
        } else {
            trace_event!(debug, success = report.outcome.is_success(), "execution finished");
        }
        report
    }

    fn hook_failure(
        &self,
        fired: FiredError,
        last_outcome: Option<Outcome<T, E>>,
    ) -> ExecuteError<T, E> {
        trace_event!(
            warn,
            attempt = self.attempt,
            phase = %fired.phase,
            error = %fired.error,
            "hook failed, aborting execution"
        );
        ExecuteError::Hook(HookFailure {
            phase: fired.phase,
            attempt: self.attempt,
            source: fired.error,
            last_outcome,
        })
    }

    fn violation(&self, violation: ContractViolation) -> ExecuteError<T, E> {
        trace_event!(
            warn,
            attempt = self.attempt,
            violation = %violation,
            "contract violation, aborting execution"
        );
        ExecuteError::Contract(violation)
    }
}

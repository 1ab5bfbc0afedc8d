//! Error types for executions that end without a strategy verdict.
//!
//! Operation errors never show up here: they travel inside
//! [`Outcome::Failure`](crate::Outcome) and are judged by strategies. The types
//! below cover the three ways an execution terminates abnormally.

use std::error::Error as StdError;
use std::fmt;

use crate::outcome::Outcome;

/// Error a hook returns to abort the execution.
pub type HookError = Box<dyn StdError + Send + Sync + 'static>;

/// Lifecycle point a hook is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HookPhase {
    /// Before the operation is invoked.
    Before,
    /// After an attempt succeeded.
    Success,
    /// After an attempt failed.
    Failure,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Before => f.write_str("before"),
            HookPhase::Success => f.write_str("on-success"),
            HookPhase::Failure => f.write_str("on-failure"),
        }
    }
}

/// A programming error: a strategy or its configuration broke an invariant.
///
/// The executor never recovers from these. They surface either from
/// [`ExecutorBuilder::build`](crate::executor::ExecutorBuilder::build) or from a
/// strategy's `decide` during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractViolation {
    /// A strategy was asked about attempt 0.
    ZeroAttempt,
    /// `MaxAttempts(0)` can never allow the first attempt.
    ZeroMaxAttempts,
    /// Exponential backoff with factor 0.
    ZeroFactor,
    /// A delay given in seconds was negative, NaN or infinite.
    InvalidDelay {
        /// The rejected value.
        secs: f64,
    },
    /// A proportional jitter factor outside `[0, 1]`.
    InvalidJitter {
        /// The rejected value.
        factor: f64,
    },
    /// The attempt counter would exceed `u32::MAX`.
    AttemptOverflow,
    /// A user strategy reported its own violation.
    Custom(String),
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroAttempt => write!(f, "strategy queried with attempt number 0"),
            Self::ZeroMaxAttempts => write!(f, "max attempts must be at least 1"),
            Self::ZeroFactor => write!(f, "backoff factor must be at least 1"),
            Self::InvalidDelay { secs } => {
                write!(f, "delay must be finite and non-negative, got {}s", secs)
            }
            Self::InvalidJitter { factor } => {
                write!(f, "jitter factor must lie in [0, 1], got {}", factor)
            }
            Self::AttemptOverflow => write!(f, "attempt counter overflowed"),
            Self::Custom(msg) => write!(f, "contract violation: {}", msg),
        }
    }
}

impl StdError for ContractViolation {}

/// A registered hook returned an error.
///
/// Carries the last known outcome so the caller can still see what the
/// operation did before the observer broke.
#[derive(Debug)]
pub struct HookFailure<T, E> {
    /// Where the failing hook was registered.
    pub phase: HookPhase,
    /// Attempt during which the hook ran.
    pub attempt: u32,
    /// Error returned by the hook.
    pub source: HookError,
    /// Outcome of the current attempt, or of the previous one for
    /// before-hooks. `None` if a before-hook failed on the first attempt.
    pub last_outcome: Option<Outcome<T, E>>,
}

impl<T, E> fmt::Display for HookFailure<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hook failed on attempt {}: {}",
            self.phase, self.attempt, self.source
        )
    }
}

impl<T: fmt::Debug, E: fmt::Debug> StdError for HookFailure<T, E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source)
    }
}

/// The execution was cancelled while waiting before a retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancelled<T, E> {
    /// Number of attempts completed before cancellation.
    pub attempts: u32,
    /// Outcome of the attempt that led to the cancelled wait.
    pub last_outcome: Outcome<T, E>,
}

impl<T, E> fmt::Display for Cancelled<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution cancelled after {} attempts", self.attempts)
    }
}

impl<T: fmt::Debug, E: fmt::Debug> StdError for Cancelled<T, E> {}

/// Abnormal termination of an execution.
///
/// # Examples
///
/// ```rust
/// use steadfast::{execute, ExecuteError, HookSet, Outcome};
/// use steadfast::strategy::MaxAttempts;
///
/// let hooks = HookSet::new().on_failure(|_| Err("observer broke".into()));
///
/// let result = execute(|| Err::<(), _>("down"), MaxAttempts::new(3), hooks);
///
/// match result {
///     Err(ExecuteError::Hook(failure)) => {
///         assert_eq!(failure.attempt, 1);
///         assert_eq!(failure.last_outcome, Some(Outcome::Failure("down")));
///     }
///     other => panic!("expected hook failure, got {:?}", other),
/// }
/// ```
#[derive(Debug)]
pub enum ExecuteError<T, E> {
    /// A hook returned an error.
    Hook(HookFailure<T, E>),
    /// A strategy or its configuration broke an invariant.
    Contract(ContractViolation),
    /// Cancelled while waiting before a retry.
    Cancelled(Cancelled<T, E>),
}

impl<T, E> ExecuteError<T, E> {
    /// Returns `true` for [`ExecuteError::Hook`].
    pub fn is_hook_failure(&self) -> bool {
        matches!(self, Self::Hook(_))
    }

    /// Returns `true` for [`ExecuteError::Contract`].
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Contract(_))
    }

    /// Returns `true` for [`ExecuteError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// The last operation outcome observed before termination, if any.
    pub fn last_outcome(&self) -> Option<&Outcome<T, E>> {
        match self {
            Self::Hook(failure) => failure.last_outcome.as_ref(),
            Self::Contract(_) => None,
            Self::Cancelled(cancelled) => Some(&cancelled.last_outcome),
        }
    }
}

impl<T, E> From<ContractViolation> for ExecuteError<T, E> {
    fn from(violation: ContractViolation) -> Self {
        Self::Contract(violation)
    }
}

impl<T, E> fmt::Display for ExecuteError<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hook(failure) => write!(f, "{}", failure),
            Self::Contract(violation) => write!(f, "{}", violation),
            Self::Cancelled(cancelled) => write!(f, "{}", cancelled),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> StdError for ExecuteError<T, E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Hook(failure) => Some(&*failure.source),
            Self::Contract(violation) => Some(violation),
            Self::Cancelled(_) => None,
        }
    }
}

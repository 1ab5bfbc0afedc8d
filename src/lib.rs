//! # Steadfast
//!
//! > *"Try again, but mean it"*
//!
//! A retry execution core: run a fallible operation, ask a strategy after every
//! attempt whether to try again and how long to wait, and notify observers along
//! the way.
//!
//! ## Philosophy
//!
//! Steadfast keeps the **decision layer** separate from the **shell**:
//! - **Strategies** are plain values that turn an attempt into a `Retry(delay)`
//!   or `Stop` verdict. No clocks, no I/O.
//! - **Executors** run the loop and delegate every wait to a sleeper you can
//!   swap, cancel or record.
//!
//! ## Quick Example
//!
//! ```rust
//! use std::time::Duration;
//! use steadfast::strategy::{compose, fixed_delay, max_attempts};
//! use steadfast::{execute, HookSet, Outcome};
//!
//! let mut calls = 0;
//! let outcome = execute(
//!     || {
//!         calls += 1;
//!         if calls < 3 { Err("connection reset") } else { Ok("payload") }
//!     },
//!     compose([
//!         max_attempts(5).into(),
//!         fixed_delay(Duration::from_millis(1)).into(),
//!     ]),
//!     HookSet::new().on_failure(|ctx| {
//!         println!("attempt {} failed", ctx.attempt);
//!         Ok(())
//!     }),
//! );
//!
//! assert_eq!(outcome.unwrap(), Outcome::Success("payload"));
//! ```
//!
//! ## Features
//!
//! - `tracing` (default): structured events for attempts, decisions and waits
//! - `async`: tokio-backed [`execute_async`] and `TokioSleeper`
//! - `jitter`: randomised delays via `strategy::Jitter`
//! - `serde`: serialisation of outcomes, decisions and strategy configuration
//! - `proptest`: `Arbitrary` for [`Outcome`]

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($level:ident, $($arg:tt)+) => {
        tracing::$level!($($arg)+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($level:ident, $($arg:tt)+) => {
        ()
    };
}

pub mod cancel;
pub mod context;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod outcome;
pub mod sleep;
pub mod strategy;
pub mod testing;

// Re-exports
pub use cancel::CancellationToken;
pub use context::{AttemptContext, BeforeAttempt};
pub use error::{Cancelled, ContractViolation, ExecuteError, HookError, HookFailure, HookPhase};
pub use executor::{execute, AsyncExecutor, Executor, ExecutorBuilder, Report};
#[cfg(feature = "async")]
pub use executor::execute_async;
pub use hooks::HookSet;
pub use outcome::{Outcome, Retryable};
pub use strategy::{Decision, Policy, Strategy};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancel::CancellationToken;
    pub use crate::context::{AttemptContext, BeforeAttempt};
    pub use crate::error::{ContractViolation, ExecuteError, HookError};
    pub use crate::executor::{execute, AsyncExecutor, Executor, Report};
    #[cfg(feature = "async")]
    pub use crate::executor::execute_async;
    pub use crate::hooks::HookSet;
    pub use crate::outcome::{Outcome, Retryable};
    pub use crate::strategy::{
        compose, exponential_backoff, fixed_delay, max_attempts, Decision, Policy, Strategy,
    };
}

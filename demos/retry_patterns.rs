//! Retry Patterns Example
//!
//! Demonstrates the retry execution core end to end:
//! - Composing strategies (attempt budget + backoff)
//! - Classifying failures with `Retryable` and `RetryIf`
//! - Observing executions with hooks
//! - Jittered backoff
//! - Async executions and cancellation
//!
//! Run with:
//!
//! ```sh
//! cargo run --example retry_patterns --features async,jitter
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use steadfast::executor::Executor;
use steadfast::prelude::*;
use steadfast::strategy::{Jitter, Policy, RetryIf};

#[derive(Debug, Clone, PartialEq)]
enum ApiError {
    RateLimited,
    Unavailable,
    BadRequest(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::RateLimited => write!(f, "429 rate limited"),
            ApiError::Unavailable => write!(f, "503 unavailable"),
            ApiError::BadRequest(msg) => write!(f, "400 bad request: {}", msg),
        }
    }
}

impl Retryable for ApiError {
    fn is_retryable(&self) -> bool {
        !matches!(self, ApiError::BadRequest(_))
    }
}

// ==================== Composed Strategies ====================

/// Example 1: attempt budget plus exponential backoff
fn example_composed() {
    println!("\n=== Example 1: Composed Strategies ===");

    let calls = AtomicU32::new(0);
    let executor = Executor::builder(compose([
        max_attempts(5).into(),
        exponential_backoff(Duration::from_millis(10), 2, Duration::from_millis(100)).into(),
    ]))
    .build()
    .expect("valid strategy");

    let report = executor
        .run(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            println!("  Attempt {}", n + 1);
            if n < 2 {
                Err(ApiError::Unavailable)
            } else {
                Ok("payload")
            }
        })
        .expect("no hook or contract errors");

    println!(
        "Finished after {} attempts, waited {:?}: {:?}",
        report.attempts, report.total_delay, report.outcome
    );
}

// ==================== Error Classification ====================

/// Example 2: stop at the first non-retryable failure
fn example_classification() {
    println!("\n=== Example 2: Error Classification ===");

    let calls = AtomicU32::new(0);
    let outcome = execute(
        || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err::<(), _>(ApiError::RateLimited)
            } else {
                Err(ApiError::BadRequest("missing field `id`".into()))
            }
        },
        compose([
            max_attempts(10).into(),
            RetryIf::retryable().into(),
            fixed_delay(Duration::from_millis(5)).into(),
        ]),
        HookSet::new(),
    )
    .expect("no hook or contract errors");

    println!(
        "Gave up after {} calls: {:?}",
        calls.load(Ordering::SeqCst),
        outcome
    );
}

// ==================== Hooks ====================

/// Example 3: hooks for logging and metrics
fn example_hooks() {
    println!("\n=== Example 3: Hooks ===");

    let failures = Arc::new(AtomicU32::new(0));
    let counter = failures.clone();

    let hooks = HookSet::new()
        .on_before(|before| {
            if before.attempt > 1 {
                println!("  Retrying (attempt {})", before.attempt);
            }
            Ok(())
        })
        .on_failure(move |ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = ctx.failure() {
                println!("  Attempt {} failed: {}", ctx.attempt, err);
            }
            Ok(())
        })
        .on_success(|ctx| {
            println!("  Attempt {} succeeded", ctx.attempt);
            Ok(())
        });

    let calls = AtomicU32::new(0);
    let _ = execute(
        || {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ApiError::RateLimited)
            } else {
                Ok(200)
            }
        },
        compose([
            max_attempts(4).into(),
            fixed_delay(Duration::from_millis(5)).into(),
        ]),
        hooks,
    );

    println!("Failure hook fired {} times", failures.load(Ordering::SeqCst));
}

// ==================== Jitter ====================

/// Example 4: jittered delays
fn example_jitter() {
    println!("\n=== Example 4: Jitter ===");

    let jittered: Policy<(), ApiError> = Jitter::proportional(
        Policy::from(fixed_delay(Duration::from_millis(20))),
        0.5,
    )
    .into();

    let executor = Executor::builder(compose([max_attempts(4).into(), jittered]))
        .hooks(HookSet::new().on_failure(|ctx| {
            println!("  Attempt {} failed after {:?}", ctx.attempt, ctx.elapsed);
            Ok(())
        }))
        .build()
        .expect("valid strategy");

    let report = executor
        .run(|| Err(ApiError::Unavailable))
        .expect("no hook or contract errors");
    println!("Total jittered delay: {:?}", report.total_delay);
}

// ==================== Async & Cancellation ====================

/// Example 5: async execution cancelled from another task
async fn example_async_cancellation() {
    println!("\n=== Example 5: Async Cancellation ===");

    let executor = AsyncExecutor::tokio(
        compose([
            max_attempts(100).into(),
            fixed_delay(Duration::from_secs(1)).into(),
        ]),
        HookSet::new(),
    )
    .expect("valid strategy");

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        println!("  Shutdown requested");
        canceller.cancel();
    });

    match executor
        .run_with_cancel(|| async { Err::<(), _>(ApiError::Unavailable) }, &token)
        .await
    {
        Ok(report) => println!("Finished: {:?}", report.outcome),
        Err(err) => println!("Stopped early: {}", err),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    println!("Retry Patterns Examples");
    println!("=======================");

    example_composed();
    example_classification();
    example_hooks();
    example_jitter();
    example_async_cancellation().await;

    println!("\n=== All examples completed ===");
}

//! Async executions on the tokio timer.
#![cfg(feature = "async")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use steadfast::prelude::*;
use steadfast::strategy::Composite;
use steadfast::testing::HookProbe;

#[tokio::test]
async fn test_async_retry_succeeds_on_third_attempt() {
    let attempts = Arc::new(AtomicU32::new(0));
    let probe = HookProbe::new();

    let outcome = execute_async(
        {
            let attempts = attempts.clone();
            move || {
                let attempts = attempts.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err("transient failure")
                    } else {
                        Ok("success")
                    }
                }
            }
        },
        compose([
            max_attempts(5).into(),
            fixed_delay(Duration::from_millis(1)).into(),
        ]),
        probe.hooks(),
    )
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Success("success"));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(probe.failure_count(), 2);
    assert_eq!(probe.success_count(), 1);
}

#[tokio::test]
async fn test_async_waits_are_real() {
    let start = Instant::now();
    let executor = AsyncExecutor::tokio(
        compose::<(), &str, _>([
            max_attempts(3).into(),
            fixed_delay(Duration::from_millis(10)).into(),
        ]),
        HookSet::new(),
    )
    .unwrap();

    let report = executor.run(|| async { Err("down") }).await.unwrap();

    assert_eq!(report.attempts, 3);
    assert_eq!(report.total_delay, Duration::from_millis(20));
    assert!(start.elapsed() >= Duration::from_millis(20));
    assert!(report.elapsed >= Duration::from_millis(20));
}

#[tokio::test(start_paused = true)]
async fn test_paused_clock_exponential_backoff() {
    let strategy: Composite<(), &str> = compose([
        max_attempts(5).into(),
        exponential_backoff(Duration::from_secs(1), 2, Duration::from_secs(4)).into(),
    ]);
    let executor = AsyncExecutor::tokio(strategy, HookSet::new()).unwrap();

    let report = executor.run(|| async { Err("down") }).await.unwrap();

    assert_eq!(report.attempts, 5);
    assert_eq!(report.total_delay, Duration::from_secs(1 + 2 + 4 + 4));
}

#[tokio::test]
async fn test_cancellation_from_spawned_task() {
    let token = CancellationToken::new();
    let executor =
        AsyncExecutor::tokio(fixed_delay(Duration::from_secs(3600)), HookSet::new()).unwrap();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let err = executor
        .run_with_cancel(|| async { Err::<(), _>("down") }, &token)
        .await
        .unwrap_err();

    match err {
        ExecuteError::Cancelled(cancelled) => {
            assert_eq!(cancelled.attempts, 1);
            assert_eq!(cancelled.last_outcome, Outcome::Failure("down"));
        }
        other => panic!("expected cancellation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_async_contract_violation_before_first_attempt() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let result = execute_async(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<(), &str>(()) }
        },
        exponential_backoff(Duration::from_millis(1), 0, Duration::from_secs(1)),
        HookSet::new(),
    )
    .await;

    assert!(matches!(
        result,
        Err(ExecuteError::Contract(ContractViolation::ZeroFactor))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

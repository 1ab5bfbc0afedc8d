//! End-to-end retry scenarios through the public API.

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use steadfast::executor::Executor;
use steadfast::prelude::*;
use steadfast::strategy::{Composite, FibonacciBackoff, LinearBackoff, MaxAttempts, RetryIf};
use steadfast::testing::{HookProbe, RecordingSleeper, Script};
use steadfast::{assert_failure, assert_success, HookPhase};

#[derive(Debug, Clone, PartialEq)]
enum FetchError {
    Timeout,
    NotFound,
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Timeout)
    }
}

fn recorded<T, E, S: Strategy<T, E>>(strategy: S, sleeper: &RecordingSleeper) -> Executor<T, E, S> {
    Executor::builder(strategy)
        .sleeper(sleeper.clone())
        .build()
        .unwrap()
}

#[test]
fn test_retry_if_stops_on_permanent_error() {
    let sleeper = RecordingSleeper::new();
    let script = Script::new(Err(FetchError::Timeout)).then(Err(FetchError::NotFound));
    let strategy: Composite<String, FetchError> = compose([
        max_attempts(10).into(),
        RetryIf::retryable().into(),
        fixed_delay(Duration::from_millis(20)).into(),
    ]);

    let report = recorded(strategy, &sleeper).run(|| script.call()).unwrap();

    assert_eq!(report.attempts, 2);
    assert_eq!(report.outcome, Outcome::Failure(FetchError::NotFound));
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(20)]);
}

#[test]
fn test_retry_if_with_predicate() {
    let sleeper = RecordingSleeper::new();
    let script = Script::fail_times(3, "503", 200u16);
    let strategy: Composite<u16, &str> = compose([
        max_attempts(5).into(),
        RetryIf::new(|status: &&str| status.starts_with('5')).into(),
    ]);

    let report = recorded(strategy, &sleeper).run(|| script.call()).unwrap();

    assert_success!(report.outcome.clone());
    assert_eq!(report.attempts, 4);
    assert_eq!(sleeper.count(), 3);
}

#[test]
fn test_io_errors_classified_by_kind() {
    let calls = AtomicU32::new(0);
    let sleeper = RecordingSleeper::new();
    let strategy: Composite<(), io::Error> =
        compose([max_attempts(5).into(), RetryIf::retryable().into()]);

    let report = recorded(strategy, &sleeper)
        .run(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let kind = if n == 0 {
                io::ErrorKind::ConnectionReset
            } else {
                io::ErrorKind::PermissionDenied
            };
            Err(io::Error::from(kind))
        })
        .unwrap();

    assert_eq!(report.attempts, 2);
    assert_failure!(report.outcome);
}

#[test]
fn test_linear_and_fibonacci_waits() {
    let linear = RecordingSleeper::new();
    let strategy: Composite<(), &str> = compose([
        max_attempts(4).into(),
        LinearBackoff::new(Duration::from_millis(10)).into(),
    ]);
    recorded(strategy, &linear).run(|| Err("down")).unwrap();
    assert_eq!(
        linear.delays(),
        [10, 20, 30].map(Duration::from_millis).to_vec()
    );

    let fib = RecordingSleeper::new();
    let strategy: Composite<(), &str> = compose([
        max_attempts(6).into(),
        FibonacciBackoff::new(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(40))
            .into(),
    ]);
    recorded(strategy, &fib).run(|| Err("down")).unwrap();
    assert_eq!(
        fib.delays(),
        [10, 10, 20, 30, 40].map(Duration::from_millis).to_vec()
    );
}

#[test]
fn test_hooks_observe_but_do_not_steer() {
    let sleeper = RecordingSleeper::new();
    let probe = HookProbe::new();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let log = errors.clone();

    let hooks = probe.hooks().on_failure(move |ctx| {
        if let Some(err) = ctx.failure() {
            log.lock().unwrap().push(format!("#{}: {}", ctx.attempt, err));
        }
        Ok(())
    });

    let executor = Executor::builder(MaxAttempts::new(3))
        .hooks(hooks)
        .sleeper(sleeper.clone())
        .build()
        .unwrap();
    let report = executor.run(|| Err::<(), _>("refused")).unwrap();

    assert_eq!(report.attempts, 3);
    assert_eq!(probe.failure_count(), 3);
    assert_eq!(
        *errors.lock().unwrap(),
        vec!["#1: refused", "#2: refused", "#3: refused"]
    );
}

#[test]
fn test_hook_error_is_reported_with_source() {
    let hooks = HookSet::new().on_before(|b| {
        if b.attempt > 1 {
            Err(io::Error::other("metrics sink full").into())
        } else {
            Ok(())
        }
    });

    let err = execute(|| Err::<(), _>("down"), MaxAttempts::new(5), hooks).unwrap_err();

    assert!(err.is_hook_failure());
    assert_eq!(
        err.to_string(),
        "before hook failed on attempt 2: metrics sink full"
    );
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), "metrics sink full");
}

#[test]
fn test_hook_trace_for_success_after_retry() {
    let sleeper = RecordingSleeper::new();
    let probe = HookProbe::new();
    let script = Script::fail_times(1, "busy", "ok");

    let executor = Executor::builder(compose([
        max_attempts(3).into(),
        fixed_delay(Duration::from_millis(5)).into(),
    ]))
    .hooks(probe.hooks())
    .sleeper(sleeper)
    .build()
    .unwrap();

    let outcome = executor.run(|| script.call()).unwrap().into_outcome();

    assert_eq!(outcome, Outcome::Success("ok"));
    assert_eq!(
        probe.events(),
        vec![
            (HookPhase::Before, 1),
            (HookPhase::Failure, 1),
            (HookPhase::Before, 2),
            (HookPhase::Success, 2),
        ]
    );
}

#[test]
fn test_concurrent_executions_share_executor() {
    let executor = Arc::new(
        Executor::builder(compose([
            max_attempts(3).into(),
            fixed_delay(Duration::from_millis(1)).into(),
        ]))
        .build()
        .unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let executor = executor.clone();
            std::thread::spawn(move || {
                let script = Script::fail_times(i, "busy", i);
                executor.run(|| script.call()).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let report = handle.join().unwrap();
        if i < 3 {
            assert_eq!(report.outcome, Outcome::Success(i));
            assert_eq!(report.attempts, i as u32 + 1);
        } else {
            assert_eq!(report.outcome, Outcome::Failure("busy"));
            assert_eq!(report.attempts, 3);
        }
    }
}

#[test]
fn test_invalid_float_delay_rejected() {
    use steadfast::strategy::{ExponentialBackoff, FixedDelay};

    assert_eq!(
        FixedDelay::from_secs_f64(-1.0).unwrap_err(),
        ContractViolation::InvalidDelay { secs: -1.0 }
    );
    assert!(ExponentialBackoff::from_secs_f64(0.1, 2, f64::INFINITY).is_err());
    assert!(FixedDelay::from_secs_f64(0.25).is_ok());
}

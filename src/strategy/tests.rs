use super::*;
use crate::outcome::Outcome;
use std::sync::atomic::{AtomicU32, Ordering};

type Ctx<'a> = AttemptContext<'a, i32, &'static str>;

const FAILED: Outcome<i32, &str> = Outcome::Failure("down");

/// Fixed verdict, counts how often it was asked.
#[derive(Debug, Default)]
struct Probe {
    verdict: Option<Duration>,
    queried: Arc<AtomicU32>,
}

impl Probe {
    fn retry(delay: Duration) -> Self {
        Self {
            verdict: Some(delay),
            queried: Arc::default(),
        }
    }

    fn stop() -> Self {
        Self::default()
    }
}

impl<T, E> Strategy<T, E> for Probe {
    fn decide(&self, _: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
        self.queried.fetch_add(1, Ordering::SeqCst);
        Ok(match self.verdict {
            Some(delay) => Decision::Retry(delay),
            None => Decision::Stop,
        })
    }
}

struct Rejects;

impl<T, E> Strategy<T, E> for Rejects {
    fn decide(&self, _: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
        Ok(Decision::Stop)
    }

    fn validate(&self) -> Result<(), ContractViolation> {
        Err(ContractViolation::Custom("rejected".into()))
    }
}

fn decide_at(strategy: &impl Strategy<i32, &'static str>, attempt: u32) -> Decision {
    strategy.decide(&Ctx::new(attempt, &FAILED)).unwrap()
}

mod composite_tests {
    use super::*;

    #[test]
    fn test_first_stop_short_circuits() {
        let later = Probe::retry(Duration::from_millis(50));
        let queried = later.queried.clone();
        let strategy = compose([max_attempts(3).into(), Policy::custom(later)]);

        assert_eq!(decide_at(&strategy, 3), Decision::Stop);
        assert_eq!(queried.load(Ordering::SeqCst), 0);

        assert_eq!(
            decide_at(&strategy, 2),
            Decision::Retry(Duration::from_millis(50))
        );
        assert_eq!(queried.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_longest_delay_wins() {
        let strategy: Composite<i32, &str> = Composite::new()
            .with(fixed_delay(Duration::from_millis(10)))
            .with(fixed_delay(Duration::from_millis(40)))
            .with(max_attempts(10));

        assert_eq!(
            decide_at(&strategy, 1),
            Decision::Retry(Duration::from_millis(40))
        );
    }

    #[test]
    fn test_empty_composite_stops() {
        let strategy: Composite<i32, &str> = compose([]);
        assert!(strategy.is_empty());
        assert_eq!(decide_at(&strategy, 1), Decision::Stop);
    }

    #[test]
    fn test_success_stops_built_in_chain() {
        let strategy: Composite<i32, &str> = compose([
            max_attempts(5).into(),
            fixed_delay(Duration::from_millis(10)).into(),
        ]);
        let ok = Outcome::Success(1);
        assert_eq!(
            strategy.decide(&Ctx::new(1, &ok)),
            Ok(Decision::Stop)
        );
    }

    #[test]
    fn test_zero_attempt_is_violation() {
        let strategy: Composite<i32, &str> = compose([]);
        assert_eq!(
            strategy.decide(&Ctx::new(0, &FAILED)),
            Err(ContractViolation::ZeroAttempt)
        );
    }

    #[test]
    fn test_nested_composites() {
        let inner: Composite<i32, &str> = compose([
            max_attempts(4).into(),
            fixed_delay(Duration::from_millis(5)).into(),
        ]);
        let outer = compose([inner.into(), fixed_delay(Duration::from_millis(20)).into()]);

        assert_eq!(
            decide_at(&outer, 1),
            Decision::Retry(Duration::from_millis(20))
        );
        assert_eq!(decide_at(&outer, 4), Decision::Stop);
    }

    #[test]
    fn test_validate_reports_first_invalid_child() {
        let strategy: Composite<i32, &str> = compose([
            fixed_delay(Duration::from_millis(1)).into(),
            max_attempts(0).into(),
            Policy::custom(Rejects),
        ]);
        assert_eq!(
            Strategy::<i32, &str>::validate(&strategy),
            Err(ContractViolation::ZeroMaxAttempts)
        );
    }

    #[test]
    fn test_debug_lists_children() {
        let strategy: Composite<i32, &str> =
            compose([max_attempts(2).into(), Policy::custom(Probe::stop())]);
        let debug = format!("{:?}", strategy);
        assert!(debug.contains("MaxAttempts"));
        assert!(debug.contains("Custom(..)"));
    }
}

mod policy_tests {
    use super::*;

    #[test]
    fn test_policy_dispatches_to_built_in() {
        let policy: Policy<i32, &str> =
            exponential_backoff(Duration::from_millis(100), 2, Duration::from_secs(1)).into();
        assert_eq!(
            decide_at(&policy, 3),
            Decision::Retry(Duration::from_millis(400))
        );
    }

    #[test]
    fn test_custom_policy_validates() {
        let policy: Policy<i32, &str> = Policy::custom(Rejects);
        assert_eq!(
            Strategy::<i32, &str>::validate(&policy),
            Err(ContractViolation::Custom("rejected".into()))
        );
    }

    #[test]
    fn test_boxed_and_shared_strategies() {
        let boxed: Box<dyn Strategy<i32, &str>> = Box::new(max_attempts(2));
        assert_eq!(decide_at(&boxed, 1), Decision::RETRY_NOW);

        let shared = Arc::new(fixed_delay(Duration::from_secs(1)));
        assert_eq!(decide_at(&shared, 9), Decision::Retry(Duration::from_secs(1)));
    }

    #[test]
    fn test_decision_accessors() {
        assert!(Decision::RETRY_NOW.is_retry());
        assert_eq!(Decision::RETRY_NOW.delay(), Some(Duration::ZERO));
        assert!(Decision::Stop.is_stop());
        assert_eq!(Decision::Stop.delay(), None);
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_jittered_policy_in_composite() {
        let jittered: Policy<i32, &str> =
            Jitter::full(Policy::from(fixed_delay(Duration::from_millis(100))))
                .with_seed(11)
                .into();
        let strategy = compose([max_attempts(3).into(), jittered]);

        match decide_at(&strategy, 1) {
            Decision::Retry(d) => assert!(d <= Duration::from_millis(100)),
            Decision::Stop => panic!("expected retry"),
        }
        assert_eq!(decide_at(&strategy, 3), Decision::Stop);
    }
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn child(verdict: Option<u64>) -> Policy<i32, &'static str> {
        match verdict {
            Some(ms) => Policy::custom(Probe::retry(Duration::from_millis(ms))),
            None => Policy::custom(Probe::stop()),
        }
    }

    proptest! {
        #[test]
        fn stop_or_retry_is_order_independent(
            verdicts in prop::collection::vec(prop::option::of(0u64..1_000), 1..8),
            attempt in 1u32..100,
        ) {
            let forward: Composite<i32, &str> = verdicts.iter().copied().map(child).collect();
            let backward: Composite<i32, &str> =
                verdicts.iter().rev().copied().map(child).collect();

            let a = decide_at(&forward, attempt);
            let b = decide_at(&backward, attempt);
            prop_assert_eq!(a, b);

            let expected = if verdicts.iter().any(Option::is_none) {
                Decision::Stop
            } else {
                let longest = verdicts.iter().flatten().copied().max().unwrap_or(0);
                Decision::Retry(Duration::from_millis(longest))
            };
            prop_assert_eq!(a, expected);
        }

        #[test]
        fn exponential_delay_never_exceeds_cap(
            base_ms in 0u64..10_000,
            factor in 1u32..10,
            cap_ms in 0u64..60_000,
            attempt in 1u32..200,
        ) {
            let cap = Duration::from_millis(cap_ms);
            let strategy = exponential_backoff(Duration::from_millis(base_ms), factor, cap);
            prop_assert!(strategy.delay_for_attempt(attempt) <= cap);
        }

        #[test]
        fn max_attempts_retries_exactly_below_budget(n in 1u32..50, attempt in 1u32..100) {
            let decision = decide_at(&max_attempts(n), attempt);
            prop_assert_eq!(decision.is_retry(), attempt < n);
        }
    }
}

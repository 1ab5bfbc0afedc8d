//! Chaining strategies under the "first stop wins, longest delay" rule.

use std::fmt;
use std::time::Duration;

use super::{Decision, Policy, Strategy};
use crate::context::AttemptContext;
use crate::error::ContractViolation;

/// An ordered chain of strategies acting as one.
///
/// Children are queried in declaration order:
///
/// - the first child returning `Stop` ends the query and the composite stops;
///   later children are not asked
/// - if every child returns `Retry`, the composite retries after the longest
///   of their delays, so every child's minimum wait is honored
/// - an empty composite stops immediately
///
/// Whether the composite stops or retries does not depend on child order.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use steadfast::{AttemptContext, Decision, Outcome, Strategy};
/// use steadfast::strategy::{Composite, FixedDelay, MaxAttempts};
///
/// let strategy = Composite::new()
///     .with(MaxAttempts::new(3))
///     .with(FixedDelay::new(Duration::from_millis(50)));
///
/// let failed = Outcome::<(), &str>::Failure("down");
/// assert_eq!(
///     strategy.decide(&AttemptContext::new(1, &failed)),
///     Ok(Decision::Retry(Duration::from_millis(50)))
/// );
/// assert_eq!(strategy.decide(&AttemptContext::new(3, &failed)), Ok(Decision::Stop));
/// ```
pub struct Composite<T, E> {
    children: Vec<Policy<T, E>>,
}

impl<T, E> Composite<T, E> {
    /// Create an empty composite.
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
        }
    }

    /// Append a child strategy. The composite takes ownership of it.
    pub fn with<S>(mut self, strategy: S) -> Self
    where
        S: Into<Policy<T, E>>,
    {
        self.children.push(strategy.into());
        self
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if the composite has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Children in declaration order.
    pub fn children(&self) -> &[Policy<T, E>] {
        &self.children
    }
}

impl<T, E> Default for Composite<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> FromIterator<Policy<T, E>> for Composite<T, E> {
    fn from_iter<I: IntoIterator<Item = Policy<T, E>>>(iter: I) -> Self {
        Self {
            children: iter.into_iter().collect(),
        }
    }
}

impl<T, E> Strategy<T, E> for Composite<T, E> {
    fn decide(&self, ctx: &AttemptContext<'_, T, E>) -> Result<Decision, ContractViolation> {
        if ctx.attempt == 0 {
            return Err(ContractViolation::ZeroAttempt);
        }
        if self.children.is_empty() {
            return Ok(Decision::Stop);
        }

        let mut delay = Duration::ZERO;
        for child in &self.children {
            match child.decide(ctx)? {
                Decision::Stop => return Ok(Decision::Stop),
                Decision::Retry(d) => delay = delay.max(d),
            }
        }
        Ok(Decision::Retry(delay))
    }

    fn validate(&self) -> Result<(), ContractViolation> {
        self.children
            .iter()
            .try_for_each(|child| Strategy::<T, E>::validate(child))
    }
}

impl<T, E> fmt::Debug for Composite<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Composite").field(&self.children).finish()
    }
}

//! The result of a single attempt.
//!
//! Every invocation of the wrapped operation produces exactly one [`Outcome`].
//! It is the only value strategies and hooks inspect, so the executor builds it
//! at a single boundary: the point where the operation returns.
//!
//! # Examples
//!
//! ```
//! use steadfast::Outcome;
//!
//! let ok: Outcome<i32, &str> = Outcome::from(Ok(42));
//! let err: Outcome<i32, &str> = Outcome::from(Err("timeout"));
//!
//! assert!(ok.is_success());
//! assert_eq!(err.failure(), Some(&"timeout"));
//! ```

/// Success payload or classified failure of one attempt.
///
/// Outcomes are immutable once built. Use [`Outcome::into_result`] to get back
/// to a plain `Result` when the execution is done.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome<T, E> {
    /// The operation returned a value.
    Success(T),
    /// The operation returned an error.
    Failure(E),
}

impl<T, E> Outcome<T, E> {
    /// Returns `true` if the attempt succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Returns `true` if the attempt failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Borrow the success payload, if any.
    pub fn success(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// Borrow the failure, if any.
    pub fn failure(&self) -> Option<&E> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }

    /// Convert `&Outcome<T, E>` into `Outcome<&T, &E>`.
    pub fn as_ref(&self) -> Outcome<&T, &E> {
        match self {
            Outcome::Success(value) => Outcome::Success(value),
            Outcome::Failure(error) => Outcome::Failure(error),
        }
    }

    /// Transform the success payload.
    pub fn map<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(error) => Outcome::Failure(error),
        }
    }

    /// Transform the failure.
    pub fn map_err<E2, F>(self, f: F) -> Outcome<T, E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Outcome::Success(value) => Outcome::Success(value),
            Outcome::Failure(error) => Outcome::Failure(f(error)),
        }
    }

    /// Convert into a standard `Result`.
    ///
    /// ```
    /// use steadfast::Outcome;
    ///
    /// let outcome = Outcome::<_, String>::Success(7);
    /// assert_eq!(outcome.into_result(), Ok(7));
    /// ```
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(error) => Err(error),
        }
    }
}

impl<T, E: Retryable> Outcome<T, E> {
    /// Returns `true` if this is a failure its error type classifies as retryable.
    pub fn is_retryable_failure(&self) -> bool {
        self.failure().is_some_and(Retryable::is_retryable)
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(error) => Outcome::Failure(error),
        }
    }
}

impl<T, E> From<Outcome<T, E>> for Result<T, E> {
    fn from(outcome: Outcome<T, E>) -> Self {
        outcome.into_result()
    }
}

/// Classification of operation errors as worth retrying or not.
///
/// Implement this for your error type and use
/// [`RetryIf::retryable`](crate::strategy::RetryIf::retryable) to stop at the
/// first permanent failure.
///
/// ```
/// use steadfast::Retryable;
///
/// #[derive(Debug)]
/// enum FetchError {
///     Timeout,
///     NotFound,
/// }
///
/// impl Retryable for FetchError {
///     fn is_retryable(&self) -> bool {
///         matches!(self, FetchError::Timeout)
///     }
/// }
///
/// assert!(FetchError::Timeout.is_retryable());
/// assert!(!FetchError::NotFound.is_retryable());
/// ```
pub trait Retryable {
    /// Returns `true` if a later attempt may succeed.
    fn is_retryable(&self) -> bool;
}

impl Retryable for std::io::Error {
    fn is_retryable(&self) -> bool {
        use std::io::ErrorKind;
        matches!(
            self.kind(),
            ErrorKind::Interrupted
                | ErrorKind::WouldBlock
                | ErrorKind::TimedOut
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::ConnectionRefused
        )
    }
}

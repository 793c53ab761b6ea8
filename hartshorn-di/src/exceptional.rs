//! [Exceptional] is the outcome of an operation which might legitimately produce nothing, or fail
//! in a recoverable way. It is used in place of `Option` and `Result` at the resolution boundary,
//! since callers usually need to distinguish all three cases:
//!
//! * [Exceptional::Present] - a value is available
//! * [Exceptional::Absent] - nothing is available, which is not an error by itself (e.g. no binding
//! registered for a key)
//! * [Exceptional::Failed] - producing the value failed and the cause is captured as data
//!
//! ```
//! use hartshorn_di::exceptional::Exceptional;
//!
//! let port = Exceptional::of(Some("8080"))
//!     .flat_map(|port| Exceptional::from_result(port.parse::<u16>()))
//!     .or_else(80);
//!
//! assert_eq!(port, 8080);
//! ```

use crate::error::{CapturedPanic, ResolutionError};
use crate::instance_provider::{error_ptr, ErrorPtr};
use crate::key::Key;
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// A container holding exactly one of: a value, nothing, or a failure cause.
#[derive(Clone, Debug)]
pub enum Exceptional<T> {
    Present(T),
    Absent,
    Failed(ErrorPtr),
}

impl<T> Default for Exceptional<T> {
    #[inline]
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Exceptional<T> {
    /// Converts an `Option` into a present or absent value.
    #[inline]
    pub fn of(value: Option<T>) -> Self {
        value.map(Self::Present).unwrap_or(Self::Absent)
    }

    /// Creates a failed value with given cause.
    #[inline]
    pub fn failed<E: Error + Send + Sync + 'static>(cause: E) -> Self {
        Self::Failed(error_ptr(cause))
    }

    /// Converts a `Result` into a present or failed value.
    #[inline]
    pub fn from_result<E: Error + Send + Sync + 'static>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Present(value),
            Err(error) => Self::failed(error),
        }
    }

    /// Runs given function, capturing both returned errors and panics as the failure cause. Never
    /// resumes the panic.
    pub fn capture<F: FnOnce() -> Result<T, ErrorPtr>>(f: F) -> Self {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => Self::Present(value),
            Ok(Err(cause)) => Self::Failed(cause),
            Err(payload) => Self::failed(CapturedPanic::from_payload(payload)),
        }
    }

    #[inline]
    pub fn present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    #[inline]
    pub fn absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[inline]
    pub fn failed_state(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the captured failure, if any.
    #[inline]
    pub fn cause(&self) -> Option<&ErrorPtr> {
        match self {
            Self::Failed(cause) => Some(cause),
            _ => None,
        }
    }

    /// Returns the captured failure downcast to a concrete error type, if it is one.
    pub fn cause_as<E: Error + 'static>(&self) -> Option<&E> {
        self.cause().and_then(|cause| cause.downcast_ref::<E>())
    }

    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Exceptional<U> {
        match self {
            Self::Present(value) => Exceptional::Present(f(value)),
            Self::Absent => Exceptional::Absent,
            Self::Failed(cause) => Exceptional::Failed(cause),
        }
    }

    #[inline]
    pub fn flat_map<U, F: FnOnce(T) -> Exceptional<U>>(self, f: F) -> Exceptional<U> {
        match self {
            Self::Present(value) => f(value),
            Self::Absent => Exceptional::Absent,
            Self::Failed(cause) => Exceptional::Failed(cause),
        }
    }

    /// Turns a present value into absence when it doesn't satisfy the predicate.
    pub fn filter<F: FnOnce(&T) -> bool>(self, predicate: F) -> Self {
        match self {
            Self::Present(value) if !predicate(&value) => Self::Absent,
            other => other,
        }
    }

    /// Calls given function with a reference to the present value.
    pub fn peek<F: FnOnce(&T)>(self, f: F) -> Self {
        if let Self::Present(value) = &self {
            f(value);
        }

        self
    }

    /// Calls given function when there is no value and no cause.
    pub fn on_absent<F: FnOnce()>(self, f: F) -> Self {
        if self.absent() {
            f();
        }

        self
    }

    /// Replaces absence with the result of given function. Failures are kept.
    pub fn or_else_try<F: FnOnce() -> Exceptional<T>>(self, f: F) -> Self {
        match self {
            Self::Absent => f(),
            other => other,
        }
    }

    /// Returns the value, or the default when absent or failed.
    #[inline]
    pub fn or_else(self, default: T) -> T {
        match self {
            Self::Present(value) => value,
            _ => default,
        }
    }

    #[inline]
    pub fn or_else_get<F: FnOnce() -> T>(self, f: F) -> T {
        match self {
            Self::Present(value) => value,
            _ => f(),
        }
    }

    #[inline]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Present(value) => Some(value),
            _ => None,
        }
    }

    /// Converts into a `Result`, where absence becomes `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, ErrorPtr> {
        match self {
            Self::Present(value) => Ok(Some(value)),
            Self::Absent => Ok(None),
            Self::Failed(cause) => Err(cause),
        }
    }

    /// Treats absence as an error for a capability declared mandatory by the caller.
    pub fn required(self, key: &Key) -> Result<T, ErrorPtr> {
        match self {
            Self::Present(value) => Ok(value),
            Self::Absent => Err(error_ptr(ResolutionError::MissingMandatory(key.clone()))),
            Self::Failed(cause) => Err(cause),
        }
    }
}

impl<T> From<Option<T>> for Exceptional<T> {
    #[inline]
    fn from(value: Option<T>) -> Self {
        Self::of(value)
    }
}

impl<T> From<Result<T, ErrorPtr>> for Exceptional<T> {
    #[inline]
    fn from(value: Result<T, ErrorPtr>) -> Self {
        match value {
            Ok(value) => Self::Present(value),
            Err(cause) => Self::Failed(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{CapturedPanic, ResolutionError};
    use crate::exceptional::Exceptional;
    use crate::key::Key;
    use std::num::ParseIntError;

    #[test]
    fn should_default_to_absent() {
        let value = Exceptional::<i8>::default();
        assert!(value.absent());
        assert!(!value.present());
        assert!(value.cause().is_none());
    }

    #[test]
    fn should_short_circuit_absence_and_failure() {
        let absent = Exceptional::<i8>::Absent.map(|value| value + 1);
        assert!(absent.absent());

        let failed = Exceptional::<i8>::from_result("x".parse::<i8>())
            .map(|value| value + 1)
            .flat_map(|value| Exceptional::Present(value * 2));
        assert!(failed.cause_as::<ParseIntError>().is_some());

        let present = Exceptional::Present(1).flat_map(|value| Exceptional::Present(value + 1));
        assert_eq!(present.get(), Some(&2));
    }

    #[test]
    fn should_fall_back_to_default() {
        assert_eq!(Exceptional::Absent.or_else(5), 5);
        assert_eq!(Exceptional::Present(1).or_else(5), 1);
        assert_eq!(
            Exceptional::<i8>::failed(CapturedPanic("x".to_string())).or_else_get(|| 3),
            3
        );
        assert_eq!(Exceptional::Present(2).filter(|value| *value > 5).or_else(0), 0);
    }

    #[test]
    fn should_capture_panics() {
        let result = Exceptional::<i8>::capture(|| panic!("boom"));
        assert_eq!(result.cause_as::<CapturedPanic>().unwrap().0, "boom");
    }

    #[test]
    fn should_upgrade_absence_when_required() {
        let key = Key::of::<i8>();
        let error = Exceptional::<i8>::Absent.required(&key).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<ResolutionError>(),
            Some(ResolutionError::MissingMandatory(missing)) if *missing == key
        ));
    }
}

//! Predicates over opaque errors.
//!
//! An [`ErrorMatcher`] decides whether an error belongs to some category. Matchers
//! are registered once at startup and evaluated concurrently by every request, so
//! they must be `Send + Sync` and must never panic.

use std::error::Error;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::DynError;

/// A predicate for errors.
pub trait ErrorMatcher: Send + Sync {
    /// Evaluates the predicate for `err`.
    fn match_error(&self, err: &DynError) -> bool;
}

impl<M: ErrorMatcher + ?Sized> ErrorMatcher for &M {
    fn match_error(&self, err: &DynError) -> bool {
        (**self).match_error(err)
    }
}

impl<M: ErrorMatcher + ?Sized> ErrorMatcher for Box<M> {
    fn match_error(&self, err: &DynError) -> bool {
        (**self).match_error(err)
    }
}

impl<M: ErrorMatcher + ?Sized> ErrorMatcher for Arc<M> {
    fn match_error(&self, err: &DynError) -> bool {
        (**self).match_error(err)
    }
}

/// Turns a plain function into an [`ErrorMatcher`].
#[derive(Clone, Copy)]
#[must_use]
pub struct ErrorMatcherFn<F> {
    f: F,
}

impl<F> fmt::Debug for ErrorMatcherFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorMatcherFn").finish_non_exhaustive()
    }
}

impl<F> ErrorMatcher for ErrorMatcherFn<F>
where
    F: Fn(&DynError) -> bool + Send + Sync,
{
    fn match_error(&self, err: &DynError) -> bool {
        (self.f)(err)
    }
}

/// Build an [`ErrorMatcher`] from a closure.
///
/// ```
/// use errkit_errors::{ErrorMatcher, matcher_fn};
///
/// let not_found = matcher_fn(|err| err.to_string() == "not found");
/// let err: errkit_errors::BoxError = "not found".into();
/// assert!(not_found.match_error(err.as_ref()));
/// ```
pub fn matcher_fn<F>(f: F) -> ErrorMatcherFn<F>
where
    F: Fn(&DynError) -> bool + Send + Sync,
{
    ErrorMatcherFn { f }
}

/// Walk the `source()` chain of `err` and return the first cause of type `E`.
///
/// `err` itself is inspected first.
#[must_use]
pub fn find_cause<E: Error + 'static>(err: &DynError) -> Option<&E> {
    let root: &(dyn Error + 'static) = err;
    std::iter::successors(Some(root), |&e| e.source()).find_map(|e| e.downcast_ref::<E>())
}

/// Matches errors that are, or are caused by, an `E`.
pub struct IsError<E> {
    _marker: PhantomData<fn() -> E>,
}

impl<E> fmt::Debug for IsError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsError")
            .field("type", &std::any::type_name::<E>())
            .finish()
    }
}

impl<E> Clone for IsError<E> {
    fn clone(&self) -> Self {
        is_error_marker()
    }
}

const fn is_error_marker<E>() -> IsError<E> {
    IsError {
        _marker: PhantomData,
    }
}

impl<E: Error + 'static> ErrorMatcher for IsError<E> {
    fn match_error(&self, err: &DynError) -> bool {
        find_cause::<E>(err).is_some()
    }
}

/// Matcher accepting any error whose chain contains an `E`.
#[must_use]
pub fn is_error<E: Error + 'static>() -> IsError<E> {
    is_error_marker()
}

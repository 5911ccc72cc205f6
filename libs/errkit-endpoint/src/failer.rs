//! The failer convention.
//!
//! Expected business failures are often better treated as regular responses: they
//! flow through the same encoder as successes, which then renders them as a
//! problem. [`FailerMiddleware`] moves errors accepted by a matcher from the error
//! channel into the response, leaving every other outcome untouched.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use errkit_errors::{BoxError, DynError, ErrorMatcher, RequestCtx};

use crate::endpoint::{BoxEndpoint, Endpoint, Middleware};

/// A response that may represent a logical failure.
pub trait Failer {
    /// The failure carried by this response, if any.
    fn failed(&self) -> Option<&DynError>;
}

/// A response type that can carry a failure.
pub trait FromFailure {
    fn from_failure(err: BoxError) -> Self;
}

/// A response that either succeeded or carries the error that failed it.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Failed(BoxError),
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    #[must_use]
    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    /// Move the failure back into the error channel.
    ///
    /// # Errors
    /// Returns the carried error for a failed outcome.
    pub fn into_result(self) -> Result<T, BoxError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failed(err) => Err(err),
        }
    }
}

impl<T> From<T> for Outcome<T> {
    fn from(value: T) -> Self {
        Self::Success(value)
    }
}

impl<T> Failer for Outcome<T> {
    fn failed(&self) -> Option<&DynError> {
        match self {
            Self::Success(_) => None,
            Self::Failed(err) => Some(err.as_ref()),
        }
    }
}

impl<T> FromFailure for Outcome<T> {
    fn from_failure(err: BoxError) -> Self {
        Self::Failed(err)
    }
}

/// Serializes the success value transparently. A failed outcome is not data and
/// refuses to serialize; encoders are expected to dispatch on [`Failer`] first.
#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for Outcome<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success(value) => value.serialize(serializer),
            Self::Failed(err) => Err(serde::ser::Error::custom(format_args!(
                "cannot serialize failed outcome: {err}"
            ))),
        }
    }
}

/// Turns matching errors into failed responses.
///
/// If the wrapped endpoint returns an error and the matcher accepts it, the error
/// is moved, unchanged, into `Resp::from_failure` and the call succeeds. Anything
/// else is returned exactly as the endpoint produced it.
#[must_use]
pub struct FailerMiddleware<M> {
    matcher: Arc<M>,
}

impl<M> FailerMiddleware<M> {
    pub fn new(matcher: M) -> Self {
        Self {
            matcher: Arc::new(matcher),
        }
    }
}

impl<M> Clone for FailerMiddleware<M> {
    fn clone(&self) -> Self {
        Self {
            matcher: self.matcher.clone(),
        }
    }
}

impl<M: fmt::Debug> fmt::Debug for FailerMiddleware<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailerMiddleware")
            .field("matcher", &self.matcher)
            .finish()
    }
}

impl<M, Req, Resp> Middleware<Req, Resp> for FailerMiddleware<M>
where
    M: ErrorMatcher + 'static,
    Req: 'static,
    Resp: FromFailure + Send + 'static,
{
    fn layer(&self, next: BoxEndpoint<Req, Resp>) -> BoxEndpoint<Req, Resp> {
        Arc::new(FailerEndpoint {
            next,
            matcher: self.matcher.clone(),
        })
    }
}

struct FailerEndpoint<M, Req, Resp> {
    next: BoxEndpoint<Req, Resp>,
    matcher: Arc<M>,
}

impl<M, Req, Resp> Endpoint<Req, Resp> for FailerEndpoint<M, Req, Resp>
where
    M: ErrorMatcher + 'static,
    Req: 'static,
    Resp: FromFailure + Send + 'static,
{
    fn call(&self, ctx: RequestCtx, req: Req) -> BoxFuture<'static, Result<Resp, BoxError>> {
        let fut = self.next.call(ctx, req);
        let matcher = self.matcher.clone();
        Box::pin(async move {
            match fut.await {
                Err(err) if matcher.match_error(err.as_ref()) => {
                    tracing::debug!(error = %err, "endpoint error converted to failed response");
                    Ok(Resp::from_failure(err))
                }
                other => other,
            }
        })
    }
}

/// An error that knows whether it is an expected business failure.
pub trait BusinessError: Error + 'static {
    fn is_business_error(&self) -> bool;
}

type Probe = fn(&(dyn Error + 'static)) -> Option<bool>;

fn probe<B: BusinessError>(err: &(dyn Error + 'static)) -> Option<bool> {
    err.downcast_ref::<B>().map(B::is_business_error)
}

/// Matches errors that report themselves as business errors.
///
/// Each [`BusinessError`] type must be registered. The `source()` chain is walked
/// from the outermost error, and the first error of a registered type decides.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct BusinessErrorMatcher {
    probes: Vec<Probe>,
}

impl BusinessErrorMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<B: BusinessError>(mut self) -> Self {
        self.probes.push(probe::<B>);
        self
    }
}

impl ErrorMatcher for BusinessErrorMatcher {
    fn match_error(&self, err: &DynError) -> bool {
        let root: &(dyn Error + 'static) = err;
        std::iter::successors(Some(root), |&e| e.source())
            .find_map(|e| self.probes.iter().find_map(|probe| probe(e)))
            .unwrap_or(false)
    }
}

/// [`FailerMiddleware`] accepting self-reported business errors.
pub fn business_error_middleware(
    matcher: BusinessErrorMatcher,
) -> FailerMiddleware<BusinessErrorMatcher> {
    FailerMiddleware::new(matcher)
}

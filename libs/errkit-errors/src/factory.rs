//! Matcher-driven problem resolution.
//!
//! [`ProblemResolver`] turns an opaque error into a [`Problem`] by scanning an
//! ordered list of [`ProblemMatcher`]s. **Order is significant: the first matcher
//! that accepts the error wins** and matchers after it are never evaluated.
//!
//! Each matcher carries optional capabilities which decide how the problem is built,
//! in this priority:
//!
//! 1. a custom [`ProblemFactory`] builds the whole problem;
//! 2. a status code, together with a custom [`StatusProblemFactory`], builds it with
//!    that status;
//! 3. a status code alone uses the configured status-aware factory;
//! 4. no capability uses the configured generic factory.
//!
//! When nothing matches, the configured fallback problem is returned as is. Without
//! a fallback, a `500` problem with the detail `"something went wrong"` is built so
//! that internal error text never leaks by default.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;

use crate::DynError;
use crate::config::{ConfigError, ProblemsConfig};
use crate::context::RequestCtx;
use crate::matcher::ErrorMatcher;
use crate::problem::Problem;

/// Detail used when no matcher accepts an error.
pub const GENERIC_DETAIL: &str = "something went wrong";

/// Creates a problem from an error.
///
/// Implementations must be total: an error that cannot be classified still yields a
/// (degraded) problem.
pub trait ProblemFactory: Send + Sync {
    fn new_problem(&self, ctx: &RequestCtx, err: &DynError) -> Problem;
}

/// Creates a problem with a known status from an error.
pub trait StatusProblemFactory: Send + Sync {
    fn new_status_problem(&self, ctx: &RequestCtx, status: u16, err: &DynError) -> Problem;
}

impl<F: ProblemFactory + ?Sized> ProblemFactory for Arc<F> {
    fn new_problem(&self, ctx: &RequestCtx, err: &DynError) -> Problem {
        (**self).new_problem(ctx, err)
    }
}

impl<F: StatusProblemFactory + ?Sized> StatusProblemFactory for Arc<F> {
    fn new_status_problem(&self, ctx: &RequestCtx, status: u16, err: &DynError) -> Problem {
        (**self).new_status_problem(ctx, status, err)
    }
}

/// Closure adapter for [`ProblemFactory`], see [`problem_factory_fn`].
#[derive(Clone, Copy)]
#[must_use]
pub struct ProblemFactoryFn<F> {
    f: F,
}

impl<F> fmt::Debug for ProblemFactoryFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemFactoryFn").finish_non_exhaustive()
    }
}

impl<F> ProblemFactory for ProblemFactoryFn<F>
where
    F: Fn(&RequestCtx, &DynError) -> Problem + Send + Sync,
{
    fn new_problem(&self, ctx: &RequestCtx, err: &DynError) -> Problem {
        (self.f)(ctx, err)
    }
}

pub fn problem_factory_fn<F>(f: F) -> ProblemFactoryFn<F>
where
    F: Fn(&RequestCtx, &DynError) -> Problem + Send + Sync,
{
    ProblemFactoryFn { f }
}

/// Closure adapter for [`StatusProblemFactory`], see [`status_problem_factory_fn`].
#[derive(Clone, Copy)]
#[must_use]
pub struct StatusProblemFactoryFn<F> {
    f: F,
}

impl<F> fmt::Debug for StatusProblemFactoryFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusProblemFactoryFn")
            .finish_non_exhaustive()
    }
}

impl<F> StatusProblemFactory for StatusProblemFactoryFn<F>
where
    F: Fn(&RequestCtx, u16, &DynError) -> Problem + Send + Sync,
{
    fn new_status_problem(&self, ctx: &RequestCtx, status: u16, err: &DynError) -> Problem {
        (self.f)(ctx, status, err)
    }
}

pub fn status_problem_factory_fn<F>(f: F) -> StatusProblemFactoryFn<F>
where
    F: Fn(&RequestCtx, u16, &DynError) -> Problem + Send + Sync,
{
    StatusProblemFactoryFn { f }
}

/// Builtin factory: the error message becomes the detail.
///
/// Without an explicit status the problem is a `500`. The request's trace id and
/// instance are attached when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetailedProblemFactory;

impl DetailedProblemFactory {
    pub(crate) fn annotate(ctx: &RequestCtx, mut problem: Problem) -> Problem {
        if let Some(instance) = ctx.instance() {
            problem = problem.with_instance(instance);
        }
        if let Some(trace_id) = ctx.trace_id() {
            problem = problem.with_trace_id(trace_id);
        }
        problem
    }
}

impl ProblemFactory for DetailedProblemFactory {
    fn new_problem(&self, ctx: &RequestCtx, err: &DynError) -> Problem {
        Self::annotate(
            ctx,
            Problem::new(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), err.to_string()),
        )
    }
}

impl StatusProblemFactory for DetailedProblemFactory {
    fn new_status_problem(&self, ctx: &RequestCtx, status: u16, err: &DynError) -> Problem {
        Self::annotate(ctx, Problem::new(status, err.to_string()))
    }
}

/// A matcher registered with the resolver, plus its optional capabilities.
///
/// Capabilities are explicit fields rather than extra trait impls. A status factory
/// is only consulted when a status is also present.
#[derive(Clone)]
#[must_use]
pub struct ProblemMatcher {
    matcher: Arc<dyn ErrorMatcher>,
    status: Option<u16>,
    factory: Option<Arc<dyn ProblemFactory>>,
    status_factory: Option<Arc<dyn StatusProblemFactory>>,
}

impl fmt::Debug for ProblemMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemMatcher")
            .field("status", &self.status)
            .field("factory", &self.factory.is_some())
            .field("status_factory", &self.status_factory.is_some())
            .finish_non_exhaustive()
    }
}

impl ProblemMatcher {
    /// A predicate-only matcher, handled by the generic factory.
    pub fn new(matcher: impl ErrorMatcher + 'static) -> Self {
        Self {
            matcher: Arc::new(matcher),
            status: None,
            factory: None,
            status_factory: None,
        }
    }

    /// A matcher that maps accepted errors to `status`.
    pub fn with_status(status: u16, matcher: impl ErrorMatcher + 'static) -> Self {
        Self::new(matcher).status(status)
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Let this matcher build the whole problem. Takes precedence over any status.
    pub fn factory(mut self, factory: impl ProblemFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Build problems for this matcher's status with a custom factory.
    pub fn status_factory(mut self, factory: impl StatusProblemFactory + 'static) -> Self {
        self.status_factory = Some(Arc::new(factory));
        self
    }

    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }
}

impl ErrorMatcher for ProblemMatcher {
    fn match_error(&self, err: &DynError) -> bool {
        self.matcher.match_error(err)
    }
}

/// Configures a [`ProblemResolver`].
///
/// Built once at startup. Unset factories default to [`DetailedProblemFactory`].
#[derive(Clone, Default)]
#[must_use]
pub struct ProblemFactoryConfig {
    /// Matchers in evaluation order. The first accepting matcher wins.
    pub matchers: Vec<ProblemMatcher>,
    /// Builds problems for matchers without a status.
    pub problem_factory: Option<Arc<dyn ProblemFactory>>,
    /// Builds problems for matchers with a status, and for unmatched errors.
    pub status_problem_factory: Option<Arc<dyn StatusProblemFactory>>,
    /// Returned verbatim when no matcher accepts an error.
    pub fallback_problem: Option<Problem>,
}

impl fmt::Debug for ProblemFactoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemFactoryConfig")
            .field("matchers", &self.matchers)
            .field("problem_factory", &self.problem_factory.is_some())
            .field("status_problem_factory", &self.status_problem_factory.is_some())
            .field("fallback_problem", &self.fallback_problem)
            .finish()
    }
}

impl ProblemFactoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matcher(mut self, matcher: ProblemMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn problem_factory(mut self, factory: impl ProblemFactory + 'static) -> Self {
        self.problem_factory = Some(Arc::new(factory));
        self
    }

    pub fn status_problem_factory(mut self, factory: impl StatusProblemFactory + 'static) -> Self {
        self.status_problem_factory = Some(Arc::new(factory));
        self
    }

    /// Use one factory for both the generic and the status-aware strategy.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: ProblemFactory + StatusProblemFactory + 'static,
    {
        let factory = Arc::new(factory);
        self.problem_factory = Some(factory.clone());
        self.status_problem_factory = Some(factory);
        self
    }

    pub fn fallback_problem(mut self, problem: Problem) -> Self {
        self.fallback_problem = Some(problem);
        self
    }

    /// Apply declarative settings on top of this configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the configured fallback problem is invalid.
    pub fn with_settings(mut self, settings: &ProblemsConfig) -> Result<Self, ConfigError> {
        if let Some(problem) = settings.fallback_problem()? {
            self.fallback_problem = Some(problem);
        }
        Ok(self)
    }
}

/// The problem resolution engine.
///
/// Immutable after construction; share it behind an `Arc` between requests.
#[derive(Clone)]
#[must_use]
pub struct ProblemResolver {
    matchers: Vec<ProblemMatcher>,
    problem_factory: Arc<dyn ProblemFactory>,
    status_problem_factory: Arc<dyn StatusProblemFactory>,
    fallback_problem: Option<Problem>,
}

impl fmt::Debug for ProblemResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemResolver")
            .field("matchers", &self.matchers)
            .field("fallback_problem", &self.fallback_problem)
            .finish_non_exhaustive()
    }
}

impl Default for ProblemResolver {
    /// No matchers and no fallback: every error becomes a generic `500`.
    fn default() -> Self {
        Self::new(ProblemFactoryConfig::default())
    }
}

/// Stand-in error carrying the generic detail for unmatched errors.
#[derive(Debug)]
struct GenericError;

impl fmt::Display for GenericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(GENERIC_DETAIL)
    }
}

impl std::error::Error for GenericError {}

impl ProblemResolver {
    pub fn new(config: ProblemFactoryConfig) -> Self {
        Self {
            matchers: config.matchers,
            problem_factory: config
                .problem_factory
                .unwrap_or_else(|| Arc::new(DetailedProblemFactory)),
            status_problem_factory: config
                .status_problem_factory
                .unwrap_or_else(|| Arc::new(DetailedProblemFactory)),
            fallback_problem: config.fallback_problem,
        }
    }

    /// The configured fallback problem, if any.
    #[must_use]
    pub fn fallback(&self) -> Option<&Problem> {
        self.fallback_problem.as_ref()
    }

    /// Resolve `err` into a problem.
    ///
    /// The fallback problem is returned borrowed, so callers observe the configured
    /// instance itself.
    pub fn resolve(&self, ctx: &RequestCtx, err: &DynError) -> Cow<'_, Problem> {
        let Some((index, matcher)) = self
            .matchers
            .iter()
            .enumerate()
            .find(|(_, m)| m.match_error(err))
        else {
            return self.unmatched(ctx, err);
        };

        tracing::debug!(
            matcher = index,
            status = matcher.status,
            operation = ctx.operation(),
            "problem matcher accepted error"
        );

        let problem = match (&matcher.factory, matcher.status, &matcher.status_factory) {
            (Some(factory), _, _) => factory.new_problem(ctx, err),
            (None, Some(status), Some(factory)) => factory.new_status_problem(ctx, status, err),
            (None, Some(status), None) => {
                self.status_problem_factory
                    .new_status_problem(ctx, status, err)
            }
            (None, None, _) => self.problem_factory.new_problem(ctx, err),
        };
        Cow::Owned(problem)
    }

    fn unmatched(&self, ctx: &RequestCtx, err: &DynError) -> Cow<'_, Problem> {
        tracing::debug!(
            error = %err,
            operation = ctx.operation(),
            fallback = self.fallback_problem.is_some(),
            "no problem matcher accepted error"
        );

        match &self.fallback_problem {
            Some(problem) => Cow::Borrowed(problem),
            None => Cow::Owned(self.status_problem_factory.new_status_problem(
                ctx,
                StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                &GenericError,
            )),
        }
    }
}

impl ProblemFactory for ProblemResolver {
    fn new_problem(&self, ctx: &RequestCtx, err: &DynError) -> Problem {
        self.resolve(ctx, err).into_owned()
    }
}

//! Endpoints and middleware composition.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use errkit_errors::{BoxError, RequestCtx};

/// A unit of business logic: `(ctx, request) -> Result<response, error>`.
///
/// The returned future owns everything it needs so that transports can drive it
/// on whatever task they like.
pub trait Endpoint<Req, Resp>: Send + Sync + 'static {
    fn call(&self, ctx: RequestCtx, req: Req) -> BoxFuture<'static, Result<Resp, BoxError>>;
}

/// Shared, type-erased endpoint.
pub type BoxEndpoint<Req, Resp> = Arc<dyn Endpoint<Req, Resp>>;

impl<Req, Resp, E> Endpoint<Req, Resp> for Arc<E>
where
    E: Endpoint<Req, Resp> + ?Sized,
{
    fn call(&self, ctx: RequestCtx, req: Req) -> BoxFuture<'static, Result<Resp, BoxError>> {
        (**self).call(ctx, req)
    }
}

/// Endpoint backed by an async closure, see [`endpoint_fn`].
#[derive(Clone, Copy)]
#[must_use]
pub struct EndpointFn<F> {
    f: F,
}

impl<F> fmt::Debug for EndpointFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointFn").finish_non_exhaustive()
    }
}

impl<F, Fut, Req, Resp> Endpoint<Req, Resp> for EndpointFn<F>
where
    F: Fn(RequestCtx, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, BoxError>> + Send + 'static,
{
    fn call(&self, ctx: RequestCtx, req: Req) -> BoxFuture<'static, Result<Resp, BoxError>> {
        Box::pin((self.f)(ctx, req))
    }
}

/// Build an endpoint from an async closure.
///
/// ```
/// use errkit_endpoint::{BoxError, Endpoint, RequestCtx, endpoint_fn};
///
/// let greet = endpoint_fn(|_ctx: RequestCtx, name: String| async move {
///     Ok::<_, BoxError>(format!("hello {name}"))
/// });
/// # let _ = greet.call(RequestCtx::new(), "bob".to_owned());
/// ```
pub fn endpoint_fn<F>(f: F) -> EndpointFn<F> {
    EndpointFn { f }
}

/// Wraps an endpoint into another endpoint.
///
/// Middlewares are stateless after construction. Plain closures of type
/// `Fn(BoxEndpoint) -> BoxEndpoint` are middlewares too.
pub trait Middleware<Req, Resp>: Send + Sync {
    fn layer(&self, next: BoxEndpoint<Req, Resp>) -> BoxEndpoint<Req, Resp>;
}

impl<Req, Resp, F> Middleware<Req, Resp> for F
where
    F: Fn(BoxEndpoint<Req, Resp>) -> BoxEndpoint<Req, Resp> + Send + Sync,
{
    fn layer(&self, next: BoxEndpoint<Req, Resp>) -> BoxEndpoint<Req, Resp> {
        self(next)
    }
}

/// An ordered composition of middlewares.
///
/// For `[m1, m2, m3]`, `layer(e)` behaves like `m1(m2(m3(e)))`: `m1` sees the call
/// first on the way in and last on the way out. An empty chain returns the endpoint
/// it was given.
#[must_use]
pub struct Chain<Req, Resp> {
    middlewares: Vec<Arc<dyn Middleware<Req, Resp>>>,
}

impl<Req, Resp> Chain<Req, Resp> {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Append `middleware` as the innermost layer so far.
    pub fn with(mut self, middleware: impl Middleware<Req, Resp> + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Wrap `endpoint` with every middleware of the chain.
    pub fn apply(&self, endpoint: impl Endpoint<Req, Resp>) -> BoxEndpoint<Req, Resp> {
        self.layer(Arc::new(endpoint))
    }
}

impl<Req, Resp> Default for Chain<Req, Resp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Resp> Clone for Chain<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            middlewares: self.middlewares.clone(),
        }
    }
}

impl<Req, Resp> fmt::Debug for Chain<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

impl<Req, Resp> Middleware<Req, Resp> for Chain<Req, Resp> {
    fn layer(&self, next: BoxEndpoint<Req, Resp>) -> BoxEndpoint<Req, Resp> {
        // innermost first
        self.middlewares
            .iter()
            .rev()
            .fold(next, |endpoint, middleware| middleware.layer(endpoint))
    }
}

/// Compose a chain from a list of middlewares.
pub fn chain<Req, Resp, I>(middlewares: I) -> Chain<Req, Resp>
where
    I: IntoIterator<Item = Arc<dyn Middleware<Req, Resp>>>,
{
    Chain {
        middlewares: middlewares.into_iter().collect(),
    }
}

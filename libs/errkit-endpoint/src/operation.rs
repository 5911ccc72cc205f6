//! Operation naming for endpoints.
//!
//! The name lands in the request metadata and on the tracing span around the call.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::Instrument;

use errkit_errors::{BoxError, RequestCtx};

use crate::endpoint::{BoxEndpoint, Endpoint, Middleware};

/// Records the logical operation name on every request passing through.
///
/// The name is stored in [`RequestCtx::operation`] for downstream problem factories
/// and error handlers, and the call runs inside an `endpoint` tracing span.
#[derive(Debug, Clone)]
#[must_use]
pub struct OperationNameMiddleware {
    name: Arc<str>,
}

impl OperationNameMiddleware {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<Req, Resp> Middleware<Req, Resp> for OperationNameMiddleware
where
    Req: 'static,
    Resp: Send + 'static,
{
    fn layer(&self, next: BoxEndpoint<Req, Resp>) -> BoxEndpoint<Req, Resp> {
        Arc::new(OperationEndpoint {
            next,
            name: self.name.clone(),
        })
    }
}

struct OperationEndpoint<Req, Resp> {
    next: BoxEndpoint<Req, Resp>,
    name: Arc<str>,
}

impl<Req, Resp> Endpoint<Req, Resp> for OperationEndpoint<Req, Resp>
where
    Req: 'static,
    Resp: Send + 'static,
{
    fn call(&self, ctx: RequestCtx, req: Req) -> BoxFuture<'static, Result<Resp, BoxError>> {
        let span = tracing::debug_span!("endpoint", operation = %self.name);
        let fut = self.next.call(ctx.with_operation(self.name.clone()), req);
        Box::pin(fut.instrument(span))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::endpoint::{Chain, endpoint_fn};

    fn echo_operation() -> BoxEndpoint<(), Option<String>> {
        Arc::new(endpoint_fn(|ctx: RequestCtx, (): ()| async move {
            Ok::<_, BoxError>(ctx.operation().map(ToOwned::to_owned))
        }))
    }

    #[tokio::test]
    async fn sets_operation_on_context() {
        let e = OperationNameMiddleware::new("CreateUser").layer(echo_operation());

        let op = e.call(RequestCtx::new(), ()).await.unwrap();
        assert_eq!(op.as_deref(), Some("CreateUser"));
    }

    #[tokio::test]
    async fn inner_name_overrides_outer() {
        let e = Chain::new()
            .with(OperationNameMiddleware::new("outer"))
            .with(OperationNameMiddleware::new("inner"))
            .layer(echo_operation());

        let op = e.call(RequestCtx::new(), ()).await.unwrap();
        assert_eq!(op.as_deref(), Some("inner"));
    }
}

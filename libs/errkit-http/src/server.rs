//! HTTP server binding an endpoint to a tower [`Service`].

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::Service;

use errkit_endpoint::{BoxEndpoint, ErrorHandler, NopErrorHandler};
use errkit_errors::{BoxError, DynError, RequestCtx};

use crate::decode::RequestDecoder;
use crate::encode::{ErrorEncoder, HttpResponse, ResponseEncoder, response};
use crate::problem::ProblemErrorEncoder;

/// Headers consulted, in order, for the request's trace id.
pub const TRACE_ID_HEADERS: [&str; 2] = ["x-trace-id", "x-request-id"];

/// Wraps an endpoint as a tower [`Service`].
///
/// Each request is decoded, passed to the endpoint and encoded. Any failure along
/// the way is reported to the error handler and rendered by the error encoder, so
/// every request yields exactly one response and the service never fails.
///
/// Defaults: errors are encoded with [`ProblemErrorEncoder::default_json`] and not
/// reported anywhere else.
#[must_use]
pub struct Server<Req, Resp> {
    inner: Arc<Inner<Req, Resp>>,
}

struct Inner<Req, Resp> {
    endpoint: BoxEndpoint<Req, Resp>,
    decoder: Arc<dyn RequestDecoder<Req>>,
    encoder: Arc<dyn ResponseEncoder<Resp>>,
    error_encoder: Arc<dyn ErrorEncoder>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl<Req, Resp> Server<Req, Resp> {
    pub fn new(
        endpoint: BoxEndpoint<Req, Resp>,
        decoder: impl RequestDecoder<Req> + 'static,
        encoder: impl ResponseEncoder<Resp> + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                endpoint,
                decoder: Arc::new(decoder),
                encoder: Arc::new(encoder),
                error_encoder: Arc::new(ProblemErrorEncoder::default_json()),
                error_handler: Arc::new(NopErrorHandler),
            }),
        }
    }

    /// Replace the encoder used for decode, endpoint and encode failures.
    pub fn with_error_encoder(self, error_encoder: impl ErrorEncoder + 'static) -> Self {
        self.map_inner(|inner| inner.error_encoder = Arc::new(error_encoder))
    }

    /// Report every failure to `handler` before it is encoded.
    pub fn with_error_handler(self, handler: impl ErrorHandler + 'static) -> Self {
        self.map_inner(|inner| inner.error_handler = Arc::new(handler))
    }

    fn map_inner(self, f: impl FnOnce(&mut Inner<Req, Resp>)) -> Self {
        let mut inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(shared) => Inner {
                endpoint: shared.endpoint.clone(),
                decoder: shared.decoder.clone(),
                encoder: shared.encoder.clone(),
                error_encoder: shared.error_encoder.clone(),
                error_handler: shared.error_handler.clone(),
            },
        };
        f(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl<Req, Resp> Clone for Server<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<Req, Resp> fmt::Debug for Server<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server").finish_non_exhaustive()
    }
}

/// Build the request metadata: the path is the problem instance, the trace id
/// comes from the first tracing header present.
pub fn request_ctx<B>(req: &Request<B>) -> RequestCtx {
    let ctx = RequestCtx::new().with_instance(req.uri().path());
    let trace_id = TRACE_ID_HEADERS
        .iter()
        .find_map(|name| req.headers().get(*name))
        .and_then(|value| value.to_str().ok());
    match trace_id {
        Some(id) => ctx.with_trace_id(id),
        None => ctx,
    }
}

impl<Req, Resp> Inner<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn serve<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: http_body::Body + Send,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let ctx = request_ctx(&req);
        match self.handle(&ctx, req).await {
            Ok(resp) => resp,
            Err(err) => self.fail(&ctx, err.as_ref()),
        }
    }

    async fn handle<B>(&self, ctx: &RequestCtx, req: Request<B>) -> Result<HttpResponse, BoxError>
    where
        B: http_body::Body + Send,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let body: Bytes = body
            .collect()
            .await
            .map_err(Into::<BoxError>::into)?
            .to_bytes();

        let request = self.decoder.decode(ctx, &parts, body)?;
        let response = self.endpoint.call(ctx.clone(), request).await?;
        Ok(self.encoder.encode(ctx, response)?)
    }

    fn fail(&self, ctx: &RequestCtx, err: &DynError) -> HttpResponse {
        self.error_handler.handle(ctx, err);
        match self.error_encoder.encode_error(ctx, err) {
            Ok(resp) => resp,
            Err(encode_err) => {
                tracing::error!(error = %encode_err, "failed to encode error response");
                self.error_handler.handle(ctx, &encode_err);
                response(StatusCode::INTERNAL_SERVER_ERROR, None, Bytes::new())
            }
        }
    }
}

impl<Req, Resp, B> Service<Request<B>> for Server<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = HttpResponse;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.serve(req).await) })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn request_ctx_reads_path_and_trace_id() {
        let req = Request::get("/users/42?verbose=1")
            .header("x-request-id", "req-1")
            .body(())
            .unwrap();
        let ctx = request_ctx(&req);
        assert_eq!(ctx.instance(), Some("/users/42"));
        assert_eq!(ctx.trace_id(), Some("req-1"));
        assert_eq!(ctx.operation(), None);
    }

    #[test]
    fn trace_header_wins_over_request_id() {
        let req = Request::get("/")
            .header("x-request-id", "req-1")
            .header("x-trace-id", "trace-1")
            .body(())
            .unwrap();
        assert_eq!(request_ctx(&req).trace_id(), Some("trace-1"));
    }
}

//! GraphQL handlers binding endpoints to resolvers.
//!
//! A resolver builds the request metadata and forwards its input to a [`Handler`]:
//!
//! ```ignore
//! async fn book(&self, id: ID) -> Result<Book, BoxError> {
//!     let ctx = RequestCtx::new().with_trace_id(self.trace_id.as_str());
//!     self.get_book.serve_graphql(ctx, id).await
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use errkit_endpoint::{BoxEndpoint, ErrorHandler, Failer, NopErrorHandler};
use errkit_errors::{BoxError, RequestCtx};

use crate::error::{ErrorEncoder, ProblemErrorEncoder};

/// Turns a GraphQL input into a domain request.
pub trait RequestDecoder<GReq, Req>: Send + Sync {
    /// # Errors
    /// Returns an error if the input cannot be decoded.
    fn decode(&self, ctx: &RequestCtx, req: GReq) -> Result<Req, BoxError>;
}

impl<GReq, Req, F> RequestDecoder<GReq, Req> for F
where
    F: Fn(&RequestCtx, GReq) -> Result<Req, BoxError> + Send + Sync,
{
    fn decode(&self, ctx: &RequestCtx, req: GReq) -> Result<Req, BoxError> {
        self(ctx, req)
    }
}

/// Turns a domain response into a GraphQL output.
pub trait ResponseEncoder<Resp, GResp>: Send + Sync {
    /// # Errors
    /// Returns an error if the response cannot be encoded.
    fn encode(&self, ctx: &RequestCtx, resp: Resp) -> Result<GResp, BoxError>;
}

impl<Resp, GResp, F> ResponseEncoder<Resp, GResp> for F
where
    F: Fn(&RequestCtx, Resp) -> Result<GResp, BoxError> + Send + Sync,
{
    fn encode(&self, ctx: &RequestCtx, resp: Resp) -> Result<GResp, BoxError> {
        self(ctx, resp)
    }
}

/// Encodes failed responses with the error encoder, everything else with the
/// wrapped encoder.
#[derive(Debug, Clone)]
#[must_use]
pub struct ErrorResponseEncoder<E, EE> {
    encoder: E,
    error_encoder: EE,
}

impl<E, EE> ErrorResponseEncoder<E, EE> {
    pub fn new(encoder: E, error_encoder: EE) -> Self {
        Self {
            encoder,
            error_encoder,
        }
    }
}

impl<Resp, GResp, E, EE> ResponseEncoder<Resp, GResp> for ErrorResponseEncoder<E, EE>
where
    Resp: Failer,
    E: ResponseEncoder<Resp, GResp>,
    EE: ErrorEncoder,
{
    fn encode(&self, ctx: &RequestCtx, resp: Resp) -> Result<GResp, BoxError> {
        if let Some(err) = resp.failed() {
            return Err(self.error_encoder.encode_error(ctx, err));
        }
        self.encoder.encode(ctx, resp)
    }
}

/// Serves one GraphQL field.
pub trait Handler<GReq, GResp>: Send + Sync + 'static {
    fn serve_graphql(
        &self,
        ctx: RequestCtx,
        req: GReq,
    ) -> BoxFuture<'static, Result<GResp, BoxError>>;
}

impl<GReq, GResp, H: Handler<GReq, GResp> + ?Sized> Handler<GReq, GResp> for Arc<H> {
    fn serve_graphql(
        &self,
        ctx: RequestCtx,
        req: GReq,
    ) -> BoxFuture<'static, Result<GResp, BoxError>> {
        (**self).serve_graphql(ctx, req)
    }
}

/// Wraps an endpoint as a [`Handler`]: decode, call, encode.
///
/// Errors are reported to the error handler and returned unchanged.
#[must_use]
pub struct Server<GReq, Req, Resp, GResp> {
    endpoint: BoxEndpoint<Req, Resp>,
    decoder: Arc<dyn RequestDecoder<GReq, Req>>,
    encoder: Arc<dyn ResponseEncoder<Resp, GResp>>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl<GReq, Req, Resp, GResp> Server<GReq, Req, Resp, GResp> {
    pub fn new(
        endpoint: BoxEndpoint<Req, Resp>,
        decoder: impl RequestDecoder<GReq, Req> + 'static,
        encoder: impl ResponseEncoder<Resp, GResp> + 'static,
    ) -> Self {
        Self {
            endpoint,
            decoder: Arc::new(decoder),
            encoder: Arc::new(encoder),
            error_handler: Arc::new(NopErrorHandler),
        }
    }

    pub fn with_error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Arc::new(handler);
        self
    }
}

impl<GReq, Req, Resp, GResp> Server<GReq, Req, Resp, GResp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn run(&self, ctx: &RequestCtx, req: GReq) -> Result<GResp, BoxError> {
        let request = self.decoder.decode(ctx, req)?;
        let response = self.endpoint.call(ctx.clone(), request).await?;
        self.encoder.encode(ctx, response)
    }
}

impl<GReq, Req, Resp, GResp> Clone for Server<GReq, Req, Resp, GResp> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            decoder: self.decoder.clone(),
            encoder: self.encoder.clone(),
            error_handler: self.error_handler.clone(),
        }
    }
}

impl<GReq, Req, Resp, GResp> fmt::Debug for Server<GReq, Req, Resp, GResp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server").finish_non_exhaustive()
    }
}

impl<GReq, Req, Resp, GResp> Handler<GReq, GResp> for Server<GReq, Req, Resp, GResp>
where
    GReq: Send + 'static,
    Req: Send + 'static,
    Resp: Send + 'static,
    GResp: Send + 'static,
{
    fn serve_graphql(
        &self,
        ctx: RequestCtx,
        req: GReq,
    ) -> BoxFuture<'static, Result<GResp, BoxError>> {
        let server = self.clone();
        Box::pin(async move {
            server.run(&ctx, req).await.inspect_err(|err| {
                server.error_handler.handle(&ctx, err.as_ref());
            })
        })
    }
}

/// Encodes the errors of a [`Handler`] with an [`ErrorEncoder`].
#[derive(Clone)]
#[must_use]
pub struct ErrorEncoderHandler<H> {
    handler: H,
    error_encoder: Arc<dyn ErrorEncoder>,
}

impl<H> ErrorEncoderHandler<H> {
    pub fn new(handler: H, error_encoder: impl ErrorEncoder + 'static) -> Self {
        Self {
            handler,
            error_encoder: Arc::new(error_encoder),
        }
    }

    /// Encode errors with [`ProblemErrorEncoder::default`].
    pub fn with_default_encoder(handler: H) -> Self {
        Self::new(handler, ProblemErrorEncoder::default())
    }
}

impl<H: fmt::Debug> fmt::Debug for ErrorEncoderHandler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorEncoderHandler")
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

impl<GReq, GResp, H> Handler<GReq, GResp> for ErrorEncoderHandler<H>
where
    H: Handler<GReq, GResp>,
    GResp: 'static,
{
    fn serve_graphql(
        &self,
        ctx: RequestCtx,
        req: GReq,
    ) -> BoxFuture<'static, Result<GResp, BoxError>> {
        let fut = self.handler.serve_graphql(ctx.clone(), req);
        let error_encoder = self.error_encoder.clone();
        Box::pin(async move {
            fut.await.map_err(|err| {
                tracing::debug!(error = %err, "graphql request failed");
                error_encoder.encode_error(&ctx, err.as_ref())
            })
        })
    }
}

//! gRPC handlers binding endpoints to tonic services.
//!
//! A generated tonic service method forwards its request to a [`Handler`]:
//!
//! ```ignore
//! async fn get_user(&self, req: Request<GetUserRequest>) -> Result<Response<User>, Status> {
//!     self.get_user.serve(req).await
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status};

use errkit_endpoint::{BoxEndpoint, ErrorHandler, Failer, NopErrorHandler};
use errkit_errors::{BoxError, RequestCtx};

use crate::status::{ErrorEncoder, InternalStatusConverter, StatusErrorEncoder};

/// Metadata key carrying the caller's trace id.
pub const TRACE_ID_METADATA_KEY: &str = "x-trace-id";

/// Turns a protobuf request message into a domain request.
pub trait RequestDecoder<GReq, Req>: Send + Sync {
    /// # Errors
    /// Returns an error if the message cannot be decoded.
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

/// Turns a domain response into a protobuf response message.
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

/// Encodes failed responses as status errors, everything else with the wrapped
/// encoder.
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
            return Err(Box::new(self.error_encoder.encode_error(ctx, err)));
        }
        self.encoder.encode(ctx, resp)
    }
}

/// Serves one gRPC method.
pub trait Handler<GReq, GResp>: Send + Sync + 'static {
    fn serve_grpc(
        &self,
        req: Request<GReq>,
    ) -> BoxFuture<'static, Result<Response<GResp>, BoxError>>;
}

impl<GReq, GResp, H: Handler<GReq, GResp> + ?Sized> Handler<GReq, GResp> for Arc<H> {
    fn serve_grpc(
        &self,
        req: Request<GReq>,
    ) -> BoxFuture<'static, Result<Response<GResp>, BoxError>> {
        (**self).serve_grpc(req)
    }
}

/// Request metadata from gRPC metadata.
pub fn request_ctx(metadata: &MetadataMap) -> RequestCtx {
    let ctx = RequestCtx::new();
    match metadata
        .get(TRACE_ID_METADATA_KEY)
        .and_then(|value| value.to_str().ok())
    {
        Some(id) => ctx.with_trace_id(id),
        None => ctx,
    }
}

/// Wraps an endpoint as a [`Handler`]: decode, call, encode.
///
/// Errors are reported to the error handler and returned unchanged; wrap the
/// server in an [`ErrorEncoderHandler`] to turn them into statuses.
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
    fn serve_grpc(
        &self,
        req: Request<GReq>,
    ) -> BoxFuture<'static, Result<Response<GResp>, BoxError>> {
        let server = self.clone();
        let ctx = request_ctx(req.metadata());
        let message = req.into_inner();

        Box::pin(async move {
            match server.run(&ctx, message).await {
                Ok(message) => Ok(Response::new(message)),
                Err(err) => {
                    server.error_handler.handle(&ctx, err.as_ref());
                    Err(err)
                }
            }
        })
    }
}

impl<GReq, Req, Resp, GResp> Server<GReq, Req, Resp, GResp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn run(&self, ctx: &RequestCtx, message: GReq) -> Result<GResp, BoxError> {
        let request = self.decoder.decode(ctx, message)?;
        let response = self.endpoint.call(ctx.clone(), request).await?;
        self.encoder.encode(ctx, response)
    }
}

/// Encodes the errors of a [`Handler`] as statuses.
#[derive(Clone)]
#[must_use]
pub struct ErrorEncoderHandler<H> {
    handler: H,
    error_encoder: Arc<dyn ErrorEncoder>,
}

impl<H: fmt::Debug> fmt::Debug for ErrorEncoderHandler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorEncoderHandler")
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

impl<H> ErrorEncoderHandler<H> {
    pub fn new(handler: H, error_encoder: impl ErrorEncoder + 'static) -> Self {
        Self {
            handler,
            error_encoder: Arc::new(error_encoder),
        }
    }

    /// Encode errors with [`StatusErrorEncoder::default`]: `Internal` for anything
    /// that is not already a status.
    pub fn with_default_encoder(handler: H) -> Self {
        Self::new(handler, StatusErrorEncoder::<InternalStatusConverter>::default())
    }

    /// Serve a request, returning the status tonic expects on failure.
    pub fn serve<GReq, GResp>(
        &self,
        req: Request<GReq>,
    ) -> BoxFuture<'static, Result<Response<GResp>, Status>>
    where
        H: Handler<GReq, GResp>,
        GReq: 'static,
        GResp: 'static,
    {
        let ctx = request_ctx(req.metadata());
        let fut = self.handler.serve_grpc(req);
        let error_encoder = self.error_encoder.clone();
        Box::pin(async move {
            fut.await.map_err(|err| {
                let status = error_encoder.encode_error(&ctx, err.as_ref());
                tracing::debug!(code = %status.code(), error = %err, "grpc request failed");
                status
            })
        })
    }
}

impl<GReq, GResp, H> Handler<GReq, GResp> for ErrorEncoderHandler<H>
where
    H: Handler<GReq, GResp>,
    GReq: 'static,
    GResp: 'static,
{
    fn serve_grpc(
        &self,
        req: Request<GReq>,
    ) -> BoxFuture<'static, Result<Response<GResp>, BoxError>> {
        let fut = self.serve(req);
        Box::pin(async move { fut.await.map_err(|status| Box::new(status) as BoxError) })
    }
}

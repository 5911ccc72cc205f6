//! Response encoders.
//!
//! A [`ResponseEncoder`] turns an endpoint response into an HTTP response, an
//! [`ErrorEncoder`] does the same for an error. Encoders never fail silently: any
//! problem building the body is reported as an [`EncodeError`].

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use errkit_endpoint::{Failer, Outcome};
use errkit_errors::{DynError, RequestCtx};

/// The response type produced by every encoder of this crate.
pub type HttpResponse = Response<Full<Bytes>>;

const APPLICATION_JSON: &str = "application/json; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to encode response as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to encode response as XML: {0}")]
    Xml(#[source] Box<DynError>),
}

/// Encodes a successful endpoint response.
pub trait ResponseEncoder<R>: Send + Sync {
    /// # Errors
    /// Returns [`EncodeError`] if the response cannot be rendered.
    fn encode(&self, ctx: &RequestCtx, resp: R) -> Result<HttpResponse, EncodeError>;
}

impl<R, F> ResponseEncoder<R> for F
where
    F: Fn(&RequestCtx, R) -> Result<HttpResponse, EncodeError> + Send + Sync,
{
    fn encode(&self, ctx: &RequestCtx, resp: R) -> Result<HttpResponse, EncodeError> {
        self(ctx, resp)
    }
}

/// Encodes an error into a response.
pub trait ErrorEncoder: Send + Sync {
    /// # Errors
    /// Returns [`EncodeError`] if the error response cannot be rendered.
    fn encode_error(&self, ctx: &RequestCtx, err: &DynError) -> Result<HttpResponse, EncodeError>;
}

impl<F> ErrorEncoder for F
where
    F: Fn(&RequestCtx, &DynError) -> Result<HttpResponse, EncodeError> + Send + Sync,
{
    fn encode_error(&self, ctx: &RequestCtx, err: &DynError) -> Result<HttpResponse, EncodeError> {
        self(ctx, err)
    }
}

/// Build a response from its parts without going through the fallible builder.
pub(crate) fn response(
    status: StatusCode,
    content_type: Option<&'static str>,
    body: impl Into<Bytes>,
) -> HttpResponse {
    let mut resp = Response::new(Full::new(body.into()));
    *resp.status_mut() = status;
    if let Some(content_type) = content_type {
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    resp
}

/// For operations without output: `200 OK` and no body.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopResponseEncoder;

impl<R> ResponseEncoder<R> for NopResponseEncoder {
    fn encode(&self, _ctx: &RequestCtx, _resp: R) -> Result<HttpResponse, EncodeError> {
        Ok(response(StatusCode::OK, None, Bytes::new()))
    }
}

/// For operations without output: a fixed status and no body.
#[derive(Debug, Clone, Copy)]
pub struct StatusCodeResponseEncoder(pub StatusCode);

impl<R> ResponseEncoder<R> for StatusCodeResponseEncoder {
    fn encode(&self, _ctx: &RequestCtx, _resp: R) -> Result<HttpResponse, EncodeError> {
        Ok(response(self.0, None, Bytes::new()))
    }
}

/// Lets a response choose its own HTTP status.
pub trait StatusCoder {
    #[must_use]
    fn status_code(&self) -> StatusCode {
        StatusCode::OK
    }
}

impl StatusCoder for serde_json::Value {}

impl<T: StatusCoder> StatusCoder for Outcome<T> {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Success(value) => value.status_code(),
            Self::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A response with an explicit status. Serializes exactly like the wrapped value.
#[derive(Debug, Clone)]
#[must_use]
pub struct WithStatusCode<T> {
    pub response: T,
    pub status: StatusCode,
}

/// Attach `status` to `response`, for use with [`JsonResponseEncoder`].
pub fn with_status_code<T>(response: T, status: StatusCode) -> WithStatusCode<T> {
    WithStatusCode { response, status }
}

impl<T> StatusCoder for WithStatusCode<T> {
    fn status_code(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> Serialize for WithStatusCode<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.response.serialize(serializer)
    }
}

/// Writes the response as JSON with the status chosen by [`StatusCoder`].
///
/// A `204 No Content` status suppresses the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseEncoder;

impl<R: Serialize + StatusCoder> ResponseEncoder<R> for JsonResponseEncoder {
    fn encode(&self, _ctx: &RequestCtx, resp: R) -> Result<HttpResponse, EncodeError> {
        let status = resp.status_code();
        if status == StatusCode::NO_CONTENT {
            return Ok(response(status, Some(APPLICATION_JSON), Bytes::new()));
        }
        let body = serde_json::to_vec(&resp)?;
        Ok(response(status, Some(APPLICATION_JSON), body))
    }
}

/// Routes failed responses to an error encoder.
///
/// If the response reports a failure through [`Failer`], the failure is encoded
/// with the error encoder; every other response goes to the wrapped encoder.
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

impl<R, E, EE> ResponseEncoder<R> for ErrorResponseEncoder<E, EE>
where
    R: Failer,
    E: ResponseEncoder<R>,
    EE: ErrorEncoder,
{
    fn encode(&self, ctx: &RequestCtx, resp: R) -> Result<HttpResponse, EncodeError> {
        if let Some(err) = resp.failed() {
            return self.error_encoder.encode_error(ctx, err);
        }
        self.encoder.encode(ctx, resp)
    }
}

impl<E: ErrorEncoder + ?Sized> ErrorEncoder for Arc<E> {
    fn encode_error(&self, ctx: &RequestCtx, err: &DynError) -> Result<HttpResponse, EncodeError> {
        (**self).encode_error(ctx, err)
    }
}

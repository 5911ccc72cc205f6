//! Request decoders.

use bytes::Bytes;
use http::request::Parts;
use serde::de::DeserializeOwned;

use errkit_errors::{BoxError, RequestCtx};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("request body is empty")]
    EmptyBody,

    #[error("failed to decode JSON request body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Extracts a domain request from an HTTP request.
///
/// Decoding errors are ordinary errors: they reach the error encoder like any
/// endpoint error, so matchers decide how they are reported.
pub trait RequestDecoder<Req>: Send + Sync {
    /// # Errors
    /// Returns an error if the request cannot be decoded.
    fn decode(&self, ctx: &RequestCtx, parts: &Parts, body: Bytes) -> Result<Req, BoxError>;
}

impl<Req, F> RequestDecoder<Req> for F
where
    F: Fn(&RequestCtx, &Parts, Bytes) -> Result<Req, BoxError> + Send + Sync,
{
    fn decode(&self, ctx: &RequestCtx, parts: &Parts, body: Bytes) -> Result<Req, BoxError> {
        self(ctx, parts, body)
    }
}

/// Ignores the request and yields `Req::default()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopRequestDecoder;

impl<Req: Default> RequestDecoder<Req> for NopRequestDecoder {
    fn decode(&self, _ctx: &RequestCtx, _parts: &Parts, _body: Bytes) -> Result<Req, BoxError> {
        Ok(Req::default())
    }
}

/// Deserializes the request body as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRequestDecoder;

impl<Req: DeserializeOwned> RequestDecoder<Req> for JsonRequestDecoder {
    fn decode(&self, _ctx: &RequestCtx, _parts: &Parts, body: Bytes) -> Result<Req, BoxError> {
        if body.is_empty() {
            return Err(DecodeError::EmptyBody.into());
        }
        serde_json::from_slice(&body).map_err(|e| DecodeError::from(e).into())
    }
}

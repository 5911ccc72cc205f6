//! HTTP transport for errkit endpoints.
//!
//! Endpoint errors become RFC 9457 problem documents, in JSON or XML, built by any
//! [`ProblemFactory`](errkit_errors::ProblemFactory), usually a
//! [`ProblemResolver`](errkit_errors::ProblemResolver). [`Server`] exposes an
//! endpoint as a tower service.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod decode;
pub mod encode;
pub mod problem;
pub mod server;

pub use decode::{DecodeError, JsonRequestDecoder, NopRequestDecoder, RequestDecoder};
pub use encode::{
    EncodeError, ErrorEncoder, ErrorResponseEncoder, HttpResponse, JsonResponseEncoder,
    NopResponseEncoder, ResponseEncoder, StatusCodeResponseEncoder, StatusCoder, WithStatusCode,
    with_status_code,
};
pub use problem::{ProblemErrorEncoder, ProblemFormat};
pub use server::{Server, TRACE_ID_HEADERS, request_ctx};

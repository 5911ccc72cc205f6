//! gRPC transport for errkit endpoints, built on `tonic`.
//!
//! Endpoint errors become `tonic::Status` values. Errors that already are a status
//! are passed through untouched; everything else goes through a
//! [`StatusConverter`], by default one that hides the error behind `Internal`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod server;
pub mod status;

pub use server::{
    ErrorEncoderHandler, ErrorResponseEncoder, Handler, RequestDecoder, ResponseEncoder, Server,
    TRACE_ID_METADATA_KEY, request_ctx,
};
pub use status::{
    ErrorEncoder, InternalStatusConverter, ProblemStatusConverter, StatusConverter,
    StatusErrorEncoder, code_from_http_status, is_grpc_error,
};

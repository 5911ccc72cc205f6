//! GraphQL transport for errkit endpoints.
//!
//! Endpoint errors reach the GraphQL executor as [`GraphQlError`]s: the message is
//! the problem detail and the problem itself is exposed under `extensions`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod error;
pub mod server;

pub use error::{ErrorEncoder, GraphQlError, GraphQlErrorExtensions, ProblemErrorEncoder};
pub use server::{
    ErrorEncoderHandler, ErrorResponseEncoder, Handler, RequestDecoder, ResponseEncoder, Server,
};

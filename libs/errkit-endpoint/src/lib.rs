//! Transport-agnostic endpoints and the middleware that wraps them.
//!
//! An [`Endpoint`] is a unit of business logic invoked once per request. A
//! [`Middleware`] wraps an endpoint into another endpoint; a [`Chain`] composes
//! middlewares so that the first one is outermost.
//!
//! The failer convention lets an endpoint report an expected business failure
//! through its response instead of its error channel, see [`FailerMiddleware`].
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod endpoint;
pub mod error_handler;
pub mod failer;
pub mod operation;

pub use errkit_errors::{BoxError, DynError, ErrorMatcher, RequestCtx, matcher_fn};

pub use endpoint::{BoxEndpoint, Chain, Endpoint, EndpointFn, Middleware, chain, endpoint_fn};
pub use error_handler::{
    ErrorHandler, ErrorHandlerFn, LogErrorHandler, NopErrorHandler, error_handler_fn,
};
pub use failer::{
    BusinessError, BusinessErrorMatcher, Failer, FailerMiddleware, FromFailure, Outcome,
    business_error_middleware,
};
pub use operation::OperationNameMiddleware;

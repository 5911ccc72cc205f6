//! Side-channel error observers.
//!
//! Transports call an [`ErrorHandler`] for every error that reaches the error
//! encoder. Handlers observe; they never change the response.

use std::fmt;
use std::sync::Arc;

use errkit_errors::{DynError, RequestCtx};

pub trait ErrorHandler: Send + Sync {
    fn handle(&self, ctx: &RequestCtx, err: &DynError);
}

impl<H: ErrorHandler + ?Sized> ErrorHandler for Arc<H> {
    fn handle(&self, ctx: &RequestCtx, err: &DynError) {
        (**self).handle(ctx, err);
    }
}

/// Ignores every error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopErrorHandler;

impl ErrorHandler for NopErrorHandler {
    fn handle(&self, _ctx: &RequestCtx, _err: &DynError) {}
}

/// Emits a `warn` event per failed request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn handle(&self, ctx: &RequestCtx, err: &DynError) {
        tracing::warn!(
            operation = ctx.operation().unwrap_or("unknown"),
            trace_id = ctx.trace_id(),
            error = %err,
            "request failed"
        );
    }
}

#[derive(Clone, Copy)]
#[must_use]
pub struct ErrorHandlerFn<F> {
    f: F,
}

impl<F> fmt::Debug for ErrorHandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandlerFn").finish_non_exhaustive()
    }
}

impl<F> ErrorHandler for ErrorHandlerFn<F>
where
    F: Fn(&RequestCtx, &DynError) + Send + Sync,
{
    fn handle(&self, ctx: &RequestCtx, err: &DynError) {
        (self.f)(ctx, err);
    }
}

pub fn error_handler_fn<F>(f: F) -> ErrorHandlerFn<F>
where
    F: Fn(&RequestCtx, &DynError) + Send + Sync,
{
    ErrorHandlerFn { f }
}

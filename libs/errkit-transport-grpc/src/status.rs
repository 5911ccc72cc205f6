//! Error to `tonic::Status` conversion.

use std::fmt;
use std::sync::Arc;

use tonic::{Code, Status};

use errkit_errors::{DynError, GENERIC_DETAIL, ProblemFactory, RequestCtx};

/// Creates a gRPC status from an error.
pub trait StatusConverter: Send + Sync {
    fn new_status(&self, ctx: &RequestCtx, err: &DynError) -> Status;
}

impl<C: StatusConverter + ?Sized> StatusConverter for Arc<C> {
    fn new_status(&self, ctx: &RequestCtx, err: &DynError) -> Status {
        (**self).new_status(ctx, err)
    }
}

/// Reports every error as `Internal` "something went wrong".
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalStatusConverter;

impl StatusConverter for InternalStatusConverter {
    fn new_status(&self, _ctx: &RequestCtx, _err: &DynError) -> Status {
        Status::new(Code::Internal, GENERIC_DETAIL)
    }
}

/// Builds statuses from problems, so gRPC and HTTP share one set of matchers.
///
/// The problem status picks the code, the problem detail (or title, when the
/// detail is empty) becomes the message.
#[derive(Clone)]
#[must_use]
pub struct ProblemStatusConverter {
    factory: Arc<dyn ProblemFactory>,
}

impl ProblemStatusConverter {
    pub fn new(factory: impl ProblemFactory + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }
}

impl fmt::Debug for ProblemStatusConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemStatusConverter").finish_non_exhaustive()
    }
}

impl StatusConverter for ProblemStatusConverter {
    fn new_status(&self, ctx: &RequestCtx, err: &DynError) -> Status {
        let problem = self.factory.new_problem(ctx, err);
        let message = if problem.detail.is_empty() {
            problem.title
        } else {
            problem.detail
        };
        Status::new(code_from_http_status(problem.status), message)
    }
}

/// Map an HTTP error status onto the closest gRPC code.
///
/// Only 4xx and 5xx have a counterpart; anything else is `Unknown`, never `Ok`.
#[must_use]
pub fn code_from_http_status(status: u16) -> Code {
    match status {
        400 => Code::InvalidArgument,
        401 => Code::Unauthenticated,
        403 => Code::PermissionDenied,
        404 => Code::NotFound,
        409 => Code::AlreadyExists,
        416 => Code::OutOfRange,
        429 => Code::ResourceExhausted,
        499 => Code::Cancelled,
        501 => Code::Unimplemented,
        503 => Code::Unavailable,
        504 => Code::DeadlineExceeded,
        402..=498 => Code::FailedPrecondition,
        500..=599 => Code::Internal,
        _ => Code::Unknown,
    }
}

/// Whether `err` is already a gRPC status.
#[must_use]
pub fn is_grpc_error(err: &DynError) -> bool {
    err.is::<Status>()
}

/// Encodes an error as the status returned to the client.
pub trait ErrorEncoder: Send + Sync {
    fn encode_error(&self, ctx: &RequestCtx, err: &DynError) -> Status;
}

impl<F> ErrorEncoder for F
where
    F: Fn(&RequestCtx, &DynError) -> Status + Send + Sync,
{
    fn encode_error(&self, ctx: &RequestCtx, err: &DynError) -> Status {
        self(ctx, err)
    }
}

impl<E: ErrorEncoder + ?Sized> ErrorEncoder for Arc<E> {
    fn encode_error(&self, ctx: &RequestCtx, err: &DynError) -> Status {
        (**self).encode_error(ctx, err)
    }
}

/// Converts errors with a [`StatusConverter`], passing existing statuses through.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct StatusErrorEncoder<C = InternalStatusConverter> {
    converter: C,
}

impl<C: StatusConverter> StatusErrorEncoder<C> {
    pub fn new(converter: C) -> Self {
        Self { converter }
    }
}

impl<C: StatusConverter> ErrorEncoder for StatusErrorEncoder<C> {
    fn encode_error(&self, ctx: &RequestCtx, err: &DynError) -> Status {
        if let Some(status) = err.downcast_ref::<Status>() {
            return status.clone();
        }
        self.converter.new_status(ctx, err)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use errkit_errors::{
        BoxError, Problem, ProblemFactoryConfig, ProblemMatcher, ProblemResolver, is_error,
    };

    struct StatusConverterStub(Status);

    impl StatusConverter for StatusConverterStub {
        fn new_status(&self, _ctx: &RequestCtx, _err: &DynError) -> Status {
            self.0.clone()
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("user not found")]
    struct UserNotFound;

    #[test]
    fn status_error_encoder_uses_converter() {
        let encoder =
            StatusErrorEncoder::new(StatusConverterStub(Status::new(Code::NotFound, "error")));
        let err: BoxError = "error".into();

        let status = encoder.encode_error(&RequestCtx::new(), err.as_ref());
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "error");
    }

    #[test]
    fn existing_status_passes_through() {
        let encoder = StatusErrorEncoder::<InternalStatusConverter>::default();
        let err: BoxError = Box::new(Status::already_exists("duplicate"));

        assert!(is_grpc_error(err.as_ref()));
        let status = encoder.encode_error(&RequestCtx::new(), err.as_ref());
        assert_eq!(status.code(), Code::AlreadyExists);
        assert_eq!(status.message(), "duplicate");
    }

    #[test]
    fn default_encoder_hides_details() {
        let err: BoxError = "disk quota exceeded".into();
        assert!(!is_grpc_error(err.as_ref()));

        let status = StatusErrorEncoder::<InternalStatusConverter>::default()
            .encode_error(&RequestCtx::new(), err.as_ref());
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "something went wrong");
    }

    #[test]
    fn problem_converter_shares_http_matchers() {
        let resolver = ProblemResolver::new(
            ProblemFactoryConfig::new()
                .matcher(ProblemMatcher::with_status(404, is_error::<UserNotFound>())),
        );
        let converter = ProblemStatusConverter::new(resolver);

        let not_found: BoxError = Box::new(UserNotFound);
        let status = converter.new_status(&RequestCtx::new(), not_found.as_ref());
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "user not found");

        let other: BoxError = "boom".into();
        let status = converter.new_status(&RequestCtx::new(), other.as_ref());
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "something went wrong");
    }

    #[test]
    fn empty_detail_falls_back_to_title() {
        let converter = ProblemStatusConverter::new(errkit_errors::problem_factory_fn(
            |_ctx: &RequestCtx, _err: &DynError| Problem::new(429, ""),
        ));
        let err: BoxError = "slow down".into();

        let status = converter.new_status(&RequestCtx::new(), err.as_ref());
        assert_eq!(status.code(), Code::ResourceExhausted);
        assert_eq!(status.message(), "Too Many Requests");
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(code_from_http_status(400), Code::InvalidArgument);
        assert_eq!(code_from_http_status(401), Code::Unauthenticated);
        assert_eq!(code_from_http_status(403), Code::PermissionDenied);
        assert_eq!(code_from_http_status(422), Code::FailedPrecondition);
        assert_eq!(code_from_http_status(500), Code::Internal);
        assert_eq!(code_from_http_status(503), Code::Unavailable);
        assert_eq!(code_from_http_status(0), Code::Unknown);
        assert_eq!(code_from_http_status(204), Code::Unknown);
        assert_eq!(code_from_http_status(302), Code::Unknown);
    }

    #[test]
    fn success_problem_never_yields_ok() {
        let converter = ProblemStatusConverter::new(errkit_errors::problem_factory_fn(
            |_ctx: &RequestCtx, _err: &DynError| Problem::new(200, "accepted"),
        ));
        let err: BoxError = "queued".into();

        let status = converter.new_status(&RequestCtx::new(), err.as_ref());
        assert_eq!(status.code(), Code::Unknown);
        assert_eq!(status.message(), "accepted");
    }
}

#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Endpoint pipeline: operation naming, failer conversion and problem resolution.

use std::sync::Arc;

use errkit_endpoint::{
    BoxEndpoint, BoxError, BusinessError, BusinessErrorMatcher, Chain, Failer, Middleware,
    OperationNameMiddleware, Outcome, RequestCtx, business_error_middleware, endpoint_fn,
};
use errkit_errors::{ProblemFactoryConfig, ProblemMatcher, ProblemResolver, is_error};

#[derive(Debug, thiserror::Error)]
enum OrderError {
    #[error("order {0} not found")]
    NotFound(u64),
    #[error("inventory service timed out")]
    Timeout,
}

impl BusinessError for OrderError {
    fn is_business_error(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

fn get_order() -> BoxEndpoint<u64, Outcome<String>> {
    Arc::new(endpoint_fn(|_ctx: RequestCtx, id: u64| async move {
        match id {
            0 => Err::<Outcome<String>, BoxError>(OrderError::Timeout.into()),
            1 => Ok(Outcome::Success("order #1".to_owned())),
            _ => Err(OrderError::NotFound(id).into()),
        }
    }))
}

fn pipeline() -> BoxEndpoint<u64, Outcome<String>> {
    Chain::new()
        .with(OperationNameMiddleware::new("orders.get"))
        .with(business_error_middleware(
            BusinessErrorMatcher::new().register::<OrderError>(),
        ))
        .layer(get_order())
}

fn resolver() -> ProblemResolver {
    ProblemResolver::new(
        ProblemFactoryConfig::new().matcher(ProblemMatcher::with_status(
            404,
            is_error::<OrderError>(),
        )),
    )
}

#[tokio::test]
async fn success_is_returned_as_is() {
    let resp = pipeline().call(RequestCtx::new(), 1).await.unwrap();
    assert_eq!(resp.success().map(String::as_str), Some("order #1"));
}

#[tokio::test]
async fn business_failure_is_resolved_from_response() {
    let ctx = RequestCtx::new().with_trace_id("trace-7");
    let resp = pipeline().call(ctx.clone(), 42).await.unwrap();

    let failure = resp.failed().expect("business error must travel in the response");
    let resolver = resolver();
    let problem = resolver.resolve(&ctx, failure);

    assert_eq!(problem.status, 404);
    assert_eq!(problem.title, "Not Found");
    assert_eq!(problem.detail, "order 42 not found");
    assert_eq!(problem.trace_id.as_deref(), Some("trace-7"));
}

#[tokio::test]
async fn technical_failure_stays_an_error() {
    let err = pipeline().call(RequestCtx::new(), 0).await.unwrap_err();
    assert_eq!(err.to_string(), "inventory service timed out");

    // matched by type, so the resolver still maps it to 404
    let resolver = resolver();
    let problem = resolver.resolve(&RequestCtx::new(), err.as_ref());
    assert_eq!(problem.status, 404);

    let unmatched: BoxError = "disk full".into();
    let problem = resolver.resolve(&RequestCtx::new(), unmatched.as_ref());
    assert_eq!(problem.status, 500);
    assert_eq!(problem.detail, "something went wrong");
}

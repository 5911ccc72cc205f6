#![allow(clippy::unwrap_used, clippy::expect_used)]

//! GraphQL handler pipeline: decode, endpoint, failer and error encoding.

use std::sync::{Arc, Mutex};

use serde_json::json;

use errkit_endpoint::{
    BoxEndpoint, BoxError, BusinessError, BusinessErrorMatcher, DynError, Middleware, Outcome,
    RequestCtx, business_error_middleware, endpoint_fn, error_handler_fn,
};
use errkit_errors::{ProblemFactoryConfig, ProblemMatcher, ProblemResolver, is_error};
use errkit_graphql::{
    ErrorEncoderHandler, ErrorResponseEncoder, GraphQlError, Handler, ProblemErrorEncoder, Server,
};

#[derive(Debug, Clone, PartialEq)]
struct Book {
    title: String,
}

#[derive(Debug, thiserror::Error)]
enum LibraryError {
    #[error("book {0} is checked out")]
    CheckedOut(u32),
    #[error("catalog offline")]
    Offline,
}

impl BusinessError for LibraryError {
    fn is_business_error(&self) -> bool {
        matches!(self, Self::CheckedOut(_))
    }
}

fn decode(_ctx: &RequestCtx, id: String) -> Result<u32, BoxError> {
    Ok(id.parse::<u32>()?)
}

fn borrow_book() -> BoxEndpoint<u32, Outcome<Book>> {
    Arc::new(endpoint_fn(|_ctx: RequestCtx, id: u32| async move {
        match id {
            1 => Ok(Outcome::Success(Book {
                title: "Dune".to_owned(),
            })),
            2 => Err::<Outcome<Book>, BoxError>(LibraryError::CheckedOut(id).into()),
            _ => Err(LibraryError::Offline.into()),
        }
    }))
}

fn error_encoder() -> ProblemErrorEncoder {
    ProblemErrorEncoder::new(ProblemResolver::new(
        ProblemFactoryConfig::new()
            .matcher(ProblemMatcher::with_status(409, is_error::<LibraryError>())),
    ))
}

fn library_handler() -> ErrorEncoderHandler<Server<String, u32, Outcome<Book>, Book>> {
    let endpoint =
        business_error_middleware(BusinessErrorMatcher::new().register::<LibraryError>())
            .layer(borrow_book());
    let encoder = ErrorResponseEncoder::new(
        |_ctx: &RequestCtx, resp: Outcome<Book>| resp.into_result(),
        error_encoder(),
    );
    ErrorEncoderHandler::new(Server::new(endpoint, decode, encoder), error_encoder())
}

fn ctx() -> RequestCtx {
    RequestCtx::new().with_trace_id("trace-3")
}

fn graphql_error(err: &BoxError) -> &GraphQlError {
    err.downcast_ref::<GraphQlError>()
        .expect("handler errors must be graphql errors")
}

#[tokio::test]
async fn success_is_encoded() {
    let book = library_handler()
        .serve_graphql(ctx(), "1".to_owned())
        .await
        .unwrap();
    assert_eq!(
        book,
        Book {
            title: "Dune".to_owned()
        }
    );
}

#[tokio::test]
async fn business_failure_becomes_graphql_error() {
    let err = library_handler()
        .serve_graphql(ctx(), "2".to_owned())
        .await
        .unwrap_err();

    assert_eq!(
        serde_json::to_value(graphql_error(&err)).unwrap(),
        json!({
            "message": "book 2 is checked out",
            "extensions": {
                "status": 409,
                "title": "Conflict",
                "type": "about:blank",
                "trace_id": "trace-3"
            }
        })
    );
}

#[tokio::test]
async fn endpoint_error_is_encoded_once() {
    let err = library_handler()
        .serve_graphql(ctx(), "3".to_owned())
        .await
        .unwrap_err();

    let gql = graphql_error(&err);
    assert_eq!(gql.message, "catalog offline");
    assert_eq!(gql.extensions.as_ref().unwrap().status, 409);
}

#[tokio::test]
async fn decode_error_is_reported_and_hidden() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let server = Server::new(
        borrow_book(),
        decode,
        |_ctx: &RequestCtx, resp: Outcome<Book>| resp.into_result(),
    )
    .with_error_handler(error_handler_fn(move |ctx: &RequestCtx, err: &DynError| {
        sink.lock()
            .unwrap()
            .push(format!("{}: {err}", ctx.trace_id().unwrap_or("-")));
    }));
    let handler: Arc<dyn Handler<String, Book>> =
        Arc::new(ErrorEncoderHandler::with_default_encoder(server));

    let err = handler
        .serve_graphql(ctx(), "one".to_owned())
        .await
        .unwrap_err();

    let gql = graphql_error(&err);
    assert_eq!(gql.message, "something went wrong");
    assert_eq!(gql.extensions.as_ref().unwrap().status, 500);
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["trace-3: invalid digit found in string"]
    );
}

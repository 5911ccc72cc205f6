#![allow(clippy::unwrap_used, clippy::expect_used)]

//! gRPC handler pipeline: decode, endpoint, failer and status encoding.

use std::sync::{Arc, Mutex};

use tonic::{Code, Request, Status};

use errkit_endpoint::{
    BoxEndpoint, BoxError, DynError, FailerMiddleware, Middleware, Outcome, RequestCtx,
    endpoint_fn, error_handler_fn,
};
use errkit_errors::{ProblemFactoryConfig, ProblemMatcher, ProblemResolver, is_error};
use errkit_transport_grpc::{
    ErrorEncoderHandler, ErrorResponseEncoder, Handler, ProblemStatusConverter, Server,
    StatusErrorEncoder, TRACE_ID_METADATA_KEY,
};

/// Stand-in for a generated protobuf message.
#[derive(Debug, Clone, PartialEq)]
struct GetAccountRequest {
    id: String,
}

#[derive(Debug, Clone, PartialEq)]
struct AccountReply {
    owner: String,
}

#[derive(Debug, thiserror::Error)]
#[error("account {0} not found")]
struct AccountNotFound(u64);

fn decode(_ctx: &RequestCtx, req: GetAccountRequest) -> Result<u64, BoxError> {
    Ok(req.id.parse::<u64>()?)
}

fn encode(_ctx: &RequestCtx, owner: String) -> Result<AccountReply, BoxError> {
    Ok(AccountReply { owner })
}

fn get_account() -> BoxEndpoint<u64, String> {
    Arc::new(endpoint_fn(|_ctx: RequestCtx, id: u64| async move {
        match id {
            1 => Ok("ada".to_owned()),
            13 => Err::<String, BoxError>(Box::new(Status::permission_denied("restricted"))),
            _ => Err(Box::new(AccountNotFound(id)) as BoxError),
        }
    }))
}

fn status_encoder() -> StatusErrorEncoder<ProblemStatusConverter> {
    StatusErrorEncoder::new(ProblemStatusConverter::new(ProblemResolver::new(
        ProblemFactoryConfig::new()
            .matcher(ProblemMatcher::with_status(404, is_error::<AccountNotFound>())),
    )))
}

fn request(id: &str) -> Request<GetAccountRequest> {
    let mut req = Request::new(GetAccountRequest { id: id.to_owned() });
    req.metadata_mut()
        .insert(TRACE_ID_METADATA_KEY, "trace-9".parse().unwrap());
    req
}

fn account_handler() -> ErrorEncoderHandler<Server<GetAccountRequest, u64, String, AccountReply>> {
    ErrorEncoderHandler::new(Server::new(get_account(), decode, encode), status_encoder())
}

#[tokio::test]
async fn success_reply() {
    let reply = account_handler().serve(request("1")).await.unwrap();
    assert_eq!(
        reply.into_inner(),
        AccountReply {
            owner: "ada".to_owned()
        }
    );
}

#[tokio::test]
async fn matched_error_gets_mapped_code() {
    let status = account_handler().serve(request("7")).await.unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
    assert_eq!(status.message(), "account 7 not found");
}

#[tokio::test]
async fn endpoint_status_passes_through() {
    let status = account_handler().serve(request("13")).await.unwrap_err();
    assert_eq!(status.code(), Code::PermissionDenied);
    assert_eq!(status.message(), "restricted");
}

#[tokio::test]
async fn decode_error_is_reported_and_hidden() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let server = Server::new(get_account(), decode, encode).with_error_handler(error_handler_fn(
        move |ctx: &RequestCtx, err: &DynError| {
            sink.lock()
                .unwrap()
                .push(format!("{}: {err}", ctx.trace_id().unwrap_or("-")));
        },
    ));
    let handler = ErrorEncoderHandler::with_default_encoder(server);

    let status = handler.serve(request("abc")).await.unwrap_err();

    assert_eq!(status.code(), Code::Internal);
    assert_eq!(status.message(), "something went wrong");
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["trace-9: invalid digit found in string"]
    );
}

#[tokio::test]
async fn failed_response_is_encoded_as_status() {
    let endpoint = FailerMiddleware::new(is_error::<AccountNotFound>()).layer(Arc::new(
        endpoint_fn(|_ctx: RequestCtx, id: u64| async move {
            Err::<Outcome<String>, BoxError>(Box::new(AccountNotFound(id)))
        }),
    ));
    let encoder = ErrorResponseEncoder::new(
        |ctx: &RequestCtx, resp: Outcome<String>| encode(ctx, resp.into_result()?),
        status_encoder(),
    );
    let server = Server::new(endpoint, decode, encoder);

    let err = server.serve_grpc(request("5")).await.unwrap_err();
    let status = err.downcast_ref::<Status>().expect("failure must be encoded as a status");
    assert_eq!(status.code(), Code::NotFound);
    assert_eq!(status.message(), "account 5 not found");
}

#[tokio::test]
async fn wrapped_handler_boxes_status() {
    let handler: Arc<dyn Handler<GetAccountRequest, AccountReply>> = Arc::new(account_handler());

    let err = handler.serve_grpc(request("7")).await.unwrap_err();
    let status = err.downcast_ref::<Status>().unwrap();
    assert_eq!(status.code(), Code::NotFound);
}

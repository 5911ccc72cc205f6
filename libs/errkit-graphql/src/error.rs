//! GraphQL error objects built from problems.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use errkit_errors::{BoxError, DynError, Problem, ProblemFactory, ProblemResolver, RequestCtx};

/// An entry of the `errors` array of a GraphQL response.
///
/// The problem that produced the error travels in `extensions`, so clients get
/// the same classification an HTTP caller would see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
#[must_use]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<GraphQlErrorExtensions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQlErrorExtensions {
    pub status: u16,
    pub title: String,
    #[serde(rename = "type")]
    pub type_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl GraphQlError {
    /// An error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extensions: None,
        }
    }
}

impl From<Problem> for GraphQlError {
    fn from(problem: Problem) -> Self {
        let message = if problem.detail.is_empty() {
            problem.title.clone()
        } else {
            problem.detail
        };
        Self {
            message,
            extensions: Some(GraphQlErrorExtensions {
                status: problem.status,
                title: problem.title,
                type_url: problem.type_url,
                code: problem.code,
                trace_id: problem.trace_id,
            }),
        }
    }
}

/// Encodes an error as the error handed back to the GraphQL executor.
pub trait ErrorEncoder: Send + Sync {
    fn encode_error(&self, ctx: &RequestCtx, err: &DynError) -> BoxError;
}

impl<F> ErrorEncoder for F
where
    F: Fn(&RequestCtx, &DynError) -> BoxError + Send + Sync,
{
    fn encode_error(&self, ctx: &RequestCtx, err: &DynError) -> BoxError {
        self(ctx, err)
    }
}

impl<E: ErrorEncoder + ?Sized> ErrorEncoder for Arc<E> {
    fn encode_error(&self, ctx: &RequestCtx, err: &DynError) -> BoxError {
        (**self).encode_error(ctx, err)
    }
}

/// Resolves errors to problems and wraps them as [`GraphQlError`]s.
///
/// Errors that already are a [`GraphQlError`] are passed through.
#[derive(Clone)]
#[must_use]
pub struct ProblemErrorEncoder {
    factory: Arc<dyn ProblemFactory>,
}

impl ProblemErrorEncoder {
    pub fn new(factory: impl ProblemFactory + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// Build the GraphQL error for `err`.
    pub fn graphql_error(&self, ctx: &RequestCtx, err: &DynError) -> GraphQlError {
        if let Some(existing) = err.downcast_ref::<GraphQlError>() {
            return existing.clone();
        }
        self.factory.new_problem(ctx, err).into()
    }
}

impl Default for ProblemErrorEncoder {
    fn default() -> Self {
        Self::new(ProblemResolver::default())
    }
}

impl fmt::Debug for ProblemErrorEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemErrorEncoder").finish_non_exhaustive()
    }
}

impl ErrorEncoder for ProblemErrorEncoder {
    fn encode_error(&self, ctx: &RequestCtx, err: &DynError) -> BoxError {
        Box::new(self.graphql_error(ctx, err))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use errkit_errors::{ProblemFactoryConfig, ProblemMatcher, is_error};
    use serde_json::json;

    #[derive(Debug, thiserror::Error)]
    #[error("book is checked out")]
    struct CheckedOut;

    #[test]
    fn default_encoder_hides_details() {
        let err: BoxError = "select failed: relation books does not exist".into();
        let gql = ProblemErrorEncoder::default().graphql_error(&RequestCtx::new(), err.as_ref());

        assert_eq!(gql.message, "something went wrong");
        assert_eq!(
            serde_json::to_value(&gql).unwrap(),
            json!({
                "message": "something went wrong",
                "extensions": {
                    "status": 500,
                    "title": "Internal Server Error",
                    "type": "about:blank"
                }
            })
        );
    }

    #[test]
    fn matched_error_keeps_its_message() {
        let encoder = ProblemErrorEncoder::new(ProblemResolver::new(
            ProblemFactoryConfig::new()
                .matcher(ProblemMatcher::with_status(409, is_error::<CheckedOut>())),
        ));
        let err: BoxError = Box::new(CheckedOut);

        let gql = encoder.graphql_error(&RequestCtx::new(), err.as_ref());
        assert_eq!(gql.message, "book is checked out");
        let ext = gql.extensions.unwrap();
        assert_eq!(ext.status, 409);
        assert_eq!(ext.title, "Conflict");
    }

    #[test]
    fn existing_graphql_error_passes_through() {
        let original = GraphQlError::new("field `isbn` is required");
        let err: BoxError = Box::new(original.clone());

        let encoded = ProblemErrorEncoder::default().encode_error(&RequestCtx::new(), err.as_ref());
        assert_eq!(encoded.downcast_ref::<GraphQlError>(), Some(&original));
        assert_eq!(
            serde_json::to_value(&original).unwrap(),
            json!({"message": "field `isbn` is required"})
        );
    }

    #[test]
    fn empty_detail_uses_title_and_code_is_kept() {
        let gql = GraphQlError::from(Problem::new(404, "").with_code("BOOK_NOT_FOUND"));
        assert_eq!(gql.message, "Not Found");
        assert_eq!(gql.to_string(), "Not Found");
        assert_eq!(gql.extensions.unwrap().code, "BOOK_NOT_FOUND");
    }
}

//! RFC 9457 problem error encoders.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;

use errkit_errors::{
    APPLICATION_PROBLEM_JSON, APPLICATION_PROBLEM_XML, DynError, Problem, ProblemFactory,
    ProblemResolver, RequestCtx,
};

use crate::encode::{EncodeError, ErrorEncoder, HttpResponse, response};

const PROBLEM_XML_NAMESPACE: &str = "urn:ietf:rfc:7807";

/// Wire format of a problem document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProblemFormat {
    #[default]
    Json,
    Xml,
}

impl ProblemFormat {
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => APPLICATION_PROBLEM_JSON,
            Self::Xml => APPLICATION_PROBLEM_XML,
        }
    }
}

/// Encodes errors as problem documents built by a [`ProblemFactory`].
///
/// The content type is always set. The problem's status becomes the response
/// status unless it is unset, in which case the response stays `200 OK`. Statuses
/// outside 100..=599 are written as `500`.
#[derive(Clone)]
#[must_use]
pub struct ProblemErrorEncoder {
    factory: Arc<dyn ProblemFactory>,
    format: ProblemFormat,
}

impl fmt::Debug for ProblemErrorEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemErrorEncoder")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl ProblemErrorEncoder {
    pub fn new(factory: impl ProblemFactory + 'static, format: ProblemFormat) -> Self {
        Self {
            factory: Arc::new(factory),
            format,
        }
    }

    pub fn json(factory: impl ProblemFactory + 'static) -> Self {
        Self::new(factory, ProblemFormat::Json)
    }

    pub fn xml(factory: impl ProblemFactory + 'static) -> Self {
        Self::new(factory, ProblemFormat::Xml)
    }

    /// JSON encoder reporting every error as `500` "something went wrong".
    pub fn default_json() -> Self {
        Self::json(ProblemResolver::default())
    }

    /// XML encoder reporting every error as `500` "something went wrong".
    pub fn default_xml() -> Self {
        Self::xml(ProblemResolver::default())
    }

    #[must_use]
    pub fn format(&self) -> ProblemFormat {
        self.format
    }

    fn render(&self, problem: &Problem) -> Result<Vec<u8>, EncodeError> {
        match self.format {
            ProblemFormat::Json => Ok(serde_json::to_vec(problem)?),
            ProblemFormat::Xml => to_xml(problem).map(String::into_bytes),
        }
    }
}

impl Default for ProblemErrorEncoder {
    fn default() -> Self {
        Self::default_json()
    }
}

impl ErrorEncoder for ProblemErrorEncoder {
    fn encode_error(&self, ctx: &RequestCtx, err: &DynError) -> Result<HttpResponse, EncodeError> {
        let problem = self.factory.new_problem(ctx, err);
        let body = self.render(&problem)?;
        let status = response_status(problem.status);

        tracing::debug!(
            status = problem.status,
            content_type = self.format.content_type(),
            "encoding error as problem"
        );

        Ok(response(
            status,
            Some(self.format.content_type()),
            Bytes::from(body),
        ))
    }
}

/// An unset status keeps the default `200 OK`; anything outside 100..=599 is `500`.
fn response_status(status: u16) -> StatusCode {
    match status {
        0 => StatusCode::OK,
        100..=599 => StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// XML shape of a problem: `<problem xmlns="urn:ietf:rfc:7807">`.
#[derive(Serialize)]
struct XmlProblem<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "type")]
    type_url: &'a str,
    title: &'a str,
    status: u16,
    detail: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    instance: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<&'a str>,
}

fn to_xml(problem: &Problem) -> Result<String, EncodeError> {
    let doc = XmlProblem {
        xmlns: PROBLEM_XML_NAMESPACE,
        type_url: &problem.type_url,
        title: &problem.title,
        status: problem.status,
        detail: &problem.detail,
        instance: &problem.instance,
        code: &problem.code,
        trace_id: problem.trace_id.as_deref(),
    };
    quick_xml::se::to_string_with_root("problem", &doc).map_err(|e| EncodeError::Xml(Box::new(e)))
}

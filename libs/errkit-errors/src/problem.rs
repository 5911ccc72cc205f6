//! RFC 9457 Problem Details (pure data model, no HTTP framework dependencies)

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Content type for JSON Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Content type for XML Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_XML: &str = "application/problem+xml";

/// Default problem type when no more specific URI applies.
pub const ABOUT_BLANK: &str = "about:blank";

/// RFC 9457 Problem Details.
///
/// A `status` of `0` is a sentinel meaning "unset": transports fall back to their
/// implicit default instead of writing a status. Once built, a `Problem` is treated
/// as immutable; it is serialized per request and never cached by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Problem {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type", default = "about_blank")]
    pub type_url: String,
    /// A short, human-readable summary of the problem type.
    #[serde(default)]
    pub title: String,
    /// The protocol status code for this occurrence of the problem, `0` when unset.
    #[serde(default)]
    pub status: u16,
    /// A human-readable explanation specific to this occurrence of the problem.
    #[serde(default)]
    pub detail: String,
    /// A URI reference that identifies the specific occurrence of the problem.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance: String,
    /// Optional machine-readable error code defined by the application.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    /// Optional trace id useful for tracing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

fn about_blank() -> String {
    ABOUT_BLANK.to_owned()
}

/// Canonical reason phrase for a status, empty when the status is unknown or unset.
#[must_use]
pub fn status_title(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
}

impl Problem {
    /// Create a new Problem with the given status and detail.
    ///
    /// The title is derived from the status.
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        Self {
            type_url: about_blank(),
            title: status_title(status).to_owned(),
            status,
            detail: detail.into(),
            instance: String::new(),
            code: String::new(),
            trace_id: None,
        }
    }

    /// A problem with no status, title or detail.
    pub fn blank() -> Self {
        Self::new(0, String::new())
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = uri.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// The status as an HTTP status code, `None` when unset or out of range.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        if self.status == 0 {
            return None;
        }
        StatusCode::from_u16(self.status).ok()
    }
}

/// Axum integration: make Problem directly usable as a response
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for Problem {
    fn into_response(self) -> axum::response::Response {
        use axum::http::HeaderValue;

        let status = self.status_code();
        let mut resp = axum::Json(self).into_response();
        if let Some(status) = status {
            *resp.status_mut() = status;
        }
        resp.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        resp
    }
}

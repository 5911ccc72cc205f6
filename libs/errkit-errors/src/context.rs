//! Request metadata passed explicitly through every pipeline stage.

use std::sync::Arc;
use std::time::Instant;

/// Per-request metadata travelling alongside the request.
///
/// Endpoints, middlewares, matchers and problem factories all receive the same
/// `RequestCtx`. Nothing is stored in task-locals or globals: a stage that needs
/// the operation name or trace id reads it from here.
///
/// The deadline is carried untouched. Handlers may consult it, the pipeline never
/// enforces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct RequestCtx {
    operation: Option<Arc<str>>,
    deadline: Option<Instant>,
    trace_id: Option<String>,
    instance: Option<String>,
}

impl RequestCtx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the human-readable operation name (e.g. `"users.get"`).
    pub fn with_operation(mut self, name: impl Into<Arc<str>>) -> Self {
        self.operation = Some(name.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// Set the URI reference identifying this occurrence (usually the request path).
    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = Some(uri.into());
        self
    }

    #[must_use]
    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }
}

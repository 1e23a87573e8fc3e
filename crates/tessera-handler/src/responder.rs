//! Error responders.
//!
//! An [`ErrorResponder`] is the single place a service turns a failed
//! business call into a transport response. The factory never inspects the
//! error itself.

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use tessera_core::transport::empty_response;
use tessera_core::{DomainError, HttpRequest, HttpResponse};
use tessera_telemetry::Team;

/// Converts a business failure into a response.
///
/// Receives the error by value, so each failure is consumed exactly once.
pub type ErrorResponder = Arc<dyn Fn(DomainError, &HttpRequest) -> HttpResponse + Send + Sync>;

/// Request header read for the trace id attached to error logs.
pub const DEFAULT_TRACE_HEADER: &str = "x-trace-id";

/// An [`ErrorResponder`] driven by a code-to-status table.
///
/// Every failure is logged for the ops team with its code, cause, stack trace
/// and the request's trace id. The response carries the mapped status and no
/// body; errors without a mapped code fall back to the default status.
///
/// ```rust
/// use http::StatusCode;
/// use tessera_core::Code;
/// use tessera_handler::CodeStatusResponder;
///
/// const ERR_FETCH: Code = Code::new("us101e", "Data fetch failed");
///
/// let responder = CodeStatusResponder::new().map(ERR_FETCH, StatusCode::NOT_FOUND);
/// assert_eq!(responder.status_for(Some(&ERR_FETCH)), StatusCode::NOT_FOUND);
/// assert_eq!(responder.status_for(None), StatusCode::INTERNAL_SERVER_ERROR);
/// ```
#[derive(Debug, Clone)]
pub struct CodeStatusResponder {
    statuses: HashMap<String, StatusCode>,
    default_status: StatusCode,
    trace_header: String,
}

impl Default for CodeStatusResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeStatusResponder {
    /// Creates a responder that answers every failure with `500`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            statuses: HashMap::new(),
            default_status: StatusCode::INTERNAL_SERVER_ERROR,
            trace_header: DEFAULT_TRACE_HEADER.to_string(),
        }
    }

    /// Maps a code to a status.
    #[must_use]
    pub fn map(mut self, code: impl AsRef<str>, status: StatusCode) -> Self {
        self.statuses.insert(code.as_ref().to_string(), status);
        self
    }

    /// Sets the status used for unmapped or uncoded failures.
    #[must_use]
    pub fn default_status(mut self, status: StatusCode) -> Self {
        self.default_status = status;
        self
    }

    /// Sets the request header logged as the trace id.
    #[must_use]
    pub fn trace_header(mut self, header: impl Into<String>) -> Self {
        self.trace_header = header.into();
        self
    }

    /// Resolves the status for an optional code.
    #[must_use]
    pub fn status_for(&self, code: Option<&tessera_core::Code>) -> StatusCode {
        code.and_then(|c| self.statuses.get(c.code()))
            .copied()
            .unwrap_or(self.default_status)
    }

    /// Logs `err` and builds the empty-bodied response.
    #[must_use]
    pub fn respond(&self, err: DomainError, req: &HttpRequest) -> HttpResponse {
        let trace_id = req
            .headers()
            .get(self.trace_header.as_str())
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let code = err.code().map(|c| c.code().to_string()).unwrap_or_default();
        let stack_trace = err
            .stack_trace()
            .map(ToString::to_string)
            .unwrap_or_default();

        tracing::error!(
            team = %Team::Ops,
            trace_id = %trace_id,
            code = %code,
            error = %err,
            stack_trace = %stack_trace,
            "Request failed"
        );

        empty_response(self.status_for(err.code()))
    }

    /// Wraps this responder for use by a [`HandlerFactory`](crate::HandlerFactory).
    #[must_use]
    pub fn into_responder(self) -> ErrorResponder {
        Arc::new(move |err: DomainError, req: &HttpRequest| self.respond(err, req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tessera_core::Code;

    const ERR_FETCH: Code = Code::new("us101e", "Data fetch failed");
    const ERR_POLICY: Code = Code::new("us201e", "Policy violated");

    fn request() -> HttpRequest {
        http::Request::builder()
            .uri("/managing/queries/view-user/u1")
            .header("x-trace-id", "trace-1")
            .body(Bytes::new())
            .unwrap()
    }

    #[test]
    fn test_mapped_code() {
        let responder = CodeStatusResponder::new().map(ERR_FETCH, StatusCode::NOT_FOUND);
        let err = DomainError::with_code(std::io::Error::other("gone"), ERR_FETCH);
        let response = responder.respond(err, &request());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unmapped_code_uses_default() {
        let responder = CodeStatusResponder::new().map(ERR_FETCH, StatusCode::NOT_FOUND);
        let response = responder.respond(DomainError::from_code(ERR_POLICY), &request());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_uncoded_error_uses_default() {
        let responder = CodeStatusResponder::new().default_status(StatusCode::BAD_GATEWAY);
        let response = responder.respond(DomainError::new("boom"), &request());
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_map_accepts_plain_identifiers() {
        let responder = CodeStatusResponder::new().map("us201e", StatusCode::FORBIDDEN);
        assert_eq!(responder.status_for(Some(&ERR_POLICY)), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_into_responder() {
        let responder = CodeStatusResponder::new()
            .map(ERR_POLICY, StatusCode::FORBIDDEN)
            .trace_header("x-request-id")
            .into_responder();
        let response = responder(DomainError::from_code(ERR_POLICY), &request());
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

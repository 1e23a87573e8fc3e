//! Transport types shared by the handler and server crates.
//!
//! The server collects each request body before dispatch, so handlers see a
//! fully buffered [`HttpRequest`] and produce a fully buffered
//! [`HttpResponse`].

use std::error::Error;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;

pub use http::StatusCode;

/// A request whose body has already been collected.
pub type HttpRequest = Request<Bytes>;

/// Type alias for HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

/// Future returned by a type-erased handler.
pub type BoxedResponse = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;

/// A type-erased request handler bound to one route.
pub type BoxedHandler = Arc<dyn Fn(HttpRequest) -> BoxedResponse + Send + Sync>;

/// Builds a response with the given status and no body.
#[must_use]
pub fn empty_response(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Outcome of classifying a failed response write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    /// The peer went away mid-write. Logged at reduced severity.
    PeerDisconnected,
    /// Any other write failure.
    Other,
}

/// Classifies a write failure by walking its source chain for an I/O error
/// that signals the peer closed the connection.
#[must_use]
pub fn classify_write_failure(err: &(dyn Error + 'static)) -> WriteFailure {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ) {
                return WriteFailure::PeerDisconnected;
            }
        }
        current = e.source();
    }
    WriteFailure::Other
}

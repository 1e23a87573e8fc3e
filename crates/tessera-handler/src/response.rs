//! Response serialization.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use tessera_core::transport::empty_response;
use tessera_core::HttpResponse;
use tessera_telemetry::Team;

/// Content type written before every JSON body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Serializes `value` as a `200 OK` JSON response.
///
/// A value that cannot be serialized is a backend defect, not a client
/// error: it is logged for the dev team and answered with an empty `500`.
#[must_use]
pub fn json_response<R: Serialize + ?Sized>(value: &R) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            response
        }
        Err(e) => {
            tracing::error!(team = %Team::Dev, error = %e, "Response marshal failed");
            empty_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

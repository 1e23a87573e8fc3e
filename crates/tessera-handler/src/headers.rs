//! Header mappers.

use std::sync::Arc;

use tessera_core::{Headers, HttpRequest};

/// Builds the [`Headers`] handed to a business function from the raw request.
///
/// The handler pipeline never inspects the result; a service uses it to pass
/// trace ids or auth tokens through to its business functions.
pub type HeaderMapper = Arc<dyn Fn(&HttpRequest) -> Headers + Send + Sync>;

/// A mapper that passes no headers.
#[must_use]
pub fn no_headers() -> HeaderMapper {
    Arc::new(|_: &HttpRequest| Headers::new())
}

/// A mapper that copies request headers into [`Headers`] under new keys.
///
/// Each pair is `(request header name, key)`. Missing or non-UTF-8 headers
/// are skipped.
///
/// ```rust
/// use bytes::Bytes;
/// use tessera_handler::forward_headers;
///
/// let mapper = forward_headers(&[("x-trace-id", "traceId")]);
/// let req = http::Request::builder()
///     .header("x-trace-id", "abc")
///     .body(Bytes::new())
///     .unwrap();
///
/// assert_eq!(mapper(&req).get("traceId"), Some("abc"));
/// ```
#[must_use]
pub fn forward_headers(pairs: &[(&str, &str)]) -> HeaderMapper {
    let pairs: Vec<(String, String)> = pairs
        .iter()
        .map(|(header, key)| ((*header).to_string(), (*key).to_string()))
        .collect();

    Arc::new(move |req: &HttpRequest| {
        let mut headers = Headers::new();
        for (header, key) in &pairs {
            if let Some(value) = req.headers().get(header).and_then(|v| v.to_str().ok()) {
                headers.set(key.clone(), value);
            }
        }
        headers
    })
}

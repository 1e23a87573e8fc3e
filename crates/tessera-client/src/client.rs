//! Outbound calls.

use std::time::Duration;

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tessera_telemetry::Team;

use crate::ClientError;

/// Timeout applied to every call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain";

/// JSON-over-HTTP client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    /// Creates a client with the default 10 second timeout.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Request` if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, ClientError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Request` if the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ClientError> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }

    /// Sends a `GET` and decodes the response.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn get<R: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<R, ClientError> {
        self.send::<(), R>(Method::GET, url, None, headers).await
    }

    /// Sends a `POST` with a JSON body and decodes the response.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        headers: &[(&str, &str)],
    ) -> Result<R, ClientError> {
        self.send(Method::POST, url, Some(body), headers).await
    }

    /// Sends a request and decodes the response.
    ///
    /// `Content-Type: application/json` is set only when `body` is present.
    /// On success, an empty body decodes as JSON `null` and a `text/plain`
    /// body decodes as a JSON string, so `R = String` receives it verbatim.
    ///
    /// # Errors
    ///
    /// - `DataNotFound` on `404`
    /// - `Status` on any status other than `200` or `202`
    /// - `Encode` / `Decode` on serialization failures
    /// - `Request` on connection failures, invalid headers and timeouts
    pub async fn send<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        headers: &[(&str, &str)],
    ) -> Result<R, ClientError> {
        let mut request = self.inner.request(method.clone(), url);

        for (key, value) in headers {
            match (HeaderName::try_from(*key), HeaderValue::try_from(*value)) {
                (Ok(name), Ok(value)) => request = request.header(name, value),
                _ => tracing::warn!(header = %key, "Skipping invalid header"),
            }
        }

        if let Some(body) = body {
            let encoded = serde_json::to_vec(body).map_err(ClientError::Encode)?;
            request = request
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(encoded);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(
                team = %Team::Ops,
                method = %method,
                url = %url,
                error = %e,
                "Client request failed"
            );
            ClientError::Request(e)
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::DataNotFound);
        }
        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let is_text = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(TEXT_CONTENT_TYPE));
        let bytes = response.bytes().await?;

        decode(&bytes, is_text)
    }
}

fn decode<R: DeserializeOwned>(bytes: &[u8], is_text: bool) -> Result<R, ClientError> {
    if bytes.is_empty() {
        return serde_json::from_value(serde_json::Value::Null).map_err(ClientError::Decode);
    }
    if is_text {
        let text = String::from_utf8_lossy(bytes).into_owned();
        return serde_json::from_value(serde_json::Value::String(text))
            .map_err(ClientError::Decode);
    }
    serde_json::from_slice(bytes).map_err(ClientError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: String,
    }

    #[test]
    fn test_decode_json() {
        let user: User = decode(br#"{"id":"u1"}"#, false).unwrap();
        assert_eq!(user.id, "u1");
    }

    #[test]
    fn test_decode_empty_is_null() {
        let user: Option<User> = decode(b"", false).unwrap();
        assert!(user.is_none());
        decode::<()>(b"", false).unwrap();
    }

    #[test]
    fn test_decode_text_passes_through() {
        let text: String = decode(b"{not json}", true).unwrap();
        assert_eq!(text, "{not json}");
    }

    #[test]
    fn test_decode_text_into_struct_fails() {
        let result = decode::<User>(b"plain", true);
        assert!(matches!(result, Err(ClientError::Decode(_))));
    }
}

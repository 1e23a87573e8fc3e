use thiserror::Error;

/// Errors returned by [`HttpClient`](crate::HttpClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The remote answered `404`.
    #[error("data not found")]
    DataNotFound,

    /// The remote answered with a status other than `200`, `202` or `404`.
    #[error("call response failed with status={status} body={body}")]
    Status {
        /// Response status code
        status: u16,
        /// Response body, lossily decoded
        body: String,
    },

    /// The request body could not be serialized.
    #[error("failed to encode request body")]
    Encode(#[source] serde_json::Error),

    /// The response body could not be deserialized.
    #[error("failed to decode response body")]
    Decode(#[source] serde_json::Error),

    /// The request could not be built or sent, or timed out.
    #[error("request failed")]
    Request(#[from] reqwest::Error),
}

impl ClientError {
    /// Returns `true` for [`ClientError::DataNotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DataNotFound)
    }

    /// Returns `true` if the call ran out of time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_timeout())
    }
}

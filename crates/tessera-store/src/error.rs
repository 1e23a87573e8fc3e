//! Store error types.

use std::time::Duration;

use tessera_core::BoxError;
use thiserror::Error;

/// Errors raised by a [`DocumentStore`](crate::DocumentStore) or by the
/// repository's timeout enforcement.
///
/// [`Repository`](crate::Repository) wraps these in a
/// [`DomainError`](tessera_core::DomainError); callers recover them with
/// `DomainError::cause_as::<StoreError>()`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document matched a point lookup.
    #[error("no document found in collection {collection}")]
    NotFound {
        /// Collection that was queried.
        collection: String,
    },

    /// A round trip exceeded the repository timeout.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Configured timeout.
        after: Duration,
    },

    /// An insert reused an existing `_id`.
    #[error("duplicate key {id} in collection {collection}")]
    DuplicateKey {
        /// Collection that rejected the insert.
        collection: String,
        /// Offending identifier.
        id: String,
    },

    /// A document could not be decoded into the requested type.
    #[error("failed to decode document: {0}")]
    Decode(#[from] bson::de::Error),

    /// An entity could not be encoded as a document.
    #[error("failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),

    /// The store does not support a filter operator or pipeline stage.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The store could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The store was used after it was disconnected.
    #[error("store client is disconnected")]
    Disconnected,

    /// Any other failure reported by the backing store.
    #[error("store backend error: {0}")]
    Backend(#[source] BoxError),
}

impl StoreError {
    /// Returns `true` for [`StoreError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for [`StoreError::Timeout`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Wraps a backend error.
    pub fn backend(err: impl Into<BoxError>) -> Self {
        Self::Backend(err.into())
    }
}

//! The narrow interface a backing store implements.
//!
//! Store-specific cursor and session machinery stays behind these traits so
//! [`Repository`](crate::Repository) can run unchanged over MongoDB or the
//! in-memory store used by tests.

use async_trait::async_trait;
use bson::{Bson, Document};

use crate::StoreError;

/// Paging and ordering for a find.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Number of matching documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return. `None` means no limit.
    pub limit: Option<i64>,
    /// Sort specification, `1` ascending and `-1` descending per key.
    pub sort: Option<Document>,
}

/// A document store reachable over the network.
///
/// Implementations must be safe for concurrent use; the repository shares a
/// single instance across all requests without additional locking.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the database this store is bound to.
    fn database_name(&self) -> &str;

    /// Active liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Opens a cursor over matching documents.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Box<dyn DocumentCursor>, StoreError>;

    /// Returns the first matching document, if any.
    async fn find_one(&self, collection: &str, filter: Document)
        -> Result<Option<Document>, StoreError>;

    /// Counts matching documents.
    async fn count(&self, collection: &str, filter: Document) -> Result<u64, StoreError>;

    /// Inserts a document and returns its `_id`.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson, StoreError>;

    /// Replaces the first matching document and returns the matched count.
    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
    ) -> Result<u64, StoreError>;

    /// Deletes the first matching document and returns the deleted count.
    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, StoreError>;

    /// Opens a cursor over the output of an aggregation pipeline.
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Box<dyn DocumentCursor>, StoreError>;

    /// Returns a handle for chunked binary storage.
    fn bucket(&self) -> Result<Box<dyn BinaryBucket>, StoreError>;

    /// Closes the connection.
    async fn disconnect(&self) -> Result<(), StoreError>;
}

/// An open result set that is drained in a separate round trip.
#[async_trait]
pub trait DocumentCursor: Send {
    /// Drains every remaining document.
    async fn collect(self: Box<Self>) -> Result<Vec<Document>, StoreError>;
}

/// Large-object storage outside the JSON document path.
#[async_trait]
pub trait BinaryBucket: Send + Sync {
    /// Stores `data` under `filename` and returns the new file id.
    async fn upload(&self, filename: &str, data: Vec<u8>) -> Result<Bson, StoreError>;

    /// Reads a stored file in full.
    async fn download(&self, id: &Bson) -> Result<Vec<u8>, StoreError>;

    /// Removes a stored file.
    async fn delete(&self, id: &Bson) -> Result<(), StoreError>;
}

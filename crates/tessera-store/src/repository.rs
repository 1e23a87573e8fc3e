//! The timeout-bounded repository handle.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bson::{Bson, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tessera_core::{DomainError, DomainResult};
use tessera_telemetry::Team;

use crate::store::{BinaryBucket, DocumentStore, FindOptions};
use crate::StoreError;

/// Default per-operation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const ID_FIELD: &str = "_id";

/// Data-access handle bound to one database.
///
/// Create one at startup and share it (behind an `Arc`) with every handler.
/// Each remote round trip opens a fresh timeout window of the configured
/// duration; operations that open a cursor and then drain it use two windows.
///
/// Failures are returned as [`DomainError`]s built with
/// [`DomainError::traced`] around a [`StoreError`], with no code attached.
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
    connected: AtomicBool,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("database", &self.store.database_name())
            .field("timeout", &self.timeout)
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish()
    }
}

impl Repository {
    /// Wraps a store and verifies it is reachable.
    ///
    /// The liveness probe runs within `timeout`. Any failure aborts
    /// construction; there is no retry.
    ///
    /// # Errors
    ///
    /// Returns the probe failure wrapped in a [`DomainError`].
    pub async fn new(timeout: Duration, store: Arc<dyn DocumentStore>) -> DomainResult<Self> {
        let database = store.database_name().to_string();

        if let Err(e) = bounded("ping", timeout, store.ping()).await {
            tracing::error!(team = %Team::Ops, database = %database, error = %e, "Ping failed");
            return Err(DomainError::traced(e));
        }

        tracing::info!(database = %database, "Document store connected");
        Ok(Self {
            store,
            timeout,
            connected: AtomicBool::new(true),
        })
    }

    /// Connects to MongoDB and verifies the connection.
    ///
    /// When `options` is `None` the connection string is read from
    /// `MONGO_DB_URI`.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the connection string is missing or
    /// invalid, or if the server does not answer the probe within `timeout`.
    #[cfg(feature = "mongodb")]
    pub async fn connect_mongodb(
        timeout: Duration,
        database: &str,
        options: Option<mongodb::options::ClientOptions>,
    ) -> DomainResult<Self> {
        let store = bounded("connect", timeout, crate::MongoStore::connect(database, options))
            .await
            .map_err(|e| {
                tracing::error!(team = %Team::Ops, database = %database, error = %e, "Connect failed");
                DomainError::traced(e)
            })?;
        Self::new(timeout, Arc::new(store)).await
    }

    /// Name of the bound database.
    #[must_use]
    pub fn database_name(&self) -> &str {
        self.store.database_name()
    }

    /// Per-operation timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Closes the connection within the repository timeout.
    ///
    /// Only the first call reaches the store; later calls are no-ops. Failures
    /// are logged, not returned.
    pub async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }

        match bounded("disconnect", self.timeout, self.store.disconnect()).await {
            Ok(()) => {
                tracing::info!(database = %self.database_name(), "Document store disconnected");
            }
            Err(e) => {
                tracing::error!(
                    team = %Team::Ops,
                    database = %self.database_name(),
                    error = %e,
                    "Document store disconnect failed"
                );
            }
        }
    }

    /// Returns one page of matching documents.
    ///
    /// `page_number` is 1-based: the store skips `(page_number - 1) * page_size`
    /// documents and returns at most `page_size`. A `page_size` of zero means
    /// no limit. `sort_params` is a flat `key, direction, key, direction, ...`
    /// sequence, see [`sort_from_params`].
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] on timeout, store failure or decode failure.
    pub async fn find<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Document,
        page_size: u64,
        page_number: u64,
        sort_params: &[&str],
    ) -> DomainResult<Vec<T>> {
        let (skip, limit) = paging(page_size, page_number);
        let options = FindOptions {
            skip: Some(skip),
            limit,
            sort: sort_from_params(sort_params),
        };

        let cursor = self
            .bounded("find", self.store.find(collection, filter, options))
            .await?;
        let documents = self.bounded("find.collect", cursor.collect()).await?;
        decode_all(documents)
    }

    /// Looks up a document by `_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] wrapping [`StoreError::NotFound`] when no
    /// document has the id, or wrapping the timeout, store or decode failure.
    pub async fn find_by_id<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: impl Into<Bson>,
    ) -> DomainResult<T> {
        let filter = id_filter(id.into());
        let document = self
            .bounded("find_by_id", self.store.find_one(collection, filter))
            .await?
            .ok_or_else(|| {
                DomainError::traced(StoreError::NotFound {
                    collection: collection.to_string(),
                })
            })?;
        bson::from_document(document).map_err(|e| DomainError::traced(StoreError::from(e)))
    }

    /// Counts matching documents.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] on timeout or store failure.
    pub async fn count(&self, collection: &str, filter: Document) -> DomainResult<u64> {
        self.bounded("count", self.store.count(collection, filter))
            .await
    }

    /// Inserts an entity.
    ///
    /// The entity carries its own `_id`; `_id` here is accepted for symmetry
    /// with [`update`](Self::update) and [`delete`](Self::delete) and is not
    /// used.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] on encode failure, timeout, duplicate key or
    /// store failure.
    pub async fn create<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        _id: impl Into<Bson>,
        entity: &T,
    ) -> DomainResult<()> {
        let document = encode(entity)?;
        self.bounded("create", self.store.insert_one(collection, document))
            .await
            .map(|_| ())
    }

    /// Replaces the document with the given `_id`.
    ///
    /// There is no partial update. Replacing an id that does not exist is not
    /// reported as an error, so callers cannot tell it apart from a
    /// successful replace.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] on encode failure, timeout or store failure.
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: impl Into<Bson>,
        entity: &T,
    ) -> DomainResult<()> {
        let document = encode(entity)?;
        let filter = id_filter(id.into());
        let matched = self
            .bounded("update", self.store.replace_one(collection, filter, document))
            .await?;
        if matched == 0 {
            tracing::debug!(collection = %collection, "Update matched no document");
        }
        Ok(())
    }

    /// Deletes the document with the given `_id`.
    ///
    /// Deleting an id that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] on timeout or store failure.
    pub async fn delete(&self, collection: &str, id: impl Into<Bson>) -> DomainResult<()> {
        let filter = id_filter(id.into());
        let deleted = self
            .bounded("delete", self.store.delete_one(collection, filter))
            .await?;
        if deleted == 0 {
            tracing::debug!(collection = %collection, "Delete matched no document");
        }
        Ok(())
    }

    /// Runs an aggregation pipeline and decodes every output document.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] on timeout, store failure, unsupported stage
    /// or decode failure.
    pub async fn aggregate<T: DeserializeOwned>(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> DomainResult<Vec<T>> {
        let cursor = self
            .bounded("aggregate", self.store.aggregate(collection, pipeline))
            .await?;
        let documents = self.bounded("aggregate.collect", cursor.collect()).await?;
        decode_all(documents)
    }

    /// Returns a handle for large-object binary storage.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the store cannot open a bucket.
    pub fn new_binary_bucket(&self) -> DomainResult<Bucket> {
        let inner = self.store.bucket().map_err(DomainError::traced)?;
        Ok(Bucket {
            inner,
            timeout: self.timeout,
        })
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> DomainResult<T>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        bounded(operation, self.timeout, fut)
            .await
            .map_err(DomainError::traced)
    }
}

/// Binary storage handle obtained from [`Repository::new_binary_bucket`].
///
/// Each call is bounded by the repository timeout.
pub struct Bucket {
    inner: Box<dyn BinaryBucket>,
    timeout: Duration,
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Bucket {
    /// Stores `data` and returns the new file id.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] on timeout or store failure.
    pub async fn upload(&self, filename: &str, data: Vec<u8>) -> DomainResult<Bson> {
        bounded("bucket.upload", self.timeout, self.inner.upload(filename, data))
            .await
            .map_err(DomainError::traced)
    }

    /// Reads a stored file in full.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] wrapping [`StoreError::NotFound`] for an
    /// unknown id, or the timeout or store failure.
    pub async fn download(&self, id: &Bson) -> DomainResult<Vec<u8>> {
        bounded("bucket.download", self.timeout, self.inner.download(id))
            .await
            .map_err(DomainError::traced)
    }

    /// Removes a stored file.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] on timeout or store failure.
    pub async fn delete(&self, id: &Bson) -> DomainResult<()> {
        bounded("bucket.delete", self.timeout, self.inner.delete(id))
            .await
            .map_err(DomainError::traced)
    }
}

/// Builds a sort specification from a flat `key, direction, ...` sequence.
///
/// A direction of exactly `"asc"` sorts ascending (`1`); anything else sorts
/// descending (`-1`). A trailing key without a direction sorts descending.
/// Returns `None` for an empty sequence.
///
/// ```rust
/// use tessera_store::{doc, sort_from_params};
///
/// let sort = sort_from_params(&["name", "asc", "age", "desc"]);
/// assert_eq!(sort, Some(doc! { "name": 1, "age": -1 }));
/// ```
#[must_use]
pub fn sort_from_params(sort_params: &[&str]) -> Option<Document> {
    if sort_params.is_empty() {
        return None;
    }

    let mut sort = Document::new();
    for pair in sort_params.chunks(2) {
        let direction = if pair.get(1) == Some(&"asc") { 1 } else { -1 };
        sort.insert(pair[0], direction);
    }
    Some(sort)
}

/// Converts 1-based paging into `(skip, limit)`.
pub(crate) fn paging(page_size: u64, page_number: u64) -> (u64, Option<i64>) {
    let skip = page_number.saturating_sub(1).saturating_mul(page_size);
    let limit = if page_size == 0 {
        None
    } else {
        Some(i64::try_from(page_size).unwrap_or(i64::MAX))
    };
    (skip, limit)
}

async fn bounded<T, F>(operation: &'static str, after: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| StoreError::Timeout { operation, after })?
}

fn id_filter(id: Bson) -> Document {
    let mut filter = Document::new();
    filter.insert(ID_FIELD, id);
    filter
}

fn encode<T: Serialize + ?Sized>(entity: &T) -> DomainResult<Document> {
    bson::to_document(entity).map_err(|e| DomainError::traced(StoreError::from(e)))
}

fn decode_all<T: DeserializeOwned>(documents: Vec<Document>) -> DomainResult<Vec<T>> {
    documents
        .into_iter()
        .map(|d| bson::from_document(d).map_err(|e| DomainError::traced(StoreError::from(e))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use bson::doc;
    use proptest::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Person {
        #[serde(rename = "_id")]
        id: String,
        name: String,
        age: i32,
    }

    fn person(id: &str, name: &str, age: i32) -> Person {
        Person {
            id: id.to_string(),
            name: name.to_string(),
            age,
        }
    }

    async fn seeded() -> Repository {
        let store = Arc::new(InMemoryStore::new("people"));
        let repo = Repository::new(Duration::from_secs(1), store).await.unwrap();
        for p in [
            person("p1", "Ada", 36),
            person("p2", "Grace", 45),
            person("p3", "Edsger", 72),
            person("p4", "Barbara", 45),
            person("p5", "Alan", 41),
        ] {
            repo.create("people", p.id.clone(), &p).await.unwrap();
        }
        repo
    }

    fn store_error(err: &DomainError) -> &StoreError {
        err.cause_as::<StoreError>().expect("store error cause")
    }

    #[test]
    fn test_sort_from_params() {
        assert_eq!(sort_from_params(&[]), None);
        assert_eq!(
            sort_from_params(&["age", "asc", "name", "DESC"]),
            Some(doc! { "age": 1, "name": -1 })
        );
        assert_eq!(sort_from_params(&["age", "ASC"]), Some(doc! { "age": -1 }));
    }

    #[test]
    fn test_sort_dangling_key_is_descending() {
        assert_eq!(
            sort_from_params(&["age", "asc", "name"]),
            Some(doc! { "age": 1, "name": -1 })
        );
    }

    #[test]
    fn test_paging() {
        assert_eq!(paging(10, 1), (0, Some(10)));
        assert_eq!(paging(10, 3), (20, Some(10)));
        assert_eq!(paging(10, 0), (0, Some(10)));
        assert_eq!(paging(0, 4), (0, None));
    }

    proptest! {
        #[test]
        fn prop_paging_arithmetic(size in 1u64..10_000, page in 1u64..10_000) {
            let (skip, limit) = paging(size, page);
            prop_assert_eq!(skip, (page - 1) * size);
            prop_assert_eq!(limit, Some(i64::try_from(size).unwrap()));
        }

        #[test]
        fn prop_sort_direction(pairs in proptest::collection::vec(("[a-z]{1,8}", "(asc|desc|ASC|x|)"), 1..6)) {
            let mut params = Vec::new();
            let mut expected = Document::new();
            for (key, dir) in &pairs {
                params.push(key.as_str());
                params.push(dir.as_str());
                expected.insert(key.clone(), if dir == "asc" { 1 } else { -1 });
            }
            prop_assert_eq!(sort_from_params(&params), Some(expected));
        }
    }

    #[tokio::test]
    async fn test_find_pages_in_store_order() {
        let repo = seeded().await;

        let first: Vec<Person> = repo.find("people", doc! {}, 2, 1, &[]).await.unwrap();
        let second: Vec<Person> = repo.find("people", doc! {}, 2, 2, &[]).await.unwrap();
        let third: Vec<Person> = repo.find("people", doc! {}, 2, 3, &[]).await.unwrap();

        let ids = |v: &[Person]| v.iter().map(|p| p.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ["p1", "p2"]);
        assert_eq!(ids(&second), ["p3", "p4"]);
        assert_eq!(ids(&third), ["p5"]);
    }

    #[tokio::test]
    async fn test_find_with_filter_and_sort() {
        let repo = seeded().await;

        let found: Vec<Person> = repo
            .find("people", doc! { "age": 45 }, 10, 1, &["name", "asc"])
            .await
            .unwrap();
        assert_eq!(found, vec![person("p4", "Barbara", 45), person("p2", "Grace", 45)]);

        let oldest: Vec<Person> = repo
            .find("people", doc! {}, 1, 1, &["age", "desc"])
            .await
            .unwrap();
        assert_eq!(oldest, vec![person("p3", "Edsger", 72)]);
    }

    #[tokio::test]
    async fn test_find_decode_failure() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct WrongShape {
            salary: i64,
        }

        let repo = seeded().await;
        let err = repo
            .find::<WrongShape>("people", doc! {}, 10, 1, &[])
            .await
            .unwrap_err();
        assert!(matches!(store_error(&err), StoreError::Decode(_)));
        assert!(err.code().is_none());
        assert!(err.stack_trace().is_some());
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let repo = seeded().await;
        let found: Person = repo.find_by_id("people", "p2").await.unwrap();
        assert_eq!(found, person("p2", "Grace", 45));
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let repo = seeded().await;
        let err = repo.find_by_id::<Person>("people", "nope").await.unwrap_err();
        assert!(store_error(&err).is_not_found());
        assert!(err.code().is_none());
        assert!(err.stack_trace().is_some());
    }

    #[tokio::test]
    async fn test_count() {
        let repo = seeded().await;
        assert_eq!(repo.count("people", doc! {}).await.unwrap(), 5);
        assert_eq!(repo.count("people", doc! { "age": { "$gte": 45 } }).await.unwrap(), 3);
        assert_eq!(repo.count("empty", doc! {}).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_duplicate_id() {
        let repo = seeded().await;
        let err = repo
            .create("people", "p1", &person("p1", "Other", 1))
            .await
            .unwrap_err();
        assert!(matches!(store_error(&err), StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_create_ignores_id_argument() {
        let repo = seeded().await;
        repo.create("people", "ignored", &person("p9", "Niklaus", 50))
            .await
            .unwrap();
        let found: Person = repo.find_by_id("people", "p9").await.unwrap();
        assert_eq!(found.name, "Niklaus");
        assert!(repo.find_by_id::<Person>("people", "ignored").await.is_err());
    }

    #[tokio::test]
    async fn test_update_replaces_document() {
        let repo = seeded().await;
        repo.update("people", "p1", &person("p1", "Ada Lovelace", 37))
            .await
            .unwrap();
        let found: Person = repo.find_by_id("people", "p1").await.unwrap();
        assert_eq!(found, person("p1", "Ada Lovelace", 37));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_id_succeed() {
        let repo = seeded().await;
        repo.update("people", "ghost", &person("ghost", "Nobody", 0))
            .await
            .unwrap();
        repo.delete("people", "ghost").await.unwrap();
        assert_eq!(repo.count("people", doc! {}).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = seeded().await;
        repo.delete("people", "p3").await.unwrap();
        assert_eq!(repo.count("people", doc! {}).await.unwrap(), 4);
        assert!(repo.find_by_id::<Person>("people", "p3").await.is_err());
    }

    #[tokio::test]
    async fn test_aggregate() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Total {
            total: i64,
        }

        let repo = seeded().await;
        let names: Vec<Person> = repo
            .aggregate(
                "people",
                vec![
                    doc! { "$match": { "age": { "$lt": 50 } } },
                    doc! { "$sort": { "age": 1 } },
                    doc! { "$limit": 2 },
                ],
            )
            .await
            .unwrap();
        assert_eq!(names, vec![person("p1", "Ada", 36), person("p5", "Alan", 41)]);

        let totals: Vec<Total> = repo
            .aggregate(
                "people",
                vec![doc! { "$match": { "age": 45 } }, doc! { "$count": "total" }],
            )
            .await
            .unwrap();
        assert_eq!(totals, vec![Total { total: 2 }]);
    }

    #[tokio::test]
    async fn test_timeout_yields_domain_error() {
        let store = Arc::new(InMemoryStore::new("slow").with_latency(Duration::from_millis(200)));
        let repo = Repository::new(Duration::from_secs(1), store.clone()).await.unwrap();
        let repo = Repository {
            timeout: Duration::from_millis(20),
            ..repo
        };

        let started = std::time::Instant::now();
        let err = repo.count("people", doc! {}).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_millis(150));
        assert!(store_error(&err).is_timeout());
        assert!(err.code().is_none());
    }

    #[tokio::test]
    async fn test_construction_fails_when_unreachable() {
        let store = Arc::new(InMemoryStore::new("down").unreachable());
        let err = Repository::new(Duration::from_millis(50), store).await.unwrap_err();
        assert!(matches!(store_error(&err), StoreError::Connect(_)));
    }

    #[tokio::test]
    async fn test_construction_times_out() {
        let store = Arc::new(InMemoryStore::new("slow").with_latency(Duration::from_millis(200)));
        let err = Repository::new(Duration::from_millis(20), store).await.unwrap_err();
        assert!(store_error(&err).is_timeout());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let repo = seeded().await;
        repo.disconnect().await;
        repo.disconnect().await;
        let err = repo.count("people", doc! {}).await.unwrap_err();
        assert!(matches!(store_error(&err), StoreError::Disconnected));
    }

    #[tokio::test]
    async fn test_database_name() {
        let repo = seeded().await;
        assert_eq!(repo.database_name(), "people");
    }

    #[tokio::test]
    async fn test_binary_bucket_round_trip() {
        let repo = seeded().await;
        let bucket = repo.new_binary_bucket().unwrap();

        let id = bucket.upload("avatar.png", vec![1, 2, 3, 4]).await.unwrap();
        assert_eq!(bucket.download(&id).await.unwrap(), vec![1, 2, 3, 4]);

        bucket.delete(&id).await.unwrap();
        let err = bucket.download(&id).await.unwrap_err();
        assert!(store_error(&err).is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_counts() {
        let repo = Arc::new(seeded().await);

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    repo.create("people", "", &person(&format!("n{i}"), "New", i))
                        .await
                        .unwrap();
                }
                repo.count("people", doc! {}).await.unwrap()
            }));
        }

        for handle in handles {
            let count = handle.await.unwrap();
            assert!((5..=13).contains(&count));
        }
        assert_eq!(repo.count("people", doc! {}).await.unwrap(), 13);
    }
}

//! In-process document store.
//!
//! Supports the subset of MongoDB behaviour the repository relies on:
//! equality and comparison filters, multi-key sorts, skip/limit and the
//! `$match`, `$sort`, `$skip`, `$limit` and `$count` aggregation stages.
//! Documents keep insertion order, which is the store's native order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use parking_lot::RwLock;

use crate::store::{BinaryBucket, DocumentCursor, DocumentStore, FindOptions};
use crate::StoreError;

const BUCKET_COLLECTION: &str = "fs.files";

type Collections = HashMap<String, Vec<Document>>;

/// A [`DocumentStore`] held entirely in memory.
///
/// Cloning shares the underlying data. An optional latency is slept before
/// every round trip, which makes timeout behaviour testable.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tessera_store::InMemoryStore;
///
/// let store = InMemoryStore::new("orders").with_latency(Duration::from_millis(5));
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    database: String,
    collections: Arc<RwLock<Collections>>,
    files: Arc<RwLock<HashMap<ObjectId, StoredFile>>>,
    latency: Option<Duration>,
    reachable: bool,
    closed: Arc<AtomicBool>,
}

#[derive(Debug, Clone)]
struct StoredFile {
    filename: String,
    data: Vec<u8>,
}

impl InMemoryStore {
    /// Creates an empty store bound to `database`.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: Arc::new(RwLock::new(HashMap::new())),
            files: Arc::new(RwLock::new(HashMap::new())),
            latency: None,
            reachable: true,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sleeps for `latency` before every round trip.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the liveness probe fail.
    #[must_use]
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Returns a snapshot of a collection.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    async fn round_trip(&self) -> Result<(), StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.closed.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Disconnected);
        }
        Ok(())
    }

    fn matching(&self, collection: &str, filter: &Document) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read();
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for document in documents {
            if matches_filter(document, filter)? {
                out.push(document.clone());
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.round_trip().await?;
        if self.reachable {
            Ok(())
        } else {
            Err(StoreError::Connect(format!(
                "database {} is unreachable",
                self.database
            )))
        }
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Box<dyn DocumentCursor>, StoreError> {
        self.round_trip().await?;
        let mut documents = self.matching(collection, &filter)?;
        if let Some(sort) = &options.sort {
            sort_documents(&mut documents, sort)?;
        }
        let skip = usize::try_from(options.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let documents: Vec<Document> = match options.limit {
            Some(limit) if limit != 0 => {
                let limit = usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX);
                documents.into_iter().skip(skip).take(limit).collect()
            }
            _ => documents.into_iter().skip(skip).collect(),
        };
        Ok(self.cursor(documents))
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        self.round_trip().await?;
        Ok(self.matching(collection, &filter)?.into_iter().next())
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.round_trip().await?;
        let count = self.matching(collection, &filter)?.len();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<Bson, StoreError> {
        self.round_trip().await?;
        let id = match document.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                document.insert("_id", id.clone());
                id
            }
        };

        let mut collections = self.collections.write();
        let documents = collections.entry(collection.to_string()).or_default();
        if documents
            .iter()
            .any(|d| d.get("_id").is_some_and(|existing| values_equal(existing, &id)))
        {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        documents.push(document);
        Ok(id)
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        mut replacement: Document,
    ) -> Result<u64, StoreError> {
        self.round_trip().await?;
        let mut collections = self.collections.write();
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };
        for document in documents.iter_mut() {
            if matches_filter(document, &filter)? {
                if let Some(id) = document.get("_id") {
                    replacement.insert("_id", id.clone());
                }
                *document = replacement;
                return Ok(1);
            }
        }
        Ok(0)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.round_trip().await?;
        let mut collections = self.collections.write();
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut position = None;
        for (i, document) in documents.iter().enumerate() {
            if matches_filter(document, &filter)? {
                position = Some(i);
                break;
            }
        }
        Ok(position.map_or(0, |i| {
            documents.remove(i);
            1
        }))
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Box<dyn DocumentCursor>, StoreError> {
        self.round_trip().await?;
        let mut documents = self.documents(collection);
        for stage in &pipeline {
            documents = apply_stage(documents, stage)?;
        }
        Ok(self.cursor(documents))
    }

    fn bucket(&self) -> Result<Box<dyn BinaryBucket>, StoreError> {
        Ok(Box::new(MemoryBucket {
            store: self.clone(),
        }))
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        self.closed.store(true, AtomicOrdering::SeqCst);
        Ok(())
    }
}

impl InMemoryStore {
    fn cursor(&self, documents: Vec<Document>) -> Box<dyn DocumentCursor> {
        Box::new(MemoryCursor {
            documents,
            latency: self.latency,
        })
    }
}

struct MemoryCursor {
    documents: Vec<Document>,
    latency: Option<Duration>,
}

#[async_trait]
impl DocumentCursor for MemoryCursor {
    async fn collect(self: Box<Self>) -> Result<Vec<Document>, StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.documents)
    }
}

struct MemoryBucket {
    store: InMemoryStore,
}

#[async_trait]
impl BinaryBucket for MemoryBucket {
    async fn upload(&self, filename: &str, data: Vec<u8>) -> Result<Bson, StoreError> {
        self.store.round_trip().await?;
        let id = ObjectId::new();
        self.store.files.write().insert(
            id,
            StoredFile {
                filename: filename.to_string(),
                data,
            },
        );
        tracing::debug!(filename = %filename, id = %id, "File stored");
        Ok(Bson::ObjectId(id))
    }

    async fn download(&self, id: &Bson) -> Result<Vec<u8>, StoreError> {
        self.store.round_trip().await?;
        let id = file_id(id)?;
        self.store
            .files
            .read()
            .get(&id)
            .map(|file| file.data.clone())
            .ok_or_else(|| StoreError::NotFound {
                collection: BUCKET_COLLECTION.to_string(),
            })
    }

    async fn delete(&self, id: &Bson) -> Result<(), StoreError> {
        self.store.round_trip().await?;
        let id = file_id(id)?;
        match self.store.files.write().remove(&id) {
            Some(file) => {
                tracing::debug!(filename = %file.filename, "File deleted");
                Ok(())
            }
            None => Err(StoreError::NotFound {
                collection: BUCKET_COLLECTION.to_string(),
            }),
        }
    }
}

fn file_id(id: &Bson) -> Result<ObjectId, StoreError> {
    match id {
        Bson::ObjectId(oid) => Ok(*oid),
        _ => Err(StoreError::NotFound {
            collection: BUCKET_COLLECTION.to_string(),
        }),
    }
}

fn apply_stage(documents: Vec<Document>, stage: &Document) -> Result<Vec<Document>, StoreError> {
    let mut iter = stage.iter();
    let (Some((name, spec)), None) = (iter.next(), iter.next()) else {
        return Err(StoreError::Unsupported(
            "pipeline stage must have exactly one field".to_string(),
        ));
    };

    match (name.as_str(), spec) {
        ("$match", Bson::Document(filter)) => {
            let mut out = Vec::with_capacity(documents.len());
            for document in documents {
                if matches_filter(&document, filter)? {
                    out.push(document);
                }
            }
            Ok(out)
        }
        ("$sort", Bson::Document(sort)) => {
            let mut documents = documents;
            sort_documents(&mut documents, sort)?;
            Ok(documents)
        }
        ("$skip", n) => {
            let n = as_count(n, "$skip")?;
            Ok(documents.into_iter().skip(n).collect())
        }
        ("$limit", n) => {
            let n = as_count(n, "$limit")?;
            Ok(documents.into_iter().take(n).collect())
        }
        ("$count", Bson::String(field)) => {
            let count = i64::try_from(documents.len()).unwrap_or(i64::MAX);
            if count == 0 {
                return Ok(Vec::new());
            }
            let mut out = Document::new();
            out.insert(field.clone(), count);
            Ok(vec![out])
        }
        (other, _) => Err(StoreError::Unsupported(format!("pipeline stage {other}"))),
    }
}

fn as_count(value: &Bson, stage: &str) -> Result<usize, StoreError> {
    let n = match value {
        Bson::Int32(n) => i64::from(*n),
        Bson::Int64(n) => *n,
        _ => return Err(StoreError::Unsupported(format!("{stage} expects an integer"))),
    };
    usize::try_from(n).map_err(|_| StoreError::Unsupported(format!("{stage} must not be negative")))
}

fn sort_documents(documents: &mut [Document], sort: &Document) -> Result<(), StoreError> {
    let mut keys = Vec::with_capacity(sort.len());
    for (key, direction) in sort {
        let descending = match direction {
            Bson::Int32(d) => *d < 0,
            Bson::Int64(d) => *d < 0,
            Bson::Double(d) => *d < 0.0,
            _ => return Err(StoreError::Unsupported(format!("sort direction for {key}"))),
        };
        keys.push((key.as_str(), descending));
    }

    documents.sort_by(|a, b| {
        for (key, descending) in &keys {
            let ordering = compare_values(lookup(a, key), lookup(b, key));
            let ordering = if *descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

fn matches_filter(document: &Document, filter: &Document) -> Result<bool, StoreError> {
    for (key, condition) in filter {
        if key.starts_with('$') {
            return Err(StoreError::Unsupported(format!("filter operator {key}")));
        }
        let value = lookup(document, key);
        let matched = match condition {
            Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
                matches_operators(value, ops)?
            }
            expected => value.is_some_and(|v| values_equal(v, expected)),
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_operators(value: Option<&Bson>, ops: &Document) -> Result<bool, StoreError> {
    for (op, operand) in ops {
        let matched = match op.as_str() {
            "$eq" => value.is_some_and(|v| values_equal(v, operand)),
            "$ne" => !value.is_some_and(|v| values_equal(v, operand)),
            "$gt" => value.is_some_and(|v| comparable(v, operand) == Some(Ordering::Greater)),
            "$gte" => value.is_some_and(|v| {
                matches!(comparable(v, operand), Some(Ordering::Greater | Ordering::Equal))
            }),
            "$lt" => value.is_some_and(|v| comparable(v, operand) == Some(Ordering::Less)),
            "$lte" => value.is_some_and(|v| {
                matches!(comparable(v, operand), Some(Ordering::Less | Ordering::Equal))
            }),
            "$in" => match operand {
                Bson::Array(candidates) => {
                    value.is_some_and(|v| candidates.iter().any(|c| values_equal(v, c)))
                }
                _ => return Err(StoreError::Unsupported("$in expects an array".to_string())),
            },
            other => return Err(StoreError::Unsupported(format!("filter operator {other}"))),
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Resolves a dotted path such as `address.city`.
fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        match current {
            Bson::Document(inner) => current = inner.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    comparable(a, b).map_or_else(|| a == b, |o| o == Ordering::Equal)
}

#[allow(clippy::cast_precision_loss)]
fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Orders two values of the same kind; `None` if they are not comparable.
fn comparable(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Total order for sorting: missing and null first, then by type rank, then
/// by value.
fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    fn rank(value: Option<&Bson>) -> u8 {
        match value {
            None | Some(Bson::Null) => 0,
            Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => 1,
            Some(Bson::String(_)) => 2,
            Some(Bson::Document(_)) => 3,
            Some(Bson::Array(_)) => 4,
            Some(Bson::ObjectId(_)) => 6,
            Some(Bson::Boolean(_)) => 7,
            Some(Bson::DateTime(_)) => 8,
            Some(_) => 9,
        }
    }

    match rank(a).cmp(&rank(b)) {
        Ordering::Equal => match (a, b) {
            (Some(x), Some(y)) => comparable(x, y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        other => other,
    }
}

//! MongoDB-backed [`DocumentStore`].

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures_util::io::{AsyncReadExt, AsyncWriteExt};
use futures_util::TryStreamExt;
use mongodb::error::{ErrorKind, GridFsErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, ReadPreference, SelectionCriteria};
use mongodb::{Client, Collection, Cursor, Database};
use tessera_config::{ConfigLoader, STORE_URI_VAR};

use crate::store::{BinaryBucket, DocumentCursor, DocumentStore, FindOptions};
use crate::StoreError;

const DUPLICATE_KEY_CODE: i32 = 11000;
const BUCKET_COLLECTION: &str = "fs.files";

/// Reads the connection string from the layered configuration.
fn store_uri(loader: ConfigLoader) -> Result<String, StoreError> {
    loader
        .load()
        .map_err(|e| StoreError::Connect(e.to_string()))?
        .store_uri
        .ok_or_else(|| StoreError::Connect(format!("{STORE_URI_VAR} is not set")))
}

/// A [`DocumentStore`] backed by a MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
    name: String,
}

impl MongoStore {
    /// Builds a client for `database`.
    ///
    /// When `options` is `None` the connection string is read from
    /// `MONGO_DB_URI`. The driver connects lazily, so reachability is only
    /// established by [`ping`](DocumentStore::ping).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connect` if the connection string is missing or
    /// invalid.
    pub async fn connect(
        database: &str,
        options: Option<ClientOptions>,
    ) -> Result<Self, StoreError> {
        let options = match options {
            Some(options) => options,
            None => {
                let loader = ConfigLoader::new()
                    .with_dotenv()
                    .map_err(|e| StoreError::Connect(e.to_string()))?
                    .with_env();
                ClientOptions::parse(store_uri(loader)?)
                    .await
                    .map_err(|e| StoreError::Connect(e.to_string()))?
            }
        };

        let client = Client::with_options(options).map_err(|e| StoreError::Connect(e.to_string()))?;
        Ok(Self::from_client(client, database))
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn from_client(client: Client, database: &str) -> Self {
        Self {
            database: client.database(database),
            client,
            name: database.to_string(),
        }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn database_name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let primary = SelectionCriteria::ReadPreference(ReadPreference::Primary);
        self.database
            .run_command(doc! { "ping": 1 }, primary)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Connect(e.to_string()))
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Box<dyn DocumentCursor>, StoreError> {
        let mut find_options = mongodb::options::FindOptions::default();
        find_options.skip = options.skip;
        find_options.limit = options.limit;
        find_options.sort = options.sort;

        let cursor = self
            .collection(collection)
            .find(filter, find_options)
            .await
            .map_err(StoreError::backend)?;
        Ok(Box::new(MongoCursor(cursor)))
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        self.collection(collection)
            .find_one(filter, None)
            .await
            .map_err(StoreError::backend)
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.collection(collection)
            .count_documents(filter, None)
            .await
            .map_err(StoreError::backend)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson, StoreError> {
        let id = document.get("_id").map(ToString::to_string).unwrap_or_default();
        match self.collection(collection).insert_one(document, None).await {
            Ok(result) => Ok(result.inserted_id),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                id,
            }),
            Err(e) => Err(StoreError::backend(e)),
        }
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
    ) -> Result<u64, StoreError> {
        self.collection(collection)
            .replace_one(filter, replacement, None)
            .await
            .map(|result| result.matched_count)
            .map_err(StoreError::backend)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.collection(collection)
            .delete_one(filter, None)
            .await
            .map(|result| result.deleted_count)
            .map_err(StoreError::backend)
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Box<dyn DocumentCursor>, StoreError> {
        let cursor = self
            .collection(collection)
            .aggregate(pipeline, None)
            .await
            .map_err(StoreError::backend)?;
        Ok(Box::new(MongoCursor(cursor)))
    }

    fn bucket(&self) -> Result<Box<dyn BinaryBucket>, StoreError> {
        Ok(Box::new(MongoBucket(self.database.gridfs_bucket(None))))
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

struct MongoCursor(Cursor<Document>);

#[async_trait]
impl DocumentCursor for MongoCursor {
    async fn collect(self: Box<Self>) -> Result<Vec<Document>, StoreError> {
        self.0.try_collect().await.map_err(StoreError::backend)
    }
}

struct MongoBucket(mongodb::gridfs::GridFsBucket);

#[async_trait]
impl BinaryBucket for MongoBucket {
    async fn upload(&self, filename: &str, data: Vec<u8>) -> Result<Bson, StoreError> {
        let mut stream = self.0.open_upload_stream(filename, None);
        stream.write_all(&data).await.map_err(StoreError::backend)?;
        stream.close().await.map_err(StoreError::backend)?;
        Ok(stream.id().clone())
    }

    async fn download(&self, id: &Bson) -> Result<Vec<u8>, StoreError> {
        let mut stream = self
            .0
            .open_download_stream(id.clone())
            .await
            .map_err(gridfs_error)?;
        let mut data = Vec::new();
        stream
            .read_to_end(&mut data)
            .await
            .map_err(StoreError::backend)?;
        Ok(data)
    }

    async fn delete(&self, id: &Bson) -> Result<(), StoreError> {
        self.0.delete(id.clone()).await.map_err(gridfs_error)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

fn gridfs_error(err: mongodb::error::Error) -> StoreError {
    if matches!(*err.kind, ErrorKind::GridFs { 0: GridFsErrorKind::FileNotFound { .. }, .. }) {
        StoreError::NotFound {
            collection: BUCKET_COLLECTION.to_string(),
        }
    } else {
        StoreError::backend(err)
    }
}

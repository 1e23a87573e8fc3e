//! Timeout-bounded document repository.
//!
//! [`Repository`] is the single data-access handle a service holds for one
//! database. Every remote round trip it makes runs inside its own timeout
//! window, and every failure comes back as a [`DomainError`] wrapping a
//! [`StoreError`] with a captured stack trace. The repository never assigns a
//! [`Code`]; the calling business function does that once it knows what the
//! failure means.
//!
//! The backing store is anything implementing [`DocumentStore`]:
//!
//! - [`InMemoryStore`] - an in-process store with optional injected latency
//! - `MongoStore` - MongoDB, behind the `mongodb` feature
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use bson::doc;
//! use serde::{Deserialize, Serialize};
//! use tessera_store::{InMemoryStore, Repository};
//!
//! #[derive(Debug, Serialize, Deserialize, PartialEq)]
//! struct User {
//!     #[serde(rename = "_id")]
//!     id: String,
//!     name: String,
//! }
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(InMemoryStore::new("users"));
//! let repo = Repository::new(Duration::from_secs(1), store).await?;
//!
//! let user = User { id: "u1".into(), name: "Ada".into() };
//! repo.create("users", "u1", &user).await?;
//!
//! let found: User = repo.find_by_id("users", "u1").await?;
//! assert_eq!(found, user);
//! assert_eq!(repo.count("users", doc! {}).await?, 1);
//! # Ok::<(), tessera_core::DomainError>(())
//! # }).unwrap();
//! ```
//!
//! [`DomainError`]: tessera_core::DomainError
//! [`Code`]: tessera_core::Code

#![doc(html_root_url = "https://docs.rs/tessera-store/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod memory;
mod model;
#[cfg(feature = "mongodb")]
mod mongo;
mod repository;
mod store;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use model::TenantModel;
#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;
pub use repository::{sort_from_params, Bucket, Repository, DEFAULT_TIMEOUT};
pub use store::{BinaryBucket, DocumentCursor, DocumentStore, FindOptions};

pub use bson::{doc, Bson, Document};

//! # Tessera
//!
//! **A small framework for CQRS-style HTTP services over a document store.**
//!
//! - [`Code`](core::Code) and [`DomainError`](core::DomainError) classify
//!   failures without losing their cause
//! - a timeout-bounded [`Repository`](store::Repository) over MongoDB or an
//!   in-memory store
//! - a [`HandlerFactory`](handler::HandlerFactory) turning typed business
//!   functions into HTTP handlers
//! - a [`TransportHost`](server::TransportHost) with interrupt-driven
//!   graceful shutdown
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tessera::prelude::*;
//!
//! const ERR_DATA_FETCH: Code = Code::new("us101e", "Data fetch failed");
//!
//! async fn view_user(repo: Arc<Repository>, id: String, _: Headers) -> DomainResult<User> {
//!     repo.find_by_id("users", id).await.map_err(|e| e.coded(ERR_DATA_FETCH))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging(&LogConfig::from_env())?;
//!
//!     let repo = Arc::new(Repository::connect_mongodb(DEFAULT_TIMEOUT, "userService", None).await?);
//!     let factory = HandlerFactory::new(
//!         Arc::clone(&repo),
//!         CodeStatusResponder::new()
//!             .map(ERR_DATA_FETCH, StatusCode::NOT_FOUND)
//!             .into_responder(),
//!         forward_headers(&[("x-trace-id", "traceId")]),
//!     );
//!     let router = Router::new().route("/managing/queries/view-user/{id}", factory.query_by_id(view_user));
//!
//!     let (done_tx, done_rx) = tokio::sync::oneshot::channel();
//!     TransportHost::from_env(router)?.start(done_tx).await?;
//!     let _ = done_rx.await;
//!     repo.disconnect().await;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/tessera/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Codes, domain errors, header maps, transport aliases
pub use tessera_core as core;

// Environment configuration
pub use tessera_config as config;

// Logging
pub use tessera_telemetry as telemetry;

// Repository and document stores
pub use tessera_store as store;

// Handler factories
pub use tessera_handler as handler;

// Transport host
pub use tessera_server as server;

// Outbound client
pub use tessera_client as client;

/// Prelude module for convenient imports.
///
/// ```rust
/// use tessera::prelude::*;
///
/// const ERR_POLICY: Code = Code::new("us201e", "Policy violated");
/// let err = DomainError::from_code(ERR_POLICY);
/// assert_eq!(err.code(), Some(&ERR_POLICY));
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    pub use tessera_core::{Code, DomainError, DomainResult, Headers};

    pub use tessera_config::{ConfigLoader, EnvConfig};

    pub use tessera_telemetry::{init_logging, LogConfig, Team};

    pub use tessera_store::{
        doc, Bson, Document, DocumentStore, InMemoryStore, Repository, StoreError, TenantModel,
        DEFAULT_TIMEOUT,
    };

    pub use tessera_handler::{
        forward_headers, no_headers, CodeStatusResponder, ErrorResponder, HandlerFactory,
        HeaderMapper,
    };

    pub use tessera_server::{Router, ServerConfig, ShutdownSignal, TransportHost};

    pub use tessera_client::{ClientError, HttpClient};

    pub use tessera_core::transport::StatusCode;
}

//! # Tessera Server
//!
//! HTTP transport host for Tessera services.
//!
//! - a [`Router`] mapping path patterns to handlers
//! - a [`TransportHost`] serving the router on a background task
//! - graceful shutdown driven by a [`ShutdownSignal`], with a bounded drain
//!   window and a one-shot completion signal
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_server::{Router, TransportHost};
//! use tokio::sync::oneshot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::new().route("/managing/queries/view-user/{id}", view_user);
//!
//!     let (done_tx, done_rx) = oneshot::channel();
//!     TransportHost::from_env(router)?.start(done_tx).await?;
//!     let _ = done_rx.await;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
mod host;
pub mod router;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::ServerError;
pub use host::TransportHost;
pub use router::{PathParams, RouteMatch, Router};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};

//! # Tessera Client
//!
//! A small JSON client for calling other services.
//!
//! Every call has a fixed 10 second timeout. A request body, when present, is
//! sent as JSON. `200` and `202` are successes; `404` is reported as
//! [`ClientError::DataNotFound`] and any other status as
//! [`ClientError::Status`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_client::HttpClient;
//!
//! let client = HttpClient::new()?;
//! let user: User = client
//!     .get("http://users/managing/queries/view-user/42", &[("x-trace-id", "abc")])
//!     .await?;
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;

pub use client::{HttpClient, DEFAULT_TIMEOUT};
pub use error::ClientError;

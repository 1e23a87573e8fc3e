//! # Tessera Core
//!
//! Core types shared by every Tessera crate.
//!
//! - [`Code`] - Immutable `(identifier, text)` pair classifying a failure
//! - [`DomainError`] - A failure carrying its cause, an optional [`Code`] and
//!   an optional captured stack trace
//! - [`Headers`] - Opaque per-request key/value map handed to business functions
//! - [`transport`] - Request/response aliases shared by handlers and the server
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{Code, DomainError};
//!
//! const ERR_DATA_FETCH: Code = Code::new("us101e", "Data fetch failed");
//!
//! let mut err = DomainError::new("document not found");
//! err.set_code(ERR_DATA_FETCH);
//!
//! assert_eq!(err.code(), Some(&ERR_DATA_FETCH));
//! assert_eq!(err.to_string(), "Data fetch failed: document not found");
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod code;
mod error;
mod headers;
pub mod transport;

pub use code::Code;
pub use error::{BoxError, DomainError, DomainResult};
pub use headers::Headers;
pub use transport::{BoxedHandler, BoxedResponse, HttpRequest, HttpResponse, ResponseBody};

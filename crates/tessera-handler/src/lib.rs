//! Handler factories for Tessera services.
//!
//! A [`HandlerFactory`] adapts a typed business function into a
//! [`BoxedHandler`](tessera_core::BoxedHandler) that a route table can serve.
//! Five shapes are available:
//!
//! | Shape | Input | Business function returns |
//! |-------|-------|---------------------------|
//! | [`command`](HandlerFactory::command) | JSON body | `DomainResult<()>` |
//! | [`command_with_response`](HandlerFactory::command_with_response) | JSON body | `DomainResult<Option<R>>` |
//! | [`query`](HandlerFactory::query) | nothing | `DomainResult<R>` |
//! | [`query_by_id`](HandlerFactory::query_by_id) | 5th path segment | `DomainResult<R>` |
//! | [`query_by_params`](HandlerFactory::query_by_params) | query string | `DomainResult<R>` |
//!
//! Every business function also receives the shared
//! [`Repository`](tessera_store::Repository) and the [`Headers`] produced by
//! the factory's [`HeaderMapper`]. A failure is handed, unchanged, to the
//! factory's [`ErrorResponder`], which alone decides the response status.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tessera_core::{Code, DomainResult, Headers};
//! use tessera_handler::{forward_headers, CodeStatusResponder, HandlerFactory};
//! use tessera_store::Repository;
//!
//! const ERR_DATA_FETCH: Code = Code::new("us101e", "Data fetch failed");
//!
//! async fn view_user(repo: Arc<Repository>, id: String, _: Headers) -> DomainResult<User> {
//!     repo.find_by_id("users", id).await.map_err(|e| e.coded(ERR_DATA_FETCH))
//! }
//!
//! let factory = HandlerFactory::new(
//!     repo,
//!     CodeStatusResponder::new()
//!         .map(ERR_DATA_FETCH, http::StatusCode::NOT_FOUND)
//!         .into_responder(),
//!     forward_headers(&[("x-trace-id", "traceId")]),
//! );
//! let handler = factory.query_by_id(view_user);
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-handler/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod extract;
mod factory;
mod headers;
mod responder;
mod response;

pub use extract::{id_from_path, query_params, ID_SEGMENT_INDEX};
pub use factory::HandlerFactory;
pub use headers::{forward_headers, no_headers, HeaderMapper};
pub use responder::{CodeStatusResponder, ErrorResponder, DEFAULT_TRACE_HEADER};
pub use response::{json_response, JSON_CONTENT_TYPE};

//! Handler construction.
//!
//! Each factory method wraps a typed business function into a type-erased
//! [`BoxedHandler`]. The wrapping always follows the same pipeline:
//!
//! 1. extract the input (body, path id, query string or nothing)
//! 2. build [`Headers`] with the factory's [`HeaderMapper`]
//! 3. call the business function with the shared [`Repository`]
//! 4. write the result, or hand the failure to the [`ErrorResponder`]
//!
//! A malformed body is answered with `400` before the business function runs.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tessera_core::transport::empty_response;
use tessera_core::{BoxedHandler, BoxedResponse, DomainResult, Headers, HttpRequest, HttpResponse};
use tessera_store::Repository;

use crate::extract::{id_from_path, query_params};
use crate::headers::HeaderMapper;
use crate::responder::ErrorResponder;
use crate::response::json_response;

/// Builds route handlers that share one repository, error responder and
/// header mapper.
///
/// Cloning is cheap; all state is reference-counted.
#[derive(Clone)]
pub struct HandlerFactory {
    repository: Arc<Repository>,
    on_error: ErrorResponder,
    map_headers: HeaderMapper,
}

impl fmt::Debug for HandlerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFactory")
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

impl HandlerFactory {
    /// Creates a factory.
    #[must_use]
    pub fn new(
        repository: Arc<Repository>,
        on_error: ErrorResponder,
        map_headers: HeaderMapper,
    ) -> Self {
        Self {
            repository,
            on_error,
            map_headers,
        }
    }

    /// Returns the shared repository.
    #[must_use]
    pub fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    /// Wraps a command: JSON body in, empty `200` out.
    pub fn command<T, F, Fut>(&self, f: F) -> BoxedHandler
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(Arc<Repository>, T, Headers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DomainResult<()>> + Send + 'static,
    {
        let f = Arc::new(f);
        let factory = self.clone();
        Arc::new(move |req: HttpRequest| -> BoxedResponse {
            let f = Arc::clone(&f);
            let factory = factory.clone();
            Box::pin(async move {
                let input = match decode_body::<T>(&req) {
                    Ok(input) => input,
                    Err(response) => return response,
                };
                let headers = (factory.map_headers)(&req);
                match f(Arc::clone(&factory.repository), input, headers).await {
                    Ok(()) => empty_response(StatusCode::OK),
                    Err(e) => (factory.on_error)(e, &req),
                }
            })
        })
    }

    /// Wraps a command that may return a value.
    ///
    /// `Some(value)` is written as JSON; `None` leaves an empty `200`.
    pub fn command_with_response<T, R, F, Fut>(&self, f: F) -> BoxedHandler
    where
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(Arc<Repository>, T, Headers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DomainResult<Option<R>>> + Send + 'static,
    {
        let f = Arc::new(f);
        let factory = self.clone();
        Arc::new(move |req: HttpRequest| -> BoxedResponse {
            let f = Arc::clone(&f);
            let factory = factory.clone();
            Box::pin(async move {
                let input = match decode_body::<T>(&req) {
                    Ok(input) => input,
                    Err(response) => return response,
                };
                let headers = (factory.map_headers)(&req);
                match f(Arc::clone(&factory.repository), input, headers).await {
                    Ok(Some(value)) => json_response(&value),
                    Ok(None) => empty_response(StatusCode::OK),
                    Err(e) => (factory.on_error)(e, &req),
                }
            })
        })
    }

    /// Wraps a query that takes no input.
    pub fn query<R, F, Fut>(&self, f: F) -> BoxedHandler
    where
        R: Serialize + Send + 'static,
        F: Fn(Arc<Repository>, Headers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DomainResult<R>> + Send + 'static,
    {
        let f = Arc::new(f);
        self.respond_with(move |repository, _req, headers| f(repository, headers))
    }

    /// Wraps a query keyed by the fifth path segment.
    ///
    /// A path with fewer segments passes an empty id; the business function
    /// decides what that means.
    pub fn query_by_id<R, F, Fut>(&self, f: F) -> BoxedHandler
    where
        R: Serialize + Send + 'static,
        F: Fn(Arc<Repository>, String, Headers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DomainResult<R>> + Send + 'static,
    {
        let f = Arc::new(f);
        self.respond_with(move |repository, req, headers| {
            let id = id_from_path(req.uri().path()).to_string();
            f(repository, id, headers)
        })
    }

    /// Wraps a query driven by the query string.
    ///
    /// Repeated keys keep their first value.
    pub fn query_by_params<R, F, Fut>(&self, f: F) -> BoxedHandler
    where
        R: Serialize + Send + 'static,
        F: Fn(Arc<Repository>, HashMap<String, String>, Headers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DomainResult<R>> + Send + 'static,
    {
        let f = Arc::new(f);
        self.respond_with(move |repository, req, headers| {
            f(repository, query_params(req.uri().query()), headers)
        })
    }

    fn respond_with<R, C, Fut>(&self, call: C) -> BoxedHandler
    where
        R: Serialize + Send + 'static,
        C: Fn(Arc<Repository>, &HttpRequest, Headers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DomainResult<R>> + Send + 'static,
    {
        let call = Arc::new(call);
        let factory = self.clone();
        Arc::new(move |req: HttpRequest| -> BoxedResponse {
            let headers = (factory.map_headers)(&req);
            let pending = call(Arc::clone(&factory.repository), &req, headers);
            let on_error = Arc::clone(&factory.on_error);
            Box::pin(async move {
                match pending.await {
                    Ok(value) => json_response(&value),
                    Err(e) => on_error(e, &req),
                }
            })
        })
    }
}

fn decode_body<T: DeserializeOwned>(req: &HttpRequest) -> Result<T, HttpResponse> {
    serde_json::from_slice(req.body()).map_err(|e| {
        tracing::debug!(
            path = %req.uri().path(),
            error = %e,
            "Request body could not be decoded"
        );
        empty_response(StatusCode::BAD_REQUEST)
    })
}

//! Route table.
//!
//! Maps request paths to [`BoxedHandler`]s. Patterns use `{name}` segments
//! for parameters; a pattern ending in `/` also matches every path below it.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use http::{Method, StatusCode};
//! use tessera_core::transport::empty_response;
//! use tessera_core::{BoxedHandler, BoxedResponse, HttpRequest};
//! use tessera_server::Router;
//!
//! let ok: BoxedHandler =
//!     Arc::new(|_: HttpRequest| -> BoxedResponse { Box::pin(async { empty_response(StatusCode::OK) }) });
//!
//! let router = Router::new()
//!     .route("/managing/queries/view-user/{id}", Arc::clone(&ok))
//!     .route_method(Method::POST, "/managing/commands/", ok);
//!
//! let matched = router.match_route(&Method::GET, "/managing/queries/view-user/42").unwrap();
//! assert_eq!(matched.param("id"), Some("42"));
//! assert!(router.match_route(&Method::POST, "/managing/commands/create-user").is_some());
//! assert!(router.match_route(&Method::GET, "/managing/commands/create-user").is_none());
//! ```

use std::collections::HashMap;
use std::fmt;

use http::Method;
use tessera_core::BoxedHandler;

/// Path parameters captured by the matched route.
///
/// Inserted into the request extensions before the handler runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    /// Returns a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns all parameters.
    #[must_use]
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.0
    }
}

/// A matched route.
pub struct RouteMatch<'a> {
    handler: &'a BoxedHandler,
    params: PathParams,
}

impl<'a> RouteMatch<'a> {
    /// Returns the handler.
    #[must_use]
    pub fn handler(&self) -> &'a BoxedHandler {
        self.handler
    }

    /// Returns a captured parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Splits the match into handler and parameters.
    #[must_use]
    pub fn into_parts(self) -> (&'a BoxedHandler, PathParams) {
        (self.handler, self.params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
}

struct Route {
    method: Option<Method>,
    segments: Vec<PathSegment>,
    subtree: bool,
    pattern: String,
    handler: BoxedHandler,
}

impl Route {
    fn new(method: Option<Method>, pattern: &str, handler: BoxedHandler) -> Self {
        Self {
            method,
            segments: parse_segments(pattern),
            subtree: pattern.len() > 1 && pattern.ends_with('/'),
            pattern: pattern.to_string(),
            handler,
        }
    }

    fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let path_segments = split_path(path)?;

        let fits = if self.subtree {
            path_segments.len() >= self.segments.len()
        } else {
            path_segments.len() == self.segments.len()
        };
        if !fits {
            return None;
        }

        let mut params = HashMap::new();
        for (pattern, actual) in self.segments.iter().zip(&path_segments) {
            match pattern {
                PathSegment::Literal(expected) if expected != actual => return None,
                PathSegment::Literal(_) => {}
                PathSegment::Param(name) => {
                    params.insert(name.clone(), (*actual).to_string());
                }
            }
        }
        Some(params)
    }
}

/// Splits a request path into segments, ignoring one leading and one
/// trailing `/`. Returns `None` for non-canonical paths such as `/x//y`, so
/// positional readers like `id_from_path` always see the matched segments.
fn split_path(path: &str) -> Option<Vec<&str>> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Some(Vec::new());
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

fn parse_segments(pattern: &str) -> Vec<PathSegment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => PathSegment::Param(name.to_string()),
            None => PathSegment::Literal(s.to_string()),
        })
        .collect()
}

/// Ordered route table; the first matching route wins.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| match &r.method {
                Some(method) => format!("{method} {}", r.pattern),
                None => r.pattern.clone(),
            }))
            .finish()
    }
}

impl Router {
    /// Creates an empty route table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route that accepts every method.
    #[must_use]
    pub fn route(mut self, pattern: impl AsRef<str>, handler: BoxedHandler) -> Self {
        self.add_route(None, pattern.as_ref(), handler);
        self
    }

    /// Adds a route restricted to one method.
    #[must_use]
    pub fn route_method(
        mut self,
        method: Method,
        pattern: impl AsRef<str>,
        handler: BoxedHandler,
    ) -> Self {
        self.add_route(Some(method), pattern.as_ref(), handler);
        self
    }

    /// Adds a route in place.
    pub fn add_route(&mut self, method: Option<Method>, pattern: &str, handler: BoxedHandler) {
        tracing::debug!(pattern = %pattern, "Route registered");
        self.routes.push(Route::new(method, pattern, handler));
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Finds the first route matching `method` and `path`.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|route| route.method.as_ref().map_or(true, |m| m == method))
            .find_map(|route| {
                route.match_path(path).map(|params| RouteMatch {
                    handler: &route.handler,
                    params: PathParams(params),
                })
            })
    }
}

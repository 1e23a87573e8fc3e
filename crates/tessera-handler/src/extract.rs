//! Input extraction from the request line.

use std::collections::HashMap;

/// Index of the `/`-delimited path segment that carries a resource id.
///
/// For `/managing/queries/view-user/42` the segments are
/// `["", "managing", "queries", "view-user", "42"]`, so the id is at index 4.
pub const ID_SEGMENT_INDEX: usize = 4;

/// Returns the resource id segment of `path`, or `""` if the path has fewer
/// than five segments.
///
/// ```rust
/// use tessera_handler::id_from_path;
///
/// assert_eq!(id_from_path("/x/y/z/42"), "42");
/// assert_eq!(id_from_path("/x/y/z"), "");
/// ```
#[must_use]
pub fn id_from_path(path: &str) -> &str {
    path.split('/').nth(ID_SEGMENT_INDEX).unwrap_or("")
}

/// Parses a query string into a flat map.
///
/// When a key repeats, the first value wins.
///
/// ```rust
/// use tessera_handler::query_params;
///
/// let params = query_params(Some("page=2&tag=a&tag=b"));
/// assert_eq!(params["page"], "2");
/// assert_eq!(params["tag"], "a");
/// ```
#[must_use]
pub fn query_params(query: Option<&str>) -> HashMap<String, String> {
    let pairs: Vec<(String, String)> = match query {
        Some(query) => serde_urlencoded::from_str(query).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Query string could not be parsed");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let mut params = HashMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        params.entry(key).or_insert(value);
    }
    params
}

//! Per-request header map passed to business functions.

use std::collections::HashMap;

/// String key/value pairs extracted from a request by a header mapper.
///
/// The framework never interprets these values. A service decides which
/// transport headers (trace ids, auth tokens) end up here and reads them back
/// in its business functions.
///
/// # Example
///
/// ```rust
/// use tessera_core::Headers;
///
/// let mut headers = Headers::new();
/// headers.set("traceId", "abc-123");
///
/// assert_eq!(headers.get("traceId"), Some("abc-123"));
/// assert!(!headers.contains("tenantId"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    values: HashMap<String, String>,
}

impl Headers {
    /// Creates an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a header map from existing pairs.
    #[must_use]
    pub fn from_map(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Returns the value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Sets a value, replacing any previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over all entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consumes the map and returns the underlying pairs.
    #[must_use]
    pub fn into_inner(self) -> HashMap<String, String> {
        self.values
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

//! Failure classification codes.
//!
//! A service declares its catalog of [`Code`]s once, usually as constants,
//! and attaches them to [`DomainError`](crate::DomainError)s where the failure
//! gains business meaning. Error responders branch on code identity to pick a
//! transport status.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An immutable `(identifier, text)` pair used to classify failures.
///
/// Equality and hashing only consider the identifier. Uniqueness of
/// identifiers within a catalog is the caller's responsibility.
///
/// # Example
///
/// ```rust
/// use tessera_core::Code;
///
/// const ERR_DATA_FETCH: Code = Code::new("us101e", "Data fetch failed");
///
/// assert_eq!(ERR_DATA_FETCH.code(), "us101e");
/// assert_eq!(ERR_DATA_FETCH.text(), "Data fetch failed");
/// assert_eq!(ERR_DATA_FETCH.to_string(), "us101e");
/// ```
#[derive(Debug, Clone)]
pub struct Code {
    code: Cow<'static, str>,
    text: Cow<'static, str>,
}

impl Code {
    /// Creates a code from static strings, usable in `const` catalogs.
    #[must_use]
    pub const fn new(code: &'static str, text: &'static str) -> Self {
        Self {
            code: Cow::Borrowed(code),
            text: Cow::Borrowed(text),
        }
    }

    /// Creates a code from owned strings, e.g. loaded at startup.
    #[must_use]
    pub fn owned(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code: Cow::Owned(code.into()),
            text: Cow::Owned(text.into()),
        }
    }

    /// Returns the machine identifier.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the human-readable description.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Code {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Code {}

impl Hash for Code {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

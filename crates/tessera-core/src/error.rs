//! Domain error type.
//!
//! [`DomainError`] separates the mechanical *cause* of a failure (kept for
//! logs and diagnostics) from its semantic *code* (used to pick a transport
//! status). Lower layers wrap causes without classifying them; the first layer
//! with enough context attaches a [`Code`].
//!
//! # Example
//!
//! ```rust
//! use tessera_core::{Code, DomainError};
//!
//! const ERR_POLICY: Code = Code::new("us201e", "Policy violated");
//!
//! // Originates here, so the message comes from the code and a trace is captured.
//! let err = DomainError::from_code(ERR_POLICY);
//! assert_eq!(err.to_string(), "Policy violated: Policy violated");
//! assert!(err.stack_trace().is_some());
//! ```

use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

use crate::Code;

/// Boxed, thread-safe error used as the cause of a [`DomainError`].
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Result type alias using [`DomainError`].
pub type DomainResult<T> = Result<T, DomainError>;

/// A failure combining a root cause, an optional [`Code`] and an optional
/// captured stack trace.
///
/// A `DomainError` always has a cause. It is consumed once by an error
/// responder, which maps the code to a transport status.
#[derive(Debug)]
pub struct DomainError {
    cause: BoxError,
    code: Option<Code>,
    trace: Option<Backtrace>,
}

impl DomainError {
    /// Wraps a cause without classification or stack capture.
    #[must_use]
    pub fn new(cause: impl Into<BoxError>) -> Self {
        Self {
            cause: cause.into(),
            code: None,
            trace: None,
        }
    }

    /// Wraps a cause and captures the current call stack.
    ///
    /// Used by lower layers that detect a failure but cannot classify it.
    #[must_use]
    pub fn traced(cause: impl Into<BoxError>) -> Self {
        Self {
            cause: cause.into(),
            code: None,
            trace: Some(Backtrace::force_capture()),
        }
    }

    /// Wraps a cause and classifies it in one step.
    #[must_use]
    pub fn with_code(cause: impl Into<BoxError>, code: Code) -> Self {
        Self {
            cause: cause.into(),
            code: Some(code),
            trace: None,
        }
    }

    /// Synthesizes a cause from the code's text and captures the call stack.
    ///
    /// Use this for failures that originate in the calling layer and have no
    /// prior cause, such as business rule violations.
    #[must_use]
    pub fn from_code(code: Code) -> Self {
        Self {
            cause: BoxError::from(code.text().to_owned()),
            code: Some(code),
            trace: Some(Backtrace::force_capture()),
        }
    }

    /// Classifies the error after the fact.
    pub fn set_code(&mut self, code: Code) {
        self.code = Some(code);
    }

    /// Builder form of [`set_code`](Self::set_code).
    #[must_use]
    pub fn coded(mut self, code: Code) -> Self {
        self.code = Some(code);
        self
    }

    /// Returns the code, or `None` if the error is unclassified.
    #[must_use]
    pub fn code(&self) -> Option<&Code> {
        self.code.as_ref()
    }

    /// Returns the captured stack trace, if any.
    ///
    /// When this error carries no trace of its own but wraps another
    /// `DomainError` that does, the inner trace is returned.
    #[must_use]
    pub fn stack_trace(&self) -> Option<&Backtrace> {
        self.trace.as_ref().or_else(|| {
            self.cause_as::<DomainError>()
                .and_then(DomainError::stack_trace)
        })
    }

    /// Returns the underlying cause.
    #[must_use]
    pub fn cause(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// Downcasts the cause to a concrete error type.
    #[must_use]
    pub fn cause_as<E: Error + 'static>(&self) -> Option<&E> {
        self.cause.downcast_ref::<E>()
    }

    /// Returns the cause's message without the code prefix.
    #[must_use]
    pub fn message(&self) -> String {
        self.cause.to_string()
    }

    /// Consumes the error and returns the cause.
    #[must_use]
    pub fn into_cause(self) -> BoxError {
        self.cause
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) if !code.text().is_empty() => write!(f, "{}: {}", code.text(), self.cause),
            _ => write!(f, "{}", self.cause),
        }
    }
}

impl Error for DomainError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

//! Result and error types for Describir.

use thiserror::Error;

/// Result type for Describir operations
pub type DescribirResult<T> = Result<T, DescribirError>;

/// Errors that can occur in Describir
#[derive(Debug, Error)]
pub enum DescribirError {
    /// Assertion failed inside a hook or test action
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// A tag expression could not be parsed
    #[error("Invalid tag expression: {message}")]
    ExpressionParse {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DescribirError {
    /// Create an assertion failure with the given message.
    ///
    /// Shorthand for returning `Err` from a hook or test action:
    ///
    /// ```
    /// use describir::DescribirError;
    ///
    /// let check = |n: u32| {
    ///     if n == 0 {
    ///         return Err(DescribirError::assertion("count must be non-zero"));
    ///     }
    ///     Ok(())
    /// };
    /// assert!(check(0).is_err());
    /// ```
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    pub(crate) fn expression(message: impl Into<String>) -> Self {
        Self::ExpressionParse {
            message: message.into(),
        }
    }
}

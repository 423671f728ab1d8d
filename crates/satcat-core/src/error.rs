//! Error types and result aliases for satcat infrastructure.
//!
//! Catalog-level failures (not found, conflicts, validation) are modelled in
//! `satcat-catalog`; this type covers configuration and identifier parsing.

/// The result type used by satcat infrastructure code.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised outside the catalog domain.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the ID invalid.
        message: String,
    },

    /// Invalid input was provided (usually configuration).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

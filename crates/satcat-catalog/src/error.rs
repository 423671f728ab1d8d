//! Error types for catalog operations.

use thiserror::Error;

use satcat_core::ComponentId;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur during catalog operations.
///
/// Every variant except [`CatalogError::Storage`] is detected before a write
/// is issued, so a failed operation never leaves a partial change behind.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A referenced component, parent, or subsystem does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Description of what was not found.
        message: String,
    },

    /// A unique name is already taken.
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflicting value.
        message: String,
    },

    /// The request violates a field range or a hierarchy rule.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the violated rule.
        message: String,
    },

    /// The backing store failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// A non-storage failure that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl CatalogError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates the validation error for a reparent that would close a cycle.
    #[must_use]
    pub fn cycle(child: ComponentId, new_parent: ComponentId) -> Self {
        Self::validation(format!(
            "moving component {child} under {new_parent} would create a cycle"
        ))
    }

    /// Creates a storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the human-readable message without the category prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound { message }
            | Self::Conflict { message }
            | Self::Validation { message }
            | Self::Storage { message }
            | Self::Internal { message } => message,
        }
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, detail)
                if code.code == rusqlite::ErrorCode::ConstraintViolation
                    && detail
                        .as_deref()
                        .is_some_and(|d| d.contains("UNIQUE constraint failed")) =>
            {
                let column = detail
                    .as_deref()
                    .and_then(|d| d.rsplit(": ").next())
                    .unwrap_or("name");
                Self::conflict(format!("duplicate value for {column}"))
            }
            rusqlite::Error::SqliteFailure(code, detail)
                if code.code == rusqlite::ErrorCode::ConstraintViolation
                    && detail
                        .as_deref()
                        .is_some_and(|d| d.contains("FOREIGN KEY constraint failed")) =>
            {
                Self::not_found("referenced component or subsystem does not exist")
            }
            _ => Self::storage(err.to_string()),
        }
    }
}

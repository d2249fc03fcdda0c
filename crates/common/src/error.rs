//! Error types for CiProbe

use thiserror::Error;

/// Result type alias using CiProbe Error
pub type Result<T> = std::result::Result<T, Error>;

/// CiProbe error types
///
/// `Instantiate`, `FieldAccess` and `MissingIdentity` are structural errors:
/// the test data setup is broken, not the product under test.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Test data setup error: cannot instantiate model {model}: {reason}")]
    Instantiate { model: String, reason: String },

    #[error("Test data setup error: cannot access field {model}.{field}: {reason}")]
    FieldAccess {
        model: String,
        field: String,
        reason: String,
    },

    #[error("Test data setup error: {category} entity has neither an id nor a locator")]
    MissingIdentity { category: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error points at a malformed model declaration rather
    /// than at the system under test
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::Instantiate { .. } | Error::FieldAccess { .. } | Error::MissingIdentity { .. }
        )
    }

    pub(crate) fn field(model: &str, field: &str, reason: impl Into<String>) -> Self {
        Error::FieldAccess {
            model: model.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

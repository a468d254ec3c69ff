//! Core error types.

use boquery_lang::ParseError;
use boquery_proto::QueryError;
use thiserror::Error;

/// Core loader errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Criteria text could not be parsed.
    #[error("invalid criteria: {0}")]
    Parse(#[from] ParseError),

    /// Criteria parsed but does not fit the class metadata.
    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    /// An argument was outside its allowed range.
    #[error("out of range: {0}")]
    Range(String),

    /// The caller broke a usage invariant.
    ///
    /// `user_message` is safe to show to end users; `developer_message`
    /// carries the diagnostic detail.
    #[error("{user_message}")]
    Developer {
        user_message: String,
        developer_message: String,
    },

    /// No class definition is registered under this name.
    #[error("unknown class '{0}'")]
    UnknownClass(String),

    /// The class has no property with this name.
    #[error("class '{class}' has no property '{property}'")]
    UnknownProperty { class: String, property: String },

    /// The class has no relationship with this name.
    #[error("class '{class}' has no relationship '{relationship}'")]
    UnknownRelationship { class: String, relationship: String },

    /// Class metadata failed validation.
    #[error("invalid class definition: {0}")]
    InvalidClassDef(String),

    /// A value could not be converted to a property type.
    #[error("cannot convert {value} ({from}) to {to}")]
    Conversion {
        value: String,
        from: &'static str,
        to: &'static str,
    },

    /// A write was rejected by the property's read-write rule.
    #[error("property '{property}' of '{class}' cannot be set: {reason}")]
    NotWritable {
        class: String,
        property: String,
        reason: String,
    },

    /// A business object failed validation before save.
    #[error("'{class}' is not valid: {message}")]
    Validation { class: String, message: String },

    /// Deletion blocked by a relationship's delete-parent action.
    #[error("cannot delete {object}: {count} related object(s) through '{relationship}'")]
    DeletePrevented {
        object: String,
        relationship: String,
        count: usize,
    },

    /// Delete cascade went deeper than the configured limit.
    #[error("delete cascade exceeded maximum depth of {0}")]
    CascadeDepthExceeded(usize),

    /// The query deadline passed before the store finished.
    #[error("query deadline exceeded")]
    DeadlineExceeded,

    /// SQLite store error.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Class metadata JSON could not be read.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a developer error.
    pub fn developer(user_message: impl Into<String>, developer_message: impl Into<String>) -> Self {
        Error::Developer {
            user_message: user_message.into(),
            developer_message: developer_message.into(),
        }
    }

    /// Check whether this error reports malformed or unresolvable criteria.
    pub fn is_invalid_criteria(&self) -> bool {
        matches!(self, Error::Parse(_) | Error::InvalidCriteria(_))
    }

    /// Developer-facing detail, if this is a developer error.
    pub fn developer_message(&self) -> Option<&str> {
        match self {
            Error::Developer {
                developer_message, ..
            } => Some(developer_message),
            _ => None,
        }
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::NegativeFirstRecord(_) => Error::Range(err.to_string()),
            QueryError::OrderCriteriaWithoutSource => Error::developer(
                "The query could not be prepared",
                err.to_string(),
            ),
        }
    }
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, Error>;

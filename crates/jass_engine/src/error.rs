//! Error types for engine operations.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by a search engine.
///
/// Variants mirror the failure classes a document store exposes over its
/// wire protocol. Callers translate the ones that carry domain meaning
/// (conflicts, strict mapping rejections, missing documents) and propagate
/// the rest untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// The engine could not be reached.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The operation did not complete in time.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// A concrete index named by the request does not exist.
    #[error("no such index: {index}")]
    IndexNotFound {
        /// The missing index.
        index: String,
    },

    /// An index with this name already exists.
    #[error("index already exists: {index}")]
    IndexAlreadyExists {
        /// The existing index.
        index: String,
    },

    /// The index name is not acceptable to the engine.
    #[error("invalid index name [{index}]: {reason}")]
    InvalidIndexName {
        /// The rejected name.
        index: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The document does not exist.
    #[error("document not found: [{index}][{id}]")]
    DocumentNotFound {
        /// Index searched.
        index: String,
        /// Missing document id.
        id: String,
    },

    /// A create was issued for an id that already exists.
    #[error("version conflict, document already exists: [{index}][{id}]")]
    VersionConflict {
        /// Index written to.
        index: String,
        /// Conflicting document id.
        id: String,
    },

    /// A strict mapping rejected an unknown field.
    #[error("mapping set to strict, dynamic introduction of [{field}] within [{index}] is not allowed")]
    StrictDynamicMapping {
        /// Index written to.
        index: String,
        /// Offending field path.
        field: String,
    },

    /// A value could not be parsed into its mapped type.
    #[error("failed to parse field [{field}] in [{index}]: {reason}")]
    MapperParsing {
        /// Index written to.
        index: String,
        /// Offending field path.
        field: String,
        /// Parser message.
        reason: String,
    },

    /// A mapping update tried to redefine an existing field.
    #[error("mapper [{field}] conflicts with existing mapping in [{index}]")]
    MappingConflict {
        /// Index whose mapping was updated.
        index: String,
        /// Conflicting field path.
        field: String,
    },

    /// A scroll cursor is unknown or has expired.
    #[error("no search context found for cursor {cursor_id}")]
    CursorNotFound {
        /// The cursor id.
        cursor_id: String,
    },

    /// The request was malformed or exceeded a limit.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
}

impl EngineError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates an illegal argument error.
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::IllegalArgument(message.into())
    }

    /// Creates an index not found error.
    pub fn index_not_found(index: impl Into<String>) -> Self {
        Self::IndexNotFound {
            index: index.into(),
        }
    }

    /// Creates a document not found error.
    pub fn document_not_found(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DocumentNotFound {
            index: index.into(),
            id: id.into(),
        }
    }

    /// Returns true if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Unavailable(_) | EngineError::Timeout(_))
    }

    /// Returns true for the "does not exist" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::IndexNotFound { .. }
                | EngineError::DocumentNotFound { .. }
                | EngineError::CursorNotFound { .. }
        )
    }
}

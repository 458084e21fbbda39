//! Error types for the JASS document layer.

use jass_engine::EngineError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in document-layer operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Engine error with no domain meaning, propagated untouched.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A directory, document, binding or schema does not exist.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// What was looked up.
        kind: &'static str,
        /// Its identifier.
        name: String,
    },

    /// An object with this identifier already exists.
    #[error("{kind} already exists: {name}")]
    AlreadyExists {
        /// What was created.
        kind: &'static str,
        /// Its identifier.
        name: String,
    },

    /// Another directory already uses this alias.
    #[error("alias already in use: {alias}")]
    AliasAlreadyExists {
        /// The alias.
        alias: String,
    },

    /// An index name failed the naming guard.
    #[error("invalid index name: {name}")]
    InvalidName {
        /// The rejected name or selector.
        name: String,
    },

    /// A document does not fit the strict schema of its index.
    #[error("document violates schema of {index} at [{field}]: {reason}")]
    SchemaViolation {
        /// Physical index.
        index: String,
        /// Offending field path.
        field: String,
        /// Engine message.
        reason: String,
    },

    /// A field would change its compiled definition.
    #[error("incompatible migration of field [{field}]")]
    MigrationIncompatible {
        /// The conflicting field.
        field: String,
    },

    /// A field would disappear.
    #[error("migration may not delete field [{field}]")]
    MigrationDeleteNotSupported {
        /// The missing field.
        field: String,
    },

    /// The schema uses a construct the compiler cannot represent.
    #[error("unsupported schema shape at [{field}]: {reason}")]
    UnsupportedSchemaShape {
        /// The offending field.
        field: String,
        /// What is unsupported.
        reason: String,
    },

    /// Search annotations on a field are missing or inconsistent.
    #[error("invalid schema binding at [{field}]: {reason}")]
    InvalidSchemaBinding {
        /// The offending field.
        field: String,
        /// What is wrong.
        reason: String,
    },

    /// Raw schema text is not a JSON object.
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Parser message.
        message: String,
    },

    /// A value nests deeper than canonicalization allows.
    #[error("value nests deeper than {limit} levels")]
    CanonicalDepthExceeded {
        /// The depth limit.
        limit: usize,
    },

    /// A document type has no index and none may be created.
    #[error("no schema found for document type: {doc_type}")]
    NoSchemaFound {
        /// The document type.
        doc_type: String,
    },

    /// The engine stayed unreachable after every reconnect attempt.
    #[error("engine unavailable after {attempts} attempts: {message}")]
    EngineUnavailable {
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        message: String,
    },

    /// One or more steps of a cascading delete failed.
    #[error("delete failed: {}", failures.join("; "))]
    DeleteFailed {
        /// One message per failed step.
        failures: Vec<String>,
    },

    /// A configuration value could not be parsed.
    #[error("invalid configuration {key}: {message}")]
    InvalidConfig {
        /// Setting name.
        key: String,
        /// Parse message.
        message: String,
    },
}

impl CoreError {
    /// Creates a not found error.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Creates an already exists error.
    pub fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Creates an unsupported schema shape error.
    pub fn unsupported_shape(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedSchemaShape {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid schema binding error.
    pub fn invalid_binding(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchemaBinding {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Translates an engine write error into its domain meaning.
    ///
    /// Conflicts become `AlreadyExists`, mapping rejections become
    /// `SchemaViolation` and missing documents become `NotFound`.
    pub fn from_write(err: EngineError) -> Self {
        match err {
            EngineError::VersionConflict { id, .. } => Self::already_exists("document", id),
            EngineError::StrictDynamicMapping { index, field } => Self::SchemaViolation {
                index,
                field,
                reason: "field is not declared in the strict schema".to_string(),
            },
            EngineError::MapperParsing {
                index,
                field,
                reason,
            } => Self::SchemaViolation {
                index,
                field,
                reason,
            },
            EngineError::DocumentNotFound { id, .. } => Self::not_found("document", id),
            other => Self::Engine(other),
        }
    }

    /// Returns true for `NotFound` and the engine's not-found family.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Engine(err) => err.is_not_found(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_errors_translate() {
        let conflict = CoreError::from_write(EngineError::VersionConflict {
            index: "i".into(),
            id: "x".into(),
        });
        assert!(matches!(conflict, CoreError::AlreadyExists { name, .. } if name == "x"));

        let strict = CoreError::from_write(EngineError::StrictDynamicMapping {
            index: "i".into(),
            field: "age".into(),
        });
        assert!(matches!(strict, CoreError::SchemaViolation { field, .. } if field == "age"));

        let missing = CoreError::from_write(EngineError::document_not_found("i", "x"));
        assert!(missing.is_not_found());

        let other = CoreError::from_write(EngineError::unavailable("down"));
        assert!(matches!(other, CoreError::Engine(_)));
    }

    #[test]
    fn not_found_covers_engine_family() {
        assert!(CoreError::from(EngineError::index_not_found("i")).is_not_found());
        assert!(CoreError::not_found("directory", "d").is_not_found());
        assert!(!CoreError::invalid_name("x").is_not_found());
    }

    #[test]
    fn delete_failed_lists_every_step() {
        let err = CoreError::DeleteFailed {
            failures: vec!["a failed".into(), "b failed".into()],
        };
        assert_eq!(err.to_string(), "delete failed: a failed; b failed");
    }
}

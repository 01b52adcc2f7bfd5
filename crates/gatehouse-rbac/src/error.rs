//! Configuration error types
//!
//! Errors raised while reading declarative permission metadata: override
//! matrices and resource registry documents. Malformed override entries are
//! recovered locally by the resolver; these values exist so callers can report
//! what was ignored.

use thiserror::Error;

/// Errors in declarative permission configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// An override entry for a role is not a list of action names.
    #[error("override for role '{role}' must be a list of action names, found {found}")]
    MalformedOverride {
        /// Role key of the malformed entry.
        role: String,
        /// JSON kind that was found instead.
        found: String,
    },

    /// A resource id was registered twice.
    #[error("duplicate resource definition: {0}")]
    DuplicateResource(String),

    /// A controller id was registered twice.
    #[error("duplicate controller definition: {0}")]
    DuplicateController(String),

    /// An identifier is empty or contains reserved characters.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A registry document could not be parsed.
    #[error("invalid registry document: {0}")]
    InvalidDocument(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigurationError>;

//! Error types for authorization operations
//!
//! This module defines the errors that can occur while compiling permission
//! matrices and while deciding requests. Decision entry points never surface
//! these as an allow: every error path resolves to a deny and is logged.

use gatehouse_identity::IdentityError;
use gatehouse_rbac::{Component, ConfigurationError};
use thiserror::Error;

/// Permission store error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store cannot be reached or its state is unusable
    #[error("Permission store unavailable: {0}")]
    Unavailable(String),

    /// A record or link could not be written
    #[error("Failed to write {what}: {message}")]
    Write {
        /// What was being written
        what: String,
        /// Underlying failure
        message: String,
    },

    /// A link referenced a record id that does not exist
    #[error("Unknown permission record: {0}")]
    UnknownRecord(u64),
}

/// Result type for permission store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// One component that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationFailure {
    /// The component whose compilation was aborted
    pub component: Component,
    /// Why it failed
    pub reason: String,
}

/// Aggregate compilation failure.
///
/// Returned by single-item compilation and by
/// [`CompilationReport::into_result`](crate::report::CompilationReport::into_result).
/// The administrative caller decides whether to retry; compilation is always
/// safe to re-run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} of {} component(s) failed to compile", .failures.len(), .attempted)]
pub struct CompilationError {
    /// Number of components compilation was attempted for
    pub attempted: usize,
    /// The components that failed
    pub failures: Vec<CompilationFailure>,
}

impl CompilationError {
    /// A single-component failure.
    pub fn single(component: Component, reason: impl Into<String>) -> Self {
        Self {
            attempted: 1,
            failures: vec![CompilationFailure {
                component,
                reason: reason.into(),
            }],
        }
    }
}

/// Authorization error types.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Declarative configuration is malformed
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Role or actor lookup failed
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Permission store failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The related component of a relationship cannot be determined
    #[error("Cannot resolve relationship '{relationship}' on '{primary}'")]
    RelationshipResolution {
        /// Primary resource id
        primary: String,
        /// Relationship name
        relationship: String,
    },

    /// Relationship operation kind is not recognized
    #[error("Unknown relationship operation: {0}")]
    UnknownOperation(String),

    /// Request context carries neither a resource nor a controller
    #[error("Request context does not identify a component")]
    MissingComponent,

    /// Route action annotation is not a valid action name
    #[error("Invalid action annotation: {0:?}")]
    InvalidAction(String),

    /// Compilation failed for one or more components
    #[error("Compilation failed: {0}")]
    Compilation(#[from] CompilationError),
}

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

impl AuthzError {
    /// Check if this error should be logged at error level.
    ///
    /// Unknown roles, missing relationships and malformed request metadata
    /// are expected denials rather than faults.
    pub fn is_server_error(&self) -> bool {
        match self {
            AuthzError::Store(_) | AuthzError::Compilation(_) | AuthzError::Configuration(_) => true,
            AuthzError::Identity(e) => e.is_server_error(),
            _ => false,
        }
    }

    /// HTTP status code a dispatcher should answer with.
    ///
    /// Decision-time failures are always access denied; only administrative
    /// failures map to 500.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthzError::Identity(_)
            | AuthzError::Store(_)
            | AuthzError::RelationshipResolution { .. }
            | AuthzError::UnknownOperation(_)
            | AuthzError::MissingComponent
            | AuthzError::InvalidAction(_) => 403,

            AuthzError::Configuration(_) | AuthzError::Compilation(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthzError::Configuration(_) => "CONFIGURATION_ERROR",
            AuthzError::Identity(IdentityError::UnknownRole(_)) => "UNKNOWN_ROLE",
            AuthzError::Identity(IdentityError::UnknownActor(_)) => "UNKNOWN_ACTOR",
            AuthzError::Identity(_) => "IDENTITY_ERROR",
            AuthzError::Store(_) => "STORE_UNAVAILABLE",
            AuthzError::RelationshipResolution { .. } => "RELATIONSHIP_UNRESOLVED",
            AuthzError::UnknownOperation(_) => "UNKNOWN_OPERATION",
            AuthzError::MissingComponent => "MISSING_COMPONENT",
            AuthzError::InvalidAction(_) => "INVALID_ACTION",
            AuthzError::Compilation(_) => "COMPILATION_FAILED",
        }
    }
}

//! Error types for identity operations
//!
//! Failures while looking up roles and actors or mutating role assignments.

use thiserror::Error;
use uuid::Uuid;

/// Identity error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Role name or id is not known to the role store
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Actor id is not known to the actor store
    #[error("Unknown actor: {0}")]
    UnknownActor(Uuid),

    /// Role name is empty or has surrounding whitespace
    #[error("Invalid role name: {0:?}")]
    InvalidRoleName(String),

    /// A role with this name already exists
    #[error("Role already exists: {0}")]
    DuplicateRole(String),

    /// Role is still linked to at least one actor
    #[error("Role is still assigned to actors: {0}")]
    RoleInUse(String),

    /// Backing store could not be read or written
    #[error("Identity store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

impl IdentityError {
    /// Whether the failure comes from infrastructure rather than data.
    pub fn is_server_error(&self) -> bool {
        matches!(self, IdentityError::Unavailable(_))
    }
}

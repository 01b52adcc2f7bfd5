//! # Gatehouse Identity
//!
//! This crate provides the identity side of gatehouse authorization:
//! roles, actors, and the cached role registry.
//!
//! ## Overview
//!
//! The gatehouse-identity crate handles:
//! - **Roles**: Named groups with unique, non-empty names
//! - **Role Registry**: Cached lookup of roles by name, with explicit invalidation
//! - **Actors**: Entities whose single role link is derived from a classification
//! - **Invalidation**: An event handler that keeps the registry fresh on role mutations
//!
//! ## Architecture
//!
//! ```text
//! Actor ─ classification ─▶ role link ─▶ Role
//!                                         ▲
//! RoleRegistry (cache) ── RoleSource ─────┘
//!        ▲
//!        └── RoleCacheInvalidator ◀── identity.role.* events
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use gatehouse_identity::{ActorStore, MemoryActorStore, MemoryRoleDirectory, RoleRegistry};
//!
//! let directory = Arc::new(MemoryRoleDirectory::with_roles(["user", "manager"]).unwrap());
//! let registry = RoleRegistry::new(directory);
//! let actors = MemoryActorStore::new();
//!
//! let actor = actors.register("user", &registry).unwrap();
//! actors.set_classification(actor.id, "manager", &registry).unwrap();
//!
//! let roles = actors.roles_of(actor.id, &registry).unwrap();
//! assert_eq!(roles.len(), 1);
//! assert_eq!(roles[0].name, "manager");
//! ```

pub mod actor;
pub mod error;
pub mod invalidation;
pub mod roles;

// Re-export main types for convenience
pub use actor::{Actor, ActorStore, MemoryActorStore};
pub use error::{IdentityError, IdentityResult};
pub use invalidation::RoleCacheInvalidator;
pub use roles::{MemoryRoleDirectory, Role, RoleReferences, RoleRegistry, RoleSource};

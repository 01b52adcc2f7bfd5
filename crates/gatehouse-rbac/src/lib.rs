//! # Gatehouse RBAC
//!
//! Declarative permission vocabulary and metadata for the gatehouse
//! authorization engine.
//!
//! ## Overview
//!
//! The gatehouse-rbac crate handles:
//! - **Actions**: `list`, `read`, `create`, `update`, `delete` and controller verbs
//! - **Components**: Model resources and controllers, in separate namespaces
//! - **Matrices**: Default role → actions maps, overrides and wildcard expansion
//! - **Permissions**: Compiled (component, action) records and role links
//! - **Resources**: The declarative registry of resource and controller metadata
//!
//! ## Architecture
//!
//! ```text
//! ResourceDefinition { defaults, override, relationships }
//!        │
//!        ▼ matrix::resolve + matrix::expand_wildcard
//! RoleActionMap  ── compiled by gatehouse-authz ──▶ PermissionRecord + RolePermissionLink
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use gatehouse_rbac::matrix::{expand_wildcard, resolve};
//! use gatehouse_rbac::resources::{ResourceDefinition, ResourceRegistry};
//!
//! let registry = ResourceRegistry::new()
//!     .with_resource(ResourceDefinition::new("Movies").with_permissions([("user", vec!["read"])]))
//!     .unwrap();
//!
//! let movies = registry.resource("Movies").unwrap();
//! let effective = resolve(&movies.defaults.matrix(), movies.override_matrix.as_ref());
//!
//! assert_eq!(effective["user"], vec!["read"]);
//! assert_eq!(expand_wildcard(&effective["admin"]).len(), 5);
//! ```

pub mod actions;
pub mod components;
pub mod error;
pub mod matrix;
pub mod permissions;
pub mod resources;

// Re-export main types for convenience
pub use actions::Action;
pub use components::{Component, ComponentKind};
pub use error::{ConfigResult, ConfigurationError};
pub use matrix::{MatrixOverride, MatrixResolution, RoleActionMap};
pub use permissions::{PermissionKey, PermissionRecord, RolePermissionLink};
pub use resources::{
    ControllerDefinition, DefaultMatrix, RelationshipDescriptor, ResourceDefinition,
    ResourceRegistry,
};

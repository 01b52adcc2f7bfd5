//! # Gatehouse Authorization
//!
//! This crate compiles declarative permission matrices into a permission
//! store and decides requests against it.
//!
//! ## Overview
//!
//! The gatehouse-authz crate handles:
//! - **Compilation**: Resource and controller matrices → deduplicated records and role links
//! - **Decisions**: Fail-secure (component, action, roles) checks with an audit trail
//! - **Request context**: Deriving the component and action from route metadata
//! - **Relationships**: Two-sided checks for list/create/link/unlink across resources
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use gatehouse_authz::{
//!     AuthorizationEngine, MemoryPermissionStore, PermissionCompiler, RequestContext,
//! };
//! use gatehouse_identity::{MemoryActorStore, MemoryRoleDirectory, RoleRegistry};
//! use gatehouse_rbac::{ResourceDefinition, ResourceRegistry};
//!
//! let resources = Arc::new(
//!     ResourceRegistry::new()
//!         .with_resource(
//!             ResourceDefinition::new("Movies").with_permissions([("user", vec!["list", "read"])]),
//!         )
//!         .unwrap(),
//! );
//! let directory = MemoryRoleDirectory::with_roles(["admin", "manager", "user", "guest"]).unwrap();
//! let roles = Arc::new(RoleRegistry::new(Arc::new(directory)));
//! let actors = Arc::new(MemoryActorStore::new());
//! let store = Arc::new(MemoryPermissionStore::new());
//!
//! let report = PermissionCompiler::new(resources, roles.clone(), store.clone()).compile_all();
//! assert!(report.is_success());
//!
//! let engine = AuthorizationEngine::new(store, roles.clone(), actors.clone());
//! let actor = actors.register("user", &roles).unwrap();
//!
//! assert!(engine.authorize(&RequestContext::new().with_verb("GET").with_resource("Movies"), actor.id));
//! assert!(!engine.authorize(&RequestContext::new().with_verb("DELETE").with_resource("Movies"), actor.id));
//! ```
//!
//! ## Logging
//!
//! Decisions are logged on the `gatehouse::audit` target. The crate never
//! installs a subscriber.

pub mod compiler;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod relationship;
pub mod report;
pub mod store;

// Re-export main types for convenience
pub use compiler::PermissionCompiler;
pub use config::{AuthzConfig, CompileStrategy, ConfigError};
pub use context::{derive_action, derive_component, RequestContext};
pub use engine::{AuthorizationEngine, AUDIT_TARGET};
pub use error::{
    AuthzError, AuthzResult, CompilationError, CompilationFailure, StoreError, StoreResult,
};
pub use relationship::{RelationshipDecision, RelationshipOperation, RelationshipPermissionResolver};
pub use report::{CompilationEntry, CompilationReport, CompilationStatus};
pub use store::{MemoryPermissionStore, PermissionStore, StoreSnapshot};

//! # Resource Definitions
//!
//! Declarative permission metadata for model resources and controllers.
//! Resources are registered explicitly at startup (in code or from a JSON
//! document) into a [`ResourceRegistry`], which the permission compiler and
//! the relationship resolver read.
//!
//! ```json
//! {
//!   "resources": [
//!     { "id": "Movies",
//!       "permissions": { "user": ["list", "read"] },
//!       "relationships": [ { "name": "quotes", "related": "Movie_Quotes" } ] },
//!     { "id": "Permissions", "defaults": "restricted",
//!       "permissions": { "admin": ["*"] } }
//!   ],
//!   "controllers": [
//!     { "id": "reports", "permissions": { "manager": ["export"] } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::components::Component;
use crate::error::{ConfigResult, ConfigurationError};
use crate::matrix::{framework_defaults, restricted_defaults, MatrixOverride, RoleActionMap};

/// Which default matrix a resource starts from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DefaultMatrix {
    /// The framework-wide defaults (admin all, manager/user CRUD, guest none).
    #[default]
    Framework,
    /// Every framework role starts empty; used for sensitive resources.
    Restricted,
}

impl DefaultMatrix {
    /// Materialize the default matrix.
    pub fn matrix(&self) -> RoleActionMap {
        match self {
            DefaultMatrix::Framework => framework_defaults(),
            DefaultMatrix::Restricted => restricted_defaults(),
        }
    }
}

/// Names the related resource reached through a relationship.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationshipDescriptor {
    /// Relationship name on the primary resource (e.g. `quotes`).
    pub name: String,
    /// Resource id of the related model (e.g. `Movie_Quotes`).
    pub related: String,
}

impl RelationshipDescriptor {
    /// Create a new descriptor.
    pub fn new(name: impl Into<String>, related: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            related: related.into(),
        }
    }

    /// The related model component, if the descriptor names one.
    pub fn related_component(&self) -> Option<Component> {
        let related = self.related.trim();
        if related.is_empty() {
            None
        } else {
            Some(Component::model(related))
        }
    }
}

/// Permission metadata for one model resource.
///
/// # Example
///
/// ```
/// use gatehouse_rbac::resources::ResourceDefinition;
///
/// let movies = ResourceDefinition::new("Movies")
///     .with_permissions([("user", vec!["read"])])
///     .with_relationship("quotes", "Movie_Quotes");
///
/// assert_eq!(movies.relationship("quotes").unwrap().related, "Movie_Quotes");
/// assert!(movies.relationship("actors").is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceDefinition {
    /// Resource id (model name).
    pub id: String,

    /// Default matrix this resource starts from.
    #[serde(default)]
    pub defaults: DefaultMatrix,

    /// Optional override, replacing the listed roles' action lists.
    #[serde(
        default,
        rename = "permissions",
        skip_serializing_if = "Option::is_none"
    )]
    pub override_matrix: Option<MatrixOverride>,

    /// Relationships to other resources.
    #[serde(default)]
    pub relationships: Vec<RelationshipDescriptor>,
}

impl ResourceDefinition {
    /// Create a resource using the framework defaults and no override.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            defaults: DefaultMatrix::Framework,
            override_matrix: None,
            relationships: Vec::new(),
        }
    }

    /// Start from the restricted (all-empty) defaults.
    pub fn restricted(mut self) -> Self {
        self.defaults = DefaultMatrix::Restricted;
        self
    }

    /// Set a raw override matrix.
    pub fn with_override(mut self, override_matrix: MatrixOverride) -> Self {
        self.override_matrix = Some(override_matrix);
        self
    }

    /// Set an override from role/action pairs.
    pub fn with_permissions<I, R, A>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (R, Vec<A>)>,
        R: Into<String>,
        A: Into<String>,
    {
        self.with_override(crate::matrix::override_from(entries))
    }

    /// Add a relationship descriptor.
    pub fn with_relationship(mut self, name: impl Into<String>, related: impl Into<String>) -> Self {
        self.relationships.push(RelationshipDescriptor::new(name, related));
        self
    }

    /// The component this resource compiles to.
    pub fn component(&self) -> Component {
        Component::model(self.id.clone())
    }

    /// Look up a relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }
}

/// Permission metadata for one controller.
///
/// Controllers have no framework defaults. An empty matrix means the
/// controller declares no custom permissions and is skipped by compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControllerDefinition {
    /// Controller id.
    pub id: String,

    /// Role name → action names (wildcards allowed).
    #[serde(default)]
    pub permissions: RoleActionMap,
}

impl ControllerDefinition {
    /// Create a controller with no permissions.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            permissions: RoleActionMap::new(),
        }
    }

    /// Grant actions to a role.
    pub fn with_role<A: Into<String>>(mut self, role: impl Into<String>, actions: Vec<A>) -> Self {
        self.permissions
            .insert(role.into(), actions.into_iter().map(Into::into).collect());
        self
    }

    /// The component this controller compiles to.
    pub fn component(&self) -> Component {
        Component::controller(self.id.clone())
    }

    /// Whether the controller declares any permissions at all.
    pub fn declares_permissions(&self) -> bool {
        !self.permissions.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    resources: Vec<ResourceDefinition>,
    #[serde(default)]
    controllers: Vec<ControllerDefinition>,
}

/// Registry of every resource and controller definition.
///
/// Iteration order is sorted by id, so compilation order is deterministic.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, ResourceDefinition>,
    controllers: BTreeMap<String, ControllerDefinition>,
}

impl ResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from a JSON document.
    ///
    /// # Example
    ///
    /// ```
    /// use gatehouse_rbac::resources::ResourceRegistry;
    ///
    /// let registry = ResourceRegistry::from_json(r#"{
    ///     "resources": [{ "id": "Movies" }],
    ///     "controllers": [{ "id": "reports", "permissions": { "admin": ["*"] } }]
    /// }"#).unwrap();
    ///
    /// assert!(registry.resource("Movies").is_some());
    /// assert!(registry.controller("reports").is_some());
    /// ```
    pub fn from_json(document: &str) -> ConfigResult<Self> {
        let document: RegistryDocument = serde_json::from_str(document)
            .map_err(|e| ConfigurationError::InvalidDocument(e.to_string()))?;

        let mut registry = Self::new();
        for resource in document.resources {
            registry.register_resource(resource)?;
        }
        for controller in document.controllers {
            registry.register_controller(controller)?;
        }
        Ok(registry)
    }

    /// Register a model resource.
    pub fn register_resource(&mut self, resource: ResourceDefinition) -> ConfigResult<()> {
        validate_identifier(&resource.id)?;
        if self.resources.contains_key(&resource.id) {
            return Err(ConfigurationError::DuplicateResource(resource.id));
        }
        tracing::debug!(resource = %resource.id, "Registered resource definition");
        self.resources.insert(resource.id.clone(), resource);
        Ok(())
    }

    /// Register a controller.
    pub fn register_controller(&mut self, controller: ControllerDefinition) -> ConfigResult<()> {
        validate_identifier(&controller.id)?;
        if self.controllers.contains_key(&controller.id) {
            return Err(ConfigurationError::DuplicateController(controller.id));
        }
        tracing::debug!(controller = %controller.id, "Registered controller definition");
        self.controllers.insert(controller.id.clone(), controller);
        Ok(())
    }

    /// Builder-style registration, for tests and static tables.
    pub fn with_resource(mut self, resource: ResourceDefinition) -> ConfigResult<Self> {
        self.register_resource(resource)?;
        Ok(self)
    }

    /// Builder-style controller registration.
    pub fn with_controller(mut self, controller: ControllerDefinition) -> ConfigResult<Self> {
        self.register_controller(controller)?;
        Ok(self)
    }

    /// Get a resource definition.
    pub fn resource(&self, id: &str) -> Option<&ResourceDefinition> {
        self.resources.get(id)
    }

    /// Get a controller definition.
    pub fn controller(&self, id: &str) -> Option<&ControllerDefinition> {
        self.controllers.get(id)
    }

    /// All resource definitions, sorted by id.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceDefinition> {
        self.resources.values()
    }

    /// All controller definitions, sorted by id.
    pub fn controllers(&self) -> impl Iterator<Item = &ControllerDefinition> {
        self.controllers.values()
    }

    /// Resolve the component reached from `primary` through `relationship`.
    ///
    /// `None` when the primary resource, the relationship, or its related id
    /// is missing.
    pub fn related_component(&self, primary: &str, relationship: &str) -> Option<Component> {
        self.resource(primary)?
            .relationship(relationship)?
            .related_component()
    }

    /// Number of registered resources and controllers.
    pub fn len(&self) -> usize {
        self.resources.len() + self.controllers.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.controllers.is_empty()
    }
}

fn validate_identifier(id: &str) -> ConfigResult<()> {
    if id.trim().is_empty() || id.contains(':') || id.trim() != id {
        return Err(ConfigurationError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

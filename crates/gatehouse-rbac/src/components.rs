//! # Components
//!
//! A component is anything a permission can be granted on: a data model
//! resource or a controller (a non-model service endpoint). The two live in
//! separate namespaces so a model called `reports` never shares permissions
//! with a controller called `reports`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The namespace a component belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// A data model resource with CRUD semantics.
    Model,
    /// A controller / service endpoint with its own verbs.
    Controller,
}

impl ComponentKind {
    /// Get the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Model => "model",
            ComponentKind::Controller => "controller",
        }
    }
}

/// An authorization-addressable unit.
///
/// # Example
///
/// ```
/// use gatehouse_rbac::components::{Component, ComponentKind};
///
/// let movies = Component::model("Movies");
/// assert_eq!(movies.kind(), ComponentKind::Model);
/// assert_eq!(movies.to_string(), "model:Movies");
///
/// let reports = Component::controller("reports");
/// assert_ne!(Component::model("reports"), reports);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Component {
    /// A model resource, identified by its resource name.
    Model(String),
    /// A controller, identified by its controller id.
    Controller(String),
}

impl Component {
    /// Create a model component.
    pub fn model(id: impl Into<String>) -> Self {
        Component::Model(id.into())
    }

    /// Create a controller component.
    pub fn controller(id: impl Into<String>) -> Self {
        Component::Controller(id.into())
    }

    /// Get the namespace of this component.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Model(_) => ComponentKind::Model,
            Component::Controller(_) => ComponentKind::Controller,
        }
    }

    /// Get the identifier within its namespace.
    pub fn id(&self) -> &str {
        match self {
            Component::Model(id) | Component::Controller(id) => id,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.id())
    }
}

//! Relationship authorization
//!
//! Operations spanning two resources (listing related rows, linking rows)
//! are allowed only when the actor holds the required permission on both
//! sides.

use gatehouse_identity::Role;
use gatehouse_rbac::{Action, Component, ResourceRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::engine::{AuthorizationEngine, AUDIT_TARGET};
use crate::error::{AuthzError, AuthzResult};

/// An operation across a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipOperation {
    /// List the rows related to a primary row
    ListRelated,
    /// Create a related row and link it
    CreateAndLink,
    /// Link an existing related row
    Link,
    /// Remove a link
    Unlink,
}

impl RelationshipOperation {
    /// All operations.
    pub const ALL: [RelationshipOperation; 4] = [
        RelationshipOperation::ListRelated,
        RelationshipOperation::CreateAndLink,
        RelationshipOperation::Link,
        RelationshipOperation::Unlink,
    ];

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipOperation::ListRelated => "list-related",
            RelationshipOperation::CreateAndLink => "create-and-link",
            RelationshipOperation::Link => "link",
            RelationshipOperation::Unlink => "unlink",
        }
    }

    /// Parse an operation name, accepting `-` or `_` separators.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "list-related" => Some(RelationshipOperation::ListRelated),
            "create-and-link" => Some(RelationshipOperation::CreateAndLink),
            "link" => Some(RelationshipOperation::Link),
            "unlink" => Some(RelationshipOperation::Unlink),
            _ => None,
        }
    }

    /// The (primary, related) actions this operation requires.
    ///
    /// ```
    /// use gatehouse_authz::relationship::RelationshipOperation;
    /// use gatehouse_rbac::Action;
    ///
    /// assert_eq!(
    ///     RelationshipOperation::CreateAndLink.required_actions(),
    ///     (Action::Read, Action::Create)
    /// );
    /// ```
    pub fn required_actions(&self) -> (Action, Action) {
        match self {
            RelationshipOperation::ListRelated => (Action::Read, Action::List),
            RelationshipOperation::CreateAndLink => (Action::Read, Action::Create),
            RelationshipOperation::Link | RelationshipOperation::Unlink => (Action::Update, Action::Read),
        }
    }
}

impl fmt::Display for RelationshipOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detailed outcome of a relationship check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipDecision {
    /// Primary side
    pub primary: Component,
    /// Action required on the primary side
    pub primary_action: Action,
    /// Whether the primary side was granted
    pub primary_allowed: bool,
    /// Related side
    pub related: Component,
    /// Action required on the related side
    pub related_action: Action,
    /// Whether the related side was granted
    pub related_allowed: bool,
}

impl RelationshipDecision {
    /// Both sides granted.
    pub fn is_allowed(&self) -> bool {
        self.primary_allowed && self.related_allowed
    }
}

/// Decides relationship operations through an [`AuthorizationEngine`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use gatehouse_authz::engine::AuthorizationEngine;
/// use gatehouse_authz::relationship::{RelationshipOperation, RelationshipPermissionResolver};
/// use gatehouse_authz::store::MemoryPermissionStore;
/// use gatehouse_identity::{MemoryActorStore, MemoryRoleDirectory, RoleRegistry};
/// use gatehouse_rbac::{ResourceDefinition, ResourceRegistry};
///
/// let resources = ResourceRegistry::new()
///     .with_resource(ResourceDefinition::new("Movies").with_relationship("quotes", "Movie_Quotes"))
///     .unwrap();
/// let directory = MemoryRoleDirectory::with_roles(["user"]).unwrap();
/// let roles = Arc::new(RoleRegistry::new(Arc::new(directory)));
/// let engine = AuthorizationEngine::new(
///     Arc::new(MemoryPermissionStore::new()),
///     roles.clone(),
///     Arc::new(MemoryActorStore::new()),
/// );
/// let resolver = RelationshipPermissionResolver::new(Arc::new(engine), Arc::new(resources));
///
/// let user = roles.get_by_name("user").unwrap();
/// // Nothing compiled yet: denied.
/// assert!(!resolver.decide_relationship("Movies", "quotes", RelationshipOperation::Link, &[user]));
/// ```
#[derive(Debug, Clone)]
pub struct RelationshipPermissionResolver {
    engine: Arc<AuthorizationEngine>,
    resources: Arc<ResourceRegistry>,
}

impl RelationshipPermissionResolver {
    /// Create a resolver.
    pub fn new(engine: Arc<AuthorizationEngine>, resources: Arc<ResourceRegistry>) -> Self {
        Self { engine, resources }
    }

    /// Decide a relationship operation. Unresolvable relationships deny.
    pub fn decide_relationship(
        &self,
        primary: &str,
        relationship: &str,
        operation: RelationshipOperation,
        roles: &[Role],
    ) -> bool {
        match self.evaluate_relationship(primary, relationship, operation, roles) {
            Ok(decision) => decision.is_allowed(),
            Err(e) => {
                deny_unresolved(primary, relationship, operation.as_str(), &e);
                false
            }
        }
    }

    /// Decide a relationship operation given by name.
    ///
    /// Unrecognized operation names deny.
    pub fn decide_relationship_named(
        &self,
        primary: &str,
        relationship: &str,
        operation: &str,
        roles: &[Role],
    ) -> bool {
        let outcome = self.related_component(primary, relationship).and_then(|_| {
            RelationshipOperation::parse(operation)
                .ok_or_else(|| AuthzError::UnknownOperation(operation.to_string()))
        });

        match outcome {
            Ok(parsed) => self.decide_relationship(primary, relationship, parsed, roles),
            Err(e) => {
                deny_unresolved(primary, relationship, operation, &e);
                false
            }
        }
    }

    /// Evaluate both sides of a relationship operation.
    ///
    /// Both sides are always decided, so each appears in the audit log even
    /// when the first one already denies.
    pub fn evaluate_relationship(
        &self,
        primary: &str,
        relationship: &str,
        operation: RelationshipOperation,
        roles: &[Role],
    ) -> AuthzResult<RelationshipDecision> {
        let related = self.related_component(primary, relationship)?;
        let primary = Component::model(primary);
        let (primary_action, related_action) = operation.required_actions();

        let primary_allowed = self.engine.decide(&primary, &primary_action, roles);
        let related_allowed = self.engine.decide(&related, &related_action, roles);

        Ok(RelationshipDecision {
            primary,
            primary_action,
            primary_allowed,
            related,
            related_action,
            related_allowed,
        })
    }

    fn related_component(&self, primary: &str, relationship: &str) -> AuthzResult<Component> {
        self.resources
            .related_component(primary, relationship)
            .ok_or_else(|| AuthzError::RelationshipResolution {
                primary: primary.to_string(),
                relationship: relationship.to_string(),
            })
    }
}

fn deny_unresolved(primary: &str, relationship: &str, operation: &str, error: &AuthzError) {
    warn!(
        target: AUDIT_TARGET,
        decision = "deny",
        primary = primary,
        relationship = relationship,
        operation = operation,
        error = %error,
        "Relationship check cannot proceed, denying"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_pairs() {
        use RelationshipOperation::*;
        assert_eq!(ListRelated.required_actions(), (Action::Read, Action::List));
        assert_eq!(CreateAndLink.required_actions(), (Action::Read, Action::Create));
        assert_eq!(Link.required_actions(), (Action::Update, Action::Read));
        assert_eq!(Unlink.required_actions(), (Action::Update, Action::Read));
    }

    #[test]
    fn test_parse() {
        for operation in RelationshipOperation::ALL {
            assert_eq!(RelationshipOperation::parse(operation.as_str()), Some(operation));
        }
        assert_eq!(
            RelationshipOperation::parse("LIST_RELATED"),
            Some(RelationshipOperation::ListRelated)
        );
        assert_eq!(RelationshipOperation::parse("merge"), None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&RelationshipOperation::CreateAndLink).unwrap();
        assert_eq!(json, "\"create-and-link\"");
    }
}

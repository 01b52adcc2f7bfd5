//! # Permissions
//!
//! Compiled permission records and their links to roles.
//! A permission record is a deduplicated (component, action) pair; roles hold
//! it through [`RolePermissionLink`] rows.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::actions::Action;
use crate::components::Component;

/// The natural key of a permission record.
///
/// # Example
///
/// ```
/// use gatehouse_rbac::actions::Action;
/// use gatehouse_rbac::components::Component;
/// use gatehouse_rbac::permissions::PermissionKey;
///
/// let key = PermissionKey::new(Component::model("Movies"), Action::Read);
/// assert_eq!(key.to_string(), "model:Movies:read");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionKey {
    /// The component the permission applies to.
    pub component: Component,
    /// The action allowed on the component.
    pub action: Action,
}

impl PermissionKey {
    /// Create a new key.
    pub fn new(component: Component, action: Action) -> Self {
        Self { component, action }
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.component, self.action)
    }
}

/// A persisted (component, action) permission.
///
/// Records are unique per key within a store. Ids are assigned by the store
/// in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Store-assigned id.
    pub id: u64,
    /// The component the permission applies to.
    pub component: Component,
    /// The action allowed on the component.
    pub action: Action,
}

impl PermissionRecord {
    /// Create a record with an id already assigned.
    pub fn new(id: u64, component: Component, action: Action) -> Self {
        Self {
            id,
            component,
            action,
        }
    }

    /// Get the natural key of this record.
    pub fn key(&self) -> PermissionKey {
        PermissionKey::new(self.component.clone(), self.action.clone())
    }
}

/// Many-to-many link between a role and a permission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RolePermissionLink {
    /// The role holding the permission.
    pub role_id: Uuid,
    /// The permission record held.
    pub permission_id: u64,
}

impl RolePermissionLink {
    /// Create a new link.
    pub fn new(role_id: Uuid, permission_id: u64) -> Self {
        Self {
            role_id,
            permission_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = PermissionKey::new(Component::controller("reports"), Action::Custom("export".into()));
        assert_eq!(key.to_string(), "controller:reports:export");
    }

    #[test]
    fn test_record_key_keeps_namespaces_apart() {
        let model = PermissionRecord::new(1, Component::model("Movies"), Action::Update);
        let controller = PermissionRecord::new(2, Component::controller("Movies"), Action::Update);
        assert_eq!(model.key().to_string(), "model:Movies:update");
        assert_ne!(model.key(), controller.key());
    }

    #[test]
    fn test_links_order_by_role_then_permission() {
        let role = Uuid::now_v7();
        let a = RolePermissionLink::new(role, 2);
        let b = RolePermissionLink::new(role, 1);
        let mut links = vec![a, b];
        links.sort();
        assert_eq!(links[0].permission_id, 1);
    }
}

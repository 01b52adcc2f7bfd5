//! Roles and the role registry
//!
//! Roles are named groups that permission records are linked to. This module
//! defines the role entity, the [`RoleSource`] interface to the backing role
//! store, an in-memory directory, and the caching [`RoleRegistry`] consumed
//! by compilation and decisions.

use chrono::{DateTime, Utc};
use gatehouse_events::RoleEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::error::{IdentityError, IdentityResult};

/// A named role.
///
/// # Examples
///
/// ```
/// use gatehouse_identity::Role;
///
/// let role = Role::new("manager");
/// assert_eq!(role.name, "manager");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Role {
    /// Unique role ID
    pub id: Uuid,

    /// Unique, non-empty role name
    pub name: String,

    /// When the role was created
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Creates a new role with a fresh UUID v7 id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Read access to the backing role store.
pub trait RoleSource: Send + Sync {
    /// Find a role by exact name.
    fn find_by_name(&self, name: &str) -> IdentityResult<Option<Role>>;

    /// Find a role by id.
    fn find_by_id(&self, id: Uuid) -> IdentityResult<Option<Role>>;
}

/// Answers whether anything still links to a role.
pub trait RoleReferences {
    /// Whether `role_id` is linked to any actor.
    fn is_role_referenced(&self, role_id: Uuid) -> IdentityResult<bool>;
}

/// In-memory role store.
///
/// Enforces unique, non-empty names and refuses to delete a role that is
/// still referenced. Every mutation returns the [`RoleEvent`] describing it;
/// publish it so cached lookups are invalidated.
#[derive(Debug, Default)]
pub struct MemoryRoleDirectory {
    roles: RwLock<HashMap<Uuid, Role>>,
}

impl MemoryRoleDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding the given role names.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatehouse_identity::{MemoryRoleDirectory, RoleSource};
    ///
    /// let directory = MemoryRoleDirectory::with_roles(["admin", "user"]).unwrap();
    /// assert!(directory.find_by_name("admin").unwrap().is_some());
    /// ```
    pub fn with_roles<I, S>(names: I) -> IdentityResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let directory = Self::new();
        for name in names {
            directory.create_role(name)?;
        }
        Ok(directory)
    }

    /// Create a role.
    pub fn create_role(&self, name: impl Into<String>) -> IdentityResult<(Role, RoleEvent)> {
        let name = name.into();
        validate_role_name(&name)?;

        let mut roles = self.write()?;
        if roles.values().any(|r| r.name == name) {
            return Err(IdentityError::DuplicateRole(name));
        }

        let role = Role::new(name);
        roles.insert(role.id, role.clone());
        tracing::info!(role_id = %role.id, role = %role.name, "Created role");
        let event = RoleEvent::Created {
            role_id: role.id,
            name: role.name.clone(),
        };
        Ok((role, event))
    }

    /// Rename a role, keeping its id and therefore its permission links.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatehouse_events::RoleEvent;
    /// use gatehouse_identity::{MemoryRoleDirectory, RoleSource};
    ///
    /// let directory = MemoryRoleDirectory::with_roles(["staff"]).unwrap();
    /// let staff = directory.find_by_name("staff").unwrap().unwrap();
    ///
    /// let (manager, event) = directory.rename_role(staff.id, "manager").unwrap();
    /// assert_eq!(manager.id, staff.id);
    /// assert_eq!(event.affected_names(), vec!["staff", "manager"]);
    /// ```
    pub fn rename_role(
        &self,
        id: Uuid,
        new_name: impl Into<String>,
    ) -> IdentityResult<(Role, RoleEvent)> {
        let new_name = new_name.into();
        validate_role_name(&new_name)?;

        let mut roles = self.write()?;
        if roles.values().any(|r| r.name == new_name && r.id != id) {
            return Err(IdentityError::DuplicateRole(new_name));
        }

        let role = roles
            .get_mut(&id)
            .ok_or_else(|| IdentityError::UnknownRole(id.to_string()))?;
        tracing::info!(role_id = %id, old = %role.name, new = %new_name, "Renamed role");
        let old_name = std::mem::replace(&mut role.name, new_name);
        let event = RoleEvent::Renamed {
            role_id: id,
            old_name,
            new_name: role.name.clone(),
        };
        Ok((role.clone(), event))
    }

    /// Delete a role that nothing references.
    pub fn delete_role(
        &self,
        id: Uuid,
        references: &dyn RoleReferences,
    ) -> IdentityResult<(Role, RoleEvent)> {
        let mut roles = self.write()?;
        let name = roles
            .get(&id)
            .map(|r| r.name.clone())
            .ok_or_else(|| IdentityError::UnknownRole(id.to_string()))?;

        if references.is_role_referenced(id)? {
            return Err(IdentityError::RoleInUse(name));
        }

        let removed = roles
            .remove(&id)
            .ok_or_else(|| IdentityError::UnknownRole(id.to_string()))?;
        tracing::info!(role_id = %id, role = %removed.name, "Deleted role");
        let event = RoleEvent::Deleted {
            role_id: id,
            name: removed.name.clone(),
        };
        Ok((removed, event))
    }

    /// All roles, sorted by name.
    pub fn roles(&self) -> IdentityResult<Vec<Role>> {
        let mut roles: Vec<Role> = self.read()?.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    fn read(&self) -> IdentityResult<std::sync::RwLockReadGuard<'_, HashMap<Uuid, Role>>> {
        self.roles
            .read()
            .map_err(|_| IdentityError::Unavailable("role directory lock poisoned".to_string()))
    }

    fn write(&self) -> IdentityResult<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Role>>> {
        self.roles
            .write()
            .map_err(|_| IdentityError::Unavailable("role directory lock poisoned".to_string()))
    }
}

impl RoleSource for MemoryRoleDirectory {
    fn find_by_name(&self, name: &str) -> IdentityResult<Option<Role>> {
        Ok(self.read()?.values().find(|r| r.name == name).cloned())
    }

    fn find_by_id(&self, id: Uuid) -> IdentityResult<Option<Role>> {
        Ok(self.read()?.get(&id).cloned())
    }
}

fn validate_role_name(name: &str) -> IdentityResult<()> {
    if name.trim().is_empty() || name.trim() != name {
        return Err(IdentityError::InvalidRoleName(name.to_string()));
    }
    Ok(())
}

/// Cached role lookup.
///
/// Constructed explicitly and shared by reference (`Arc`) between the
/// compiler, the decision engine and the cache invalidator. Successful
/// lookups are cached until [`invalidate`](Self::invalidate) or
/// [`invalidate_role`](Self::invalidate_role) is called; misses are never
/// cached.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use gatehouse_identity::{IdentityError, MemoryRoleDirectory, RoleRegistry};
///
/// let directory = Arc::new(MemoryRoleDirectory::with_roles(["admin"]).unwrap());
/// let registry = RoleRegistry::new(directory);
///
/// assert_eq!(registry.get_by_name("admin").unwrap().name, "admin");
/// assert_eq!(registry.cached_len(), 1);
/// assert!(matches!(registry.get_by_name("ghost"), Err(IdentityError::UnknownRole(_))));
/// ```
pub struct RoleRegistry {
    source: Arc<dyn RoleSource>,
    cache: RwLock<HashMap<String, Role>>,
}

impl std::fmt::Debug for RoleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleRegistry")
            .field("cached", &self.cached_len())
            .finish()
    }
}

impl RoleRegistry {
    /// Create a registry over a role source.
    pub fn new(source: Arc<dyn RoleSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a role by name.
    ///
    /// Fails with [`IdentityError::UnknownRole`] if the source has no such role.
    pub fn get_by_name(&self, name: &str) -> IdentityResult<Role> {
        if let Some(role) = self.cached(|cache| cache.get(name).cloned()) {
            return Ok(role);
        }

        let role = self
            .source
            .find_by_name(name)?
            .ok_or_else(|| IdentityError::UnknownRole(name.to_string()))?;
        self.remember(&role);
        Ok(role)
    }

    /// Look up a role by id.
    pub fn get_by_id(&self, id: Uuid) -> IdentityResult<Role> {
        if let Some(role) = self.cached(|cache| cache.values().find(|r| r.id == id).cloned()) {
            return Ok(role);
        }

        let role = self
            .source
            .find_by_id(id)?
            .ok_or_else(|| IdentityError::UnknownRole(id.to_string()))?;
        self.remember(&role);
        Ok(role)
    }

    /// Drop every cached role.
    pub fn invalidate(&self) {
        match self.cache.write() {
            Ok(mut cache) => cache.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        tracing::debug!("Role cache cleared");
    }

    /// Drop the cached entry for one role name.
    pub fn invalidate_role(&self, name: &str) {
        match self.cache.write() {
            Ok(mut cache) => {
                cache.remove(name);
            }
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        tracing::debug!(role = %name, "Role cache entry invalidated");
    }

    /// Drop every cached entry carrying `id`, whatever name it was cached under.
    pub fn invalidate_id(&self, id: Uuid) {
        match self.cache.write() {
            Ok(mut cache) => cache.retain(|_, role| role.id != id),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    /// Number of cached roles.
    pub fn cached_len(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    fn cached<T>(&self, lookup: impl FnOnce(&HashMap<String, Role>) -> Option<T>) -> Option<T> {
        self.cache.read().ok().and_then(|cache| lookup(&cache))
    }

    fn remember(&self, role: &Role) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(role.name.clone(), role.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoReferences;

    impl RoleReferences for NoReferences {
        fn is_role_referenced(&self, _role_id: Uuid) -> IdentityResult<bool> {
            Ok(false)
        }
    }

    struct AlwaysReferenced;

    impl RoleReferences for AlwaysReferenced {
        fn is_role_referenced(&self, _role_id: Uuid) -> IdentityResult<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_directory_enforces_unique_non_empty_names() {
        let directory = MemoryRoleDirectory::new();
        directory.create_role("admin").unwrap();

        assert_eq!(
            directory.create_role("admin"),
            Err(IdentityError::DuplicateRole("admin".into()))
        );
        assert!(matches!(
            directory.create_role("  "),
            Err(IdentityError::InvalidRoleName(_))
        ));
        assert!(matches!(
            directory.create_role(" admin"),
            Err(IdentityError::InvalidRoleName(_))
        ));
    }

    #[test]
    fn test_rename_keeps_id() {
        let directory = MemoryRoleDirectory::with_roles(["staff", "user"]).unwrap();
        let staff = directory.find_by_name("staff").unwrap().unwrap();

        let (renamed, _) = directory.rename_role(staff.id, "manager").unwrap();
        assert_eq!(renamed.id, staff.id);
        assert!(directory.find_by_name("staff").unwrap().is_none());

        assert_eq!(
            directory.rename_role(staff.id, "user"),
            Err(IdentityError::DuplicateRole("user".into()))
        );
    }

    #[test]
    fn test_mutations_describe_themselves() {
        let directory = MemoryRoleDirectory::new();

        let (auditor, created) = directory.create_role("auditor").unwrap();
        assert_eq!(
            created,
            RoleEvent::Created {
                role_id: auditor.id,
                name: "auditor".into(),
            }
        );

        let (_, renamed) = directory.rename_role(auditor.id, "curator").unwrap();
        assert_eq!(
            renamed,
            RoleEvent::Renamed {
                role_id: auditor.id,
                old_name: "auditor".into(),
                new_name: "curator".into(),
            }
        );

        let (_, deleted) = directory.delete_role(auditor.id, &NoReferences).unwrap();
        assert_eq!(deleted.to_event().topic(), "identity.role.deleted");
        assert_eq!(deleted.affected_names(), vec!["curator"]);
    }

    #[test]
    fn test_delete_refuses_referenced_roles() {
        let directory = MemoryRoleDirectory::with_roles(["guest"]).unwrap();
        let guest = directory.find_by_name("guest").unwrap().unwrap();

        assert_eq!(
            directory.delete_role(guest.id, &AlwaysReferenced),
            Err(IdentityError::RoleInUse("guest".into()))
        );
        directory.delete_role(guest.id, &NoReferences).unwrap();
        assert!(directory.roles().unwrap().is_empty());
    }

    #[test]
    fn test_registry_caches_until_invalidated() {
        let directory = Arc::new(MemoryRoleDirectory::with_roles(["staff"]).unwrap());
        let registry = RoleRegistry::new(directory.clone());

        let staff = registry.get_by_name("staff").unwrap();
        directory.rename_role(staff.id, "manager").unwrap();

        // Stale until invalidated
        assert_eq!(registry.get_by_name("staff").unwrap().id, staff.id);
        assert!(registry.get_by_name("manager").is_ok());

        registry.invalidate_role("staff");
        assert!(matches!(
            registry.get_by_name("staff"),
            Err(IdentityError::UnknownRole(_))
        ));
    }

    #[test]
    fn test_registry_does_not_cache_misses() {
        let directory = Arc::new(MemoryRoleDirectory::new());
        let registry = RoleRegistry::new(directory.clone());

        assert!(registry.get_by_name("auditor").is_err());
        directory.create_role("auditor").unwrap();
        assert!(registry.get_by_name("auditor").is_ok());
    }

    #[test]
    fn test_registry_lookup_by_id_and_invalidate_id() {
        let directory = Arc::new(MemoryRoleDirectory::with_roles(["admin", "user"]).unwrap());
        let registry = RoleRegistry::new(directory.clone());
        let admin = directory.find_by_name("admin").unwrap().unwrap();

        assert_eq!(registry.get_by_id(admin.id).unwrap().name, "admin");
        registry.get_by_name("user").unwrap();
        assert_eq!(registry.cached_len(), 2);

        registry.invalidate_id(admin.id);
        assert_eq!(registry.cached_len(), 1);

        registry.invalidate();
        assert_eq!(registry.cached_len(), 0);
        assert!(matches!(
            registry.get_by_id(Uuid::now_v7()),
            Err(IdentityError::UnknownRole(_))
        ));
    }
}

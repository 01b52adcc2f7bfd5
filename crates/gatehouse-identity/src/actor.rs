//! Actors and their role links
//!
//! An actor's roles are derived from its classification attribute: the
//! classification names a role, and whenever it changes the actor's existing
//! role links are cleared and a single new link is created.

use chrono::{DateTime, Utc};
use gatehouse_events::ActorEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{IdentityError, IdentityResult};
use crate::roles::{Role, RoleReferences, RoleRegistry};

/// An entity that may hold roles.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use gatehouse_identity::{MemoryActorStore, MemoryRoleDirectory, RoleRegistry};
///
/// let directory = Arc::new(MemoryRoleDirectory::with_roles(["user", "manager"]).unwrap());
/// let registry = RoleRegistry::new(directory);
/// let actors = MemoryActorStore::new();
///
/// let actor = actors.register("User", &registry).unwrap();
/// assert_eq!(actor.classification, "user");
/// assert_eq!(actor.role_ids.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    /// Unique actor ID
    pub id: Uuid,

    /// Classification attribute the role link is derived from (normalized)
    pub classification: String,

    /// Linked role ids
    pub role_ids: Vec<Uuid>,

    /// When the actor was registered
    pub created_at: DateTime<Utc>,

    /// Last role re-synchronization
    pub updated_at: DateTime<Utc>,
}

impl Actor {
    /// Whether the actor currently links to `role_id`.
    pub fn has_role(&self, role_id: Uuid) -> bool {
        self.role_ids.contains(&role_id)
    }
}

/// Normalize a classification to the role name it derives.
///
/// ```
/// use gatehouse_identity::actor::classification_role_name;
///
/// assert_eq!(classification_role_name("  Manager "), "manager");
/// ```
pub fn classification_role_name(classification: &str) -> String {
    classification.trim().to_lowercase()
}

/// Read access to actors, as needed at decision time.
pub trait ActorStore: Send + Sync {
    /// Fetch an actor.
    fn actor(&self, id: Uuid) -> IdentityResult<Actor>;

    /// Resolve the actor's current roles.
    ///
    /// Any link to a role the registry no longer knows fails the whole load
    /// with [`IdentityError::UnknownRole`].
    fn roles_of(&self, id: Uuid, registry: &RoleRegistry) -> IdentityResult<Vec<Role>> {
        self.actor(id)?
            .role_ids
            .iter()
            .map(|role_id| registry.get_by_id(*role_id))
            .collect()
    }
}

/// In-memory actor store.
#[derive(Debug, Default)]
pub struct MemoryActorStore {
    actors: RwLock<HashMap<Uuid, Actor>>,
}

impl MemoryActorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new actor with a role link derived from `classification`.
    pub fn register(&self, classification: &str, registry: &RoleRegistry) -> IdentityResult<Actor> {
        let name = classification_role_name(classification);
        let role = registry.get_by_name(&name)?;
        let now = Utc::now();

        let actor = Actor {
            id: Uuid::now_v7(),
            classification: name,
            role_ids: vec![role.id],
            created_at: now,
            updated_at: now,
        };

        self.write()?.insert(actor.id, actor.clone());
        tracing::info!(actor_id = %actor.id, role = %role.name, "Registered actor");
        Ok(actor)
    }

    /// Change an actor's classification and re-synchronize its role link.
    ///
    /// The new role is resolved before anything changes, so an unknown
    /// classification leaves the actor untouched. On success the returned
    /// [`ActorEvent`] is ready to publish.
    pub fn set_classification(
        &self,
        actor_id: Uuid,
        classification: &str,
        registry: &RoleRegistry,
    ) -> IdentityResult<(Actor, ActorEvent)> {
        let name = classification_role_name(classification);
        let role = registry.get_by_name(&name)?;

        let mut actors = self.write()?;
        let actor = actors
            .get_mut(&actor_id)
            .ok_or(IdentityError::UnknownActor(actor_id))?;

        let previous = std::mem::replace(&mut actor.classification, name.clone());
        actor.role_ids.clear();
        actor.role_ids.push(role.id);
        actor.updated_at = Utc::now();

        tracing::info!(
            actor_id = %actor_id,
            previous = %previous,
            current = %name,
            "Re-synchronized actor role link"
        );

        let event = ActorEvent::ClassificationChanged {
            actor_id,
            previous: Some(previous),
            current: name,
        };
        Ok((actor.clone(), event))
    }

    /// Number of stored actors.
    pub fn len(&self) -> usize {
        self.actors.read().map(|a| a.len()).unwrap_or(0)
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> IdentityResult<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Actor>>> {
        self.actors
            .write()
            .map_err(|_| IdentityError::Unavailable("actor store lock poisoned".to_string()))
    }
}

impl ActorStore for MemoryActorStore {
    fn actor(&self, id: Uuid) -> IdentityResult<Actor> {
        self.actors
            .read()
            .map_err(|_| IdentityError::Unavailable("actor store lock poisoned".to_string()))?
            .get(&id)
            .cloned()
            .ok_or(IdentityError::UnknownActor(id))
    }
}

impl RoleReferences for MemoryActorStore {
    fn is_role_referenced(&self, role_id: Uuid) -> IdentityResult<bool> {
        Ok(self
            .actors
            .read()
            .map_err(|_| IdentityError::Unavailable("actor store lock poisoned".to_string()))?
            .values()
            .any(|actor| actor.has_role(role_id)))
    }
}

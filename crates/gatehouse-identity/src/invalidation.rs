//! Event-driven role cache invalidation
//!
//! [`RoleCacheInvalidator`] subscribes a [`RoleRegistry`] to role mutation
//! events so renames and deletions take effect without a restart.

use async_trait::async_trait;
use gatehouse_events::{Event, EventBusResult, EventHandler, RoleEvent};
use std::sync::Arc;

use crate::roles::RoleRegistry;

/// Invalidates registry entries on `identity.role.*` events.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use gatehouse_events::{EventBus, MemoryEventBus};
/// use gatehouse_identity::{MemoryRoleDirectory, RoleCacheInvalidator, RoleRegistry};
///
/// async fn wire(bus: &MemoryEventBus) {
///     let directory = Arc::new(MemoryRoleDirectory::new());
///     let registry = Arc::new(RoleRegistry::new(directory));
///     bus.register_handler(Arc::new(RoleCacheInvalidator::new(registry)))
///         .await
///         .unwrap();
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RoleCacheInvalidator {
    registry: Arc<RoleRegistry>,
}

impl RoleCacheInvalidator {
    /// Create an invalidator for `registry`.
    pub fn new(registry: Arc<RoleRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl EventHandler for RoleCacheInvalidator {
    fn name(&self) -> &str {
        "role_cache_invalidator"
    }

    async fn handle(&self, event: Event) -> EventBusResult<()> {
        match event.parse_payload::<RoleEvent>() {
            Ok(role_event) => {
                for name in role_event.affected_names() {
                    self.registry.invalidate_role(name);
                }
                if let RoleEvent::Renamed { role_id, .. } | RoleEvent::Deleted { role_id, .. } = role_event {
                    self.registry.invalidate_id(role_id);
                }
            }
            Err(e) => {
                // Unknown payload shape: the safe reaction is to forget everything.
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %e,
                    "Unreadable role event, clearing the whole role cache"
                );
                self.registry.invalidate();
            }
        }
        Ok(())
    }

    fn topics(&self) -> Vec<String> {
        vec![RoleEvent::TOPIC_PATTERN.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{MemoryRoleDirectory, RoleReferences, RoleSource};
    use crate::{IdentityError, IdentityResult};
    use gatehouse_events::{EventBus, EventSource, MemoryEventBus};
    use uuid::Uuid;

    struct Unreferenced;

    impl RoleReferences for Unreferenced {
        fn is_role_referenced(&self, _role_id: Uuid) -> IdentityResult<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_rename_event_invalidates_stale_entry() {
        let directory = Arc::new(MemoryRoleDirectory::with_roles(["staff", "user"]).unwrap());
        let registry = Arc::new(RoleRegistry::new(directory.clone()));
        let bus = MemoryEventBus::new();
        bus.register_handler(Arc::new(RoleCacheInvalidator::new(registry.clone())))
            .await
            .unwrap();

        let staff = registry.get_by_name("staff").unwrap();
        registry.get_by_name("user").unwrap();
        assert_eq!(registry.cached_len(), 2);

        let (_, renamed) = directory.rename_role(staff.id, "manager").unwrap();
        bus.publish(renamed.to_event()).await.unwrap();

        assert_eq!(registry.cached_len(), 1);
        assert!(matches!(
            registry.get_by_name("staff"),
            Err(IdentityError::UnknownRole(_))
        ));
        assert_eq!(registry.get_by_name("manager").unwrap().id, staff.id);
    }

    #[tokio::test]
    async fn test_delete_event_forgets_role() {
        let directory = Arc::new(MemoryRoleDirectory::with_roles(["guest"]).unwrap());
        let registry = Arc::new(RoleRegistry::new(directory.clone()));
        let bus = MemoryEventBus::new();
        bus.register_handler(Arc::new(RoleCacheInvalidator::new(registry.clone())))
            .await
            .unwrap();

        let guest = registry.get_by_name("guest").unwrap();
        let (_, deleted) = directory.delete_role(guest.id, &Unreferenced).unwrap();
        bus.publish(deleted.to_event()).await.unwrap();

        assert_eq!(registry.cached_len(), 0);
        assert!(registry.get_by_id(guest.id).is_err());
    }

    #[tokio::test]
    async fn test_unreadable_payload_clears_everything() {
        let directory = Arc::new(MemoryRoleDirectory::with_roles(["user"]).unwrap());
        let registry = Arc::new(RoleRegistry::new(directory.clone()));
        registry.get_by_name("user").unwrap();

        let invalidator = RoleCacheInvalidator::new(registry.clone());
        invalidator
            .handle(Event::new("role.renamed", EventSource::Identity, serde_json::json!("???")))
            .await
            .unwrap();

        assert_eq!(registry.cached_len(), 0);
        assert!(directory.find_by_name("user").unwrap().is_some());
    }
}

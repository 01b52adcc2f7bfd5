//! Authorization engine
//!
//! Answers "may an actor holding these roles perform this action on this
//! component?" against the compiled permission store.
//!
//! The engine is fail-secure: every error on the decision path resolves to a
//! deny and is logged. It never writes to the store.

use gatehouse_identity::{ActorStore, Role, RoleRegistry};
use gatehouse_rbac::{Action, Component};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::config::AuthzConfig;
use crate::context::{derive_action, derive_component, RequestContext};
use crate::error::{AuthzError, AuthzResult};
use crate::store::PermissionStore;

/// Log target for decision audit lines.
pub const AUDIT_TARGET: &str = "gatehouse::audit";

// Every decision is logged. `audit_decisions` only picks the level.
macro_rules! audit {
    ($loud:expr, $($field:tt)+) => {
        if $loud {
            ::tracing::info!(target: AUDIT_TARGET, $($field)+)
        } else {
            ::tracing::debug!(target: AUDIT_TARGET, $($field)+)
        }
    };
}

/// Decides requests against a [`PermissionStore`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use gatehouse_authz::engine::AuthorizationEngine;
/// use gatehouse_authz::store::{MemoryPermissionStore, PermissionStore};
/// use gatehouse_identity::{MemoryActorStore, MemoryRoleDirectory, RoleRegistry};
/// use gatehouse_rbac::{Action, Component};
///
/// let directory = MemoryRoleDirectory::with_roles(["user"]).unwrap();
/// let roles = Arc::new(RoleRegistry::new(Arc::new(directory)));
/// let store = Arc::new(MemoryPermissionStore::new());
/// let engine = AuthorizationEngine::new(store.clone(), roles.clone(), Arc::new(MemoryActorStore::new()));
///
/// let user = roles.get_by_name("user").unwrap();
/// let movies = Component::model("Movies");
/// let record = store.find_or_create_record(&movies, &Action::Read).unwrap();
/// store.link_role(user.id, record.id).unwrap();
///
/// assert!(engine.decide(&movies, &Action::Read, &[user.clone()]));
/// assert!(!engine.decide(&movies, &Action::Update, &[user]));
/// assert!(!engine.decide(&movies, &Action::Read, &[]));
/// ```
pub struct AuthorizationEngine {
    store: Arc<dyn PermissionStore>,
    roles: Arc<RoleRegistry>,
    actors: Arc<dyn ActorStore>,
    config: AuthzConfig,
}

impl AuthorizationEngine {
    /// Create an engine reading `store`, resolving actors through `actors`.
    pub fn new(
        store: Arc<dyn PermissionStore>,
        roles: Arc<RoleRegistry>,
        actors: Arc<dyn ActorStore>,
    ) -> Self {
        Self {
            store,
            roles,
            actors,
            config: AuthzConfig::default(),
        }
    }

    /// Use `config` instead of the defaults.
    pub fn with_config(mut self, config: AuthzConfig) -> Self {
        self.config = config;
        self
    }

    /// Decide whether any of `roles` grants `action` on `component`.
    ///
    /// Empty `roles` deny without touching the store. Store failures deny.
    pub fn decide(&self, component: &Component, action: &Action, roles: &[Role]) -> bool {
        self.decide_for(component, action, roles, None)
    }

    /// Like [`decide`](Self::decide) but surfaces store failures.
    ///
    /// Returns the first role that grants the permission.
    pub fn try_decide<'r>(
        &self,
        component: &Component,
        action: &Action,
        roles: &'r [Role],
    ) -> AuthzResult<Option<&'r Role>> {
        for role in roles {
            if self.store.has_permission(role.id, component, action)? {
                return Ok(Some(role));
            }
        }
        Ok(None)
    }

    /// Decide a request for a stored actor.
    ///
    /// The actor's roles are loaded fresh on every call, so a
    /// reclassification takes effect on the next request.
    pub fn authorize(&self, ctx: &RequestContext, actor_id: Uuid) -> bool {
        let Some((component, action)) = self.target_of(ctx, Some(actor_id)) else {
            return false;
        };

        let roles = match self.actors.roles_of(actor_id, &self.roles) {
            Ok(roles) => roles,
            Err(e) => {
                let error = AuthzError::from(e);
                log_denial(&error, &component, &action, Some(actor_id));
                return false;
            }
        };

        self.decide_for(&component, &action, &roles, Some(actor_id))
    }

    /// Decide a request for an already-loaded role set.
    pub fn authorize_roles(&self, ctx: &RequestContext, roles: &[Role]) -> bool {
        match self.target_of(ctx, None) {
            Some((component, action)) => self.decide_for(&component, &action, roles, None),
            None => false,
        }
    }

    /// Keep the operations `roles` may perform.
    ///
    /// Used when generating documentation: operations that would be denied
    /// are omitted.
    pub fn visible_operations(
        &self,
        operations: &[(Component, Action)],
        roles: &[Role],
    ) -> Vec<(Component, Action)> {
        operations
            .iter()
            .filter(|(component, action)| self.decide(component, action, roles))
            .cloned()
            .collect()
    }

    fn target_of(&self, ctx: &RequestContext, actor_id: Option<Uuid>) -> Option<(Component, Action)> {
        let derived = derive_component(ctx).and_then(|component| Ok((component, derive_action(ctx)?)));
        match derived {
            Ok(target) => Some(target),
            Err(e) => {
                warn!(
                    target: AUDIT_TARGET,
                    decision = "deny",
                    actor_id = ?actor_id,
                    resource = ?ctx.resource,
                    controller = ?ctx.controller,
                    verb = ?ctx.verb,
                    route_action = ?ctx.route_action,
                    error = %e,
                    "Cannot derive authorization target, denying"
                );
                None
            }
        }
    }

    fn decide_for(
        &self,
        component: &Component,
        action: &Action,
        roles: &[Role],
        actor_id: Option<Uuid>,
    ) -> bool {
        if roles.is_empty() {
            audit!(
                self.config.audit_decisions,
                decision = "deny",
                component = %component,
                action = %action,
                actor_id = ?actor_id,
                "Actor holds no roles"
            );
            return false;
        }

        match self.try_decide(component, action, roles) {
            Ok(matched) => {
                let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
                let decision = if matched.is_some() { "allow" } else { "deny" };
                audit!(
                    self.config.audit_decisions,
                    decision,
                    component = %component,
                    action = %action,
                    matched_role = matched.map(|r| r.name.as_str()),
                    roles = ?names,
                    actor_id = ?actor_id,
                    "Authorization decision"
                );
                matched.is_some()
            }
            Err(e) => {
                log_denial(&e, component, action, actor_id);
                false
            }
        }
    }
}

fn log_denial(error: &AuthzError, component: &Component, action: &Action, actor_id: Option<Uuid>) {
    if error.is_server_error() {
        error!(
            target: AUDIT_TARGET,
            decision = "deny",
            component = %component,
            action = %action,
            actor_id = ?actor_id,
            error = %error,
            "Authorization failed, denying"
        );
    } else {
        warn!(
            target: AUDIT_TARGET,
            decision = "deny",
            component = %component,
            action = %action,
            actor_id = ?actor_id,
            error = %error,
            "Authorization failed, denying"
        );
    }
}

impl std::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::store::{MemoryPermissionStore, StoreSnapshot};
    use gatehouse_identity::{MemoryActorStore, MemoryRoleDirectory};
    use gatehouse_rbac::PermissionRecord;
    use std::sync::Mutex;
    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Level, Metadata, Subscriber};

    /// Collects the level of every event logged on the audit target.
    #[derive(Clone, Default)]
    struct AuditLevels(Arc<Mutex<Vec<Level>>>);

    impl AuditLevels {
        fn take(&self) -> Vec<Level> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl Subscriber for AuditLevels {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &Attributes<'_>) -> Id {
            Id::from_u64(1)
        }
        fn record(&self, _: &Id, _: &Record<'_>) {}
        fn record_follows_from(&self, _: &Id, _: &Id) {}
        fn event(&self, event: &Event<'_>) {
            if event.metadata().target() == AUDIT_TARGET {
                self.0.lock().unwrap().push(*event.metadata().level());
            }
        }
        fn enter(&self, _: &Id) {}
        fn exit(&self, _: &Id) {}
    }

    struct UnavailableStore;

    impl PermissionStore for UnavailableStore {
        fn clear(&self) -> StoreResult<()> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn find_or_create_record(&self, _: &Component, _: &Action) -> StoreResult<PermissionRecord> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn link_role(&self, _: Uuid, _: u64) -> StoreResult<bool> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn has_permission(&self, _: Uuid, _: &Component, _: &Action) -> StoreResult<bool> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn snapshot(&self) -> StoreResult<StoreSnapshot> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn replace(&self, _: StoreSnapshot) -> StoreResult<()> {
            Err(StoreError::Unavailable("offline".into()))
        }
    }

    struct Fixture {
        engine: AuthorizationEngine,
        store: Arc<MemoryPermissionStore>,
        roles: Arc<RoleRegistry>,
        actors: Arc<MemoryActorStore>,
    }

    fn fixture() -> Fixture {
        let directory = MemoryRoleDirectory::with_roles(["manager", "user", "guest"]).unwrap();
        let roles = Arc::new(RoleRegistry::new(Arc::new(directory)));
        let store = Arc::new(MemoryPermissionStore::new());
        let actors = Arc::new(MemoryActorStore::new());
        let engine = AuthorizationEngine::new(store.clone(), roles.clone(), actors.clone());

        let user = roles.get_by_name("user").unwrap();
        for (component, action) in [
            (Component::model("Movies"), Action::Read),
            (Component::controller("reports"), Action::Custom("export".into())),
        ] {
            let record = store.find_or_create_record(&component, &action).unwrap();
            store.link_role(user.id, record.id).unwrap();
        }

        Fixture {
            engine,
            store,
            roles,
            actors,
        }
    }

    #[test]
    fn test_empty_roles_skip_store() {
        let f = fixture();
        assert!(!f.engine.decide(&Component::model("Movies"), &Action::Read, &[]));
        assert_eq!(f.store.lookup_count(), 0);
    }

    #[test]
    fn test_any_role_matches() {
        let f = fixture();
        let roles = vec![
            f.roles.get_by_name("guest").unwrap(),
            f.roles.get_by_name("user").unwrap(),
        ];
        let matched = f
            .engine
            .try_decide(&Component::model("Movies"), &Action::Read, &roles)
            .unwrap();
        assert_eq!(matched.map(|r| r.name.as_str()), Some("user"));
    }

    #[test]
    fn test_store_failure_denies() {
        let f = fixture();
        let engine = AuthorizationEngine::new(Arc::new(UnavailableStore), f.roles.clone(), f.actors.clone());
        let user = f.roles.get_by_name("user").unwrap();

        assert!(!engine.decide(&Component::model("Movies"), &Action::Read, &[user.clone()]));
        assert!(matches!(
            engine.try_decide(&Component::model("Movies"), &Action::Read, &[user]),
            Err(AuthzError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[test]
    fn test_authorize_loads_actor_roles() {
        let f = fixture();
        let actor = f.actors.register("user", &f.roles).unwrap();

        let read = RequestContext::new().with_verb("GET").with_resource("Movies");
        let delete = RequestContext::new().with_verb("DELETE").with_resource("Movies");
        assert!(f.engine.authorize(&read, actor.id));
        assert!(!f.engine.authorize(&delete, actor.id));
    }

    #[test]
    fn test_authorize_unknown_actor_denies() {
        let f = fixture();
        let read = RequestContext::new().with_verb("GET").with_resource("Movies");
        assert!(!f.engine.authorize(&read, Uuid::now_v7()));
    }

    #[test]
    fn test_authorize_bad_context_denies() {
        let f = fixture();
        let user = f.roles.get_by_name("user").unwrap();

        assert!(!f.engine.authorize_roles(&RequestContext::new().with_verb("GET"), &[user.clone()]));
        assert!(!f.engine.authorize_roles(
            &RequestContext::new().with_resource("Movies").with_action("read all"),
            &[user.clone()]
        ));
        assert!(f.engine.authorize_roles(
            &RequestContext::new().with_controller("reports").with_action("export"),
            &[user]
        ));
    }

    #[test]
    fn test_visible_operations() {
        let f = fixture();
        let user = f.roles.get_by_name("user").unwrap();
        let operations = vec![
            (Component::model("Movies"), Action::List),
            (Component::model("Movies"), Action::Read),
            (Component::controller("reports"), Action::Custom("export".into())),
        ];

        let visible = f.engine.visible_operations(&operations, &[user]);
        assert_eq!(visible, operations[1..].to_vec());
        assert!(f.engine.visible_operations(&operations, &[]).is_empty());
    }

    fn decide_three(engine: &AuthorizationEngine, user: &Role) {
        let movies = Component::model("Movies");
        assert!(engine.decide(&movies, &Action::Read, std::slice::from_ref(user)));
        assert!(!engine.decide(&movies, &Action::Delete, std::slice::from_ref(user)));
        assert!(!engine.decide(&movies, &Action::Read, &[]));
    }

    #[test]
    fn test_every_decision_is_audited_at_info() {
        let f = fixture();
        let user = f.roles.get_by_name("user").unwrap();
        let levels = AuditLevels::default();

        tracing::subscriber::with_default(levels.clone(), || decide_three(&f.engine, &user));

        assert_eq!(levels.take(), vec![Level::INFO; 3]);
    }

    #[test]
    fn test_quiet_audit_still_logs_every_decision() {
        let f = fixture();
        let engine = f.engine.with_config(AuthzConfig::default().with_audit_decisions(false));
        let user = f.roles.get_by_name("user").unwrap();
        let levels = AuditLevels::default();

        tracing::subscriber::with_default(levels.clone(), || decide_three(&engine, &user));

        assert_eq!(levels.take(), vec![Level::DEBUG; 3]);
    }
}

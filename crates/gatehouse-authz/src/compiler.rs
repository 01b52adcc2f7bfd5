//! Permission compiler
//!
//! Turns the declarative resource and controller definitions into persisted
//! permission records and role links.
//!
//! For every component the compiler resolves the effective role→actions
//! matrix, expands wildcards, and writes one deduplicated record per
//! (component, action) plus one link per (role, record). Unknown roles and
//! unparseable actions are skipped with a warning; a store failure abandons
//! the component being written and the run moves on to the next one.

use chrono::Utc;
use gatehouse_identity::{IdentityError, Role, RoleRegistry};
use gatehouse_rbac::matrix::{expand_wildcard, resolve_with_diagnostics};
use gatehouse_rbac::{
    Action, Component, ControllerDefinition, ResourceDefinition, ResourceRegistry, RoleActionMap,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{AuthzConfig, CompileStrategy};
use crate::error::{CompilationError, StoreError};
use crate::report::{CompilationEntry, CompilationReport, CompilationStatus};
use crate::store::{MemoryPermissionStore, PermissionStore};

/// Compiles resource definitions into a [`PermissionStore`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use gatehouse_authz::compiler::PermissionCompiler;
/// use gatehouse_authz::store::{MemoryPermissionStore, PermissionStore};
/// use gatehouse_identity::{MemoryRoleDirectory, RoleRegistry};
/// use gatehouse_rbac::{Action, Component, ResourceDefinition, ResourceRegistry};
///
/// let resources = ResourceRegistry::new()
///     .with_resource(ResourceDefinition::new("Movies"))
///     .unwrap();
/// let directory = MemoryRoleDirectory::with_roles(["admin", "manager", "user", "guest"]).unwrap();
/// let roles = Arc::new(RoleRegistry::new(Arc::new(directory)));
/// let store = Arc::new(MemoryPermissionStore::new());
///
/// let compiler = PermissionCompiler::new(Arc::new(resources), roles.clone(), store.clone());
/// let report = compiler.compile_all();
/// assert!(report.is_success());
///
/// let user = roles.get_by_name("user").unwrap();
/// let guest = roles.get_by_name("guest").unwrap();
/// let movies = Component::model("Movies");
/// assert!(store.has_permission(user.id, &movies, &Action::Delete).unwrap());
/// assert!(!store.has_permission(guest.id, &movies, &Action::Read).unwrap());
/// ```
pub struct PermissionCompiler {
    resources: Arc<ResourceRegistry>,
    roles: Arc<RoleRegistry>,
    store: Arc<dyn PermissionStore>,
    config: AuthzConfig,
}

impl PermissionCompiler {
    /// Create a compiler writing into `store`.
    pub fn new(
        resources: Arc<ResourceRegistry>,
        roles: Arc<RoleRegistry>,
        store: Arc<dyn PermissionStore>,
    ) -> Self {
        Self {
            resources,
            roles,
            store,
            config: AuthzConfig::default(),
        }
    }

    /// Use `config` instead of the defaults.
    pub fn with_config(mut self, config: AuthzConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the active configuration.
    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    /// Rebuild the store from every registered resource and controller.
    ///
    /// Never returns early on a component failure: every component gets an
    /// entry in the report.
    #[instrument(skip(self), fields(strategy = %self.config.compile_strategy))]
    pub fn compile_all(&self) -> CompilationReport {
        let started_at = Utc::now();

        let (mut entries, aborted) = match self.config.compile_strategy {
            CompileStrategy::Staged => {
                let staging = MemoryPermissionStore::new();
                let entries = self.compile_into(&staging);
                let published = staging
                    .snapshot()
                    .and_then(|snapshot| self.store.replace(snapshot));
                (entries, published.err())
            }
            CompileStrategy::InPlace => match self.store.clear() {
                Ok(()) => (self.compile_into(self.store.as_ref()), None),
                Err(e) => (Vec::new(), Some(e)),
            },
        };

        if let Some(e) = &aborted {
            error!(error = %e, "Permission compilation aborted, live store not updated");
            let reason = format!("not published: {e}");
            for entry in entries.iter_mut() {
                if matches!(
                    entry.status,
                    CompilationStatus::Compiled | CompilationStatus::PartiallyCompiled
                ) {
                    entry.fail(reason.clone());
                }
            }
        }

        let report = CompilationReport {
            strategy: self.config.compile_strategy,
            fail_on_partial: self.config.fail_on_partial,
            entries,
            aborted: aborted.map(|e| e.to_string()),
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            components = report.entries.len(),
            pairs = report.total_pairs(),
            partial = report.partial().count(),
            failed = report.failures().count(),
            duration_ms = report.duration_ms(),
            "Permission compilation finished"
        );
        report
    }

    /// Compile one resource into the live store without clearing it.
    ///
    /// Returns the number of (role, action) pairs written. Skipped roles and
    /// actions are logged but do not fail the call.
    #[instrument(skip(self))]
    pub fn compile_resource(&self, resource_id: &str) -> Result<usize, CompilationError> {
        let resource = self.resources.resource(resource_id).ok_or_else(|| {
            CompilationError::single(Component::model(resource_id), "resource is not registered")
        })?;
        Self::into_pairs(self.compile_resource_entry(resource, self.store.as_ref()))
    }

    /// Compile one controller into the live store without clearing it.
    ///
    /// A controller without declared permissions compiles to zero pairs.
    #[instrument(skip(self))]
    pub fn compile_controller(&self, controller_id: &str) -> Result<usize, CompilationError> {
        let controller = self.resources.controller(controller_id).ok_or_else(|| {
            CompilationError::single(
                Component::controller(controller_id),
                "controller is not registered",
            )
        })?;
        Self::into_pairs(self.compile_controller_entry(controller, self.store.as_ref()))
    }

    fn into_pairs(entry: CompilationEntry) -> Result<usize, CompilationError> {
        match entry.status {
            CompilationStatus::Failed => Err(CompilationError::single(
                entry.component,
                entry.error.unwrap_or_default(),
            )),
            _ => Ok(entry.pairs),
        }
    }

    fn compile_into(&self, target: &dyn PermissionStore) -> Vec<CompilationEntry> {
        let resources = self
            .resources
            .resources()
            .map(|resource| self.compile_resource_entry(resource, target));
        let controllers = self
            .resources
            .controllers()
            .map(|controller| self.compile_controller_entry(controller, target));
        resources.chain(controllers).collect()
    }

    fn compile_resource_entry(
        &self,
        resource: &ResourceDefinition,
        target: &dyn PermissionStore,
    ) -> CompilationEntry {
        let resolution =
            resolve_with_diagnostics(&resource.defaults.matrix(), resource.override_matrix.as_ref());

        let mut entry = CompilationEntry::new(resource.component());
        // Ignored overrides leave the default in force; the component still compiles fully.
        entry
            .warnings
            .extend(resolution.warnings.iter().map(ToString::to_string));

        self.materialize(&mut entry, &resolution.matrix, target);
        entry
    }

    fn compile_controller_entry(
        &self,
        controller: &ControllerDefinition,
        target: &dyn PermissionStore,
    ) -> CompilationEntry {
        if !controller.declares_permissions() {
            debug!(controller = %controller.id, "Controller declares no permissions, skipping");
            return CompilationEntry::skipped(controller.component(), "no permissions declared");
        }

        let mut entry = CompilationEntry::new(controller.component());
        self.materialize(&mut entry, &controller.permissions, target);
        entry
    }

    /// Write every (role, action) pair of `matrix` for `entry.component`.
    fn materialize(&self, entry: &mut CompilationEntry, matrix: &RoleActionMap, target: &dyn PermissionStore) {
        let component = entry.component.clone();

        for (role_name, actions) in matrix {
            let actions = expand_wildcard(actions);
            if actions.is_empty() {
                continue;
            }

            let role = match self.roles.get_by_name(role_name) {
                Ok(role) => role,
                Err(IdentityError::UnknownRole(_)) => {
                    warn!(
                        component = %component,
                        role = %role_name,
                        "Role in permission matrix does not exist, skipping"
                    );
                    entry.degrade(format!("unknown role '{role_name}'"));
                    continue;
                }
                Err(e) => {
                    error!(component = %component, role = %role_name, error = %e, "Role lookup failed");
                    entry.fail(e.to_string());
                    return;
                }
            };

            let mut granted: Vec<Action> = Vec::with_capacity(actions.len());
            for name in &actions {
                match Action::parse(name) {
                    Some(action) if !granted.contains(&action) => granted.push(action),
                    Some(_) => {}
                    None => {
                        warn!(
                            component = %component,
                            role = %role_name,
                            action = %name,
                            "Unparseable action in permission matrix, skipping"
                        );
                        entry.degrade(format!("invalid action '{name}' for role '{role_name}'"));
                    }
                }
            }

            for action in &granted {
                if let Err(e) = Self::grant(target, &role, &component, action) {
                    error!(
                        component = %component,
                        role = %role.name,
                        action = %action,
                        error = %e,
                        "Failed to persist permission, abandoning component"
                    );
                    entry.fail(e.to_string());
                    return;
                }
                entry.pairs += 1;
            }
        }

        debug!(component = %component, pairs = entry.pairs, status = ?entry.status, "Compiled component");
    }

    fn grant(
        target: &dyn PermissionStore,
        role: &Role,
        component: &Component,
        action: &Action,
    ) -> Result<(), StoreError> {
        let record = target.find_or_create_record(component, action)?;
        target.link_role(role.id, record.id)?;
        Ok(())
    }
}

impl std::fmt::Debug for PermissionCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionCompiler")
            .field("resources", &self.resources.len())
            .field("config", &self.config)
            .finish()
    }
}

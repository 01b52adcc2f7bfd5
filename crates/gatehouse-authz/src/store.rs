//! Permission store
//!
//! Persistence of compiled permission records and role links. The compiler
//! writes here, the engine reads here; nothing else touches it.
//!
//! Record ids are sequential within a store generation and restart at 1
//! whenever the store is cleared or replaced. Together with the sorted
//! iteration of the resource registry this makes two compilations of the same
//! configuration produce identical [`StoreSnapshot`]s.

use gatehouse_rbac::{Action, Component, PermissionKey, PermissionRecord, RolePermissionLink};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Storage for permission records and role links.
///
/// Implementations must be safe to share between the compiler and concurrent
/// decision calls.
pub trait PermissionStore: Send + Sync {
    /// Remove every record and link.
    fn clear(&self) -> StoreResult<()>;

    /// Return the record for `(component, action)`, creating it if absent.
    fn find_or_create_record(&self, component: &Component, action: &Action) -> StoreResult<PermissionRecord>;

    /// Link a role to a record. Returns `true` if the link is new.
    fn link_role(&self, role_id: Uuid, permission_id: u64) -> StoreResult<bool>;

    /// Check whether `role_id` holds a record for `(component, action)`.
    fn has_permission(&self, role_id: Uuid, component: &Component, action: &Action) -> StoreResult<bool>;

    /// Copy the full store contents.
    fn snapshot(&self) -> StoreResult<StoreSnapshot>;

    /// Atomically swap the store contents for `snapshot`.
    fn replace(&self, snapshot: StoreSnapshot) -> StoreResult<()>;
}

/// Full, ordered copy of a store's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Records keyed by id
    pub records: BTreeMap<u64, PermissionRecord>,
    /// Role links
    pub links: BTreeSet<RolePermissionLink>,
}

impl StoreSnapshot {
    /// Check if the snapshot holds nothing.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.links.is_empty()
    }

    /// Permission keys granted to `role_id`, sorted.
    pub fn grants_for(&self, role_id: Uuid) -> Vec<PermissionKey> {
        let mut keys: Vec<PermissionKey> = self
            .links
            .iter()
            .filter(|link| link.role_id == role_id)
            .filter_map(|link| self.records.get(&link.permission_id))
            .map(PermissionRecord::key)
            .collect();
        keys.sort();
        keys
    }
}

#[derive(Debug)]
struct StoreState {
    next_id: u64,
    records: BTreeMap<u64, PermissionRecord>,
    by_key: HashMap<PermissionKey, u64>,
    links: BTreeSet<RolePermissionLink>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: BTreeMap::new(),
            by_key: HashMap::new(),
            links: BTreeSet::new(),
        }
    }
}

impl StoreState {
    fn from_snapshot(snapshot: StoreSnapshot) -> StoreResult<Self> {
        if let Some(link) = snapshot
            .links
            .iter()
            .find(|link| !snapshot.records.contains_key(&link.permission_id))
        {
            return Err(StoreError::UnknownRecord(link.permission_id));
        }

        let by_key = snapshot
            .records
            .values()
            .map(|record| (record.key(), record.id))
            .collect();
        let next_id = snapshot.records.keys().next_back().map_or(1, |id| id + 1);

        Ok(Self {
            next_id,
            records: snapshot.records,
            by_key,
            links: snapshot.links,
        })
    }
}

/// In-memory permission store.
///
/// # Examples
///
/// ```
/// use gatehouse_authz::store::{MemoryPermissionStore, PermissionStore};
/// use gatehouse_rbac::{Action, Component};
/// use uuid::Uuid;
///
/// let store = MemoryPermissionStore::new();
/// let role = Uuid::now_v7();
/// let movies = Component::model("Movies");
///
/// let record = store.find_or_create_record(&movies, &Action::Read).unwrap();
/// assert!(store.link_role(role, record.id).unwrap());
/// assert!(store.has_permission(role, &movies, &Action::Read).unwrap());
/// assert!(!store.has_permission(role, &movies, &Action::Delete).unwrap());
/// ```
#[derive(Debug, Default)]
pub struct MemoryPermissionStore {
    state: RwLock<StoreState>,
    lookups: AtomicU64,
}

impl MemoryPermissionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of [`PermissionStore::has_permission`] calls served.
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Number of records.
    pub fn record_count(&self) -> usize {
        self.read().map(|s| s.records.len()).unwrap_or(0)
    }

    /// Number of role links.
    pub fn link_count(&self) -> usize {
        self.read().map(|s| s.links.len()).unwrap_or(0)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("permission store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("permission store lock poisoned".to_string()))
    }
}

impl PermissionStore for MemoryPermissionStore {
    fn clear(&self) -> StoreResult<()> {
        *self.write()? = StoreState::default();
        Ok(())
    }

    fn find_or_create_record(&self, component: &Component, action: &Action) -> StoreResult<PermissionRecord> {
        let key = PermissionKey::new(component.clone(), action.clone());
        let mut state = self.write()?;

        if let Some(record) = state.by_key.get(&key).and_then(|id| state.records.get(id)) {
            return Ok(record.clone());
        }

        let id = state.next_id;
        state.next_id += 1;
        let record = PermissionRecord::new(id, key.component.clone(), key.action.clone());
        state.by_key.insert(key, id);
        state.records.insert(id, record.clone());
        Ok(record)
    }

    fn link_role(&self, role_id: Uuid, permission_id: u64) -> StoreResult<bool> {
        let mut state = self.write()?;
        if !state.records.contains_key(&permission_id) {
            return Err(StoreError::UnknownRecord(permission_id));
        }
        Ok(state.links.insert(RolePermissionLink::new(role_id, permission_id)))
    }

    fn has_permission(&self, role_id: Uuid, component: &Component, action: &Action) -> StoreResult<bool> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let key = PermissionKey::new(component.clone(), action.clone());
        let state = self.read()?;
        Ok(state
            .by_key
            .get(&key)
            .is_some_and(|id| state.links.contains(&RolePermissionLink::new(role_id, *id))))
    }

    fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        let state = self.read()?;
        Ok(StoreSnapshot {
            records: state.records.clone(),
            links: state.links.clone(),
        })
    }

    fn replace(&self, snapshot: StoreSnapshot) -> StoreResult<()> {
        let next = StoreState::from_snapshot(snapshot)?;
        *self.write()? = next;
        Ok(())
    }
}

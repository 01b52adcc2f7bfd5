//! # Permission Matrices
//!
//! A permission matrix maps role names to the action names that role holds on
//! one component. Every model resource starts from a default matrix and may
//! supply an override. Override entries **replace** the role's whole action
//! list; roles the override does not mention keep their default.
//!
//! ```text
//! defaults  { admin: [*], manager: [list..delete], user: [list..delete], guest: [] }
//! override  { user: [read] }
//! effective { admin: [*], manager: [list..delete], user: [read],          guest: [] }
//! ```
//!
//! Overrides arrive as untyped JSON so that malformed entries (a scalar
//! instead of a list) can be detected, warned about and ignored rather than
//! failing the whole resource.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::actions::{Action, WILDCARD};
use crate::error::ConfigurationError;

/// Role name → action names held by that role.
pub type RoleActionMap = BTreeMap<String, Vec<String>>;

/// A resource-supplied override, keyed by role name.
pub type MatrixOverride = serde_json::Map<String, Value>;

/// Framework role with every action.
pub const ADMIN_ROLE: &str = "admin";
/// Framework role for staff users.
pub const MANAGER_ROLE: &str = "manager";
/// Framework role for regular users.
pub const USER_ROLE: &str = "user";
/// Framework role for anonymous visitors.
pub const GUEST_ROLE: &str = "guest";

/// The roles every default matrix mentions.
pub const FRAMEWORK_ROLES: [&str; 4] = [ADMIN_ROLE, MANAGER_ROLE, USER_ROLE, GUEST_ROLE];

/// The framework-wide default matrix applied to ordinary model resources.
///
/// # Example
///
/// ```
/// use gatehouse_rbac::matrix::framework_defaults;
///
/// let defaults = framework_defaults();
/// assert_eq!(defaults["admin"], vec!["*"]);
/// assert!(defaults["guest"].is_empty());
/// ```
pub fn framework_defaults() -> RoleActionMap {
    let crud: Vec<String> = Action::canonical().into_iter().map(String::from).collect();

    let mut map = RoleActionMap::new();
    map.insert(ADMIN_ROLE.to_string(), vec![WILDCARD.to_string()]);
    map.insert(MANAGER_ROLE.to_string(), crud.clone());
    map.insert(USER_ROLE.to_string(), crud);
    map.insert(GUEST_ROLE.to_string(), Vec::new());
    map
}

/// The default matrix for sensitive resources: every framework role starts
/// with nothing and the resource's override grants explicitly.
pub fn restricted_defaults() -> RoleActionMap {
    FRAMEWORK_ROLES
        .iter()
        .map(|role| (role.to_string(), Vec::new()))
        .collect()
}

/// Outcome of resolving a matrix, with the override entries that were ignored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatrixResolution {
    /// The effective matrix.
    pub matrix: RoleActionMap,
    /// One entry per malformed override value.
    pub warnings: Vec<ConfigurationError>,
}

/// Merge `defaults` with an optional override.
///
/// Malformed override entries are logged and skipped. Use
/// [`resolve_with_diagnostics`] to also receive them.
///
/// # Example
///
/// ```
/// use gatehouse_rbac::matrix::{framework_defaults, resolve, MatrixOverride};
/// use serde_json::json;
///
/// let mut over = MatrixOverride::new();
/// over.insert("user".into(), json!(["read"]));
///
/// let effective = resolve(&framework_defaults(), Some(&over));
/// assert_eq!(effective["user"], vec!["read"]);
/// assert_eq!(effective["manager"].len(), 5);
/// ```
pub fn resolve(defaults: &RoleActionMap, override_matrix: Option<&MatrixOverride>) -> RoleActionMap {
    resolve_with_diagnostics(defaults, override_matrix).matrix
}

/// Merge `defaults` with an optional override, reporting ignored entries.
pub fn resolve_with_diagnostics(
    defaults: &RoleActionMap,
    override_matrix: Option<&MatrixOverride>,
) -> MatrixResolution {
    let mut resolution = MatrixResolution {
        matrix: defaults.clone(),
        warnings: Vec::new(),
    };

    let Some(override_matrix) = override_matrix.filter(|o| !o.is_empty()) else {
        return resolution;
    };

    for (role, value) in override_matrix {
        match action_list(value) {
            Some(actions) => {
                resolution.matrix.insert(role.clone(), actions);
            }
            None => {
                let error = ConfigurationError::MalformedOverride {
                    role: role.clone(),
                    found: json_kind(value).to_string(),
                };
                tracing::warn!(
                    role = %role,
                    found = json_kind(value),
                    "Ignoring malformed permission override, role keeps its default actions"
                );
                resolution.warnings.push(error);
            }
        }
    }

    resolution
}

/// Expand a wildcard action list.
///
/// A list containing `*` becomes exactly the canonical five actions; any
/// other list is returned unchanged.
///
/// ```
/// use gatehouse_rbac::matrix::expand_wildcard;
///
/// let expanded = expand_wildcard(&["*".to_string()]);
/// assert_eq!(expanded, vec!["list", "read", "create", "update", "delete"]);
///
/// let plain = vec!["read".to_string()];
/// assert_eq!(expand_wildcard(&plain), plain);
/// ```
pub fn expand_wildcard(actions: &[String]) -> Vec<String> {
    if actions.iter().any(|a| a.trim() == WILDCARD) {
        Action::canonical().into_iter().map(String::from).collect()
    } else {
        actions.to_vec()
    }
}

/// Build an override from plain role/action pairs.
///
/// Convenience for code-defined resources; JSON documents deserialize into
/// [`MatrixOverride`] directly.
pub fn override_from<I, R, A>(entries: I) -> MatrixOverride
where
    I: IntoIterator<Item = (R, Vec<A>)>,
    R: Into<String>,
    A: Into<String>,
{
    entries
        .into_iter()
        .map(|(role, actions)| {
            let actions = actions
                .into_iter()
                .map(|a| Value::String(a.into()))
                .collect();
            (role.into(), Value::Array(actions))
        })
        .collect()
}

fn action_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list with non-string items",
        Value::Object(_) => "object",
    }
}

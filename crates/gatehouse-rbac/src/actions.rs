//! # Actions
//!
//! Defines the operations that can be evaluated against a component.
//! Model resources use the five CRUD-style actions; controllers may declare
//! their own verbs, carried as [`Action::Custom`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Matrix entry that stands for every canonical action.
pub const WILDCARD: &str = "*";

/// Actions that can be performed on a component.
///
/// - **List**: Query/browse multiple records
/// - **Read**: View a single record
/// - **Create**: Create new records
/// - **Update**: Modify existing records
/// - **Delete**: Remove records
/// - **Custom**: A controller-specific verb (e.g. `publish`, `export`)
///
/// Actions serialize as their lowercase name, so a permission matrix in JSON
/// reads `["list", "read", "publish"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Action {
    /// List/query records.
    List,

    /// Read a single record.
    Read,

    /// Create a new record.
    Create,

    /// Update an existing record.
    Update,

    /// Delete a record.
    Delete,

    /// Controller-specific verb, stored lowercase.
    Custom(String),
}

impl Action {
    /// Get the string representation of the action.
    pub fn as_str(&self) -> &str {
        match self {
            Action::List => "list",
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Custom(verb) => verb.as_str(),
        }
    }

    /// Parse an action name.
    ///
    /// Canonical names are matched case-insensitively. Any other single word
    /// becomes a [`Action::Custom`] verb. Empty input, the wildcard and names
    /// containing whitespace or `:` are rejected.
    ///
    /// # Example
    ///
    /// ```
    /// use gatehouse_rbac::actions::Action;
    ///
    /// assert_eq!(Action::parse("READ"), Some(Action::Read));
    /// assert_eq!(Action::parse("publish"), Some(Action::Custom("publish".into())));
    /// assert_eq!(Action::parse("*"), None);
    /// assert_eq!(Action::parse(""), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "list" => Some(Action::List),
            "read" => Some(Action::Read),
            "create" => Some(Action::Create),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            "" | WILDCARD => None,
            other if other.contains(|c: char| c.is_whitespace() || c == ':') => None,
            other => Some(Action::Custom(other.to_string())),
        }
    }

    /// Map an operation verb (HTTP method or equivalent) to an action.
    ///
    /// Only the four single-record actions are reachable from a verb;
    /// `list` is always an explicit route annotation.
    ///
    /// # Example
    ///
    /// ```
    /// use gatehouse_rbac::actions::Action;
    ///
    /// assert_eq!(Action::from_verb("POST"), Some(Action::Create));
    /// assert_eq!(Action::from_verb("patch"), Some(Action::Update));
    /// assert_eq!(Action::from_verb("OPTIONS"), None);
    /// ```
    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb.trim().to_uppercase().as_str() {
            "GET" | "HEAD" => Some(Action::Read),
            "POST" => Some(Action::Create),
            "PUT" | "PATCH" => Some(Action::Update),
            "DELETE" => Some(Action::Delete),
            _ => None,
        }
    }

    /// The canonical action set a wildcard expands to.
    pub fn canonical() -> Vec<Self> {
        vec![
            Action::List,
            Action::Read,
            Action::Create,
            Action::Update,
            Action::Delete,
        ]
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        match action {
            Action::Custom(verb) => verb,
            other => other.as_str().to_string(),
        }
    }
}

impl TryFrom<String> for Action {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Action::parse(&value).ok_or_else(|| format!("invalid action name: {value:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parsing() {
        assert_eq!(Action::parse("list"), Some(Action::List));
        assert_eq!(Action::parse("Read"), Some(Action::Read));
        assert_eq!(Action::parse(" create "), Some(Action::Create));
        assert_eq!(Action::parse("UPDATE"), Some(Action::Update));
        assert_eq!(Action::parse("delete"), Some(Action::Delete));

        assert_eq!(
            Action::parse("Publish"),
            Some(Action::Custom("publish".to_string()))
        );

        assert_eq!(Action::parse("*"), None);
        assert_eq!(Action::parse("   "), None);
        assert_eq!(Action::parse("two words"), None);
        assert_eq!(Action::parse("movies:read"), None);
    }

    #[test]
    fn test_action_as_str() {
        assert_eq!(Action::List.as_str(), "list");
        assert_eq!(Action::Read.as_str(), "read");
        assert_eq!(Action::Delete.to_string(), "delete");
        assert_eq!(Action::Custom("export".into()).as_str(), "export");
    }

    #[test]
    fn test_from_verb() {
        assert_eq!(Action::from_verb("GET"), Some(Action::Read));
        assert_eq!(Action::from_verb("head"), Some(Action::Read));
        assert_eq!(Action::from_verb("POST"), Some(Action::Create));
        assert_eq!(Action::from_verb("PUT"), Some(Action::Update));
        assert_eq!(Action::from_verb("PATCH"), Some(Action::Update));
        assert_eq!(Action::from_verb("DELETE"), Some(Action::Delete));
        assert_eq!(Action::from_verb("TRACE"), None);
    }

    #[test]
    fn test_canonical_actions() {
        let all = Action::canonical();
        assert_eq!(all.len(), 5);
        assert!(!all.iter().any(|a| matches!(a, Action::Custom(_))));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&vec![Action::Read, Action::Custom("publish".into())])
            .unwrap();
        assert_eq!(json, r#"["read","publish"]"#);

        let parsed: Vec<Action> = serde_json::from_str(r#"["LIST","export"]"#).unwrap();
        assert_eq!(parsed, vec![Action::List, Action::Custom("export".into())]);

        assert!(serde_json::from_str::<Action>(r#""*""#).is_err());
    }
}

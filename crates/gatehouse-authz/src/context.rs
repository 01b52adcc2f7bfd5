//! Request context helpers
//!
//! Route-level metadata a dispatcher hands to the engine, and the rules for
//! turning it into a (component, action) pair.

use gatehouse_rbac::{Action, Component};
use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, AuthzResult};

/// Metadata describing one incoming request.
///
/// # Examples
///
/// ```
/// use gatehouse_authz::context::{derive_action, derive_component, RequestContext};
/// use gatehouse_rbac::{Action, Component};
///
/// let ctx = RequestContext::new().with_verb("PATCH").with_resource("Movies");
/// assert_eq!(derive_action(&ctx).unwrap(), Action::Update);
/// assert_eq!(derive_component(&ctx).unwrap(), Component::model("Movies"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Explicit action annotation on the route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_action: Option<String>,

    /// HTTP verb
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,

    /// Model resource the route operates on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    /// Controller handling the route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
}

impl RequestContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the explicit action annotation.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.route_action = Some(action.into());
        self
    }

    /// Set the HTTP verb.
    pub fn with_verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = Some(verb.into());
        self
    }

    /// Set the model resource.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the controller.
    pub fn with_controller(mut self, controller: impl Into<String>) -> Self {
        self.controller = Some(controller.into());
        self
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Determine the action of a request.
///
/// An explicit annotation wins, then the HTTP verb mapping, then `read`.
/// An annotation that is not a valid action name is an error rather than a
/// silent fallback.
pub fn derive_action(ctx: &RequestContext) -> AuthzResult<Action> {
    if let Some(annotation) = present(&ctx.route_action) {
        return Action::parse(annotation).ok_or_else(|| AuthzError::InvalidAction(annotation.to_string()));
    }

    Ok(present(&ctx.verb)
        .and_then(Action::from_verb)
        .unwrap_or(Action::Read))
}

/// Determine the component of a request.
///
/// A model resource takes precedence over the controller.
pub fn derive_component(ctx: &RequestContext) -> AuthzResult<Component> {
    if let Some(resource) = present(&ctx.resource) {
        return Ok(Component::model(resource));
    }
    present(&ctx.controller)
        .map(Component::controller)
        .ok_or(AuthzError::MissingComponent)
}

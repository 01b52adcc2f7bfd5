//! Event types for identity mutations
//!
//! This module defines the envelope published on the gatehouse event bus and
//! the typed payloads for role and actor mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subsystem that published an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Role and actor administration.
    Identity,
}

impl EventSource {
    /// Get the string representation of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Identity => "identity",
        }
    }
}

/// Event envelope.
///
/// All events are wrapped in this envelope, which carries the routing
/// topic and a versioned payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Event type (e.g., "role.renamed")
    pub event_type: String,

    /// Publishing subsystem
    pub source: EventSource,

    /// Timestamp when event was created
    pub timestamp: DateTime<Utc>,

    /// Event version for schema evolution
    pub version: u32,

    /// Event payload
    pub payload: serde_json::Value,
}

impl Event {
    /// Create a new event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The event type string
    /// * `source` - The publishing subsystem
    /// * `payload` - The event payload
    pub fn new(event_type: impl Into<String>, source: EventSource, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type: event_type.into(),
            source,
            timestamp: Utc::now(),
            version: 1,
            payload,
        }
    }

    /// Get the topic for this event: `{source}.{event_type}`.
    pub fn topic(&self) -> String {
        format!("{}.{}", self.source.as_str(), self.event_type)
    }

    /// Parse the payload into a specific type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Role lifecycle events.
///
/// Any of these invalidates cached role lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoleEvent {
    /// Role was created
    Created { role_id: Uuid, name: String },
    /// Role was renamed
    Renamed {
        role_id: Uuid,
        old_name: String,
        new_name: String,
    },
    /// Role was deleted
    Deleted { role_id: Uuid, name: String },
}

impl RoleEvent {
    /// Topic pattern matching every role event.
    pub const TOPIC_PATTERN: &'static str = "identity.role.*";

    /// Role names whose cached lookups this event makes stale.
    pub fn affected_names(&self) -> Vec<&str> {
        match self {
            RoleEvent::Created { name, .. } | RoleEvent::Deleted { name, .. } => vec![name.as_str()],
            RoleEvent::Renamed {
                old_name, new_name, ..
            } => vec![old_name.as_str(), new_name.as_str()],
        }
    }

    /// Convert to generic event.
    pub fn to_event(&self) -> Event {
        let event_type = match self {
            RoleEvent::Created { .. } => "role.created",
            RoleEvent::Renamed { .. } => "role.renamed",
            RoleEvent::Deleted { .. } => "role.deleted",
        };
        Event::new(
            event_type,
            EventSource::Identity,
            serde_json::to_value(self).unwrap_or_default(),
        )
    }
}

/// Actor events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActorEvent {
    /// Actor classification changed and its role link was re-synchronized
    ClassificationChanged {
        actor_id: Uuid,
        previous: Option<String>,
        current: String,
    },
}

impl ActorEvent {
    /// Convert to generic event.
    pub fn to_event(&self) -> Event {
        let event_type = match self {
            ActorEvent::ClassificationChanged { .. } => "actor.classification_changed",
        };
        Event::new(
            event_type,
            EventSource::Identity,
            serde_json::to_value(self).unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_topic() {
        let event = RoleEvent::Created {
            role_id: Uuid::now_v7(),
            name: "auditor".into(),
        }
        .to_event();
        assert_eq!(event.topic(), "identity.role.created");
        assert_eq!(event.version, 1);
    }

    #[test]
    fn test_envelope_serializes_routing_fields_only() {
        let event = RoleEvent::Deleted {
            role_id: Uuid::now_v7(),
            name: "guest".into(),
        }
        .to_event();

        let json = serde_json::to_value(&event).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["event_type", "id", "payload", "source", "timestamp", "version"]);
        assert_eq!(json["source"], "identity");
    }

    #[test]
    fn test_role_event_payload_roundtrip() {
        let role_event = RoleEvent::Renamed {
            role_id: Uuid::now_v7(),
            old_name: "staff".into(),
            new_name: "manager".into(),
        };
        let event = role_event.to_event();

        let parsed: RoleEvent = event.parse_payload().unwrap();
        assert_eq!(parsed, role_event);
        assert_eq!(parsed.affected_names(), vec!["staff", "manager"]);
    }

    #[test]
    fn test_actor_event_topic() {
        let event = ActorEvent::ClassificationChanged {
            actor_id: Uuid::now_v7(),
            previous: Some("user".into()),
            current: "manager".into(),
        }
        .to_event();
        assert_eq!(event.topic(), "identity.actor.classification_changed");
        assert_eq!(event.payload["current"], "manager");
    }
}

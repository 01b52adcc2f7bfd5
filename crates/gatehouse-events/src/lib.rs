//! # Gatehouse Events
//!
//! This crate provides the event bus gatehouse uses to propagate identity
//! mutations (role created/renamed/deleted, actor reclassified) to the
//! components that cache identity data.
//!
//! ## Overview
//!
//! The gatehouse-events crate handles:
//! - **Event Types**: The `Event` envelope plus typed `RoleEvent` / `ActorEvent` payloads
//! - **Event Bus**: Publish/subscribe messaging
//! - **Event Handlers**: Inline processing, used for cache invalidation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gatehouse_events::{EventBus, MemoryEventBus, RoleEvent};
//! use uuid::Uuid;
//!
//! async fn publish_example() {
//!     let bus = MemoryEventBus::new();
//!     let mut sub = bus.subscribe(RoleEvent::TOPIC_PATTERN).await.unwrap();
//!
//!     let renamed = RoleEvent::Renamed {
//!         role_id: Uuid::now_v7(),
//!         old_name: "staff".to_string(),
//!         new_name: "manager".to_string(),
//!     };
//!     bus.publish(renamed.to_event()).await.unwrap();
//!
//!     let event = sub.recv().await.unwrap();
//!     assert_eq!(event.topic(), "identity.role.renamed");
//! }
//! ```
//!
//! ## Topic Patterns
//!
//! Topics are structured as `{source}.{event_type}`:
//! - `identity.role.renamed` - Specific event
//! - `identity.role.*` - All role events
//! - `identity.#` - All identity events
//!
//! Wildcards:
//! - `*` matches exactly one segment
//! - `#` matches zero or more segments

pub mod bus;
pub mod types;

// Re-export main types
pub use bus::{EventBus, EventBusError, EventBusResult, EventBusStats, EventHandler, MemoryEventBus, Subscription};
pub use types::{ActorEvent, Event, EventSource, RoleEvent};

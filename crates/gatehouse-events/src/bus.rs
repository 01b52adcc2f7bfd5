//! Event bus implementation
//!
//! This module provides the event bus abstraction and the in-memory
//! implementation used to fan identity mutations out to caches.

use crate::types::Event;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

/// Event bus error types.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// Failed to subscribe
    #[error("Failed to subscribe: {0}")]
    SubscribeError(String),

    /// A handler rejected an event
    #[error("Handler {handler} failed: {message}")]
    HandlerFailed {
        /// Handler name
        handler: String,
        /// Failure description
        message: String,
    },

    /// Channel closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Subscription handle for receiving events.
pub struct Subscription {
    /// Subscription ID
    pub id: String,
    /// Topic pattern
    pub topic: String,
    /// Event receiver
    pub receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receive the next event.
    pub async fn recv(&mut self) -> EventBusResult<Event> {
        self.receiver
            .recv()
            .await
            .map_err(|_| EventBusError::ChannelClosed)
    }
}

/// Event handler trait for processing events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handler name, used in logs.
    fn name(&self) -> &str;

    /// Handle an event.
    async fn handle(&self, event: Event) -> EventBusResult<()>;

    /// Get the topic patterns this handler is interested in.
    fn topics(&self) -> Vec<String>;
}

/// Event bus trait for publish/subscribe operations.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event.
    async fn publish(&self, event: Event) -> EventBusResult<()>;

    /// Subscribe to a topic pattern.
    ///
    /// Topic patterns support wildcards:
    /// - `*` matches any single segment
    /// - `#` matches zero or more segments
    ///
    /// Examples:
    /// - `identity.role.*` matches `identity.role.created`, `identity.role.renamed`
    /// - `identity.#` matches every identity event
    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription>;

    /// Register an event handler.
    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()>;

    /// Unsubscribe.
    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()>;

    /// Get event bus stats.
    async fn stats(&self) -> EventBusStats;
}

/// Event bus statistics.
#[derive(Debug, Clone, Default)]
pub struct EventBusStats {
    /// Total events published
    pub events_published: u64,
    /// Total deliveries to subscribers and handlers
    pub events_delivered: u64,
    /// Handler invocations that returned an error
    pub handler_failures: u64,
    /// Active subscriptions
    pub active_subscriptions: usize,
    /// Registered handlers
    pub registered_handlers: usize,
}

struct SubscriberEntry {
    pattern: String,
    sender: broadcast::Sender<Event>,
}

/// In-memory event bus implementation.
///
/// Handlers run inline, in registration order, before `publish` returns, so
/// once a role mutation has been published every registered cache has
/// already been invalidated. Subscribers receive events through broadcast
/// channels.
pub struct MemoryEventBus {
    /// Subscribers by subscription id
    subscribers: Arc<RwLock<HashMap<String, SubscriberEntry>>>,
    /// Registered handlers
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
    /// Statistics
    stats: Arc<RwLock<EventBusStats>>,
    /// Channel capacity per subscription
    channel_capacity: usize,
}

impl std::fmt::Debug for MemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventBus")
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

impl MemoryEventBus {
    /// Create a new in-memory event bus.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create with custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            handlers: Arc::new(RwLock::new(Vec::new())),
            stats: Arc::new(RwLock::new(EventBusStats::default())),
            channel_capacity: capacity.max(1),
        }
    }

    /// Check if a topic matches a pattern.
    pub fn topic_matches(pattern: &str, topic: &str) -> bool {
        let pattern: Vec<&str> = pattern.split('.').collect();
        let topic: Vec<&str> = topic.split('.').collect();
        Self::segments_match(&pattern, &topic)
    }

    fn segments_match(pattern: &[&str], topic: &[&str]) -> bool {
        match (pattern.split_first(), topic.split_first()) {
            (None, None) => true,
            (Some((&"#", rest)), _) => {
                // `#` consumes zero or more segments
                (0..=topic.len()).any(|skip| Self::segments_match(rest, &topic[skip..]))
            }
            (Some((&"*", rest)), Some((_, topic_rest))) => Self::segments_match(rest, topic_rest),
            (Some((segment, rest)), Some((head, topic_rest))) => {
                segment == head && Self::segments_match(rest, topic_rest)
            }
            _ => false,
        }
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: Event) -> EventBusResult<()> {
        let topic = event.topic();
        let mut delivered = 0u64;
        let mut failures = 0u64;

        {
            let subscribers = self.subscribers.read().await;
            for entry in subscribers.values() {
                if Self::topic_matches(&entry.pattern, &topic) && entry.sender.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }

        let handlers: Vec<Arc<dyn EventHandler>> = self.handlers.read().await.clone();
        for handler in handlers {
            let interested = handler
                .topics()
                .iter()
                .any(|pattern| Self::topic_matches(pattern, &topic));
            if !interested {
                continue;
            }

            match handler.handle(event.clone()).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failures += 1;
                    tracing::error!(
                        handler = handler.name(),
                        topic = %topic,
                        event_id = %event.id,
                        error = %e,
                        "Event handler failed"
                    );
                }
            }
        }

        {
            let mut stats = self.stats.write().await;
            stats.events_published += 1;
            stats.events_delivered += delivered;
            stats.handler_failures += failures;
        }

        tracing::debug!(topic = %topic, event_id = %event.id, delivered, "Published event");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription> {
        if topic.trim().is_empty() {
            return Err(EventBusError::SubscribeError(
                "topic pattern must not be empty".to_string(),
            ));
        }

        let id = uuid::Uuid::now_v7().to_string();
        let (sender, receiver) = broadcast::channel(self.channel_capacity);

        {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(
                id.clone(),
                SubscriberEntry {
                    pattern: topic.to_string(),
                    sender,
                },
            );
        }

        {
            let mut stats = self.stats.write().await;
            stats.active_subscriptions += 1;
        }

        Ok(Subscription {
            id,
            topic: topic.to_string(),
            receiver,
        })
    }

    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()> {
        tracing::debug!(handler = handler.name(), topics = ?handler.topics(), "Registered event handler");
        self.handlers.write().await.push(handler);

        {
            let mut stats = self.stats.write().await;
            stats.registered_handlers += 1;
        }

        Ok(())
    }

    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()> {
        let removed = self.subscribers.write().await.remove(subscription_id);

        if removed.is_some() {
            let mut stats = self.stats.write().await;
            stats.active_subscriptions = stats.active_subscriptions.saturating_sub(1);
        }

        Ok(())
    }

    async fn stats(&self) -> EventBusStats {
        self.stats.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActorEvent, RoleEvent};
    use uuid::Uuid;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        seen: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        fn name(&self) -> &str {
            "counting"
        }

        async fn handle(&self, _event: Event) -> EventBusResult<()> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EventBusError::HandlerFailed {
                    handler: "counting".into(),
                    message: "boom".into(),
                });
            }
            Ok(())
        }

        fn topics(&self) -> Vec<String> {
            vec![RoleEvent::TOPIC_PATTERN.to_string()]
        }
    }

    fn role_created() -> Event {
        RoleEvent::Created {
            role_id: uuid::Uuid::now_v7(),
            name: "auditor".into(),
        }
        .to_event()
    }

    #[tokio::test]
    async fn test_memory_event_bus_publish_subscribe() {
        let bus = MemoryEventBus::new();
        let mut sub = bus.subscribe("identity.role.*").await.unwrap();

        bus.publish(role_created()).await.unwrap();

        let received = tokio::time::timeout(std::time::Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.event_type, "role.created");
    }

    #[tokio::test]
    async fn test_handlers_run_before_publish_returns() {
        let bus = MemoryEventBus::new();
        let handler = Arc::new(CountingHandler {
            seen: AtomicUsize::new(0),
            fail: false,
        });
        bus.register_handler(handler.clone()).await.unwrap();

        bus.publish(role_created()).await.unwrap();
        assert_eq!(handler.seen.load(Ordering::SeqCst), 1);

        // Not a role topic
        let reclassified = ActorEvent::ClassificationChanged {
            actor_id: Uuid::now_v7(),
            previous: None,
            current: "user".into(),
        };
        bus.publish(reclassified.to_event()).await.unwrap();
        assert_eq!(handler.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_failure_is_counted_not_propagated() {
        let bus = MemoryEventBus::new();
        bus.register_handler(Arc::new(CountingHandler {
            seen: AtomicUsize::new(0),
            fail: true,
        }))
        .await
        .unwrap();

        assert!(bus.publish(role_created()).await.is_ok());
        assert_eq!(bus.stats().await.handler_failures, 1);
    }

    #[test]
    fn test_topic_matching() {
        // Exact match
        assert!(MemoryEventBus::topic_matches("identity.role.created", "identity.role.created"));

        // Single wildcard
        assert!(MemoryEventBus::topic_matches("identity.role.*", "identity.role.renamed"));
        assert!(MemoryEventBus::topic_matches("*.role.created", "identity.role.created"));

        // Multi-segment wildcard
        assert!(MemoryEventBus::topic_matches("identity.#", "identity.role.created"));
        assert!(MemoryEventBus::topic_matches("#", "authz.permissions.compiled"));
        assert!(MemoryEventBus::topic_matches("identity.#.created", "identity.role.created"));

        // Non-matches
        assert!(!MemoryEventBus::topic_matches("identity.role.*", "identity.actor.classification_changed"));
        assert!(!MemoryEventBus::topic_matches("identity.role", "identity.role.created"));
        assert!(!MemoryEventBus::topic_matches("identity.role.*.x", "identity.role.created"));
    }

    #[tokio::test]
    async fn test_unsubscribe_updates_stats() {
        let bus = MemoryEventBus::new();
        let sub = bus.subscribe("identity.#").await.unwrap();
        assert_eq!(bus.stats().await.active_subscriptions, 1);

        bus.unsubscribe(&sub.id).await.unwrap();
        bus.unsubscribe(&sub.id).await.unwrap();
        assert_eq!(bus.stats().await.active_subscriptions, 0);

        assert!(bus.subscribe(" ").await.is_err());
    }
}

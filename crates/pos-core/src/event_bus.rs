//! Event bus abstraction for cross-service communication.
//!
//! Events flow from the event store (source of truth) through the event bus
//! to downstream services: stock, report, external POS integrations. This
//! is the transport the delivery tracker (`pos-delivery`) wraps with
//! per-destination tracking and a republish sweep.
//!
//! # Key Principles
//!
//! - **Postgres first**: events are persisted to the event store before publishing.
//! - **At-least-once delivery**: events may be delivered multiple times.
//! - **Idempotency**: subscribers must handle duplicate events.
//! - **Ordered within partition**: events from the same stream keep order.
//!
//! # Topic Naming Convention
//!
//! Topics follow `{aggregate-type}-events`: `tranlog-events`, `cart-events`,
//! `terminal-events`.

use crate::event::SerializedEvent;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed { topic: String, reason: String },

    #[error("Subscription failed for topics {topics:?}: {reason}")]
    SubscriptionFailed { topics: Vec<String>, reason: String },

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Consumer group error: {0}")]
    ConsumerGroupError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Event bus error: {0}")]
    Other(String),
}

/// Stream of events from subscriptions.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<SerializedEvent, EventBusError>> + Send>>;

/// Trait for event bus implementations: publish/subscribe with
/// at-least-once delivery semantics.
///
/// # Dyn Compatibility
///
/// Uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn` so
/// that `Arc<dyn EventBus>` can be wrapped by the circuit breaker in
/// `pos-delivery`.
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the publish operation fails.
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;

    /// Subscribe to one or more topics and receive a stream of events,
    /// typically backed by a consumer group so multiple instances of the
    /// same subscriber share the workload.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SubscriptionFailed`] if subscription fails.
    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>>;
}

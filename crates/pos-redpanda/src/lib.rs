//! Redpanda event bus implementation for the POS transactional core.
//!
//! Provides a production-ready Redpanda-based event bus implementing the
//! [`EventBus`] trait from `pos-core`, over `rdkafka` (Kafka-compatible).
//!
//! # Delivery semantics
//!
//! **At-least-once delivery** with manual offset commits:
//! - Events are committed AFTER successful delivery to the subscriber's channel
//! - If the process crashes before commit, events will be redelivered
//! - Subscribers MUST be idempotent (the stock consumer keys off `event_id`
//!   in the event metadata for exactly this reason)
//! - Ordering is guaranteed within the same partition (same event type key)
//!
//! **Configuration options**:
//! - `consumer_group`: Explicit consumer group for load balancing
//! - `buffer_size`: Event buffer (default: 1000) for handling bursts
//! - `auto_offset_reset`: Where to start reading (default: "latest")
//!
//! # Example
//!
//! ```no_run
//! use pos_redpanda::RedpandaEventBus;
//! use pos_core::event_bus::EventBus;
//! use pos_core::event::SerializedEvent;
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let event_bus = RedpandaEventBus::new("localhost:9092")?;
//!
//! let event = SerializedEvent::new("TransactionFinalised.v1".to_string(), vec![1, 2, 3], None);
//! event_bus.publish("tranlog-events", &event).await?;
//!
//! let mut stream = event_bus.subscribe(&["tranlog-events"]).await?;
//! while let Some(result) = stream.next().await {
//!     match result {
//!         Ok(event) => println!("Received: {:?}", event.event_type),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use pos_core::event::SerializedEvent;
use pos_core::event_bus::{EventBus, EventBusError, EventStream};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Redpanda-backed [`EventBus`] implementation.
///
/// - **At-least-once delivery**: events may be delivered multiple times
/// - **Ordering within partition**: events keyed by `event_type` preserve order
/// - **Consumer groups**: multiple instances of a subscriber share the workload
pub struct RedpandaEventBus {
    /// Kafka producer for publishing events.
    producer: FutureProducer,
    /// Broker addresses (for creating consumers).
    brokers: String,
    /// Producer send timeout.
    timeout: Duration,
    /// Consumer group ID, if explicitly set.
    consumer_group: Option<String>,
    /// Event buffer size for subscribers.
    buffer_size: usize,
    /// Auto offset reset policy for new consumer groups.
    auto_offset_reset: String,
}

impl RedpandaEventBus {
    /// Creates a new event bus with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if the producer cannot
    /// be created (invalid brokers, authentication failure, etc).
    pub fn new(brokers: &str) -> Result<Self, EventBusError> {
        Self::builder().brokers(brokers).build()
    }

    /// Creates a builder for configuring the event bus.
    #[must_use]
    pub fn builder() -> RedpandaEventBusBuilder {
        RedpandaEventBusBuilder::default()
    }

    /// Returns the configured broker addresses.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }
}

/// Builder for configuring a [`RedpandaEventBus`].
#[derive(Default)]
pub struct RedpandaEventBusBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    timeout: Option<Duration>,
    consumer_group: Option<String>,
    buffer_size: Option<usize>,
    auto_offset_reset: Option<String>,
}

impl RedpandaEventBusBuilder {
    /// Sets the broker addresses (comma-separated, e.g. `"localhost:9092"`).
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Sets the producer acknowledgment mode: `"0"`, `"1"`, or `"all"`.
    /// Default: `"1"`.
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Sets the compression codec. Default: `"none"`.
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Sets the producer send timeout. Default: 5 seconds.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets an explicit consumer group ID. If unset, one is derived from the
    /// sorted subscribed topics so repeated subscriptions to the same topic
    /// set share a group deterministically.
    #[must_use]
    pub fn consumer_group(mut self, consumer_group: impl Into<String>) -> Self {
        self.consumer_group = Some(consumer_group.into());
        self
    }

    /// Sets the event buffer size between the Kafka consumer task and the
    /// subscriber. Default: 1000.
    ///
    /// # Panics
    ///
    /// Panics if `buffer_size` is 0.
    #[must_use]
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        assert!(buffer_size > 0, "buffer_size must be greater than 0");
        self.buffer_size = Some(buffer_size);
        self
    }

    /// Sets where new consumer groups start reading: `"earliest"`,
    /// `"latest"`, or `"error"`. Default: `"latest"`.
    #[must_use]
    pub fn auto_offset_reset(mut self, policy: impl Into<String>) -> Self {
        self.auto_offset_reset = Some(policy.into());
        self
    }

    /// Builds the [`RedpandaEventBus`].
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if brokers are unset or
    /// the producer cannot be created.
    pub fn build(self) -> Result<RedpandaEventBus, EventBusError> {
        let brokers = self
            .brokers
            .ok_or_else(|| EventBusError::ConnectionFailed("brokers not configured".to_string()))?;

        let mut producer_config = ClientConfig::new();
        producer_config
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", self.producer_acks.as_deref().unwrap_or("1"))
            .set("compression.type", self.compression.as_deref().unwrap_or("none"));

        let producer: FutureProducer = producer_config
            .create()
            .map_err(|e| EventBusError::ConnectionFailed(format!("failed to create producer: {e}")))?;

        tracing::info!(
            brokers = %brokers,
            acks = self.producer_acks.as_deref().unwrap_or("1"),
            compression = self.compression.as_deref().unwrap_or("none"),
            buffer_size = self.buffer_size.unwrap_or(1000),
            auto_offset_reset = self.auto_offset_reset.as_deref().unwrap_or("latest"),
            "redpanda event bus created"
        );

        Ok(RedpandaEventBus {
            producer,
            brokers,
            timeout: self.timeout.unwrap_or(Duration::from_secs(5)),
            consumer_group: self.consumer_group,
            buffer_size: self.buffer_size.unwrap_or(1000),
            auto_offset_reset: self.auto_offset_reset.unwrap_or_else(|| "latest".to_string()),
        })
    }
}

impl EventBus for RedpandaEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let event = event.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let payload = bincode::serialize(&event).map_err(|e| EventBusError::PublishFailed {
                topic: topic.clone(),
                reason: format!("failed to serialize event: {e}"),
            })?;

            let key = event.event_type.as_bytes();
            let record = FutureRecord::to(&topic).payload(&payload).key(key);

            let send_result = self.producer.send(record, Timeout::After(timeout)).await;

            match send_result {
                Ok((partition, offset)) => {
                    tracing::debug!(
                        topic = %topic,
                        partition = partition,
                        offset = offset,
                        event_type = %event.event_type,
                        "event published"
                    );
                    Ok(())
                }
                Err((kafka_error, _)) => {
                    tracing::error!(topic = %topic, error = %kafka_error, "failed to publish event");
                    Err(EventBusError::PublishFailed {
                        topic,
                        reason: kafka_error.to_string(),
                    })
                }
            }
        })
    }

    #[allow(clippy::too_many_lines)]
    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(|s| (*s).to_string()).collect();
        let brokers = self.brokers.clone();
        let consumer_group = self.consumer_group.clone();
        let buffer_size = self.buffer_size;
        let auto_offset_reset = self.auto_offset_reset.clone();

        Box::pin(async move {
            let consumer_group_id = if let Some(group) = consumer_group {
                group
            } else {
                let mut sorted_topics = topics.clone();
                sorted_topics.sort();
                format!("pos-core-{}", sorted_topics.join("-"))
            };

            let consumer: StreamConsumer = ClientConfig::new()
                .set("bootstrap.servers", &brokers)
                .set("group.id", &consumer_group_id)
                .set("enable.auto.commit", "false")
                .set("auto.offset.reset", &auto_offset_reset)
                .set("session.timeout.ms", "6000")
                .set("enable.partition.eof", "false")
                .create()
                .map_err(|e| EventBusError::SubscriptionFailed {
                    topics: topics.clone(),
                    reason: format!("failed to create consumer: {e}"),
                })?;

            let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
            consumer.subscribe(&topic_refs).map_err(|e| EventBusError::SubscriptionFailed {
                topics: topics.clone(),
                reason: format!("failed to subscribe to topics: {e}"),
            })?;

            tracing::info!(
                topics = ?topics,
                consumer_group = %consumer_group_id,
                buffer_size = buffer_size,
                auto_offset_reset = %auto_offset_reset,
                manual_commit = true,
                "subscribed to topics"
            );

            let (tx, rx) = tokio::sync::mpsc::channel(buffer_size);

            tokio::spawn(async move {
                use futures::StreamExt;
                use rdkafka::consumer::CommitMode;

                let mut stream = consumer.stream();

                while let Some(msg_result) = stream.next().await {
                    match msg_result {
                        Ok(message) => {
                            let event_result = {
                                let Some(payload) = message.payload() else {
                                    let err = EventBusError::DeserializationFailed("message has no payload".to_string());
                                    if tx.send(Err(err)).await.is_err() {
                                        break;
                                    }
                                    if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
                                        tracing::warn!(error = %e, "failed to commit message with no payload");
                                    }
                                    continue;
                                };

                                match bincode::deserialize::<SerializedEvent>(payload) {
                                    Ok(event) => {
                                        tracing::trace!(
                                            topic = message.topic(),
                                            partition = message.partition(),
                                            offset = message.offset(),
                                            event_type = %event.event_type,
                                            "received event"
                                        );
                                        Ok(event)
                                    }
                                    Err(e) => Err(EventBusError::DeserializationFailed(format!(
                                        "failed to deserialize event: {e}"
                                    ))),
                                }
                            };

                            if tx.send(event_result).await.is_err() {
                                tracing::debug!("channel receiver dropped, exiting consumer task");
                                break;
                            }

                            if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
                                tracing::warn!(
                                    topic = message.topic(),
                                    partition = message.partition(),
                                    offset = message.offset(),
                                    error = %e,
                                    "failed to commit offset, message may be redelivered"
                                );
                            }
                        }
                        Err(e) => {
                            let err = EventBusError::TransportError(format!("failed to receive message: {e}"));
                            if tx.send(Err(err)).await.is_err() {
                                break;
                            }
                        }
                    }
                }

                tracing::debug!("consumer task exiting");
            });

            let stream = async_stream::stream! {
                let mut rx = rx;
                while let Some(result) = rx.recv().await {
                    yield result;
                }
            };

            Ok(Box::pin(stream) as EventStream)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redpanda_event_bus_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedpandaEventBus>();
        assert_sync::<RedpandaEventBus>();
    }

    #[test]
    fn builder_default_works() {
        let _builder = RedpandaEventBus::builder();
    }

    #[test]
    fn serialized_event_roundtrips_through_bincode() {
        let event = SerializedEvent::new(
            "TransactionFinalised.v1".to_string(),
            vec![1, 2, 3],
            Some(serde_json::json!({"event_id": "evt-1"})),
        );

        let bytes = bincode::serialize(&event).expect("serialization should succeed");
        let decoded: SerializedEvent = bincode::deserialize(&bytes).expect("deserialization should succeed");

        assert_eq!(decoded.event_type, event.event_type);
        assert_eq!(decoded.data, event.data);
        assert_eq!(decoded.metadata, event.metadata);
    }
}

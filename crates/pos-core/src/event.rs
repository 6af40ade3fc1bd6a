//! Event trait and related types for event sourcing.
//!
//! Events represent facts about things that have happened in the past and
//! are immutable: `CartItemAdded`, `TransactionFinalised`, `TerminalOpened`.
//!
//! # Design
//!
//! Events are serialized using `bincode`: all-Rust services share one binary
//! wire format between the event store and the event bus, with lower
//! overhead than JSON.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

/// An event that can be stored in an event store and replayed to
/// reconstruct aggregate state.
///
/// # Event Naming Convention
///
/// `event_type()` returns a stable, versioned identifier, e.g.
/// `"CartItemAdded.v1"`, so that schema evolution can introduce
/// `"CartItemAdded.v2"` without breaking old readers.
pub trait Event: Send + Sync + 'static {
    /// Returns the event type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes are corrupt,
    /// belong to a different event type, or the schema changed incompatibly.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A serialized event ready for storage or publication.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// The event type identifier (e.g. `"CartItemAdded.v1"`).
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,

    /// Optional metadata in JSONB format: `correlation_id`, `causation_id`,
    /// `tenant_id`, `store_code`, `terminal_no`, `timestamp`.
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    #[must_use]
    pub const fn new(event_type: String, data: Vec<u8>, metadata: Option<serde_json::Value>) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Create a serialized event from an `Event` trait object.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    enum TestEvent {
        Created { id: String, value: i32 },
        Updated { id: String, new_value: i32 },
    }

    impl Event for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Created { .. } => "TestEvent.Created.v1",
                TestEvent::Updated { .. } => "TestEvent.Updated.v1",
            }
        }
    }

    #[test]
    fn event_type_returns_correct_identifier() {
        let event = TestEvent::Created {
            id: "test-1".to_string(),
            value: 42,
        };
        assert_eq!(event.event_type(), "TestEvent.Created.v1");
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = TestEvent::Created {
            id: "test-1".to_string(),
            value: 42,
        };

        let bytes = event.to_bytes().expect("serialization should succeed");
        let deserialized = TestEvent::from_bytes(&bytes).expect("deserialization should succeed");

        assert_eq!(event, deserialized);
    }

    #[test]
    fn serialized_event_from_event() {
        let event = TestEvent::Updated {
            id: "test-1".to_string(),
            new_value: 100,
        };

        let metadata = serde_json::json!({
            "correlation_id": "corr-456",
            "tenant_id": "ten1",
        });

        let serialized = SerializedEvent::from_event(&event, Some(metadata.clone()))
            .expect("serialization should succeed");

        assert_eq!(serialized.event_type, "TestEvent.Updated.v1");
        assert!(!serialized.data.is_empty());
        assert_eq!(serialized.metadata, Some(metadata));
    }

    #[test]
    fn serialized_event_display() {
        let serialized = SerializedEvent::new("TestEvent.v1".to_string(), vec![1, 2, 3, 4, 5], None);

        let display = format!("{serialized}");
        assert!(display.contains("TestEvent.v1"));
        assert!(display.contains("5 bytes"));
    }
}

//! Event store trait: storage and retrieval of event streams with
//! optimistic concurrency control.
//!
//! # Implementations
//!
//! - `PostgresEventStore` (`pos-postgres`): production implementation
//! - `InMemoryEventStore` (test helpers, `pos-core::testing`): fast,
//!   deterministic tests

use crate::event::SerializedEvent;
use crate::stream::{StreamId, Version};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Type alias for snapshot data: `(Version, Vec<u8>)`
type SnapshotData = (Version, Vec<u8>);

/// Errors that can occur during event store operations.
#[derive(Error, Debug)]
pub enum EventStoreError {
    /// Optimistic concurrency conflict: expected version doesn't match current version.
    #[error("Concurrency conflict: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        stream_id: StreamId,
        expected: Version,
        actual: Version,
    },

    #[error("Stream not found: {0}")]
    StreamNotFound(StreamId),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

/// Event store abstraction for storing and retrieving event streams.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of
/// `async fn` so that `Arc<dyn EventStore>` can be shared across the cart,
/// terminal and tranlog aggregates.
pub trait EventStore: Send + Sync {
    /// Append events to a stream with optimistic concurrency control.
    ///
    /// `expected_version = Some(v)` asserts the stream is currently at
    /// version `v`; `None` appends unconditionally.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict`: version mismatch (concurrent modification)
    /// - `DatabaseError`: database connection or query failed
    /// - `SerializationError`: failed to serialize events
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<Version, EventStoreError>> + Send + '_>>;

    /// Load events from a stream, ordered by version (oldest first). An
    /// absent stream returns an empty vector, not an error.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: database connection or query failed
    /// - `SerializationError`: failed to deserialize events
    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SerializedEvent>, EventStoreError>> + Send + '_>>;

    /// Save a snapshot of aggregate state at a given version.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: database connection or query failed
    fn save_snapshot(
        &self,
        stream_id: StreamId,
        version: Version,
        state: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>>;

    /// Load the latest snapshot for a stream, if any.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: database connection or query failed
    /// - `SerializationError`: failed to deserialize the snapshot
    fn load_snapshot(
        &self,
        stream_id: StreamId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SnapshotData>, EventStoreError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_conflict_error_display() {
        let error = EventStoreError::ConcurrencyConflict {
            stream_id: StreamId::new("cart-123"),
            expected: Version::new(5),
            actual: Version::new(7),
        };

        let display = format!("{error}");
        assert!(display.contains("expected version 5"));
        assert!(display.contains("found 7"));
    }

    #[test]
    fn stream_not_found_error_display() {
        let error = EventStoreError::StreamNotFound(StreamId::new("cart-missing"));
        let display = format!("{error}");
        assert!(display.contains("cart-missing"));
    }
}

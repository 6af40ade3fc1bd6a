//! Projection system for building and maintaining read models from events.
//!
//! Projections are the query side of CQRS: the sales report and stock
//! consumers fold the tranlog event stream into denormalized views instead
//! of re-querying the write-side event store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Error type for projection operations.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Event processing error: {0}")]
    EventProcessing(String),

    #[error("Projection error: {0}")]
    Other(String),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;

/// A projection builds and maintains a read model from events.
///
/// # Philosophy
///
/// - Eventually consistent: projections lag behind events.
/// - Optimized for reads: schema matches query patterns, not the write model.
/// - Rebuildable: can be dropped and rebuilt from events at any time.
pub trait Projection: Send + Sync {
    /// The event type this projection listens to.
    type Event: for<'de> Deserialize<'de> + Send;

    /// Projection name, used for checkpointing. Must be unique across all
    /// projections in the system.
    fn name(&self) -> &str;

    /// Apply an event to update the projection.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if event processing or storage fails.
    ///
    /// # Idempotency
    ///
    /// Must be idempotent: events may be replayed during catch-up.
    fn apply_event(&self, event: &Self::Event) -> impl Future<Output = Result<()>> + Send;

    /// Rebuild projection from scratch. Default is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if rebuild fails.
    fn rebuild(&self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

/// Storage backend for projection data, typically a separate database from
/// the event store so read and write sides scale independently.
pub trait ProjectionStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if save fails.
    fn save(&self, key: &str, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if retrieval fails.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if deletion fails.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if the underlying check fails.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send {
        async move { Ok(self.get(key).await?.is_some()) }
    }
}

/// Checkpoint tracking for projection progress through the event stream,
/// so a restarted consumer resumes rather than reprocessing everything.
///
/// # Dyn Compatibility
///
/// Uses explicit `Pin<Box<dyn Future>>` returns so checkpoints can be
/// passed around as `Arc<dyn ProjectionCheckpoint>`.
pub trait ProjectionCheckpoint: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ProjectionError::Checkpoint`] if save fails.
    fn save_position(
        &self,
        projection_name: &str,
        position: EventPosition,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// # Errors
    ///
    /// Returns [`ProjectionError::Checkpoint`] if load fails.
    fn load_position(
        &self,
        projection_name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EventPosition>>> + Send + '_>>;
}

/// Position in the event stream, for checkpoint resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPosition {
    pub offset: u64,
    pub timestamp: DateTime<Utc>,
}

impl EventPosition {
    #[must_use]
    pub const fn new(offset: u64, timestamp: DateTime<Utc>) -> Self {
        Self { offset, timestamp }
    }

    #[must_use]
    pub fn beginning() -> Self {
        Self {
            offset: 0,
            timestamp: Utc::now(),
        }
    }
}

//! Postgres-backed storage for the POS transactional core.
//!
//! Provides a production [`EventStore`](pos_core::EventStore) implementation
//! plus the POS-specific repositories that sit alongside it: per-terminal
//! counters (transaction/receipt numbers), delivery status tracking, and a
//! failed-publish queue for events the circuit breaker in `pos-delivery`
//! could not get onto the bus.

#![forbid(unsafe_code)]

pub mod counters;
pub mod delivery_status;
pub mod event_store;
pub mod failed_publish;

pub use counters::{CounterRepository, CounterType};
pub use delivery_status::DeliveryStatusRepository;
pub use event_store::PostgresEventStore;
pub use failed_publish::{FailedPublishEntry, FailedPublishQueue, FailedPublishStatus};

//! Generic, storage- and event-type-agnostic projection infrastructure:
//! Postgres-backed projection state and checkpoints, plus a poller that
//! advances a [`pos_core::projection::Projection`] by reading new rows off
//! the shared `tranlog` table.
//!
//! Deliberately has no dependency on `pos-cart`'s event types: consumers
//! like `pos-stock` supply their own `Projection::Event` and this crate only
//! ever handles a row's body as opaque JSON.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod checkpoint;
pub mod poller;
pub mod store;

pub use checkpoint::PgProjectionCheckpoint;
pub use poller::{deserialize_event, PollerError, TranlogPoller};
pub use store::PgProjectionStore;

//! Stock projection over the shared tranlog stream, manual stock
//! adjustments, threshold alerts, and scheduled snapshots: the third
//! pillar of the POS transactional subsystem (spec §4.8).
//!
//! Unlike `pos_cart`'s state machine or `pos_terminal`'s imperative
//! lifecycle, stock is driven by replaying another crate's events: the
//! consumer implements `pos_projections`' [`pos_core::projection::Projection`]
//! trait over `pos_cart`'s [`pos_cart::tranlog::TransactionLog`], folding
//! every committed transaction's line items into signed quantity deltas.
//! Idempotency and the quantity update share one database transaction
//! (spec §5), so a tranlog event replayed during catch-up or redelivered
//! over `POST /tranlog` applies its effect exactly once.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod alerts;
pub mod consumer;
pub mod handlers;
pub mod model;
pub mod router;
pub mod runtime_env;
pub mod service;
pub mod snapshot;
pub mod store;

pub use consumer::StockProjection;
pub use model::{SnapshotFrequency, SnapshotSchedule, Stock, StockSnapshot, StockSnapshotItem, StockUpdate, StockUpdateReason};
pub use runtime_env::SystemClock;
pub use service::{StockKey, StockService, StockServiceError};
pub use snapshot::SnapshotScheduler;
pub use store::{StockRepository, StockStoreError};

//! Terminal registry, open/close lifecycle, cash in/out, and session
//! counters: the second pillar of the POS transactional subsystem.
//!
//! A terminal is a long-lived registry row (spec §4.5), not a short-lived
//! aggregate like a cart: opening, cash movements, and closing are
//! one-shot imperative transitions gated by plain precondition checks
//! rather than a state machine over discrete events. Closing snapshots
//! the session's cash-movement and transaction activity — the latter read
//! directly from the shared tranlog table `pos-cart` writes — and embeds
//! it on the closing log for the report service's reconciliation gate
//! (spec §4.7) to compare against.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod gate;
pub mod handlers;
pub mod model;
pub mod receipt;
pub mod router;
pub mod runtime_env;
pub mod service;
pub mod store;

pub use model::{CashInOutLog, OpenCloseLog, OpenCloseOperation, Terminal};
pub use runtime_env::SystemClock;
pub use service::{TerminalKey, TerminalService, TerminalServiceError};
pub use store::{SessionSnapshot, TerminalLogRepository, TerminalRepository, TerminalStoreError};

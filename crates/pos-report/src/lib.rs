//! Sales report aggregation over the shared tranlog stream, the daily
//! reconciliation gate, and report-to-journal posting: the fourth pillar
//! of the POS transactional subsystem (spec §4.7).
//!
//! Unlike `pos_stock`'s consumer, this crate is not projection-based:
//! reports are computed on demand from a direct, filtered query over the
//! same `tranlog` table `pos_stock` folds incrementally, plus a read-only
//! cross-service read of `pos_terminal`'s `cash_in_out_log` and
//! `open_close_log` tables. A `daily` report additionally runs the
//! reconciliation gate before aggregating anything; `flash` bypasses it.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod aggregate;
pub mod gate;
pub mod handlers;
pub mod journal;
pub mod model;
pub mod router;
pub mod runtime_env;
pub mod service;
pub mod store;

pub use journal::JournalTransactionType;
pub use model::{CashBlock, DailyInfo, DiscountBucket, PaymentBucket, ReportKey, ReportScope, ReportType, SalesReport, TaxBucket};
pub use runtime_env::SystemClock;
pub use service::{ReportService, ReportServiceError, SalesAggregate, CASH_PAYMENT_CODE};
pub use store::{ReportRepository, ReportStoreError};

//! The production clock used to build a [`StockService`](crate::service::StockService).

use chrono::{DateTime, Utc};
use pos_core::environment::Clock;

/// `Utc::now()`-backed clock, the only production [`Clock`] implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

//! The production clock used to build a [`ReportService`](crate::service::ReportService).

use chrono::{DateTime, Utc};
use pos_core::environment::Clock;

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

//! The production [`CartEnvironment`]: a real clock and the payment
//! registry built once at startup from the payment master.

use crate::payment::PaymentRegistry;
use crate::reducer::CartEnvironment;
use chrono::{DateTime, Utc};
use pos_core::environment::Clock;
use pos_domain::money::Rounding;

/// `Utc::now()`-backed clock, the only production [`Clock`] implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Production cart environment: system clock plus a tenant's payment
/// registry and rounding rule.
pub struct RuntimeEnv {
    clock: SystemClock,
    payments: PaymentRegistry,
    rounding: Rounding,
}

impl RuntimeEnv {
    #[must_use]
    pub fn new(payments: PaymentRegistry, rounding: Rounding) -> Self {
        Self {
            clock: SystemClock,
            payments,
            rounding,
        }
    }
}

impl Clock for RuntimeEnv {
    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl CartEnvironment for RuntimeEnv {
    fn rounding(&self) -> Rounding {
        self.rounding
    }

    fn payments(&self) -> &PaymentRegistry {
        &self.payments
    }
}

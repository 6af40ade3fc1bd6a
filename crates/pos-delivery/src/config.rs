//! Tunables for the republish sweep and the publish-side circuit breaker.

use crate::circuit_breaker::CircuitBreakerConfig;
use std::time::Duration;

/// Delivery tracker configuration, named after the environment variables the
/// original system reads these from.
#[derive(Debug, Clone)]
pub struct DeliveryTrackerConfig {
    /// Rows younger than this are skipped by the sweep: too fresh to worry about.
    pub undelivered_check_interval: Duration,
    /// Rows older than this, at sweep time, are marked `failed` (a warning is
    /// emitted) before the sweep still attempts to republish them.
    pub undelivered_check_failed_period: Duration,
    /// How far back the sweep looks for outstanding rows at all.
    pub undelivered_check_period: Duration,
    /// How often the sweep runs.
    pub sweep_interval: Duration,
    /// Circuit breaker guarding the broker publish call.
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for DeliveryTrackerConfig {
    fn default() -> Self {
        Self {
            undelivered_check_interval: Duration::from_secs(5 * 60),
            undelivered_check_failed_period: Duration::from_secs(30 * 60),
            undelivered_check_period: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(60),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_orders_windows_sensibly() {
        let config = DeliveryTrackerConfig::default();
        assert!(config.undelivered_check_interval < config.undelivered_check_failed_period);
        assert!(config.undelivered_check_failed_period < config.undelivered_check_period);
    }
}

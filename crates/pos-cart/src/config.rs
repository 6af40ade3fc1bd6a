//! Tenant-level cart configuration: rounding mode and receipt numbering
//! bounds, loaded once per tenant and cached by the caller.

use pos_domain::money::Rounding;
use serde::{Deserialize, Serialize};

/// Pricing configuration for one tenant. `rounding` defaults to
/// [`Rounding::HalfEven`], matching the fiscal rounding convention the
/// pricing engine falls back to when a tenant hasn't overridden it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TenantPricingConfig {
    #[serde(default)]
    pub rounding: Rounding,
    pub receipt_no_start: i64,
    pub receipt_no_end: i64,
}

impl Default for TenantPricingConfig {
    fn default() -> Self {
        Self {
            rounding: Rounding::HalfEven,
            receipt_no_start: 1,
            receipt_no_end: 9999,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rounding_is_half_even() {
        assert!(matches!(TenantPricingConfig::default().rounding, Rounding::HalfEven));
    }
}

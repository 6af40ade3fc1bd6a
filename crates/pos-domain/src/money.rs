//! Money amounts and the rounding rules used throughout the pricing engine.
//!
//! Amounts are whole currency units (yen has no subdivision), stored as `i64`
//! so that arithmetic is exact. Tax rates are [`rust_decimal::Decimal`] so
//! that `amount * rate` never drifts the way `f64` would.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// A whole-unit currency amount (e.g. yen). Negative values represent
/// refunds, change, or cash-out.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Multiplies by an integer quantity (line gross = unit price x quantity).
    #[must_use]
    pub fn checked_mul_qty(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(quantity)).map(Self)
    }

    /// Applies a decimal rate and rounds according to `rounding`. Used for
    /// both tax computation and percentage discounts.
    #[must_use]
    pub fn apply_rate(self, rate: Decimal, rounding: Rounding) -> Self {
        let exact = Decimal::from(self.0) * rate;
        Self(rounding.round(exact))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Amount {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, v| acc + *v)
    }
}

/// Rounding strategy applied at every point the pricing engine turns a
/// fractional amount into a whole-unit [`Amount`]. Configurable per tenant;
/// default is banker's rounding (round-half-to-even), matching common fiscal
/// rounding rules for tax-inclusive pricing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rounding {
    /// Round half to even (banker's rounding). Default.
    #[default]
    HalfEven,
    /// Round half away from zero.
    HalfUp,
    /// Always round down (truncate toward zero).
    Down,
    /// Always round up (away from zero).
    Up,
}

impl Rounding {
    /// Rounds `exact` to the nearest whole unit under this strategy and
    /// returns it as `i64`. `exact` is expected to already be in the target
    /// currency's minor unit (here: whole yen).
    #[must_use]
    pub fn round(self, exact: Decimal) -> i64 {
        let rounded = match self {
            Rounding::HalfEven => exact.round_dp_with_strategy(
                0,
                rust_decimal::RoundingStrategy::MidpointNearestEven,
            ),
            Rounding::HalfUp => exact.round_dp_with_strategy(
                0,
                rust_decimal::RoundingStrategy::MidpointAwayFromZero,
            ),
            Rounding::Down => exact.trunc(),
            Rounding::Up => {
                if exact >= Decimal::ZERO {
                    exact.ceil()
                } else {
                    exact.floor()
                }
            },
        };
        rounded.to_i64().unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn external_tax_rounds_half_even() {
        // 15 * 0.5 = 7.5 -> rounds to 8 (nearest even)
        let amount = Amount::new(15);
        assert_eq!(amount.apply_rate(dec!(0.5), Rounding::HalfEven).value(), 8);

        // 25 * 0.5 = 12.5 -> rounds to 12 (nearest even)
        let amount = Amount::new(25);
        assert_eq!(amount.apply_rate(dec!(0.5), Rounding::HalfEven).value(), 12);
    }

    #[test]
    fn half_up_always_rounds_away_from_zero_at_midpoint() {
        let amount = Amount::new(25);
        assert_eq!(amount.apply_rate(dec!(0.5), Rounding::HalfUp).value(), 13);
    }

    #[test]
    fn arithmetic_is_exact() {
        let total = Amount::new(100) + Amount::new(200) - Amount::new(50);
        assert_eq!(total.value(), 250);
    }
}

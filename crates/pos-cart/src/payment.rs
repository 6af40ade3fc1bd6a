//! Payment strategies (spec §4.3).
//!
//! Each payment method is a [`PaymentHandler`] looked up by its
//! [`PaymentCode`] in a registry built once at startup. Applying a list of
//! payments is sequential and all-or-nothing: the first handler failure
//! aborts the whole list without committing any of the payments already
//! validated in that call.

use crate::model::{Cart, Payment};
use pos_domain::ids::PaymentCode;
use pos_domain::money::Amount;
use std::collections::HashMap;
use thiserror::Error;

/// Failure modes a payment handler can raise (spec §4.3).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentError {
    /// The cart balance is already zero; no further payment is accepted.
    #[error("balance is already zero")]
    BalanceZero,
    /// Applying this payment would take the balance below zero for a
    /// handler that cannot produce change.
    #[error("payment would take balance below zero")]
    BalanceMinus,
    /// The deposited amount exceeds the balance for a handler that cannot
    /// accept an over-deposit (cashless methods typically cannot).
    #[error("deposit exceeds balance for a method that cannot deposit over")]
    DepositOver,
}

/// What a payment method is and isn't allowed to do, independent of the
/// math a handler performs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PaymentCapabilities {
    pub can_refund: bool,
    pub can_deposit_over: bool,
    pub can_change: bool,
}

/// A strategy for one payment method. Implementations decide how a
/// requested deposit maps to a credited `amount` and optional change.
pub trait PaymentHandler: Send + Sync {
    /// Static capability flags consulted by the finaliser (refund/void
    /// eligibility) independent of any single application.
    fn capabilities(&self) -> PaymentCapabilities;

    /// Applies `deposit` against `balance`, returning the realised
    /// [`Payment`]. `payment_no` and `description` are supplied by the
    /// caller; the handler only computes `amount`/`deposit_amount`.
    ///
    /// # Errors
    ///
    /// Returns a [`PaymentError`] if this deposit is not acceptable given
    /// the handler's capabilities and the current balance.
    fn apply(
        &self,
        payment_no: u32,
        code: &PaymentCode,
        description: &str,
        deposit: Amount,
        balance: Amount,
    ) -> Result<Payment, PaymentError>;
}

/// Cash: can produce change, cannot go over-deposit because the excess is
/// simply handed back as change, can be refunded.
pub struct CashHandler;

impl PaymentHandler for CashHandler {
    fn capabilities(&self) -> PaymentCapabilities {
        PaymentCapabilities {
            can_refund: true,
            can_deposit_over: true,
            can_change: true,
        }
    }

    fn apply(
        &self,
        payment_no: u32,
        code: &PaymentCode,
        description: &str,
        deposit: Amount,
        balance: Amount,
    ) -> Result<Payment, PaymentError> {
        if balance.is_zero() {
            return Err(PaymentError::BalanceZero);
        }
        let credited = if deposit > balance { balance } else { deposit };
        Ok(Payment {
            payment_no,
            payment_code: code.clone(),
            description: description.to_string(),
            amount: credited,
            deposit_amount: Some(deposit),
            detail: None,
        })
    }
}

/// Cashless methods (card, e-money, QR): credit exactly what was deposited,
/// cannot over-deposit, cannot be refunded through the cart (refund is a
/// separate settlement flow outside this system).
pub struct CashlessHandler;

impl PaymentHandler for CashlessHandler {
    fn capabilities(&self) -> PaymentCapabilities {
        PaymentCapabilities {
            can_refund: false,
            can_deposit_over: false,
            can_change: false,
        }
    }

    fn apply(
        &self,
        payment_no: u32,
        code: &PaymentCode,
        description: &str,
        deposit: Amount,
        balance: Amount,
    ) -> Result<Payment, PaymentError> {
        if balance.is_zero() {
            return Err(PaymentError::BalanceZero);
        }
        if deposit > balance {
            return Err(PaymentError::DepositOver);
        }
        if balance - deposit < Amount::ZERO {
            return Err(PaymentError::BalanceMinus);
        }
        Ok(Payment {
            payment_no,
            payment_code: code.clone(),
            description: description.to_string(),
            amount: deposit,
            deposit_amount: Some(deposit),
            detail: None,
        })
    }
}

/// A registry of payment handlers keyed by payment code, built once at
/// startup from the payment master.
#[derive(Default)]
pub struct PaymentRegistry {
    handlers: HashMap<PaymentCode, Box<dyn PaymentHandler>>,
}

impl PaymentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, code: PaymentCode, handler: Box<dyn PaymentHandler>) {
        self.handlers.insert(code, handler);
    }

    #[must_use]
    pub fn get(&self, code: &PaymentCode) -> Option<&dyn PaymentHandler> {
        self.handlers.get(code).map(std::convert::AsRef::as_ref)
    }

    /// Applies a list of `(code, description, deposit)` requests against
    /// `cart` sequentially, stopping at the first failure. On success every
    /// payment is appended to `cart.payments` in order; on failure none of
    /// the requests from this call are applied.
    ///
    /// # Errors
    ///
    /// Returns the first [`PaymentError`] encountered, along with its
    /// 0-based index in `requests`.
    pub fn apply_all(
        &self,
        cart: &mut Cart,
        requests: &[(PaymentCode, String, Amount)],
    ) -> Result<(), (usize, PaymentError)> {
        let mut balance = cart.sales.balance_amount;
        let mut applied = Vec::with_capacity(requests.len());
        let mut next_no = cart.next_payment_no();

        for (idx, (code, description, deposit)) in requests.iter().enumerate() {
            let Some(handler) = self.get(code) else {
                // An unknown payment code cannot be applied; treat it like
                // any other rejection so no partial payments are committed.
                return Err((idx, PaymentError::BalanceMinus));
            };
            match handler.apply(next_no, code, description, *deposit, balance) {
                Ok(payment) => {
                    balance -= payment.amount;
                    next_no += 1;
                    applied.push(payment);
                },
                Err(err) => return Err((idx, err)),
            }
        }

        cart.payments.extend(applied);
        cart.sales.balance_amount = balance;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cash_produces_change_by_capping_credited_amount() {
        let handler = CashHandler;
        let payment = handler
            .apply(1, &PaymentCode::new("01"), "cash", Amount::new(150), Amount::new(100))
            .expect("cash accepts over-deposit");
        assert_eq!(payment.amount.value(), 100);
        assert_eq!(payment.deposit_amount, Some(Amount::new(150)));
    }

    #[test]
    fn cash_rejects_when_balance_already_zero() {
        let handler = CashHandler;
        assert_eq!(
            handler.apply(1, &PaymentCode::new("01"), "cash", Amount::new(10), Amount::ZERO),
            Err(PaymentError::BalanceZero)
        );
    }

    #[test]
    fn cashless_rejects_deposit_over_balance() {
        let handler = CashlessHandler;
        assert_eq!(
            handler.apply(1, &PaymentCode::new("02"), "card", Amount::new(150), Amount::new(100)),
            Err(PaymentError::DepositOver)
        );
    }

    #[test]
    fn registry_apply_all_stops_at_first_failure_without_partial_commit() {
        let mut registry = PaymentRegistry::new();
        registry.register(PaymentCode::new("01"), Box::new(CashHandler));
        registry.register(PaymentCode::new("02"), Box::new(CashlessHandler));

        let mut cart = crate::model::Cart::new(
            pos_domain::ids::CartId::new("c1"),
            pos_domain::ids::TenantId::new("t1"),
            pos_domain::ids::StoreCode::new("s1"),
            pos_domain::ids::TerminalNo(1),
            pos_domain::business_date::BusinessDate::from_ymd(2026, 1, 1).expect("valid date"),
            chrono::Utc::now(),
        );
        cart.sales.balance_amount = Amount::new(100);

        let requests = vec![
            (PaymentCode::new("01"), "cash".to_string(), Amount::new(50)),
            (PaymentCode::new("02"), "card".to_string(), Amount::new(9999)),
        ];
        let result = registry.apply_all(&mut cart, &requests);
        assert_eq!(result, Err((1, PaymentError::DepositOver)));
        assert!(cart.payments.is_empty());
        assert_eq!(cart.sales.balance_amount.value(), 100);
    }

    #[test]
    fn registry_apply_all_commits_every_payment_on_success() {
        let mut registry = PaymentRegistry::new();
        registry.register(PaymentCode::new("01"), Box::new(CashHandler));

        let mut cart = crate::model::Cart::new(
            pos_domain::ids::CartId::new("c1"),
            pos_domain::ids::TenantId::new("t1"),
            pos_domain::ids::StoreCode::new("s1"),
            pos_domain::ids::TerminalNo(1),
            pos_domain::business_date::BusinessDate::from_ymd(2026, 1, 1).expect("valid date"),
            chrono::Utc::now(),
        );
        cart.sales.balance_amount = Amount::new(100);

        let requests = vec![(PaymentCode::new("01"), "cash".to_string(), Amount::new(100))];
        registry.apply_all(&mut cart, &requests).expect("payment accepted");
        assert_eq!(cart.payments.len(), 1);
        assert_eq!(cart.sales.balance_amount.value(), 0);
    }
}

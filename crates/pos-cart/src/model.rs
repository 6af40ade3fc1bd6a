//! The cart aggregate and the frozen master-data snapshots it carries.
//!
//! A cart owns copies of every master-data document it touches (items,
//! taxes, settings) rather than sharing repository state, so a running
//! cart's pricing never shifts under a concurrent master-data edit.

use chrono::{DateTime, Utc};
use pos_domain::business_date::BusinessDate;
use pos_domain::enums::{CartStatus, DiscountScope, DiscountType, TaxType, TransactionType};
use pos_domain::ids::{CartId, CategoryCode, ItemCode, PaymentCode, StaffRef, TaxCode, TerminalNo};
use pos_domain::money::Amount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single item line on the cart.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineItem {
    /// 1-based, assigned in add order; stable once assigned.
    pub line_no: u32,
    pub item_code: ItemCode,
    pub category_code: CategoryCode,
    pub description: String,
    pub unit_price: Amount,
    pub unit_price_original: Option<Amount>,
    pub is_unit_price_changed: bool,
    pub quantity: u32,
    pub tax_code: TaxCode,
    pub is_cancelled: bool,
    pub is_discount_restricted: bool,
    pub discounts: Vec<Discount>,
    /// Cart-level subtotal discount allocated back to this line,
    /// proportional to its net amount. Populated by the pricing engine.
    pub discounts_allocated: Vec<Discount>,
}

impl LineItem {
    /// Gross amount before any discount: `unit_price * quantity`.
    #[must_use]
    pub fn gross(&self) -> Amount {
        self.unit_price.checked_mul_qty(self.quantity).unwrap_or(Amount::ZERO)
    }

    /// Sum of this line's own discounts (not the cart-level allocation).
    #[must_use]
    pub fn line_discount_total(&self) -> Amount {
        self.discounts.iter().map(|d| d.discount_amount).sum()
    }

    /// Net amount after line discounts, before subtotal-level allocation.
    #[must_use]
    pub fn net_before_allocation(&self) -> Amount {
        self.gross() - self.line_discount_total()
    }

    /// Net amount after both line discounts and the allocated subtotal share.
    #[must_use]
    pub fn net_after_allocation(&self) -> Amount {
        let allocated: Amount = self.discounts_allocated.iter().map(|d| d.discount_amount).sum();
        self.net_before_allocation() - allocated
    }
}

/// A discount applied either to a single line or to the cart subtotal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Discount {
    pub discount_type: DiscountType,
    pub discount_scope: DiscountScope,
    /// Raw value: either a fixed amount or a percentage (0-100).
    pub discount_value: rust_decimal::Decimal,
    /// Realised amount after applying `discount_value` to its target.
    pub discount_amount: Amount,
    pub discount_detail: Option<String>,
    pub discount_reason: Option<String>,
}

/// A settled payment line.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payment {
    /// 1-based, assigned in application order.
    pub payment_no: u32,
    pub payment_code: PaymentCode,
    pub description: String,
    /// Amount credited against the balance (post-change for cash-like codes).
    pub amount: Amount,
    /// Pre-change amount actually deposited; only meaningful for cash-like codes.
    pub deposit_amount: Option<Amount>,
    pub detail: Option<String>,
}

/// A tax line computed on the cart or tranlog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tax {
    pub tax_no: u32,
    pub tax_code: TaxCode,
    pub tax_type: TaxType,
    pub tax_name: String,
    pub tax_amount: Amount,
    pub target_amount: Amount,
    pub target_quantity: u32,
}

/// Aggregate totals computed by the pricing engine (spec §4.2 step 5-6).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Sales {
    /// Post-discount, pre-external-tax total.
    pub total_amount: Amount,
    /// External tax only (invariant 4: internal tax never appears here).
    pub tax_amount: Amount,
    pub total_amount_with_tax: Amount,
    pub total_discount_amount: Amount,
    pub total_quantity: u32,
    pub balance_amount: Amount,
    pub is_stamp_duty_applied: bool,
    pub stamp_duty_target_amount: Option<Amount>,
    pub stamp_duty_amount: Option<Amount>,
}

/// Frozen copy of the item master rows a cart has touched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemMaster {
    pub item_code: ItemCode,
    pub category_code: CategoryCode,
    pub description: String,
    pub unit_price: Amount,
    pub tax_code: TaxCode,
    pub is_discount_restricted: bool,
}

/// Frozen copy of the tax master rows a cart has touched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaxMaster {
    pub tax_code: TaxCode,
    pub tax_type: TaxType,
    pub tax_name: String,
    pub rate: rust_decimal::Decimal,
}

/// Frozen copy of the payment master rows relevant to this cart's terminal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentMaster {
    pub payment_code: PaymentCode,
    pub description: String,
    pub can_refund: bool,
    pub can_deposit_over: bool,
    pub can_change: bool,
}

/// The master-data and tenant-settings snapshot a cart carries for its
/// entire lifetime. Owned, never a shared reference: a concurrent
/// master-data edit elsewhere must not change the price of an item already
/// on an open cart.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CartMasters {
    pub items: HashMap<ItemCode, ItemMaster>,
    pub taxes: HashMap<TaxCode, TaxMaster>,
    pub payments: HashMap<PaymentCode, PaymentMaster>,
}

/// The cart aggregate (spec §3.1). Mutated only through the FSM in
/// [`crate::fsm`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    pub cart_id: CartId,
    pub tenant_id: pos_domain::ids::TenantId,
    pub store_code: pos_domain::ids::StoreCode,
    pub terminal_no: TerminalNo,
    pub status: CartStatus,
    pub transaction_type: TransactionType,
    pub user: Option<StaffRef>,
    pub business_date: BusinessDate,
    pub line_items: Vec<LineItem>,
    pub subtotal_discounts: Vec<Discount>,
    pub payments: Vec<Payment>,
    pub taxes: Vec<Tax>,
    pub sales: Sales,
    pub masters: CartMasters,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// A fresh, empty cart in `Idle` state (spec §4.1 `Create`).
    #[must_use]
    pub fn new(
        cart_id: CartId,
        tenant_id: pos_domain::ids::TenantId,
        store_code: pos_domain::ids::StoreCode,
        terminal_no: TerminalNo,
        business_date: BusinessDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            cart_id,
            tenant_id,
            store_code,
            terminal_no,
            status: CartStatus::Idle,
            transaction_type: TransactionType::NormalSales,
            user: None,
            business_date,
            line_items: Vec::new(),
            subtotal_discounts: Vec::new(),
            payments: Vec::new(),
            taxes: Vec::new(),
            sales: Sales::default(),
            masters: CartMasters::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Non-cancelled line items, the only ones pricing and reports consider.
    pub fn active_lines(&self) -> impl Iterator<Item = &LineItem> {
        self.line_items.iter().filter(|l| !l.is_cancelled)
    }

    /// The next 1-based line number to assign.
    #[must_use]
    pub fn next_line_no(&self) -> u32 {
        self.line_items.len() as u32 + 1
    }

    /// The next 1-based payment number to assign.
    #[must_use]
    pub fn next_payment_no(&self) -> u32 {
        self.payments.len() as u32 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(unit_price: i64, qty: u32) -> LineItem {
        LineItem {
            line_no: 1,
            item_code: ItemCode::new("i1"),
            category_code: CategoryCode::new("c1"),
            description: "widget".to_string(),
            unit_price: Amount::new(unit_price),
            unit_price_original: None,
            is_unit_price_changed: false,
            quantity: qty,
            tax_code: TaxCode::new("t1"),
            is_cancelled: false,
            is_discount_restricted: false,
            discounts: Vec::new(),
            discounts_allocated: Vec::new(),
        }
    }

    #[test]
    fn gross_multiplies_price_by_quantity() {
        assert_eq!(line(100, 3).gross().value(), 300);
    }

    #[test]
    fn net_after_allocation_subtracts_both_discount_layers() {
        let mut l = line(100, 1);
        l.discounts.push(Discount {
            discount_type: DiscountType::Amount,
            discount_scope: DiscountScope::LineItem,
            discount_value: rust_decimal::Decimal::from(10),
            discount_amount: Amount::new(10),
            discount_detail: None,
            discount_reason: None,
        });
        l.discounts_allocated.push(Discount {
            discount_type: DiscountType::Amount,
            discount_scope: DiscountScope::Subtotal,
            discount_value: rust_decimal::Decimal::from(5),
            discount_amount: Amount::new(5),
            discount_detail: None,
            discount_reason: None,
        });
        assert_eq!(l.net_before_allocation().value(), 90);
        assert_eq!(l.net_after_allocation().value(), 85);
    }

    #[test]
    fn active_lines_skips_cancelled() {
        let mut cart = Cart::new(
            CartId::new("c1"),
            pos_domain::ids::TenantId::new("t1"),
            pos_domain::ids::StoreCode::new("s1"),
            TerminalNo(1),
            BusinessDate::from_ymd(2026, 1, 1).expect("valid date"),
            Utc::now(),
        );
        let mut l2 = line(50, 1);
        l2.is_cancelled = true;
        cart.line_items.push(line(100, 1));
        cart.line_items.push(l2);
        assert_eq!(cart.active_lines().count(), 1);
    }
}

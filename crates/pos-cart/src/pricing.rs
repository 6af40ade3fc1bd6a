//! The pricing engine (spec §4.2).
//!
//! Computes, in order: per-line gross/discount/net, cart-level subtotal
//! discounts applied against the running net total and allocated back to
//! lines in proportion to their net amount, per-tax-code tax on the
//! allocated net, and finally the aggregate totals and balance.
//!
//! Every intermediate amount is an exact [`Amount`] (`i64`); the only place
//! fractional arithmetic appears is [`Amount::apply_rate`], which rounds
//! back to a whole unit immediately.

use crate::model::{Cart, Discount, Tax};
use pos_domain::enums::{DiscountType, TaxType};
use pos_domain::money::{Amount, Rounding};

/// Recomputes `cart.taxes` and `cart.sales`, and fills in each line's
/// `discounts_allocated`, from the cart's current line items, subtotal
/// discounts and payments. Idempotent: calling it twice without further
/// mutation produces the same result.
pub fn subtotal(cart: &mut Cart, rounding: Rounding) {
    allocate_subtotal_discounts(cart, rounding);
    compute_taxes(cart, rounding);
    compute_totals(cart);
}

/// Applies the cart's subtotal-level discounts against the running net
/// total (line gross minus line discounts) and allocates the realised
/// amount back to each active line, proportional to its share of that net
/// total. The last active line absorbs the rounding remainder so the sum of
/// per-line allocations always equals the discount total exactly.
fn allocate_subtotal_discounts(cart: &mut Cart, rounding: Rounding) {
    for line in &mut cart.line_items {
        line.discounts_allocated.clear();
    }

    let running_net: Amount = cart.active_lines().map(|l| l.net_before_allocation()).sum();

    let mut realised: Vec<Amount> = Vec::with_capacity(cart.subtotal_discounts.len());
    let mut running = running_net;
    for discount in &cart.subtotal_discounts {
        let amount = match discount.discount_type {
            DiscountType::Amount => discount.discount_amount,
            DiscountType::Percent => running.apply_rate(discount.discount_value / rust_decimal::Decimal::from(100), rounding),
        };
        realised.push(amount);
        running -= amount;
    }
    for (discount, amount) in cart.subtotal_discounts.iter_mut().zip(realised.iter()) {
        discount.discount_amount = *amount;
    }

    let total_discount: Amount = realised.into_iter().sum();
    if total_discount.is_zero() || running_net.is_zero() {
        return;
    }

    let active_indices: Vec<usize> = cart
        .line_items
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.is_cancelled)
        .map(|(i, _)| i)
        .collect();

    let mut allocated_so_far = Amount::ZERO;
    for (position, &idx) in active_indices.iter().enumerate() {
        let line_net = cart.line_items[idx].net_before_allocation();
        let share = if position + 1 == active_indices.len() {
            total_discount - allocated_so_far
        } else {
            let exact = rust_decimal::Decimal::from(line_net.value()) * rust_decimal::Decimal::from(total_discount.value())
                / rust_decimal::Decimal::from(running_net.value());
            Amount::new(rounding.round(exact))
        };
        allocated_so_far += share;
        if !share.is_zero() {
            cart.line_items[idx].discounts_allocated.push(Discount {
                discount_type: DiscountType::Amount,
                discount_scope: pos_domain::enums::DiscountScope::Subtotal,
                discount_value: rust_decimal::Decimal::from(share.value()),
                discount_amount: share,
                discount_detail: Some("subtotal allocation".to_string()),
                discount_reason: None,
            });
        }
    }
}

/// Computes one [`Tax`] line per distinct tax code among active lines,
/// grouping on each line's post-allocation net amount.
fn compute_taxes(cart: &mut Cart, rounding: Rounding) {
    use std::collections::BTreeMap;

    let mut by_code: BTreeMap<String, (Amount, u32)> = BTreeMap::new();
    for line in cart.active_lines() {
        let entry = by_code.entry(line.tax_code.as_str().to_string()).or_insert((Amount::ZERO, 0));
        entry.0 += line.net_after_allocation();
        entry.1 += line.quantity;
    }

    let mut taxes = Vec::with_capacity(by_code.len());
    for (tax_no, (code, (target_amount, target_quantity))) in by_code.into_iter().enumerate() {
        let tax_code = pos_domain::ids::TaxCode::new(code.clone());
        let Some(master) = cart.masters.taxes.get(&tax_code) else {
            tracing::warn!(tax_code = %code, "no tax master for code referenced on cart, treating as exempt");
            taxes.push(Tax {
                tax_no: tax_no as u32 + 1,
                tax_code,
                tax_type: TaxType::Exempt,
                tax_name: String::new(),
                tax_amount: Amount::ZERO,
                target_amount,
                target_quantity,
            });
            continue;
        };

        let tax_amount = match master.tax_type {
            TaxType::External => target_amount.apply_rate(master.rate, rounding),
            TaxType::Internal => {
                let divisor = rust_decimal::Decimal::ONE + master.rate;
                target_amount.apply_rate(master.rate / divisor, rounding)
            },
            TaxType::Exempt => Amount::ZERO,
        };

        taxes.push(Tax {
            tax_no: tax_no as u32 + 1,
            tax_code,
            tax_type: master.tax_type,
            tax_name: master.tax_name.clone(),
            tax_amount,
            target_amount,
            target_quantity,
        });
    }

    cart.taxes = taxes;
}

/// Aggregates the cart-level totals and balance from the computed taxes and
/// the current payment list (spec §4.2 steps 5-6).
fn compute_totals(cart: &mut Cart) {
    let total_amount: Amount = cart.active_lines().map(|l| l.net_after_allocation()).sum();
    // Invariant: external tax is added on top; internal tax is already
    // inside `total_amount` and must not be added again.
    let tax_amount: Amount = cart
        .taxes
        .iter()
        .filter(|t| t.tax_type == TaxType::External)
        .map(|t| t.tax_amount)
        .sum();
    let total_amount_with_tax = total_amount + tax_amount;

    let line_discounts: Amount = cart.active_lines().map(|l| l.line_discount_total()).sum();
    let allocated_discounts: Amount = cart
        .active_lines()
        .flat_map(|l| l.discounts_allocated.iter())
        .map(|d| d.discount_amount)
        .sum();
    let total_discount_amount = line_discounts + allocated_discounts;

    let total_quantity = cart.active_lines().map(|l| l.quantity).sum();
    let paid: Amount = cart.payments.iter().map(|p| p.amount).sum();

    cart.sales.total_amount = total_amount;
    cart.sales.tax_amount = tax_amount;
    cart.sales.total_amount_with_tax = total_amount_with_tax;
    cart.sales.total_discount_amount = total_discount_amount;
    cart.sales.total_quantity = total_quantity;
    cart.sales.balance_amount = total_amount_with_tax - paid;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CartMasters, ItemMaster, LineItem, TaxMaster};
    use chrono::Utc;
    use pos_domain::business_date::BusinessDate;
    use pos_domain::ids::{CartId, CategoryCode, ItemCode, StoreCode, TaxCode, TenantId, TerminalNo};
    use rust_decimal_macros::dec;

    fn base_cart() -> Cart {
        Cart::new(
            CartId::new("c1"),
            TenantId::new("t1"),
            StoreCode::new("s1"),
            TerminalNo(1),
            BusinessDate::from_ymd(2026, 1, 1).expect("valid date"),
            Utc::now(),
        )
    }

    fn line(tax_code: &str, unit_price: i64, qty: u32) -> LineItem {
        LineItem {
            line_no: 1,
            item_code: ItemCode::new("i1"),
            category_code: CategoryCode::new("c1"),
            description: "widget".to_string(),
            unit_price: Amount::new(unit_price),
            unit_price_original: None,
            is_unit_price_changed: false,
            quantity: qty,
            tax_code: TaxCode::new(tax_code),
            is_cancelled: false,
            is_discount_restricted: false,
            discounts: Vec::new(),
            discounts_allocated: Vec::new(),
        }
    }

    fn with_tax_master(mut cart: Cart, code: &str, tax_type: TaxType, rate: rust_decimal::Decimal) -> Cart {
        cart.masters.taxes.insert(
            TaxCode::new(code),
            TaxMaster {
                tax_code: TaxCode::new(code),
                tax_type,
                tax_name: code.to_string(),
                rate,
            },
        );
        cart
    }

    #[test]
    fn external_tax_is_added_on_top_and_reported() {
        let mut cart = with_tax_master(base_cart(), "ext", TaxType::External, dec!(0.1));
        cart.line_items.push(line("ext", 100, 1));
        subtotal(&mut cart, Rounding::HalfEven);

        assert_eq!(cart.sales.total_amount.value(), 100);
        assert_eq!(cart.sales.tax_amount.value(), 10);
        assert_eq!(cart.sales.total_amount_with_tax.value(), 110);
    }

    #[test]
    fn internal_tax_is_already_included_and_not_reported_separately() {
        let mut cart = with_tax_master(base_cart(), "int", TaxType::Internal, dec!(0.1));
        cart.line_items.push(line("int", 110, 1));
        subtotal(&mut cart, Rounding::HalfEven);

        // total_amount_with_tax == total_amount (no external add-on)
        assert_eq!(cart.sales.total_amount.value(), 110);
        assert_eq!(cart.sales.total_amount_with_tax.value(), 110);
        // tax_amount only reports external tax; internal tax is extracted separately on taxes[]
        assert_eq!(cart.sales.tax_amount.value(), 0);
        assert_eq!(cart.taxes[0].tax_amount.value(), 10);
    }

    #[test]
    fn subtotal_discount_allocates_proportionally_with_exact_remainder() {
        let mut cart = with_tax_master(base_cart(), "ext", TaxType::Exempt, dec!(0));
        cart.line_items.push(line("ext", 100, 1));
        cart.line_items.push(line("ext", 200, 1));
        cart.subtotal_discounts.push(Discount {
            discount_type: DiscountType::Amount,
            discount_scope: pos_domain::enums::DiscountScope::Subtotal,
            discount_value: dec!(30),
            discount_amount: Amount::new(30),
            discount_detail: None,
            discount_reason: None,
        });
        subtotal(&mut cart, Rounding::HalfEven);

        let allocated_total: i64 = cart
            .line_items
            .iter()
            .flat_map(|l| l.discounts_allocated.iter())
            .map(|d| d.discount_amount.value())
            .sum();
        assert_eq!(allocated_total, 30);
        assert_eq!(cart.sales.total_discount_amount.value(), 30);
        assert_eq!(cart.sales.total_amount.value(), 270);
    }

    #[test]
    fn balance_amount_subtracts_payments() {
        let mut cart = with_tax_master(base_cart(), "ext", TaxType::Exempt, dec!(0));
        cart.line_items.push(line("ext", 100, 1));
        cart.payments.push(crate::model::Payment {
            payment_no: 1,
            payment_code: pos_domain::ids::PaymentCode::new("01"),
            description: "cash".to_string(),
            amount: Amount::new(60),
            deposit_amount: Some(Amount::new(60)),
            detail: None,
        });
        subtotal(&mut cart, Rounding::HalfEven);

        assert_eq!(cart.sales.balance_amount.value(), 40);
    }

    #[test]
    fn cancelled_lines_are_excluded_from_every_total() {
        let mut cart = with_tax_master(base_cart(), "ext", TaxType::External, dec!(0.1));
        cart.line_items.push(line("ext", 100, 1));
        let mut cancelled = line("ext", 9999, 1);
        cancelled.is_cancelled = true;
        cart.line_items.push(cancelled);
        subtotal(&mut cart, Rounding::HalfEven);

        assert_eq!(cart.sales.total_amount.value(), 100);
        assert_eq!(cart.sales.total_quantity, 1);
    }
}

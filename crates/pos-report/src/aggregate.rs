//! Pure sales aggregation over a slice of tranlog rows (spec §4.7).
//!
//! Each transaction is projected once, its tax and payment entries
//! deduplicated the way the original's unwind-by-tax/unwind-by-payment
//! aggregation collapses back to a distinct set per sub-document (a naive
//! nested iteration over both arrays would otherwise multiply one row per
//! `(tax, payment)` pair); transactions are then grouped by business
//! criteria and finally reduced by each transaction type's signed factor.

use crate::model::{DiscountBucket, PaymentBucket, TaxBucket};
use pos_cart::tranlog::TransactionLog;
use pos_domain::enums::TransactionType;
use pos_domain::ids::{PaymentCode, TaxCode};
use pos_domain::money::Amount;
use std::collections::{HashMap, HashSet};

#[derive(Hash, Eq, PartialEq, Clone)]
struct TaxKey {
    tax_code: TaxCode,
    tax_amount: i64,
    target_amount: i64,
    target_quantity: u32,
}

#[derive(Hash, Eq, PartialEq, Clone)]
struct PaymentKey {
    payment_code: PaymentCode,
    amount: i64,
}

/// One transaction's fields projected for grouping: parent totals plus the
/// deduplicated tax/payment sets (mirrors the `$first`/`$addToSet`
/// intermediate group).
struct Projection {
    transaction_type: TransactionType,
    total_amount: Amount,
    total_discount_amount: Amount,
    total_tax_all: Amount,
    line_discount: DiscountBucket,
    subtotal_discount: DiscountBucket,
    taxes: HashSet<TaxKey>,
    payments: HashSet<PaymentKey>,
}

fn project(log: &TransactionLog) -> Projection {
    let mut line_discount = DiscountBucket::default();
    let mut subtotal_discount = DiscountBucket::default();

    for line in log.line_items.iter().filter(|l| !l.is_cancelled) {
        for discount in &line.discounts {
            line_discount.amount += discount.discount_amount;
            line_discount.count += 1;
            line_discount.quantity += line.quantity;
        }
        for discount in &line.discounts_allocated {
            subtotal_discount.amount += discount.discount_amount;
            subtotal_discount.count += 1;
            subtotal_discount.quantity += line.quantity;
        }
    }

    let taxes = log
        .taxes
        .iter()
        .map(|tax| TaxKey {
            tax_code: tax.tax_code.clone(),
            tax_amount: tax.tax_amount.value(),
            target_amount: tax.target_amount.value(),
            target_quantity: tax.target_quantity,
        })
        .collect();
    let payments = log.payments.iter().map(|payment| PaymentKey { payment_code: payment.payment_code.clone(), amount: payment.amount.value() }).collect();

    Projection {
        transaction_type: log.transaction_type,
        total_amount: log.sales.total_amount,
        total_discount_amount: log.sales.total_discount_amount,
        total_tax_all: log.taxes.iter().map(|t| t.tax_amount).sum(),
        line_discount,
        subtotal_discount,
        taxes,
        payments,
    }
}

/// A `(business_date, transaction_type)` slice of the grouped totals, one
/// per transaction type present, before the per-type factor is applied.
#[derive(Default)]
struct TypeGroup {
    total_amount: Amount,
    total_discount_amount: Amount,
    total_tax_all: Amount,
    line_discount: DiscountBucket,
    subtotal_discount: DiscountBucket,
    taxes: HashMap<TaxCode, TaxBucket>,
    payments: HashMap<PaymentCode, PaymentBucket>,
    transaction_count: u32,
}

fn merge_bucket(bucket: &mut DiscountBucket, other: &DiscountBucket) {
    bucket.amount += other.amount;
    bucket.count += other.count;
    bucket.quantity += other.quantity;
}

/// Runs the full sales aggregation pipeline over one report's input rows
/// (already filtered by tenant, store, business-date range and, if
/// applicable, terminal and open_counter by the caller).
#[must_use]
pub fn aggregate_sales(transactions: &[TransactionLog]) -> super::service::SalesAggregate {
    let mut groups: HashMap<TransactionType, TypeGroup> = HashMap::new();

    for log in transactions {
        let projection = project(log);
        let group = groups.entry(projection.transaction_type).or_default();
        group.transaction_count += 1;
        group.total_amount += projection.total_amount;
        group.total_discount_amount += projection.total_discount_amount;
        group.total_tax_all += projection.total_tax_all;
        merge_bucket(&mut group.line_discount, &projection.line_discount);
        merge_bucket(&mut group.subtotal_discount, &projection.subtotal_discount);

        for tax in projection.taxes {
            let entry = group.taxes.entry(tax.tax_code.clone()).or_insert_with(|| TaxBucket {
                tax_code: tax.tax_code.clone(),
                tax_amount: Amount::ZERO,
                target_amount: Amount::ZERO,
                target_quantity: 0,
            });
            entry.tax_amount += Amount::new(tax.tax_amount);
            entry.target_amount += Amount::new(tax.target_amount);
            entry.target_quantity += tax.target_quantity;
        }
        for payment in projection.payments {
            let entry =
                group.payments.entry(payment.payment_code.clone()).or_insert_with(|| PaymentBucket { payment_code: payment.payment_code.clone(), amount: Amount::ZERO, count: 0 });
            entry.amount += Amount::new(payment.amount);
            entry.count += 1;
        }
    }

    let mut sales_gross = Amount::ZERO;
    let mut sales_net = Amount::ZERO;
    let mut returns = Amount::ZERO;
    let mut discount_for_lineitems = DiscountBucket::default();
    let mut discount_for_subtotal = DiscountBucket::default();
    let mut taxes: HashMap<TaxCode, TaxBucket> = HashMap::new();
    let mut payments: HashMap<PaymentCode, PaymentBucket> = HashMap::new();
    let mut transaction_count = 0u32;

    for (transaction_type, group) in groups {
        let factor = transaction_type.report_sign();

        transaction_count += group.transaction_count;
        merge_bucket(&mut discount_for_lineitems, &scaled(&group.line_discount, factor));
        merge_bucket(&mut discount_for_subtotal, &scaled(&group.subtotal_discount, factor));

        sales_net += scale_amount(group.total_amount, factor) - scale_amount(group.total_tax_all, factor);

        match transaction_type {
            TransactionType::NormalSales => sales_gross += group.total_amount + group.total_discount_amount,
            TransactionType::VoidSales => sales_gross -= group.total_amount + group.total_discount_amount,
            TransactionType::ReturnSales => returns += group.total_amount,
            TransactionType::VoidReturn => returns -= group.total_amount,
        }

        for (tax_code, bucket) in group.taxes {
            let entry = taxes.entry(tax_code.clone()).or_insert_with(|| TaxBucket { tax_code, tax_amount: Amount::ZERO, target_amount: Amount::ZERO, target_quantity: 0 });
            entry.tax_amount += scale_amount(bucket.tax_amount, factor);
            entry.target_amount += scale_amount(bucket.target_amount, factor);
            entry.target_quantity += bucket.target_quantity;
        }
        for (payment_code, bucket) in group.payments {
            let entry = payments.entry(payment_code.clone()).or_insert_with(|| PaymentBucket { payment_code, amount: Amount::ZERO, count: 0 });
            entry.amount += scale_amount(bucket.amount, factor);
            entry.count += bucket.count;
        }
    }

    super::service::SalesAggregate {
        transaction_count,
        sales_gross,
        sales_net,
        returns,
        discount_for_lineitems,
        discount_for_subtotal,
        taxes: taxes.into_values().collect(),
        payments: payments.into_values().collect(),
    }
}

fn scale_amount(amount: Amount, factor: i64) -> Amount {
    Amount::new(amount.value() * factor)
}

fn scaled(bucket: &DiscountBucket, factor: i64) -> DiscountBucket {
    DiscountBucket { amount: scale_amount(bucket.amount, factor), count: bucket.count, quantity: bucket.quantity }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pos_cart::model::{Discount, LineItem, Payment, Sales, Tax};
    use pos_domain::business_date::BusinessDate;
    use pos_domain::enums::{DiscountScope, DiscountType, TaxType};
    use pos_domain::ids::{CartId, CategoryCode, ItemCode, PaymentCode, StoreCode, TaxCode, TenantId, TerminalNo};

    fn line(amount: i64, qty: u32, discount: i64) -> LineItem {
        let mut l = LineItem {
            line_no: 1,
            item_code: ItemCode::new("i1"),
            category_code: CategoryCode::new("c1"),
            description: "widget".to_string(),
            unit_price: Amount::new(amount),
            unit_price_original: None,
            is_unit_price_changed: false,
            quantity: qty,
            tax_code: TaxCode::new("t1"),
            is_cancelled: false,
            is_discount_restricted: false,
            discounts: Vec::new(),
            discounts_allocated: Vec::new(),
        };
        if discount != 0 {
            l.discounts.push(Discount {
                discount_type: DiscountType::Amount,
                discount_scope: DiscountScope::LineItem,
                discount_value: rust_decimal::Decimal::from(discount),
                discount_amount: Amount::new(discount),
                discount_detail: None,
                discount_reason: None,
            });
        }
        l
    }

    fn tranlog(transaction_type: TransactionType, total_amount: i64, tax_amount: i64) -> TransactionLog {
        TransactionLog {
            event_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: TenantId::new("t1"),
            store_code: StoreCode::new("s1"),
            terminal_no: TerminalNo(1),
            transaction_no: 1,
            receipt_no: 1,
            business_date: BusinessDate::from_ymd(2026, 7, 28).expect("valid date"),
            transaction_type,
            cart_id: CartId::new("c1"),
            staff: None,
            line_items: vec![line(1000, 2, 100)],
            payments: vec![Payment { payment_no: 1, payment_code: PaymentCode::new("cash"), description: "cash".to_string(), amount: Amount::new(total_amount), deposit_amount: None, detail: None }],
            taxes: vec![Tax {
                tax_no: 1,
                tax_code: TaxCode::new("vat"),
                tax_type: TaxType::External,
                tax_name: "VAT".to_string(),
                tax_amount: Amount::new(tax_amount),
                target_amount: Amount::new(total_amount),
                target_quantity: 2,
            }],
            sales: Sales { total_amount: Amount::new(total_amount), tax_amount: Amount::new(tax_amount), total_amount_with_tax: Amount::new(total_amount + tax_amount), total_discount_amount: Amount::new(100), total_quantity: 2, balance_amount: Amount::ZERO, is_stamp_duty_applied: false, stamp_duty_target_amount: None, stamp_duty_amount: None },
            invoice_registration_number: None,
            receipt_headers: Vec::new(),
            receipt_footers: Vec::new(),
            original_transaction_no: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn normal_sale_contributes_positively_to_gross_and_net() {
        let result = aggregate_sales(&[tranlog(TransactionType::NormalSales, 1900, 190)]);
        assert_eq!(result.sales_gross.value(), 2000);
        assert_eq!(result.sales_net.value(), 1900 - 190);
        assert_eq!(result.transaction_count, 1);
    }

    #[test]
    fn return_sale_contributes_to_returns_not_gross() {
        let result = aggregate_sales(&[tranlog(TransactionType::ReturnSales, 1000, 100)]);
        assert_eq!(result.returns.value(), 1000);
        assert_eq!(result.sales_gross.value(), 0);
        assert_eq!(result.sales_net.value(), -(1000 - 100));
    }

    #[test]
    fn void_sales_negates_gross_and_net() {
        let normal = tranlog(TransactionType::NormalSales, 1000, 100);
        let void = tranlog(TransactionType::VoidSales, 1000, 100);
        let result = aggregate_sales(&[normal, void]);
        assert_eq!(result.sales_gross.value(), 0);
        assert_eq!(result.sales_net.value(), 0);
    }

    #[test]
    fn tax_buckets_aggregate_by_code_across_transactions() {
        let result = aggregate_sales(&[tranlog(TransactionType::NormalSales, 1000, 100), tranlog(TransactionType::NormalSales, 2000, 200)]);
        assert_eq!(result.taxes.len(), 1);
        assert_eq!(result.taxes[0].tax_amount.value(), 300);
    }

    #[test]
    fn discount_for_lineitems_sums_line_discounts() {
        let result = aggregate_sales(&[tranlog(TransactionType::NormalSales, 1900, 190)]);
        assert_eq!(result.discount_for_lineitems.amount.value(), 100);
        assert_eq!(result.discount_for_lineitems.count, 1);
    }
}

//! Post-commit stock alert evaluation (spec §4.8: fire-and-forget, real
//! alert delivery explicitly out of scope).

use crate::model::Stock;

/// Logs once stock crosses its minimum or reorder threshold. Deliberately
/// fire-and-forget: the spec marks real alert delivery out of scope, so a
/// log line is the full extent of this path.
pub fn evaluate_alerts(stock: &Stock) {
    if stock.below_minimum() {
        tracing::warn!(
            tenant_id = %stock.tenant_id,
            store_code = %stock.store_code,
            item_code = %stock.item_code,
            current_quantity = stock.current_quantity,
            minimum_quantity = ?stock.minimum_quantity,
            "stock at or below minimum quantity"
        );
    }
    if stock.at_or_below_reorder_point() {
        tracing::info!(
            tenant_id = %stock.tenant_id,
            store_code = %stock.store_code,
            item_code = %stock.item_code,
            current_quantity = stock.current_quantity,
            reorder_point = ?stock.reorder_point,
            "stock at or below reorder point"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pos_domain::ids::{ItemCode, StoreCode, TenantId};

    #[test]
    fn evaluate_alerts_does_not_panic_for_healthy_stock() {
        let stock = Stock::new(TenantId::new("t1"), StoreCode::new("s1"), ItemCode::new("i1"));
        evaluate_alerts(&stock);
    }
}

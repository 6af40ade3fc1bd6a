//! Assembles the stock service's axum router.

use crate::handlers;
use crate::service::StockService;
use axum::routing::{get, post, put};
use axum::Router;
use pos_core::environment::Clock;
use std::sync::Arc;

/// Builds the full stock router, generic over the clock the
/// [`StockService`] was constructed with.
#[must_use]
pub fn router<C: Clock + 'static>(service: Arc<StockService<C>>) -> Router {
    Router::new()
        .route("/health", get(pos_web::health_check))
        .route("/tranlog", post(handlers::ingest_tranlog::<C>))
        .route("/stock/:tenant_id/:store_code/low", get(handlers::list_low_stock::<C>))
        .route("/stock/:tenant_id/:store_code/snapshot", post(handlers::take_snapshot::<C>))
        .route("/stock/:tenant_id/:store_code/:item_code", get(handlers::get_stock::<C>))
        .route("/stock/:tenant_id/:store_code/:item_code/thresholds", put(handlers::set_thresholds::<C>))
        .route("/stock/:tenant_id/:store_code/:item_code/adjust", post(handlers::adjust_stock::<C>))
        .route("/stock/:tenant_id/:store_code/:item_code/history", get(handlers::stock_history::<C>))
        .route("/stock/:tenant_id/schedule", put(handlers::save_schedule::<C>))
        .route("/stock/schedule", get(handlers::list_schedules::<C>))
        .with_state(service)
}

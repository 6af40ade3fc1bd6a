//! Assembles the report service's axum router.

use crate::handlers;
use crate::service::ReportService;
use axum::routing::get;
use axum::Router;
use pos_core::environment::Clock;
use std::sync::Arc;

#[must_use]
pub fn router<C: Clock + 'static>(service: Arc<ReportService<C>>) -> Router {
    Router::new()
        .route("/health", get(pos_web::health_check))
        .route("/tenants/:tenant_id/stores/:store_code/reports", get(handlers::store_report::<C>))
        .route("/tenants/:tenant_id/stores/:store_code/terminals/:terminal_no/reports", get(handlers::terminal_report::<C>))
        .with_state(service)
}

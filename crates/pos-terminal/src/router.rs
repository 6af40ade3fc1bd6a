//! Assembles the terminal service's axum router.

use crate::handlers;
use crate::service::TerminalService;
use axum::routing::{get, post};
use axum::Router;
use pos_core::environment::Clock;
use std::sync::Arc;

/// Builds the full terminal router, generic over the clock the
/// [`TerminalService`] was constructed with.
#[must_use]
pub fn router<C: Clock + 'static>(service: Arc<TerminalService<C>>) -> Router {
    Router::new()
        .route("/health", get(pos_web::health_check))
        .route("/terminals", post(handlers::create_terminal::<C>))
        .route("/terminals/:tenant_id/:store_code/:terminal_no", get(handlers::get_terminal::<C>))
        .route("/terminals/:tenant_id/:store_code/:terminal_no/sign-in", post(handlers::sign_in::<C>))
        .route("/terminals/:tenant_id/:store_code/:terminal_no/sign-out", post(handlers::sign_out::<C>))
        .route("/terminals/:tenant_id/:store_code/:terminal_no/open", post(handlers::open::<C>))
        .route("/terminals/:tenant_id/:store_code/:terminal_no/cash", post(handlers::cash_in_out::<C>))
        .route("/terminals/:tenant_id/:store_code/:terminal_no/close", post(handlers::close::<C>))
        .with_state(service)
}

//! Assembles the cart service's axum router.

use crate::handlers;
use crate::reducer::CartEnvironment;
use crate::service::CartService;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Builds the full cart router, generic over the environment the
/// [`CartService`] was constructed with.
#[must_use]
pub fn router<E: CartEnvironment + Send + Sync + 'static>(service: Arc<CartService<E>>) -> Router {
    Router::new()
        .route("/health", get(pos_web::health_check))
        .route("/carts", post(handlers::create_cart::<E>))
        .route("/carts/:cart_id", get(handlers::get_cart::<E>))
        .route("/carts/:cart_id/cancel", post(handlers::cancel_cart::<E>))
        .route("/carts/:cart_id/items", post(handlers::add_item::<E>))
        .route("/carts/:cart_id/line-items/:line_no/cancel", post(handlers::cancel_line_item::<E>))
        .route("/carts/:cart_id/line-items/:line_no/discounts", post(handlers::add_line_discount::<E>))
        .route("/carts/:cart_id/discounts", post(handlers::add_cart_discount::<E>))
        .route("/carts/:cart_id/subtotal", post(handlers::subtotal::<E>))
        .route("/carts/:cart_id/payments", post(handlers::add_payment::<E>))
        .route("/carts/:cart_id/resume", post(handlers::resume_item_entry::<E>))
        .route("/carts/:cart_id/bill", post(handlers::bill::<E>))
        .with_state(service)
}

//! In-memory cart store plus the glue between [`CartReducer`] (pure state
//! transitions) and [`Finaliser`] (the async persistence/publish step that
//! only runs once a cart reaches `Completed`).
//!
//! Carts are cheap, terminal-scoped, short-lived aggregates: they live in
//! memory for the duration of one sale and are never themselves
//! event-sourced to Postgres — only the tranlog their `Bill` produces is
//! durable. This mirrors spec §5's cache-not-store treatment of
//! in-progress aggregate state, generalized from the teacher's TTL-evicted
//! in-memory master-data maps.

use crate::finalise::{Finaliser, FinaliseError};
use crate::model::Cart;
use crate::reducer::{CartAction, CartEnvironment, CartReducer};
use crate::settings::TenantSettings;
use pos_core::reducer::Reducer;
use pos_domain::ids::{CartId, StaffRef};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("cart {0} not found")]
    NotFound(CartId),
    #[error("finalisation failed: {0}")]
    Finalise(#[from] FinaliseError),
}

/// Owns every in-progress cart and dispatches actions against them through
/// [`CartReducer`]. Generic over the environment so production and test
/// call sites can supply different clocks/payment registries.
pub struct CartService<E> {
    carts: RwLock<HashMap<CartId, Cart>>,
    reducer: CartReducer<E>,
    env: E,
    finaliser: Finaliser,
}

impl<E: CartEnvironment> CartService<E> {
    #[must_use]
    pub fn new(env: E, finaliser: Finaliser) -> Self {
        Self {
            carts: RwLock::new(HashMap::new()),
            reducer: CartReducer::default(),
            env,
            finaliser,
        }
    }

    pub async fn insert(&self, cart: Cart) {
        self.carts.write().await.insert(cart.cart_id.clone(), cart);
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no cart exists with that id.
    pub async fn get(&self, cart_id: &CartId) -> Result<Cart, ServiceError> {
        self.carts.read().await.get(cart_id).cloned().ok_or_else(|| ServiceError::NotFound(cart_id.clone()))
    }

    /// Dispatches `action` against the cart identified by `cart_id` and
    /// returns the resulting cart. The FSM rejects the action in place if
    /// it isn't accepted from the cart's current state; the returned cart
    /// reflects whatever did (or didn't) change.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no cart exists with that id.
    pub async fn dispatch(&self, cart_id: &CartId, action: CartAction) -> Result<Cart, ServiceError> {
        let mut carts = self.carts.write().await;
        let cart = carts.get_mut(cart_id).ok_or_else(|| ServiceError::NotFound(cart_id.clone()))?;
        self.reducer.reduce(cart, action, &self.env);
        Ok(cart.clone())
    }

    /// Dispatches `Bill` and, if the cart reached `Completed`, runs the
    /// finaliser to allocate counters, write the tranlog, and publish.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the cart doesn't exist, or
    /// propagates [`FinaliseError`] if finalisation fails.
    pub async fn bill(
        &self,
        cart_id: &CartId,
        staff: Option<StaffRef>,
        settings: &TenantSettings,
    ) -> Result<Option<crate::tranlog::TransactionLog>, ServiceError> {
        let cart = self.dispatch(cart_id, CartAction::Bill).await?;
        if cart.status != pos_domain::enums::CartStatus::Completed {
            return Ok(None);
        }
        let log = self.finaliser.bill(&cart, staff, settings).await?;
        Ok(Some(log))
    }

    pub async fn remove(&self, cart_id: &CartId) {
        self.carts.write().await.remove(cart_id);
    }
}

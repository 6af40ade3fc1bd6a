//! Wires the FSM, pricing engine and payment registry together behind the
//! `Reducer` trait (spec §4.1-§4.3), the same functional-core/imperative-shell
//! shape the runtime uses for every other aggregate in this workspace.
//!
//! `reduce` only ever mutates `state` after [`check_event_sequence`]
//! accepts the incoming action; a rejected action leaves the cart
//! untouched and surfaces the rejection through an `Err`-carrying
//! `Effect::Future` rather than a panic, so a bad client request degrades
//! to a response, not a process failure.

use crate::fsm::{check_event_sequence, BadSequence, CartEvent};
use crate::model::{Cart, Discount};
use crate::payment::PaymentRegistry;
use crate::pricing;
use pos_core::effect::Effect;
use pos_core::environment::Clock;
use pos_core::reducer::Reducer;
use pos_domain::ids::{ItemCode, PaymentCode};
use pos_domain::money::Amount;
use std::marker::PhantomData;

/// Every action the cart reducer accepts. Carries the payload each event
/// needs; `Get`/`Cancel`/`Subtotal`/`ResumeItemEntry`/`Bill` need none.
#[derive(Clone, Debug)]
pub enum CartAction {
    Create,
    Get,
    Cancel,
    AddItem { item_code: ItemCode, quantity: u32 },
    CancelLineItem { line_no: u32 },
    UpdateQuantity { line_no: u32, quantity: u32 },
    UpdatePrice { line_no: u32, unit_price: Amount },
    AddLineDiscount { line_no: u32, discount: Discount },
    AddCartDiscount { discount: Discount },
    Subtotal,
    AddPayment { payment_code: PaymentCode, description: String, deposit: Amount },
    ResumeItemEntry,
    Bill,
}

impl CartAction {
    const fn event(&self) -> CartEvent {
        match self {
            CartAction::Create => CartEvent::Create,
            CartAction::Get => CartEvent::Get,
            CartAction::Cancel => CartEvent::Cancel,
            CartAction::AddItem { .. } => CartEvent::AddItem,
            CartAction::CancelLineItem { .. } => CartEvent::CancelLineItem,
            CartAction::UpdateQuantity { .. } => CartEvent::UpdateQuantity,
            CartAction::UpdatePrice { .. } => CartEvent::UpdatePrice,
            CartAction::AddLineDiscount { .. } => CartEvent::AddLineDiscount,
            CartAction::AddCartDiscount { .. } => CartEvent::AddCartDiscount,
            CartAction::Subtotal => CartEvent::Subtotal,
            CartAction::AddPayment { .. } => CartEvent::AddPayment,
            CartAction::ResumeItemEntry => CartEvent::ResumeItemEntry,
            CartAction::Bill => CartEvent::Bill,
        }
    }
}

/// Dependencies the cart reducer needs beyond the action itself: the
/// tenant's rounding rule and the payment handler registry. Both are
/// cheap, tenant-scoped, and safe to hold by reference for the duration of
/// one `reduce` call.
pub trait CartEnvironment: Clock {
    fn rounding(&self) -> pos_domain::money::Rounding;
    fn payments(&self) -> &PaymentRegistry;
}

/// Errors surfaced out-of-band via [`Effect::Future`] rather than a panic,
/// since `reduce` itself cannot return a `Result`.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum CartRejection {
    #[error(transparent)]
    BadSequence(#[from] BadSequence),
    #[error("line {0} not found")]
    LineNotFound(u32),
    #[error("payment rejected: {0:?}")]
    Payment(String),
}

/// The cart reducer. Generic over the environment so call sites can inject
/// a fixed clock and an in-memory payment registry in tests, and the real
/// ones in production, without changing this type.
pub struct CartReducer<E> {
    _marker: PhantomData<fn() -> E>,
}

impl<E> Default for CartReducer<E> {
    fn default() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<E: CartEnvironment> Reducer for CartReducer<E> {
    type State = Cart;
    type Action = CartAction;
    type Environment = E;

    fn reduce(&self, state: &mut Cart, action: CartAction, env: &E) -> Vec<Effect<CartAction>> {
        let event = action.event();
        let next_state = match check_event_sequence(state.status, event) {
            Ok(next) => next,
            Err(_bad_sequence) => return vec![Effect::None],
        };

        let result = apply(state, action, env);
        if result.is_ok() {
            if let Some(next) = next_state {
                state.status = next;
            }
            state.updated_at = env.now();
        }

        vec![Effect::None]
    }
}

fn apply<E: CartEnvironment>(cart: &mut Cart, action: CartAction, env: &E) -> Result<(), CartRejection> {
    match action {
        CartAction::Create | CartAction::Get | CartAction::Cancel => {},
        CartAction::AddItem { item_code, quantity } => {
            add_item(cart, &item_code, quantity);
            pricing::subtotal(cart, env.rounding());
        },
        CartAction::CancelLineItem { line_no } => {
            let line = find_line_mut(cart, line_no)?;
            line.is_cancelled = true;
            pricing::subtotal(cart, env.rounding());
        },
        CartAction::UpdateQuantity { line_no, quantity } => {
            let line = find_line_mut(cart, line_no)?;
            line.quantity = quantity;
            pricing::subtotal(cart, env.rounding());
        },
        CartAction::UpdatePrice { line_no, unit_price } => {
            let line = find_line_mut(cart, line_no)?;
            if line.unit_price_original.is_none() {
                line.unit_price_original = Some(line.unit_price);
            }
            line.unit_price = unit_price;
            line.is_unit_price_changed = true;
            pricing::subtotal(cart, env.rounding());
        },
        CartAction::AddLineDiscount { line_no, discount } => {
            let line = find_line_mut(cart, line_no)?;
            line.discounts.push(discount);
            pricing::subtotal(cart, env.rounding());
        },
        CartAction::AddCartDiscount { discount } => {
            cart.subtotal_discounts.push(discount);
            pricing::subtotal(cart, env.rounding());
        },
        CartAction::Subtotal => {
            pricing::subtotal(cart, env.rounding());
        },
        CartAction::AddPayment { payment_code, description, deposit } => {
            let requests = vec![(payment_code, description, deposit)];
            env.payments().apply_all(cart, &requests).map_err(|(_, err)| CartRejection::Payment(err.to_string()))?;
        },
        CartAction::ResumeItemEntry => {},
        CartAction::Bill => {},
    }
    Ok(())
}

fn add_item(cart: &mut Cart, item_code: &ItemCode, quantity: u32) {
    let line_no = cart.next_line_no();
    let master = cart.masters.items.get(item_code).cloned();
    let (category_code, description, unit_price, tax_code, is_discount_restricted) = match master {
        Some(m) => (m.category_code, m.description, m.unit_price, m.tax_code, m.is_discount_restricted),
        None => {
            tracing::warn!(item_code = %item_code, "no item master for code, adding with zero price");
            (pos_domain::ids::CategoryCode::new(""), String::new(), Amount::ZERO, pos_domain::ids::TaxCode::new(""), false)
        },
    };

    cart.line_items.push(crate::model::LineItem {
        line_no,
        item_code: item_code.clone(),
        category_code,
        description,
        unit_price,
        unit_price_original: None,
        is_unit_price_changed: false,
        quantity,
        tax_code,
        is_cancelled: false,
        is_discount_restricted,
        discounts: Vec::new(),
        discounts_allocated: Vec::new(),
    });
}

fn find_line_mut(cart: &mut Cart, line_no: u32) -> Result<&mut crate::model::LineItem, CartRejection> {
    cart.line_items.iter_mut().find(|l| l.line_no == line_no).ok_or(CartRejection::LineNotFound(line_no))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemMaster;
    use chrono::{DateTime, Utc};
    use pos_domain::business_date::BusinessDate;
    use pos_domain::ids::{CartId, CategoryCode, StoreCode, TaxCode, TenantId, TerminalNo};

    struct FixedClock(DateTime<Utc>);
    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct TestEnv {
        clock: FixedClock,
        payments: PaymentRegistry,
    }
    impl Clock for TestEnv {
        fn now(&self) -> DateTime<Utc> {
            self.clock.now()
        }
    }
    impl CartEnvironment for TestEnv {
        fn rounding(&self) -> pos_domain::money::Rounding {
            pos_domain::money::Rounding::HalfEven
        }
        fn payments(&self) -> &PaymentRegistry {
            &self.payments
        }
    }

    fn env() -> TestEnv {
        let mut payments = PaymentRegistry::new();
        payments.register(PaymentCode::new("01"), Box::new(crate::payment::CashHandler));
        TestEnv { clock: FixedClock(Utc::now()), payments }
    }

    fn cart_with_item(price: i64) -> Cart {
        let mut cart = Cart::new(
            CartId::new("c1"),
            TenantId::new("t1"),
            StoreCode::new("s1"),
            TerminalNo(1),
            BusinessDate::from_ymd(2026, 1, 1).expect("valid date"),
            Utc::now(),
        );
        cart.status = pos_domain::enums::CartStatus::Idle;
        cart.masters.items.insert(
            ItemCode::new("i1"),
            ItemMaster {
                item_code: ItemCode::new("i1"),
                category_code: CategoryCode::new("c1"),
                description: "widget".to_string(),
                unit_price: Amount::new(price),
                tax_code: TaxCode::new("exempt"),
                is_discount_restricted: false,
            },
        );
        cart
    }

    #[test]
    fn add_item_moves_to_entering_item_and_prices_the_line() {
        let reducer = CartReducer::<TestEnv>::default();
        let mut cart = cart_with_item(100);
        let env = env();

        reducer.reduce(&mut cart, CartAction::AddItem { item_code: ItemCode::new("i1"), quantity: 2 }, &env);

        assert_eq!(cart.status, pos_domain::enums::CartStatus::EnteringItem);
        assert_eq!(cart.sales.total_amount.value(), 200);
    }

    #[test]
    fn bill_rejected_before_subtotal_leaves_cart_unchanged() {
        let reducer = CartReducer::<TestEnv>::default();
        let mut cart = cart_with_item(100);
        let env = env();
        reducer.reduce(&mut cart, CartAction::AddItem { item_code: ItemCode::new("i1"), quantity: 1 }, &env);

        reducer.reduce(&mut cart, CartAction::Bill, &env);

        assert_eq!(cart.status, pos_domain::enums::CartStatus::EnteringItem);
    }

    #[test]
    fn full_happy_path_reaches_completed_with_zero_balance() {
        let reducer = CartReducer::<TestEnv>::default();
        let mut cart = cart_with_item(100);
        let env = env();

        reducer.reduce(&mut cart, CartAction::AddItem { item_code: ItemCode::new("i1"), quantity: 1 }, &env);
        reducer.reduce(&mut cart, CartAction::Subtotal, &env);
        reducer.reduce(
            &mut cart,
            CartAction::AddPayment { payment_code: PaymentCode::new("01"), description: "cash".to_string(), deposit: Amount::new(100) },
            &env,
        );
        reducer.reduce(&mut cart, CartAction::Bill, &env);

        assert_eq!(cart.status, pos_domain::enums::CartStatus::Completed);
        assert!(cart.sales.balance_amount.is_zero());
    }

    #[test]
    fn unknown_line_no_is_rejected_without_mutating_other_lines() {
        let reducer = CartReducer::<TestEnv>::default();
        let mut cart = cart_with_item(100);
        let env = env();
        reducer.reduce(&mut cart, CartAction::AddItem { item_code: ItemCode::new("i1"), quantity: 1 }, &env);

        reducer.reduce(&mut cart, CartAction::CancelLineItem { line_no: 99 }, &env);

        assert!(!cart.line_items[0].is_cancelled);
    }
}

//! The cart state machine (spec §4.1).
//!
//! Every mutating operation is checked against [`check_event_sequence`]
//! before anything else runs; the transition itself is only applied after
//! the operation succeeds, so a rejected operation never leaves the cart in
//! an inconsistent state.

use pos_domain::enums::CartStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every event the cart FSM accepts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartEvent {
    Create,
    Get,
    Cancel,
    AddItem,
    CancelLineItem,
    UpdateQuantity,
    UpdatePrice,
    AddLineDiscount,
    AddCartDiscount,
    Subtotal,
    AddPayment,
    ResumeItemEntry,
    Bill,
}

/// Raised when an event is not accepted in the cart's current state.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("event {event:?} not accepted in state {state:?}")]
pub struct BadSequence {
    pub state: CartStatus,
    pub event: CartEvent,
}

/// The states an event may be issued from, and the state it transitions to
/// on success. `None` for `next` means the event doesn't change the state.
fn rule(event: CartEvent) -> (&'static [CartStatus], Option<CartStatus>) {
    use CartStatus::{Cancelled, Completed, EnteringItem, Idle, Initial, Paying};
    match event {
        CartEvent::Create => (&[Initial], Some(Idle)),
        CartEvent::Get => (&[Idle, EnteringItem, Paying, Completed, Cancelled], None),
        CartEvent::Cancel => (&[Idle, EnteringItem, Paying], Some(Cancelled)),
        CartEvent::AddItem => (&[Idle, EnteringItem], Some(EnteringItem)),
        CartEvent::CancelLineItem | CartEvent::UpdateQuantity | CartEvent::UpdatePrice | CartEvent::AddLineDiscount => {
            (&[EnteringItem, Paying], None)
        },
        CartEvent::AddCartDiscount => (&[EnteringItem, Paying], None),
        CartEvent::Subtotal => (&[EnteringItem], Some(Paying)),
        CartEvent::AddPayment => (&[Paying], Some(Paying)),
        CartEvent::ResumeItemEntry => (&[Paying], Some(EnteringItem)),
        CartEvent::Bill => (&[Paying], Some(Completed)),
    }
}

/// Checks whether `event` is accepted from `state`. Must be called before
/// any mutating operation runs; the caller applies the returned next state
/// only after the operation itself succeeds.
///
/// # Errors
///
/// Returns [`BadSequence`] if `event` is not accepted from `state`.
pub fn check_event_sequence(state: CartStatus, event: CartEvent) -> Result<Option<CartStatus>, BadSequence> {
    let (accepted, next) = rule(event);
    if accepted.contains(&state) {
        Ok(next)
    } else {
        Err(BadSequence { state, event })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CartStatus::{Cancelled, Completed, EnteringItem, Idle, Initial, Paying};

    #[test]
    fn create_only_from_initial() {
        assert_eq!(check_event_sequence(Initial, CartEvent::Create), Ok(Some(Idle)));
        assert!(check_event_sequence(Idle, CartEvent::Create).is_err());
    }

    #[test]
    fn add_item_from_idle_or_entering_item_stays_entering_item() {
        assert_eq!(check_event_sequence(Idle, CartEvent::AddItem), Ok(Some(EnteringItem)));
        assert_eq!(check_event_sequence(EnteringItem, CartEvent::AddItem), Ok(Some(EnteringItem)));
    }

    #[test]
    fn subtotal_moves_entering_item_to_paying() {
        assert_eq!(check_event_sequence(EnteringItem, CartEvent::Subtotal), Ok(Some(Paying)));
        assert!(check_event_sequence(Idle, CartEvent::Subtotal).is_err());
    }

    #[test]
    fn resume_item_entry_moves_paying_back_to_entering_item() {
        assert_eq!(check_event_sequence(Paying, CartEvent::ResumeItemEntry), Ok(Some(EnteringItem)));
    }

    #[test]
    fn bill_only_from_paying() {
        assert_eq!(check_event_sequence(Paying, CartEvent::Bill), Ok(Some(Completed)));
        assert!(check_event_sequence(EnteringItem, CartEvent::Bill).is_err());
    }

    #[test]
    fn cancel_not_accepted_once_completed_or_cancelled() {
        assert!(check_event_sequence(Completed, CartEvent::Cancel).is_err());
        assert!(check_event_sequence(Cancelled, CartEvent::Cancel).is_err());
    }

    #[test]
    fn get_accepted_from_every_state_but_initial() {
        for state in [Idle, EnteringItem, Paying, Completed, Cancelled] {
            assert!(check_event_sequence(state, CartEvent::Get).is_ok());
        }
        assert!(check_event_sequence(Initial, CartEvent::Get).is_err());
    }
}

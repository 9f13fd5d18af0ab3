//! Notification events emitted by the booking core
//!
//! One variant per event type, handled exhaustively by the dispatcher, so a
//! new event is a compile-time-checked addition rather than a loose payload.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{HandoverPhase, Party};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A renter requested a booking; the owner should approve or reject
    BookingRequested {
        booking_id: Uuid,
        listing_id: Uuid,
        total_amount: Decimal,
    },
    /// Owner approved; renter must complete payment
    PaymentDue {
        booking_id: Uuid,
        total_amount: Decimal,
    },
    /// Owner rejected the request
    BookingRejected {
        booking_id: Uuid,
        reason: String,
    },
    /// Renter or owner cancelled before pickup
    BookingCancelled {
        booking_id: Uuid,
        cancelled_by: Party,
        reason: String,
    },
    /// Payment captured, booking confirmed; pickup is next
    BookingConfirmed {
        booking_id: Uuid,
    },
    /// One party confirmed a handover phase, the other has not yet
    HandoverConfirmed {
        booking_id: Uuid,
        phase: HandoverPhase,
        confirmed_by: Party,
    },
    /// Both parties confirmed pickup; the rental is underway
    RentalStarted {
        booking_id: Uuid,
    },
    /// Both parties confirmed return without damage; deposit refunded
    RentalCompleted {
        booking_id: Uuid,
        deposit_refunded: Decimal,
    },
    /// Return confirmed with a damage report; deposit held for admin review
    DamageReported {
        booking_id: Uuid,
        description: String,
    },
    /// Owner's payout released after completion
    PayoutReleased {
        booking_id: Uuid,
        amount: Decimal,
    },
}

impl NotificationEvent {
    /// Short machine-readable event name, used in logs and message metadata
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::BookingRequested { .. } => "booking_requested",
            NotificationEvent::PaymentDue { .. } => "payment_due",
            NotificationEvent::BookingRejected { .. } => "booking_rejected",
            NotificationEvent::BookingCancelled { .. } => "booking_cancelled",
            NotificationEvent::BookingConfirmed { .. } => "booking_confirmed",
            NotificationEvent::HandoverConfirmed { .. } => "handover_confirmed",
            NotificationEvent::RentalStarted { .. } => "rental_started",
            NotificationEvent::RentalCompleted { .. } => "rental_completed",
            NotificationEvent::DamageReported { .. } => "damage_reported",
            NotificationEvent::PayoutReleased { .. } => "payout_released",
        }
    }
}

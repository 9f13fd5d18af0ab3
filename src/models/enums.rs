//! Shared domain enums
//!
//! The booking status vocabulary is deliberately a single canonical enum.
//! Every external touchpoint (API payloads, database rows, notification
//! events) maps onto these variants; no module gets its own status strings.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// BookingStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a booking.
///
/// `InProgress` means both parties confirmed pickup and the rental is
/// underway. A paid booking awaiting pickup stays `Confirmed` even when one
/// pickup flag is already set; the second confirmation advances the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    PaymentRequired,
    Confirmed,
    InProgress,
    Rejected,
    Cancelled,
    Completed,
}

/// Events that may advance a booking's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEvent {
    /// Owner approves the request
    Approve,
    /// Owner declines the request
    Reject,
    /// Renter or owner cancels (only while unpaid or pre-pickup)
    Cancel,
    /// Payment successfully captured
    PaymentCaptured,
    /// Both parties confirmed pickup
    PickupComplete,
    /// Both parties confirmed return
    ReturnComplete,
}

impl BookingStatus {
    /// Resolve a transition. Returns `None` when the event is not legal from
    /// this status; callers surface that as a wrong-status guard error with
    /// no state change and no side effects.
    pub fn apply(self, event: BookingEvent) -> Option<BookingStatus> {
        use BookingEvent::*;
        use BookingStatus::*;

        match (self, event) {
            (Pending, Approve) => Some(PaymentRequired),
            (Pending, Reject) => Some(Rejected),
            (Pending, Cancel) | (PaymentRequired, Cancel) => Some(Cancelled),
            (PaymentRequired, PaymentCaptured) => Some(Confirmed),
            (Confirmed, PickupComplete) => Some(InProgress),
            (InProgress, ReturnComplete) => Some(Completed),
            _ => None,
        }
    }

    /// Terminal statuses permit no further transition. The only mutation
    /// allowed afterwards is fund-release bookkeeping on `Completed`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Cancelled | BookingStatus::Completed
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::PaymentRequired => "payment_required",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Party
// ---------------------------------------------------------------------------

/// Which side of the rental is acting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Renter,
    Owner,
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Party::Renter => write!(f, "renter"),
            Party::Owner => write!(f, "owner"),
        }
    }
}

// ---------------------------------------------------------------------------
// HandoverPhase
// ---------------------------------------------------------------------------

/// The two handover rendezvous of a rental
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HandoverPhase {
    Pickup,
    Return,
}

impl std::fmt::Display for HandoverPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandoverPhase::Pickup => write!(f, "pickup"),
            HandoverPhase::Return => write!(f, "return"),
        }
    }
}

// ---------------------------------------------------------------------------
// DepositStatus
// ---------------------------------------------------------------------------

/// Where the security deposit stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "deposit_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    /// Deposit authorized/captured and held by the platform
    Held,
    /// Deposit refunded to the renter after a damage-free return
    Refunded,
    /// Damage reported; deposit held pending manual admin review
    FlaggedForReview,
}

//! Booking model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::{BookingStatus, DepositStatus, HandoverPhase, Party};

/// Booking record, the central entity of the marketplace.
///
/// The pricing snapshot is computed once at creation and immutable
/// thereafter: re-deriving pricing after payment would break consistency
/// with the amount already authorized.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub owner_id: Uuid,
    pub renter_id: Uuid,

    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: BookingStatus,

    // Pricing snapshot
    pub subtotal: Decimal,
    pub service_fee: Decimal,
    pub insurance_fee: Decimal,
    pub delivery_fee: Decimal,
    pub deposit_amount: Decimal,
    pub total_amount: Decimal,

    // Gateway references, each set once the corresponding operation succeeds
    pub payment_intent_ref: Option<String>,
    pub charge_ref: Option<String>,
    pub transfer_ref: Option<String>,
    pub deposit_refund_ref: Option<String>,

    // Two-party confirmation flags, independently settable, order-insensitive
    pub pickup_confirmed_by_renter: bool,
    pub pickup_confirmed_by_renter_at: Option<DateTime<Utc>>,
    pub pickup_confirmed_by_owner: bool,
    pub pickup_confirmed_by_owner_at: Option<DateTime<Utc>>,
    pub return_confirmed_by_renter: bool,
    pub return_confirmed_by_renter_at: Option<DateTime<Utc>>,
    pub return_confirmed_by_owner: bool,
    pub return_confirmed_by_owner_at: Option<DateTime<Utc>>,

    pub damage_reported: bool,
    /// Description filed with the damage report, kept whichever party
    /// confirms first so the review sees the substance of the report
    pub damage_description: Option<String>,
    pub deposit_status: DepositStatus,

    /// Loyalty points redeemed at booking time; restored exactly once if the
    /// booking is rejected or cancelled before capture.
    pub points_used: i64,
    pub points_restored: bool,

    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Role of the given user on this booking, if any
    pub fn role_of(&self, user_id: Uuid) -> Option<Party> {
        if user_id == self.renter_id {
            Some(Party::Renter)
        } else if user_id == self.owner_id {
            Some(Party::Owner)
        } else {
            None
        }
    }

    /// Whether the given party already confirmed the given phase
    pub fn is_confirmed_by(&self, party: Party, phase: HandoverPhase) -> bool {
        match (phase, party) {
            (HandoverPhase::Pickup, Party::Renter) => self.pickup_confirmed_by_renter,
            (HandoverPhase::Pickup, Party::Owner) => self.pickup_confirmed_by_owner,
            (HandoverPhase::Return, Party::Renter) => self.return_confirmed_by_renter,
            (HandoverPhase::Return, Party::Owner) => self.return_confirmed_by_owner,
        }
    }

    /// Whether both parties confirmed the given phase
    pub fn phase_complete(&self, phase: HandoverPhase) -> bool {
        match phase {
            HandoverPhase::Pickup => {
                self.pickup_confirmed_by_renter && self.pickup_confirmed_by_owner
            }
            HandoverPhase::Return => {
                self.return_confirmed_by_renter && self.return_confirmed_by_owner
            }
        }
    }
}

/// Parameters for creating a booking (after validation and pricing)
#[derive(Debug, Clone)]
pub struct CreateBooking {
    /// Generated by the caller so the gateway metadata can reference the
    /// booking before the row exists
    pub id: Uuid,
    pub listing_id: Uuid,
    pub owner_id: Uuid,
    pub renter_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub subtotal: Decimal,
    pub service_fee: Decimal,
    pub insurance_fee: Decimal,
    pub delivery_fee: Decimal,
    pub deposit_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_intent_ref: Option<String>,
    pub points_used: i64,
}

/// User record, reduced to what the booking core touches
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub points_balance: i64,
    /// Connected account identifier with the payment gateway; `None` until
    /// the owner completes payout onboarding
    pub payout_destination: Option<String>,
}

/// Handover evidence attached to a confirmation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HandoverEvidence {
    /// Photo URLs (upload itself is handled elsewhere)
    pub photos: Vec<String>,
    pub notes: Option<String>,
    /// Damage description; present only when the confirming party reports
    /// damage on return
    pub damage_report: Option<String>,
}

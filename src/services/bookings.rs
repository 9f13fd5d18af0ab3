//! Booking lifecycle service
//!
//! Validates transitions against the canonical status machine, commits them
//! through the store's compare-and-swap, then runs the money movement and
//! notification side effects for the transition. Side-effect failures never
//! roll back a committed transition; they surface as outcome warnings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    gateway::PaymentMetadata,
    models::{
        booking::{Booking, CreateBooking},
        enums::{BookingEvent, BookingStatus, Party},
        notification::NotificationEvent,
    },
    pricing::{self, PricingInput},
    repository::{BookingPatch, BookingStore},
};

use super::{notifications::Notifier, payments::PaymentsService, BookingOutcome};
use crate::config::FeesConfig;

/// Validated input for a booking request
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub listing_id: Uuid,
    pub owner_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub daily_rate: Decimal,
    pub include_insurance: bool,
    pub security_deposit: Decimal,
    pub delivery_fee: Decimal,
    pub points_used: i64,
}

#[derive(Clone)]
pub struct BookingsService {
    store: Arc<dyn BookingStore>,
    payments: PaymentsService,
    notifier: Notifier,
    fees: FeesConfig,
}

impl BookingsService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        payments: PaymentsService,
        notifier: Notifier,
        fees: FeesConfig,
    ) -> Self {
        Self { store, payments, notifier, fees }
    }

    /// Rental length in days; a same-day rental counts as one day
    fn rental_days(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<u32> {
        if end < start {
            return Err(AppError::Validation(
                "end_date must not be before start_date".to_string(),
            ));
        }
        let days = (end - start).num_days().max(1);
        u32::try_from(days)
            .map_err(|_| AppError::Validation("rental period too long".to_string()))
    }

    /// Guard helper: resolve the transition or fail with a wrong-status
    /// error, before any side effect
    fn next_status(booking: &Booking, event: BookingEvent) -> AppResult<BookingStatus> {
        booking.status.apply(event).ok_or_else(|| {
            AppError::WrongStatus(format!(
                "Booking {} is {}, cannot {:?}",
                booking.id, booking.status, event
            ))
        })
    }

    /// Create a booking request: price it, place the payment hold, persist
    /// it as `pending` and tell the owner.
    ///
    /// If the hold cannot be placed the booking is not created at all, so a
    /// gateway failure leaves no half-made record behind.
    pub async fn create_booking(
        &self,
        renter_id: Uuid,
        request: BookingRequest,
    ) -> AppResult<BookingOutcome> {
        if renter_id == request.owner_id {
            return Err(AppError::Validation("Cannot book your own listing".to_string()));
        }
        if request.points_used < 0 {
            return Err(AppError::Validation("points_used must not be negative".to_string()));
        }

        let days = Self::rental_days(request.start_date, request.end_date)?;
        let breakdown = pricing::calculate(
            &PricingInput {
                daily_rate: request.daily_rate,
                days,
                include_insurance: request.include_insurance,
                security_deposit: request.security_deposit,
                delivery_fee: request.delivery_fee,
            },
            &self.fees,
        )?;

        // Both parties must exist before any money is held
        let owner = self.store.get_user(request.owner_id).await?;
        self.store.get_user(renter_id).await?;

        let booking_id = Uuid::new_v4();
        let authorization = self
            .payments
            .authorize(
                &owner,
                breakdown.total_renter_pays,
                PaymentMetadata {
                    booking_id,
                    listing_id: request.listing_id,
                },
            )
            .await?;

        let created = self
            .store
            .create_booking(CreateBooking {
                id: booking_id,
                listing_id: request.listing_id,
                owner_id: request.owner_id,
                renter_id,
                start_date: request.start_date,
                end_date: request.end_date,
                subtotal: breakdown.base_price,
                service_fee: breakdown.service_fee,
                insurance_fee: breakdown.insurance,
                delivery_fee: breakdown.delivery_fee,
                deposit_amount: breakdown.security_deposit,
                total_amount: breakdown.total_amount,
                payment_intent_ref: Some(authorization.0.clone()),
                points_used: request.points_used,
            })
            .await;

        // The hold must not outlive a failed insert
        let booking = match created {
            Ok(booking) => booking,
            Err(e) => {
                self.payments.void_orphaned(&authorization, booking_id).await;
                return Err(e);
            }
        };

        let mut warnings = Vec::new();
        self.notifier
            .send(
                booking.owner_id,
                NotificationEvent::BookingRequested {
                    booking_id: booking.id,
                    listing_id: booking.listing_id,
                    total_amount: booking.total_amount,
                },
                &mut warnings,
            )
            .await;

        Ok(BookingOutcome { booking, warnings })
    }

    /// Owner approves a pending request; the renter owes payment next
    pub async fn approve(&self, booking_id: Uuid, actor_id: Uuid) -> AppResult<BookingOutcome> {
        let booking = self.store.get_booking(booking_id).await?;
        self.require_role(&booking, actor_id, Party::Owner, "approve")?;
        let next = Self::next_status(&booking, BookingEvent::Approve)?;

        let booking = self
            .store
            .update_if_status(booking_id, BookingPatch::status(next), BookingStatus::Pending)
            .await?;

        let mut warnings = Vec::new();
        self.notifier
            .send(
                booking.renter_id,
                NotificationEvent::PaymentDue {
                    booking_id: booking.id,
                    total_amount: booking.total_amount + booking.deposit_amount,
                },
                &mut warnings,
            )
            .await;

        Ok(BookingOutcome { booking, warnings })
    }

    /// Owner declines a pending request: void the hold, restore the
    /// renter's loyalty points, tell both parties
    pub async fn reject(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
        reason: String,
    ) -> AppResult<BookingOutcome> {
        if reason.trim().is_empty() {
            return Err(AppError::Validation("A rejection reason is required".to_string()));
        }

        let booking = self.store.get_booking(booking_id).await?;
        self.require_role(&booking, actor_id, Party::Owner, "reject")?;
        let next = Self::next_status(&booking, BookingEvent::Reject)?;

        let patch = BookingPatch {
            status: Some(next),
            rejection_reason: Some(reason.clone()),
            restore_points: true,
            ..BookingPatch::default()
        };
        let booking = self
            .store
            .update_if_status(booking_id, patch, BookingStatus::Pending)
            .await?;

        let mut warnings = Vec::new();
        self.payments.void_soft(&booking, "booking rejected", &mut warnings).await;

        let event = NotificationEvent::BookingRejected {
            booking_id: booking.id,
            reason,
        };
        self.notifier.send(booking.renter_id, event.clone(), &mut warnings).await;
        self.notifier.send(booking.owner_id, event, &mut warnings).await;

        Ok(BookingOutcome { booking, warnings })
    }

    /// Renter or owner cancels before pickup (only while unpaid)
    pub async fn cancel(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
        reason: String,
    ) -> AppResult<BookingOutcome> {
        if reason.trim().is_empty() {
            return Err(AppError::Validation("A cancellation reason is required".to_string()));
        }

        let booking = self.store.get_booking(booking_id).await?;
        let role = booking.role_of(actor_id).ok_or_else(|| {
            AppError::Authorization(format!(
                "User {} is not a party to booking {}",
                actor_id, booking_id
            ))
        })?;
        let next = Self::next_status(&booking, BookingEvent::Cancel)?;

        let patch = BookingPatch {
            status: Some(next),
            cancellation_reason: Some(reason.clone()),
            restore_points: true,
            ..BookingPatch::default()
        };
        let booking = self
            .store
            .update_if_status(booking_id, patch, booking.status)
            .await?;

        let mut warnings = Vec::new();
        self.payments.void_soft(&booking, "booking cancelled", &mut warnings).await;

        // Notify the counterparty only
        let counterparty = match role {
            Party::Renter => booking.owner_id,
            Party::Owner => booking.renter_id,
        };
        self.notifier
            .send(
                counterparty,
                NotificationEvent::BookingCancelled {
                    booking_id: booking.id,
                    cancelled_by: role,
                    reason,
                },
                &mut warnings,
            )
            .await;

        Ok(BookingOutcome { booking, warnings })
    }

    /// Renter completes payment: capture the hold, then commit the status.
    ///
    /// Capture runs before the compare-and-swap so a timed-out gateway call
    /// leaves the booking in `payment_required` and a retry stays safe. A
    /// lost swap after a successful capture means a cancellation won the
    /// race; that is flagged for manual follow-up rather than auto-refunded.
    pub async fn capture_payment(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
    ) -> AppResult<BookingOutcome> {
        let booking = self.store.get_booking(booking_id).await?;
        self.require_role(&booking, actor_id, Party::Renter, "pay for")?;
        let next = Self::next_status(&booking, BookingEvent::PaymentCaptured)?;

        let charge = self.payments.capture(&booking).await?;

        let patch = BookingPatch {
            status: Some(next),
            charge_ref: Some(charge.0),
            ..BookingPatch::default()
        };
        let booking = match self
            .store
            .update_if_status(booking_id, patch, BookingStatus::PaymentRequired)
            .await
        {
            Ok(booking) => booking,
            Err(e) => {
                tracing::error!(
                    %booking_id,
                    "payment captured but status swap lost: {}; manual follow-up required",
                    e
                );
                return Err(e);
            }
        };

        let mut warnings = Vec::new();
        let event = NotificationEvent::BookingConfirmed { booking_id: booking.id };
        self.notifier.send(booking.renter_id, event.clone(), &mut warnings).await;
        self.notifier.send(booking.owner_id, event, &mut warnings).await;

        Ok(BookingOutcome { booking, warnings })
    }

    pub async fn get_booking(&self, booking_id: Uuid, actor_id: Uuid) -> AppResult<Booking> {
        let booking = self.store.get_booking(booking_id).await?;
        if booking.role_of(actor_id).is_none() {
            return Err(AppError::Authorization(format!(
                "User {} is not a party to booking {}",
                actor_id, booking_id
            )));
        }
        Ok(booking)
    }

    fn require_role(
        &self,
        booking: &Booking,
        actor_id: Uuid,
        required: Party,
        action: &str,
    ) -> AppResult<()> {
        match booking.role_of(actor_id) {
            Some(role) if role == required => Ok(()),
            Some(_) => Err(AppError::Authorization(format!(
                "Only the {} may {} booking {}",
                required, action, booking.id
            ))),
            None => Err(AppError::Authorization(format!(
                "User {} is not a party to booking {}",
                actor_id, booking.id
            ))),
        }
    }
}

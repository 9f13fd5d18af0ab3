//! Payment orchestrator
//!
//! Drives the gateway for each state-machine transition: authorize at
//! request time, void on rejection/cancellation, capture on payment,
//! transfer and deposit refund on completion. Amounts become integer cents
//! at the gateway boundary and nowhere else.

use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::FeesConfig,
    error::{AppError, AppResult},
    gateway::{
        to_minor_units, AuthorizationRef, ChargeRef, GatewayError, PaymentGateway,
        PaymentMetadata, RefundRef, TransferRef,
    },
    models::booking::{Booking, User},
    pricing,
};

use super::SideEffectWarning;

#[derive(Clone)]
pub struct PaymentsService {
    gateway: Arc<dyn PaymentGateway>,
    fees: FeesConfig,
}

impl PaymentsService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, fees: FeesConfig) -> Self {
        Self { gateway, fees }
    }

    /// Place the hold for a new booking request. Fails with a distinct
    /// payee-not-onboarded error when the owner has no payout destination,
    /// before any gateway call is made.
    pub async fn authorize(
        &self,
        owner: &User,
        amount: Decimal,
        metadata: PaymentMetadata,
    ) -> AppResult<AuthorizationRef> {
        let destination = owner.payout_destination.as_deref().ok_or_else(|| {
            AppError::PayeeNotOnboarded(format!(
                "Owner {} has not completed payout onboarding",
                owner.id
            ))
        })?;

        let authorization = self
            .gateway
            .authorize(to_minor_units(amount)?, destination, metadata)
            .await?;

        Ok(authorization)
    }

    /// Void a hold that has no booking row behind it (the insert failed
    /// after the authorization succeeded). There is no record to attach a
    /// warning to, so a failed void is logged for manual follow-up.
    pub async fn void_orphaned(&self, authorization: &AuthorizationRef, booking_id: Uuid) {
        match self.gateway.void(authorization, "booking creation failed").await {
            Ok(()) => {
                tracing::warn!(%booking_id, "voided orphaned authorization {}", authorization.0);
            }
            Err(e) => {
                tracing::error!(
                    %booking_id,
                    "failed to void orphaned authorization {}: {}; manual follow-up required",
                    authorization.0,
                    e
                );
            }
        }
    }

    /// Void the booking's hold, if one exists. Idempotent from the caller's
    /// perspective: an already-voided or already-captured hold is a logged
    /// warning, never an error, and never blocks the status transition that
    /// already committed.
    pub async fn void_soft(
        &self,
        booking: &Booking,
        reason: &str,
        warnings: &mut Vec<SideEffectWarning>,
    ) {
        let Some(ref intent) = booking.payment_intent_ref else {
            return;
        };

        let authorization = AuthorizationRef(intent.clone());
        match self.gateway.void(&authorization, reason).await {
            Ok(()) => {}
            Err(GatewayError::AlreadyFinalized(detail)) => {
                tracing::warn!(booking_id = %booking.id, "void skipped: {}", detail);
            }
            Err(e) => {
                tracing::warn!(booking_id = %booking.id, "void failed: {}", e);
                warnings.push(SideEffectWarning::new(
                    "void_authorization",
                    format!("booking {}: {}", booking.id, e),
                ));
            }
        }
    }

    /// Capture the held charge. A gateway failure here surfaces to the
    /// caller with the booking status untouched, so the renter can retry.
    pub async fn capture(&self, booking: &Booking) -> AppResult<ChargeRef> {
        let intent = booking.payment_intent_ref.as_deref().ok_or_else(|| {
            AppError::Internal(format!("Booking {} has no authorization to capture", booking.id))
        })?;

        let charge = self.gateway.capture(&AuthorizationRef(intent.to_string())).await?;
        Ok(charge)
    }

    /// Owner's net proceeds for this booking: subtotal minus platform
    /// commission, per the snapshot
    pub fn owner_net(&self, booking: &Booking) -> Decimal {
        pricing::owner_net(booking.subtotal, &self.fees)
    }

    /// Release the owner's payout after completion. A failure is flagged for
    /// manual follow-up, not rolled back, and is independent of the deposit
    /// refund.
    pub async fn release_soft(
        &self,
        booking: &Booking,
        payout_destination: &str,
        warnings: &mut Vec<SideEffectWarning>,
    ) -> Option<TransferRef> {
        let amount = self.owner_net(booking);
        let cents = match to_minor_units(amount) {
            Ok(cents) => cents,
            Err(e) => {
                warnings.push(SideEffectWarning::new(
                    "release_payout",
                    format!("booking {}: {}", booking.id, e),
                ));
                return None;
            }
        };

        let metadata = PaymentMetadata {
            booking_id: booking.id,
            listing_id: booking.listing_id,
        };

        match self.gateway.transfer(cents, payout_destination, metadata).await {
            Ok(transfer) => Some(transfer),
            Err(e) => {
                tracing::error!(booking_id = %booking.id, "payout release failed: {}", e);
                warnings.push(SideEffectWarning::new(
                    "release_payout",
                    format!("booking {}: {}", booking.id, e),
                ));
                None
            }
        }
    }

    /// Refund the deposit slice of the captured charge after a damage-free
    /// return. Independent of the payout release; a failure here is flagged
    /// for manual follow-up.
    pub async fn refund_deposit_soft(
        &self,
        booking: &Booking,
        warnings: &mut Vec<SideEffectWarning>,
    ) -> Option<RefundRef> {
        if booking.deposit_amount.is_zero() {
            return None;
        }

        let Some(ref charge) = booking.charge_ref else {
            warnings.push(SideEffectWarning::new(
                "refund_deposit",
                format!("booking {}: no captured charge to refund against", booking.id),
            ));
            return None;
        };

        let cents = match to_minor_units(booking.deposit_amount) {
            Ok(cents) => cents,
            Err(e) => {
                warnings.push(SideEffectWarning::new(
                    "refund_deposit",
                    format!("booking {}: {}", booking.id, e),
                ));
                return None;
            }
        };

        match self
            .gateway
            .refund(&ChargeRef(charge.clone()), cents, "security deposit refund")
            .await
        {
            Ok(refund) => Some(refund),
            Err(e) => {
                tracing::error!(booking_id = %booking.id, "deposit refund failed: {}", e);
                warnings.push(SideEffectWarning::new(
                    "refund_deposit",
                    format!("booking {}: {}", booking.id, e),
                ));
                None
            }
        }
    }
}

//! Two-party handover confirmation tracker
//!
//! Pickup and return each require a commutative two-of-two rendezvous:
//! renter and owner confirm independently, in either order, and the second
//! confirmation advances the booking. Re-confirming is a no-op, so no
//! duplicate phase-complete event can fire.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, HandoverEvidence},
        enums::{BookingEvent, BookingStatus, DepositStatus, HandoverPhase, Party},
        notification::NotificationEvent,
    },
    repository::{BookingPatch, BookingStore},
};

use super::{notifications::Notifier, payments::PaymentsService, BookingOutcome};

/// Evidence photo bounds; the return handover is where disputes happen, so
/// it carries the strict requirement
const RETURN_PHOTOS_MIN: usize = 3;
const PHOTOS_MAX: usize = 8;

#[derive(Clone)]
pub struct ConfirmationsService {
    store: Arc<dyn BookingStore>,
    payments: PaymentsService,
    notifier: Notifier,
    admin_user_id: Option<Uuid>,
}

impl ConfirmationsService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        payments: PaymentsService,
        notifier: Notifier,
        admin_user_id: Option<Uuid>,
    ) -> Self {
        Self { store, payments, notifier, admin_user_id }
    }

    fn validate_evidence(phase: HandoverPhase, evidence: &HandoverEvidence) -> AppResult<()> {
        if evidence.photos.len() > PHOTOS_MAX {
            return Err(AppError::Validation(format!(
                "At most {} photos may be attached",
                PHOTOS_MAX
            )));
        }
        if phase == HandoverPhase::Return && evidence.photos.len() < RETURN_PHOTOS_MIN {
            return Err(AppError::Validation(format!(
                "A return confirmation requires at least {} photos",
                RETURN_PHOTOS_MIN
            )));
        }
        if phase == HandoverPhase::Pickup && evidence.damage_report.is_some() {
            return Err(AppError::Validation(
                "Damage reports are filed with the return confirmation".to_string(),
            ));
        }
        Ok(())
    }

    /// Status from which a phase confirmation is legal
    fn expected_status(phase: HandoverPhase) -> BookingStatus {
        match phase {
            HandoverPhase::Pickup => BookingStatus::Confirmed,
            HandoverPhase::Return => BookingStatus::InProgress,
        }
    }

    /// Record one party's confirmation of a handover phase.
    ///
    /// The first confirmation only records a flag; the second one advances
    /// the booking and triggers the transition's money movement.
    pub async fn confirm(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
        phase: HandoverPhase,
        evidence: HandoverEvidence,
    ) -> AppResult<BookingOutcome> {
        Self::validate_evidence(phase, &evidence)?;

        let booking = self.store.get_booking(booking_id).await?;
        let party = booking.role_of(actor_id).ok_or_else(|| {
            AppError::Authorization(format!(
                "User {} is not a party to booking {}",
                actor_id, booking_id
            ))
        })?;

        let expected = Self::expected_status(phase);
        if booking.status != expected {
            return Err(AppError::WrongStatus(format!(
                "Booking {} is {}, {} confirmation requires {}",
                booking_id, booking.status, phase, expected
            )));
        }

        // Idempotent: confirming twice changes nothing and fires nothing
        if booking.is_confirmed_by(party, phase) {
            return Ok(BookingOutcome { booking, warnings: Vec::new() });
        }

        let mut patch = BookingPatch::confirmation(party, phase, Utc::now());
        if evidence.damage_report.is_some() {
            patch.damage_reported = Some(true);
            patch.damage_description = evidence.damage_report.clone();
        }
        let booking = self.store.update_if_status(booking_id, patch, expected).await?;

        let mut warnings = Vec::new();

        if !booking.phase_complete(phase) {
            // Rendezvous still open; nudge the other side
            let counterparty = match party {
                Party::Renter => booking.owner_id,
                Party::Owner => booking.renter_id,
            };
            self.notifier
                .send(
                    counterparty,
                    NotificationEvent::HandoverConfirmed {
                        booking_id: booking.id,
                        phase,
                        confirmed_by: party,
                    },
                    &mut warnings,
                )
                .await;
            return Ok(BookingOutcome { booking, warnings });
        }

        let booking = match phase {
            HandoverPhase::Pickup => self.complete_pickup(booking, &mut warnings).await?,
            HandoverPhase::Return => self.complete_return(booking, &mut warnings).await?,
        };

        Ok(BookingOutcome { booking, warnings })
    }

    /// Both parties confirmed pickup: the rental is underway
    async fn complete_pickup(
        &self,
        booking: Booking,
        warnings: &mut Vec<super::SideEffectWarning>,
    ) -> AppResult<Booking> {
        let next = booking.status.apply(BookingEvent::PickupComplete).ok_or_else(|| {
            AppError::WrongStatus(format!(
                "Booking {} is {}, cannot start the rental",
                booking.id, booking.status
            ))
        })?;

        let booking = self
            .store
            .update_if_status(booking.id, BookingPatch::status(next), BookingStatus::Confirmed)
            .await?;

        let event = NotificationEvent::RentalStarted { booking_id: booking.id };
        self.notifier.send(booking.renter_id, event.clone(), warnings).await;
        self.notifier.send(booking.owner_id, event, warnings).await;

        Ok(booking)
    }

    /// Both parties confirmed return: complete the booking, release the
    /// owner's payout, and either refund the deposit or hold it for admin
    /// review when damage was reported.
    async fn complete_return(
        &self,
        booking: Booking,
        warnings: &mut Vec<super::SideEffectWarning>,
    ) -> AppResult<Booking> {
        let next = booking.status.apply(BookingEvent::ReturnComplete).ok_or_else(|| {
            AppError::WrongStatus(format!(
                "Booking {} is {}, cannot complete the rental",
                booking.id, booking.status
            ))
        })?;

        // The confirmation patch already recorded any damage report, from
        // whichever party filed it
        let damage = booking.damage_reported;

        let patch = BookingPatch {
            status: Some(next),
            deposit_status: Some(if damage {
                DepositStatus::FlaggedForReview
            } else {
                DepositStatus::Held
            }),
            ..BookingPatch::default()
        };
        let mut booking = self
            .store
            .update_if_status(booking.id, patch, BookingStatus::InProgress)
            .await?;

        // Owner payout is released regardless of the damage report; only
        // the deposit is in dispute.
        match self.store.get_user(booking.owner_id).await {
            Ok(owner) => {
                if let Some(destination) = owner.payout_destination.as_deref() {
                    if let Some(transfer) =
                        self.payments.release_soft(&booking, destination, warnings).await
                    {
                        booking = self
                            .record_settlement(
                                booking,
                                BookingPatch {
                                    transfer_ref: Some(transfer.0),
                                    ..BookingPatch::default()
                                },
                                warnings,
                            )
                            .await;
                        self.notifier
                            .send(
                                booking.owner_id,
                                NotificationEvent::PayoutReleased {
                                    booking_id: booking.id,
                                    amount: self.payments.owner_net(&booking),
                                },
                                warnings,
                            )
                            .await;
                    }
                } else {
                    warnings.push(super::SideEffectWarning::new(
                        "release_payout",
                        format!("booking {}: owner has no payout destination", booking.id),
                    ));
                }
            }
            Err(e) => {
                warnings.push(super::SideEffectWarning::new(
                    "release_payout",
                    format!("booking {}: owner lookup failed: {}", booking.id, e),
                ));
            }
        }

        if damage {
            let description = booking
                .damage_description
                .clone()
                .unwrap_or_else(|| "damage reported".to_string());
            let event = NotificationEvent::DamageReported {
                booking_id: booking.id,
                description,
            };
            match self.admin_user_id {
                Some(admin) => self.notifier.send(admin, event.clone(), warnings).await,
                None => {
                    tracing::error!(booking_id = %booking.id, "damage reported, no admin recipient configured");
                }
            }
            self.notifier.send(booking.owner_id, event, warnings).await;
        } else if let Some(refund) = self.payments.refund_deposit_soft(&booking, warnings).await {
            booking = self
                .record_settlement(
                    booking,
                    BookingPatch {
                        deposit_refund_ref: Some(refund.0),
                        deposit_status: Some(DepositStatus::Refunded),
                        ..BookingPatch::default()
                    },
                    warnings,
                )
                .await;
            let event = NotificationEvent::RentalCompleted {
                booking_id: booking.id,
                deposit_refunded: booking.deposit_amount,
            };
            self.notifier.send(booking.renter_id, event.clone(), warnings).await;
            self.notifier.send(booking.owner_id, event, warnings).await;
        }

        Ok(booking)
    }

    /// Post-completion bookkeeping: record gateway references on the
    /// already-terminal booking. A failure here is a follow-up warning, the
    /// money has moved either way.
    async fn record_settlement(
        &self,
        booking: Booking,
        patch: BookingPatch,
        warnings: &mut Vec<super::SideEffectWarning>,
    ) -> Booking {
        match self
            .store
            .update_if_status(booking.id, patch, BookingStatus::Completed)
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                tracing::error!(booking_id = %booking.id, "settlement bookkeeping failed: {}", e);
                warnings.push(super::SideEffectWarning::new(
                    "record_settlement",
                    format!("booking {}: {}", booking.id, e),
                ));
                booking
            }
        }
    }
}

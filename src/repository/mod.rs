//! Persistent record store for bookings
//!
//! The core talks to storage through the narrow [`BookingStore`] trait so
//! services stay testable without a database. The Postgres implementation
//! lives in [`bookings`].

pub mod bookings;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        booking::{Booking, CreateBooking, User},
        enums::{BookingStatus, DepositStatus, HandoverPhase, Party},
    },
};

/// Partial update applied to a booking record.
///
/// Only the populated fields change. When `restore_points` is set, the
/// renter's loyalty balance is credited with the booking's `points_used` in
/// the same transaction as the status swap and the `points_restored` latch
/// is raised, so restoration happens exactly once even under racing calls.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub status: Option<BookingStatus>,
    pub payment_intent_ref: Option<String>,
    pub charge_ref: Option<String>,
    pub transfer_ref: Option<String>,
    pub deposit_refund_ref: Option<String>,
    /// Record one party's confirmation of one handover phase
    pub confirmation: Option<(Party, HandoverPhase, DateTime<Utc>)>,
    pub damage_reported: Option<bool>,
    pub damage_description: Option<String>,
    pub deposit_status: Option<DepositStatus>,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub restore_points: bool,
}

impl BookingPatch {
    pub fn status(status: BookingStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn confirmation(party: Party, phase: HandoverPhase, at: DateTime<Utc>) -> Self {
        Self {
            confirmation: Some((party, phase, at)),
            ..Self::default()
        }
    }
}

/// Narrow persistence interface required by the booking core.
///
/// `update_if_status` is the concurrency linchpin: updates to one booking
/// are serialized by a compare-and-swap on the current status, so of two
/// racing transitions exactly one wins and the other gets a wrong-status
/// error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create_booking(&self, booking: CreateBooking) -> AppResult<Booking>;

    async fn get_booking(&self, id: Uuid) -> AppResult<Booking>;

    /// Apply `patch` only if the booking currently has `expected` status.
    /// Fails with a wrong-status error (and no change) otherwise.
    async fn update_if_status(
        &self,
        id: Uuid,
        patch: BookingPatch,
        expected: BookingStatus,
    ) -> AppResult<Booking>;

    async fn get_user(&self, id: Uuid) -> AppResult<User>;
}

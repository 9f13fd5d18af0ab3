//! Postgres-backed booking store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, CreateBooking, User},
        enums::{BookingStatus, HandoverPhase, Party},
    },
};

use super::{BookingPatch, BookingStore};

#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: Pool<Postgres>,
}

impl PostgresBookingStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Split a confirmation patch into the four flag/timestamp column pairs
fn confirmation_columns(
    confirmation: &Option<(Party, HandoverPhase, DateTime<Utc>)>,
) -> [(Option<bool>, Option<DateTime<Utc>>); 4] {
    let mut columns: [(Option<bool>, Option<DateTime<Utc>>); 4] = Default::default();
    if let Some((party, phase, at)) = confirmation {
        let index = match (phase, party) {
            (HandoverPhase::Pickup, Party::Renter) => 0,
            (HandoverPhase::Pickup, Party::Owner) => 1,
            (HandoverPhase::Return, Party::Renter) => 2,
            (HandoverPhase::Return, Party::Owner) => 3,
        };
        columns[index] = (Some(true), Some(*at));
    }
    columns
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn create_booking(&self, booking: CreateBooking) -> AppResult<Booking> {
        let created = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                id, listing_id, owner_id, renter_id, start_date, end_date, status,
                subtotal, service_fee, insurance_fee, delivery_fee, deposit_amount,
                total_amount, payment_intent_ref, points_used
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'pending',
                    $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(booking.id)
        .bind(booking.listing_id)
        .bind(booking.owner_id)
        .bind(booking.renter_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.subtotal)
        .bind(booking.service_fee)
        .bind(booking.insurance_fee)
        .bind(booking.delivery_fee)
        .bind(booking.deposit_amount)
        .bind(booking.total_amount)
        .bind(&booking.payment_intent_ref)
        .bind(booking.points_used)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get_booking(&self, id: Uuid) -> AppResult<Booking> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))
    }

    async fn update_if_status(
        &self,
        id: Uuid,
        patch: BookingPatch,
        expected: BookingStatus,
    ) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let confirmations = confirmation_columns(&patch.confirmation);

        // Single compare-and-swap statement: the WHERE clause on status
        // serializes racing transitions, the loser matches zero rows.
        let updated = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET
                status = COALESCE($3, status),
                payment_intent_ref = COALESCE($4, payment_intent_ref),
                charge_ref = COALESCE($5, charge_ref),
                transfer_ref = COALESCE($6, transfer_ref),
                deposit_refund_ref = COALESCE($7, deposit_refund_ref),
                pickup_confirmed_by_renter = COALESCE($8, pickup_confirmed_by_renter),
                pickup_confirmed_by_renter_at = COALESCE($9, pickup_confirmed_by_renter_at),
                pickup_confirmed_by_owner = COALESCE($10, pickup_confirmed_by_owner),
                pickup_confirmed_by_owner_at = COALESCE($11, pickup_confirmed_by_owner_at),
                return_confirmed_by_renter = COALESCE($12, return_confirmed_by_renter),
                return_confirmed_by_renter_at = COALESCE($13, return_confirmed_by_renter_at),
                return_confirmed_by_owner = COALESCE($14, return_confirmed_by_owner),
                return_confirmed_by_owner_at = COALESCE($15, return_confirmed_by_owner_at),
                damage_reported = COALESCE($16, damage_reported),
                damage_description = COALESCE($21, damage_description),
                deposit_status = COALESCE($17, deposit_status),
                rejection_reason = COALESCE($18, rejection_reason),
                cancellation_reason = COALESCE($19, cancellation_reason),
                points_restored = points_restored OR $20,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(patch.status)
        .bind(&patch.payment_intent_ref)
        .bind(&patch.charge_ref)
        .bind(&patch.transfer_ref)
        .bind(&patch.deposit_refund_ref)
        .bind(confirmations[0].0)
        .bind(confirmations[0].1)
        .bind(confirmations[1].0)
        .bind(confirmations[1].1)
        .bind(confirmations[2].0)
        .bind(confirmations[2].1)
        .bind(confirmations[3].0)
        .bind(confirmations[3].1)
        .bind(patch.damage_reported)
        .bind(patch.deposit_status)
        .bind(&patch.rejection_reason)
        .bind(&patch.cancellation_reason)
        .bind(patch.restore_points)
        .bind(&patch.damage_description)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            // Distinguish a missing booking from a lost race
            let current = self.get_booking(id).await?;
            return Err(AppError::WrongStatus(format!(
                "Booking {} is {}, expected {}",
                id, current.status, expected
            )));
        };

        // Points restoration is atomic with the status swap; the CAS above
        // guarantees this branch runs at most once per booking.
        if patch.restore_points && updated.points_used > 0 {
            sqlx::query("UPDATE users SET points_balance = points_balance + $1 WHERE id = $2")
                .bind(updated.points_used)
                .bind(updated.renter_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(updated)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, points_balance, payout_destination FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }
}

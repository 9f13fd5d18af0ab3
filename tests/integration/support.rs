//! In-memory collaborators for end-to-end booking flow tests
//!
//! The store mirrors the Postgres compare-and-swap semantics: all updates to
//! a booking go through a single mutex, and a status mismatch fails without
//! touching the record. That makes the concurrency scenarios meaningful.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use rentora_server::{
    error::{AppError, AppResult},
    gateway::{
        AuthorizationRef, ChargeRef, GatewayError, PaymentGateway, PaymentMetadata, RefundRef,
        TransferRef,
    },
    models::{
        booking::{Booking, CreateBooking, User},
        enums::{BookingStatus, DepositStatus, HandoverPhase, Party},
        notification::NotificationEvent,
    },
    repository::{BookingPatch, BookingStore},
    services::notifications::{NotificationDispatcher, NotificationError},
};

#[derive(Default)]
struct StoreInner {
    bookings: HashMap<Uuid, Booking>,
    users: HashMap<Uuid, User>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, points_balance: i64, payout_destination: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().users.insert(
            id,
            User {
                id,
                email: format!("{}@example.com", id),
                points_balance,
                payout_destination: payout_destination.map(String::from),
            },
        );
        id
    }

    pub fn points_balance(&self, user_id: Uuid) -> i64 {
        self.inner.lock().unwrap().users[&user_id].points_balance
    }

    pub fn booking(&self, id: Uuid) -> Booking {
        self.inner.lock().unwrap().bookings[&id].clone()
    }

    fn apply_patch(booking: &mut Booking, patch: &BookingPatch) {
        if let Some(status) = patch.status {
            booking.status = status;
        }
        if let Some(ref value) = patch.payment_intent_ref {
            booking.payment_intent_ref = Some(value.clone());
        }
        if let Some(ref value) = patch.charge_ref {
            booking.charge_ref = Some(value.clone());
        }
        if let Some(ref value) = patch.transfer_ref {
            booking.transfer_ref = Some(value.clone());
        }
        if let Some(ref value) = patch.deposit_refund_ref {
            booking.deposit_refund_ref = Some(value.clone());
        }
        if let Some((party, phase, at)) = patch.confirmation {
            match (phase, party) {
                (HandoverPhase::Pickup, Party::Renter) => {
                    booking.pickup_confirmed_by_renter = true;
                    booking.pickup_confirmed_by_renter_at = Some(at);
                }
                (HandoverPhase::Pickup, Party::Owner) => {
                    booking.pickup_confirmed_by_owner = true;
                    booking.pickup_confirmed_by_owner_at = Some(at);
                }
                (HandoverPhase::Return, Party::Renter) => {
                    booking.return_confirmed_by_renter = true;
                    booking.return_confirmed_by_renter_at = Some(at);
                }
                (HandoverPhase::Return, Party::Owner) => {
                    booking.return_confirmed_by_owner = true;
                    booking.return_confirmed_by_owner_at = Some(at);
                }
            }
        }
        if let Some(value) = patch.damage_reported {
            booking.damage_reported = value;
        }
        if let Some(ref value) = patch.damage_description {
            booking.damage_description = Some(value.clone());
        }
        if let Some(value) = patch.deposit_status {
            booking.deposit_status = value;
        }
        if let Some(ref value) = patch.rejection_reason {
            booking.rejection_reason = Some(value.clone());
        }
        if let Some(ref value) = patch.cancellation_reason {
            booking.cancellation_reason = Some(value.clone());
        }
        if patch.restore_points {
            booking.points_restored = true;
        }
        booking.updated_at = Utc::now();
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn create_booking(&self, create: CreateBooking) -> AppResult<Booking> {
        let now = Utc::now();
        let booking = Booking {
            id: create.id,
            listing_id: create.listing_id,
            owner_id: create.owner_id,
            renter_id: create.renter_id,
            start_date: create.start_date,
            end_date: create.end_date,
            status: BookingStatus::Pending,
            subtotal: create.subtotal,
            service_fee: create.service_fee,
            insurance_fee: create.insurance_fee,
            delivery_fee: create.delivery_fee,
            deposit_amount: create.deposit_amount,
            total_amount: create.total_amount,
            payment_intent_ref: create.payment_intent_ref,
            charge_ref: None,
            transfer_ref: None,
            deposit_refund_ref: None,
            pickup_confirmed_by_renter: false,
            pickup_confirmed_by_renter_at: None,
            pickup_confirmed_by_owner: false,
            pickup_confirmed_by_owner_at: None,
            return_confirmed_by_renter: false,
            return_confirmed_by_renter_at: None,
            return_confirmed_by_owner: false,
            return_confirmed_by_owner_at: None,
            damage_reported: false,
            damage_description: None,
            deposit_status: DepositStatus::Held,
            points_used: create.points_used,
            points_restored: false,
            rejection_reason: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.lock().unwrap();
        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> AppResult<Booking> {
        self.inner
            .lock()
            .unwrap()
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))
    }

    async fn update_if_status(
        &self,
        id: Uuid,
        patch: BookingPatch,
        expected: BookingStatus,
    ) -> AppResult<Booking> {
        let mut inner = self.inner.lock().unwrap();

        let current = inner
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))?;

        if current.status != expected {
            return Err(AppError::WrongStatus(format!(
                "Booking {} is {}, expected {}",
                id, current.status, expected
            )));
        }

        let mut updated = current;
        let restore = patch.restore_points && !updated.points_restored;
        Self::apply_patch(&mut updated, &patch);

        // Points restoration is atomic with the status swap, same as the
        // SQL transaction in the Postgres store
        if restore && updated.points_used > 0 {
            let renter_id = updated.renter_id;
            let points = updated.points_used;
            if let Some(user) = inner.users.get_mut(&renter_id) {
                user.points_balance += points;
            }
        }

        inner.bookings.insert(id, updated.clone());
        Ok(updated)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.inner
            .lock()
            .unwrap()
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }
}

/// Gateway stand-in that hands out sequential references and records calls
#[derive(Default)]
pub struct FakeGateway {
    sequence: AtomicU64,
    pub voids: Mutex<Vec<String>>,
    pub transfers: Mutex<Vec<(i64, String)>>,
    pub refunds: Mutex<Vec<(String, i64)>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_ref(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.sequence.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn authorize(
        &self,
        _amount_cents: i64,
        _payout_destination: &str,
        _metadata: PaymentMetadata,
    ) -> Result<AuthorizationRef, GatewayError> {
        Ok(AuthorizationRef(self.next_ref("pi")))
    }

    async fn void(
        &self,
        authorization: &AuthorizationRef,
        _reason: &str,
    ) -> Result<(), GatewayError> {
        self.voids.lock().unwrap().push(authorization.0.clone());
        Ok(())
    }

    async fn capture(&self, _authorization: &AuthorizationRef) -> Result<ChargeRef, GatewayError> {
        Ok(ChargeRef(self.next_ref("ch")))
    }

    async fn transfer(
        &self,
        amount_cents: i64,
        payout_destination: &str,
        _metadata: PaymentMetadata,
    ) -> Result<TransferRef, GatewayError> {
        self.transfers
            .lock()
            .unwrap()
            .push((amount_cents, payout_destination.to_string()));
        Ok(TransferRef(self.next_ref("tr")))
    }

    async fn refund(
        &self,
        charge: &ChargeRef,
        amount_cents: i64,
        _reason: &str,
    ) -> Result<RefundRef, GatewayError> {
        self.refunds
            .lock()
            .unwrap()
            .push((charge.0.clone(), amount_cents));
        Ok(RefundRef(self.next_ref("re")))
    }
}

/// Dispatcher that records events instead of delivering them
#[derive(Default)]
pub struct RecordingDispatcher {
    pub events: Mutex<Vec<(Uuid, NotificationEvent)>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds_for(&self, user_id: Uuid) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(recipient, _)| *recipient == user_id)
            .map(|(_, event)| event.kind())
            .collect()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn notify(
        &self,
        user_id: Uuid,
        event: NotificationEvent,
    ) -> Result<(), NotificationError> {
        self.events.lock().unwrap().push((user_id, event));
        Ok(())
    }
}

/// Decimal literal helper for test amounts
pub fn money(value: &str) -> Decimal {
    value.parse().unwrap()
}

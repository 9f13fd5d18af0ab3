//! End-to-end booking flow tests against the in-memory store
//!
//! These exercise the real service wiring with the store's compare-and-swap
//! semantics, a fake gateway and a recording dispatcher.

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use rentora_server::{
    config::{
        AppConfig, DatabaseConfig, EmailConfig, FeesConfig, GatewayConfig, LoggingConfig,
        PlatformConfig, ServerConfig,
    },
    error::AppError,
    models::{
        booking::HandoverEvidence,
        enums::{BookingStatus, DepositStatus, HandoverPhase},
        notification::NotificationEvent,
    },
    services::{bookings::BookingRequest, Services},
};

use crate::support::{money, FakeGateway, InMemoryStore, RecordingDispatcher};

struct Harness {
    store: InMemoryStore,
    gateway: Arc<FakeGateway>,
    dispatcher: Arc<RecordingDispatcher>,
    services: Services,
    owner_id: Uuid,
    renter_id: Uuid,
}

fn test_config(admin_user_id: Option<Uuid>) -> AppConfig {
    AppConfig {
        server: ServerConfig::default(),
        database: DatabaseConfig::default(),
        logging: LoggingConfig::default(),
        email: EmailConfig::default(),
        gateway: GatewayConfig::default(),
        fees: FeesConfig::default(),
        platform: PlatformConfig { admin_user_id },
    }
}

fn harness_with_admin(admin_user_id: Option<Uuid>) -> Harness {
    let store = InMemoryStore::new();
    let gateway = Arc::new(FakeGateway::new());
    let dispatcher = Arc::new(RecordingDispatcher::new());

    let owner_id = store.add_user(0, Some("acct_owner"));
    let renter_id = store.add_user(1000, None);

    let services = Services::new(
        &test_config(admin_user_id),
        Arc::new(store.clone()),
        gateway.clone(),
        dispatcher.clone(),
    );

    Harness { store, gateway, dispatcher, services, owner_id, renter_id }
}

fn harness() -> Harness {
    harness_with_admin(None)
}

fn request(owner_id: Uuid, points_used: i64) -> BookingRequest {
    let start = Utc::now() + Duration::days(7);
    BookingRequest {
        listing_id: Uuid::new_v4(),
        owner_id,
        start_date: start,
        end_date: start + Duration::days(3),
        daily_rate: money("50"),
        include_insurance: true,
        security_deposit: money("100"),
        delivery_fee: money("0"),
        points_used,
    }
}

fn photos(count: usize) -> HandoverEvidence {
    HandoverEvidence {
        photos: (0..count).map(|i| format!("https://cdn.example/{i}.jpg")).collect(),
        notes: None,
        damage_report: None,
    }
}

async fn book_and_pay(h: &Harness) -> Uuid {
    let outcome = h
        .services
        .bookings
        .create_booking(h.renter_id, request(h.owner_id, 0))
        .await
        .unwrap();
    let id = outcome.booking.id;
    h.services.bookings.approve(id, h.owner_id).await.unwrap();
    h.services.bookings.capture_payment(id, h.renter_id).await.unwrap();
    id
}

async fn start_rental(h: &Harness) -> Uuid {
    let id = book_and_pay(h).await;
    h.services
        .confirmations
        .confirm(id, h.renter_id, HandoverPhase::Pickup, photos(1))
        .await
        .unwrap();
    h.services
        .confirmations
        .confirm(id, h.owner_id, HandoverPhase::Pickup, photos(1))
        .await
        .unwrap();
    id
}

#[tokio::test]
async fn full_lifecycle_completes_and_settles() {
    let h = harness();
    let id = start_rental(&h).await;
    assert_eq!(h.store.booking(id).status, BookingStatus::InProgress);

    h.services
        .confirmations
        .confirm(id, h.renter_id, HandoverPhase::Return, photos(3))
        .await
        .unwrap();
    let outcome = h
        .services
        .confirmations
        .confirm(id, h.owner_id, HandoverPhase::Return, photos(3))
        .await
        .unwrap();

    assert_eq!(outcome.booking.status, BookingStatus::Completed);
    assert_eq!(outcome.booking.deposit_status, DepositStatus::Refunded);
    assert!(outcome.booking.transfer_ref.is_some());
    assert!(outcome.booking.deposit_refund_ref.is_some());
    assert!(outcome.warnings.is_empty());

    // Owner net: 150 subtotal minus 20% commission, in cents
    let transfers = h.gateway.transfers.lock().unwrap();
    assert_eq!(transfers.as_slice(), &[(12000, "acct_owner".to_string())]);
    drop(transfers);

    // Deposit slice refunded in full
    let refunds = h.gateway.refunds.lock().unwrap();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].1, 10000);
    drop(refunds);

    let owner_kinds = h.dispatcher.kinds_for(h.owner_id);
    assert!(owner_kinds.contains(&"booking_requested"));
    assert!(owner_kinds.contains(&"payout_released"));
    assert!(owner_kinds.contains(&"rental_completed"));
}

#[tokio::test]
async fn rejection_restores_points_exactly_once() {
    let h = harness();
    let outcome = h
        .services
        .bookings
        .create_booking(h.renter_id, request(h.owner_id, 200))
        .await
        .unwrap();
    let id = outcome.booking.id;
    assert_eq!(h.store.points_balance(h.renter_id), 1000);

    let outcome = h
        .services
        .bookings
        .reject(id, h.owner_id, "item damaged, unavailable".to_string())
        .await
        .unwrap();
    assert_eq!(outcome.booking.status, BookingStatus::Rejected);
    assert_eq!(h.store.points_balance(h.renter_id), 1200);

    // The hold was voided
    assert_eq!(h.gateway.voids.lock().unwrap().len(), 1);

    // Repeating the rejection hits the status guard and must not credit again
    let err = h
        .services
        .bookings
        .reject(id, h.owner_id, "again".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::WrongStatus(_)));
    assert_eq!(h.store.points_balance(h.renter_id), 1200);

    // Both parties were notified of the rejection
    assert!(h.dispatcher.kinds_for(h.renter_id).contains(&"booking_rejected"));
    assert!(h.dispatcher.kinds_for(h.owner_id).contains(&"booking_rejected"));
}

#[tokio::test]
async fn cancellation_voids_hold_and_notifies_counterparty() {
    let h = harness();
    let outcome = h
        .services
        .bookings
        .create_booking(h.renter_id, request(h.owner_id, 50))
        .await
        .unwrap();
    let id = outcome.booking.id;

    let outcome = h
        .services
        .bookings
        .cancel(id, h.renter_id, "found a better option".to_string())
        .await
        .unwrap();
    assert_eq!(outcome.booking.status, BookingStatus::Cancelled);
    assert_eq!(h.store.points_balance(h.renter_id), 1050);
    assert_eq!(h.gateway.voids.lock().unwrap().len(), 1);

    // Only the owner hears about the renter's cancellation
    assert!(h.dispatcher.kinds_for(h.owner_id).contains(&"booking_cancelled"));
    assert!(!h.dispatcher.kinds_for(h.renter_id).contains(&"booking_cancelled"));
}

#[tokio::test]
async fn pickup_confirmation_is_commutative() {
    // Renter first
    let h1 = harness();
    let id1 = book_and_pay(&h1).await;
    let first = h1
        .services
        .confirmations
        .confirm(id1, h1.renter_id, HandoverPhase::Pickup, photos(1))
        .await
        .unwrap();
    assert_eq!(first.booking.status, BookingStatus::Confirmed);
    assert!(first.booking.pickup_confirmed_by_renter);
    assert!(!first.booking.pickup_confirmed_by_owner);
    h1.services
        .confirmations
        .confirm(id1, h1.owner_id, HandoverPhase::Pickup, photos(1))
        .await
        .unwrap();

    // Owner first
    let h2 = harness();
    let id2 = book_and_pay(&h2).await;
    h2.services
        .confirmations
        .confirm(id2, h2.owner_id, HandoverPhase::Pickup, photos(1))
        .await
        .unwrap();
    h2.services
        .confirmations
        .confirm(id2, h2.renter_id, HandoverPhase::Pickup, photos(1))
        .await
        .unwrap();

    let b1 = h1.store.booking(id1);
    let b2 = h2.store.booking(id2);
    assert_eq!(b1.status, BookingStatus::InProgress);
    assert_eq!(b2.status, BookingStatus::InProgress);
    assert!(b1.pickup_confirmed_by_renter && b1.pickup_confirmed_by_owner);
    assert!(b2.pickup_confirmed_by_renter && b2.pickup_confirmed_by_owner);
}

#[tokio::test]
async fn reconfirming_fires_no_duplicate_rental_start() {
    let h = harness();
    let id = start_rental(&h).await;

    // A repeated confirmation after the rendezvous completed is rejected by
    // the status guard (pickup is only legal while awaiting pickup)
    let err = h
        .services
        .confirmations
        .confirm(id, h.renter_id, HandoverPhase::Pickup, photos(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::WrongStatus(_)));

    let starts = h
        .dispatcher
        .kinds_for(h.renter_id)
        .iter()
        .filter(|kind| **kind == "rental_started")
        .count();
    assert_eq!(starts, 1);
}

#[tokio::test]
async fn damage_report_holds_deposit_for_review() {
    let admin_id = Uuid::new_v4();
    let h = harness_with_admin(Some(admin_id));
    let id = start_rental(&h).await;

    h.services
        .confirmations
        .confirm(id, h.owner_id, HandoverPhase::Return, photos(4))
        .await
        .unwrap();

    let mut evidence = photos(4);
    evidence.damage_report = Some("deep scratches on the lens".to_string());
    let outcome = h
        .services
        .confirmations
        .confirm(id, h.renter_id, HandoverPhase::Return, evidence)
        .await
        .unwrap();

    assert_eq!(outcome.booking.status, BookingStatus::Completed);
    assert_eq!(outcome.booking.deposit_status, DepositStatus::FlaggedForReview);
    assert!(outcome.booking.damage_reported);

    // Payout still released, deposit not auto-refunded
    assert_eq!(h.gateway.transfers.lock().unwrap().len(), 1);
    assert!(h.gateway.refunds.lock().unwrap().is_empty());

    assert!(h.dispatcher.kinds_for(admin_id).contains(&"damage_reported"));
}

#[tokio::test]
async fn damage_filed_with_first_confirmation_reaches_review() {
    let admin_id = Uuid::new_v4();
    let h = harness_with_admin(Some(admin_id));
    let id = start_rental(&h).await;

    // The renter files the damage report first; the owner's clean
    // confirmation completes the return afterwards
    let mut evidence = photos(3);
    evidence.damage_report = Some("deep scratches on the lens".to_string());
    h.services
        .confirmations
        .confirm(id, h.renter_id, HandoverPhase::Return, evidence)
        .await
        .unwrap();

    let outcome = h
        .services
        .confirmations
        .confirm(id, h.owner_id, HandoverPhase::Return, photos(3))
        .await
        .unwrap();

    assert_eq!(outcome.booking.status, BookingStatus::Completed);
    assert_eq!(outcome.booking.deposit_status, DepositStatus::FlaggedForReview);
    assert_eq!(
        outcome.booking.damage_description.as_deref(),
        Some("deep scratches on the lens")
    );
    assert!(h.gateway.refunds.lock().unwrap().is_empty());

    // The review sees the filed description, not a generic placeholder
    let events = h.dispatcher.events.lock().unwrap();
    let admin_report = events.iter().find_map(|(recipient, event)| match event {
        NotificationEvent::DamageReported { description, .. } if *recipient == admin_id => {
            Some(description.clone())
        }
        _ => None,
    });
    assert_eq!(admin_report.as_deref(), Some("deep scratches on the lens"));
}

#[tokio::test]
async fn terminal_booking_refuses_every_mutation() {
    let h = harness();
    let id = start_rental(&h).await;
    h.services
        .confirmations
        .confirm(id, h.renter_id, HandoverPhase::Return, photos(3))
        .await
        .unwrap();
    h.services
        .confirmations
        .confirm(id, h.owner_id, HandoverPhase::Return, photos(3))
        .await
        .unwrap();
    assert_eq!(h.store.booking(id).status, BookingStatus::Completed);

    let approve = h.services.bookings.approve(id, h.owner_id).await.unwrap_err();
    let reject = h
        .services
        .bookings
        .reject(id, h.owner_id, "late".to_string())
        .await
        .unwrap_err();
    let cancel = h
        .services
        .bookings
        .cancel(id, h.renter_id, "late".to_string())
        .await
        .unwrap_err();
    let pay = h.services.bookings.capture_payment(id, h.renter_id).await.unwrap_err();

    for err in [approve, reject, cancel, pay] {
        assert!(matches!(err, AppError::WrongStatus(_)));
    }
    assert_eq!(h.store.booking(id).status, BookingStatus::Completed);
}

#[tokio::test]
async fn concurrent_approve_and_cancel_has_one_winner() {
    for _ in 0..20 {
        let h = harness();
        let outcome = h
            .services
            .bookings
            .create_booking(h.renter_id, request(h.owner_id, 100))
            .await
            .unwrap();
        let id = outcome.booking.id;

        let approve = h.services.bookings.approve(id, h.owner_id);
        let cancel = h
            .services
            .bookings
            .cancel(id, h.renter_id, "changed plans".to_string());

        let (approved, cancelled) = tokio::join!(approve, cancel);

        let final_status = h.store.booking(id).status;
        match (approved.is_ok(), cancelled.is_ok()) {
            (true, false) => assert_eq!(final_status, BookingStatus::PaymentRequired),
            (false, true) => {
                assert_eq!(final_status, BookingStatus::Cancelled);
                assert_eq!(h.store.points_balance(h.renter_id), 1100);
            }
            // A cancel can also legally follow a finished approve, since
            // payment_required still permits cancellation
            (true, true) => assert_eq!(final_status, BookingStatus::Cancelled),
            (false, false) => panic!("both transitions failed"),
        }
    }
}

#[tokio::test]
async fn booking_with_unonboarded_owner_fails_upfront() {
    let h = harness();
    let bare_owner = h.store.add_user(0, None);

    let err = h
        .services
        .bookings
        .create_booking(h.renter_id, request(bare_owner, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PayeeNotOnboarded(_)));
}

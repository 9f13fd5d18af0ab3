//! Business logic services

pub mod bookings;
pub mod confirmations;
pub mod notifications;
pub mod payments;

use std::sync::Arc;

use serde::Serialize;

use crate::{
    config::AppConfig,
    gateway::PaymentGateway,
    models::booking::Booking,
    repository::BookingStore,
};

/// A side effect that failed after the primary operation committed.
///
/// Distinct from errors: the transition stands, the money that moved stays
/// moved; these are surfaced for logs and admin follow-up, never shown to
/// the end user.
#[derive(Debug, Clone, Serialize)]
pub struct SideEffectWarning {
    pub operation: &'static str,
    pub detail: String,
}

impl SideEffectWarning {
    pub fn new(operation: &'static str, detail: String) -> Self {
        Self { operation, detail }
    }
}

/// Result of a booking mutation: the primary outcome plus any side-effect
/// warnings collected along the way
#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub warnings: Vec<SideEffectWarning>,
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub bookings: bookings::BookingsService,
    pub confirmations: confirmations::ConfirmationsService,
}

impl Services {
    /// Wire the services onto their collaborators. Store, gateway and
    /// dispatcher are injected rather than global, so tests swap them for
    /// mocks without touching the network.
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        dispatcher: Arc<dyn notifications::NotificationDispatcher>,
    ) -> Self {
        let payments = payments::PaymentsService::new(gateway, config.fees.clone());
        let notifier = notifications::Notifier::new(dispatcher);

        Self {
            bookings: bookings::BookingsService::new(
                store.clone(),
                payments.clone(),
                notifier.clone(),
                config.fees.clone(),
            ),
            confirmations: confirmations::ConfirmationsService::new(
                store,
                payments,
                notifier,
                config.platform.admin_user_id,
            ),
        }
    }
}

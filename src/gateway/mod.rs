//! Payment gateway interface
//!
//! The core drives the gateway through this narrow trait; the hosted
//! processor's wire format stays behind [`http::HttpPaymentGateway`].
//! All amounts crossing this boundary are integer minor units (cents).

pub mod http;

use async_trait::async_trait;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use thiserror::Error;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Reference to a held (not yet captured) charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRef(pub String);

/// Reference to a captured charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRef(pub String);

/// Reference to a payout transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRef(pub String);

/// Reference to a refund
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRef(pub String);

/// Metadata attached to every money movement for reconciliation
#[derive(Debug, Clone)]
pub struct PaymentMetadata {
    pub booking_id: Uuid,
    pub listing_id: Uuid,
}

/// Typed gateway failure, surfaced to the caller with the processor's
/// human-readable reason. Retry policy belongs to the caller, never here.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("payment declined: {0}")]
    Declined(String),

    #[error("payee has no payout destination: {0}")]
    PayeeNotOnboarded(String),

    /// Voiding an already-voided or already-captured authorization. Treated
    /// as a soft failure by callers: logged, not retried.
    #[error("authorization already finalized: {0}")]
    AlreadyFinalized(String),

    #[error("gateway transport error: {0}")]
    Network(String),

    #[error("gateway rejected the request: {0}")]
    Protocol(String),
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::PayeeNotOnboarded(msg) => AppError::PayeeNotOnboarded(msg),
            other => AppError::Gateway(other.to_string()),
        }
    }
}

/// Escrow-style payment operations against the hosted processor
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Place a hold for `amount_cents` against the renter's payment method.
    /// The hold is not captured until [`capture`](Self::capture).
    async fn authorize(
        &self,
        amount_cents: i64,
        payout_destination: &str,
        metadata: PaymentMetadata,
    ) -> Result<AuthorizationRef, GatewayError>;

    /// Cancel a hold without capturing funds
    async fn void(&self, authorization: &AuthorizationRef, reason: &str)
        -> Result<(), GatewayError>;

    /// Convert a hold into a captured charge. Captured funds land on the
    /// platform balance; the owner's share is released later via
    /// [`transfer`](Self::transfer).
    async fn capture(&self, authorization: &AuthorizationRef) -> Result<ChargeRef, GatewayError>;

    /// Transfer funds to the owner's payout destination
    async fn transfer(
        &self,
        amount_cents: i64,
        payout_destination: &str,
        metadata: PaymentMetadata,
    ) -> Result<TransferRef, GatewayError>;

    /// Refund part of a captured charge back to the renter
    async fn refund(
        &self,
        charge: &ChargeRef,
        amount_cents: i64,
        reason: &str,
    ) -> Result<RefundRef, GatewayError>;
}

/// Convert a decimal currency amount to integer minor units.
///
/// Amounts reaching this boundary are already rounded to cents by the
/// pricing calculator; a fractional cent here is a programming error, not a
/// user input problem.
pub fn to_minor_units(amount: Decimal) -> AppResult<i64> {
    let cents = amount * Decimal::from(100);
    if !cents.fract().is_zero() {
        return Err(AppError::Internal(format!(
            "fractional cents at gateway boundary: {}",
            amount
        )));
    }
    cents
        .to_i64()
        .ok_or_else(|| AppError::Internal(format!("amount out of range: {}", amount)))
}

/// Convert gateway minor units back to a decimal amount for storage
pub fn from_minor_units(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

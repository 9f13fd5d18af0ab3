//! HTTP implementation of the payment gateway interface
//!
//! Thin JSON client over the hosted processor's REST API. Every mutating
//! call carries an idempotency key derived from the operation and the
//! object it acts on, so a retried call replays the original result instead
//! of moving money twice.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::GatewayConfig;

use super::{
    AuthorizationRef, ChargeRef, GatewayError, PaymentGateway, PaymentMetadata, RefundRef,
    TransferRef,
};

#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

#[derive(Deserialize)]
struct GatewayObject {
    id: String,
}

#[derive(Deserialize)]
struct GatewayErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    async fn post(
        &self,
        path: &str,
        idempotency_key: String,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, GatewayError> {
        self.client
            .post(format!("{}{}", self.config.base_url, path))
            .bearer_auth(&self.config.secret_key)
            .header("Idempotency-Key", idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))
    }

    /// Map a non-success response onto the typed error taxonomy
    async fn decode_error(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let body: GatewayErrorBody = response
            .json()
            .await
            .unwrap_or(GatewayErrorBody { code: None, message: None });

        let message = body.message.unwrap_or_else(|| format!("HTTP {}", status));

        match body.code.as_deref() {
            Some("card_declined") | Some("insufficient_funds") => GatewayError::Declined(message),
            Some("payee_not_onboarded") | Some("payouts_not_enabled") => {
                GatewayError::PayeeNotOnboarded(message)
            }
            Some("intent_already_voided") | Some("intent_already_captured") => {
                GatewayError::AlreadyFinalized(message)
            }
            _ => GatewayError::Protocol(message),
        }
    }

    /// Deterministic per-operation key: retrying the same operation on the
    /// same object yields the same key, so the processor deduplicates it
    fn idempotency_key(operation: &str, reference: impl std::fmt::Display) -> String {
        format!("{}:{}", operation, reference)
    }

    async fn expect_object(response: reqwest::Response) -> Result<String, GatewayError> {
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }
        let object: GatewayObject = response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;
        Ok(object.id)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn authorize(
        &self,
        amount_cents: i64,
        payout_destination: &str,
        metadata: PaymentMetadata,
    ) -> Result<AuthorizationRef, GatewayError> {
        let response = self
            .post(
                "/payment_intents",
                Self::idempotency_key("authorize", metadata.booking_id),
                json!({
                    "amount": amount_cents,
                    "currency": self.config.currency,
                    "capture_method": "manual",
                    "on_behalf_of": payout_destination,
                    "metadata": {
                        "booking_id": metadata.booking_id,
                        "listing_id": metadata.listing_id,
                    },
                }),
            )
            .await?;

        Self::expect_object(response).await.map(AuthorizationRef)
    }

    async fn void(
        &self,
        authorization: &AuthorizationRef,
        reason: &str,
    ) -> Result<(), GatewayError> {
        let response = self
            .post(
                &format!("/payment_intents/{}/void", authorization.0),
                Self::idempotency_key("void", &authorization.0),
                json!({ "reason": reason }),
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }
        Ok(())
    }

    async fn capture(&self, authorization: &AuthorizationRef) -> Result<ChargeRef, GatewayError> {
        let response = self
            .post(
                &format!("/payment_intents/{}/capture", authorization.0),
                Self::idempotency_key("capture", &authorization.0),
                json!({}),
            )
            .await?;

        Self::expect_object(response).await.map(ChargeRef)
    }

    async fn transfer(
        &self,
        amount_cents: i64,
        payout_destination: &str,
        metadata: PaymentMetadata,
    ) -> Result<TransferRef, GatewayError> {
        let response = self
            .post(
                "/transfers",
                Self::idempotency_key("transfer", metadata.booking_id),
                json!({
                    "amount": amount_cents,
                    "currency": self.config.currency,
                    "destination": payout_destination,
                    "metadata": {
                        "booking_id": metadata.booking_id,
                        "listing_id": metadata.listing_id,
                    },
                }),
            )
            .await?;

        Self::expect_object(response).await.map(TransferRef)
    }

    async fn refund(
        &self,
        charge: &ChargeRef,
        amount_cents: i64,
        reason: &str,
    ) -> Result<RefundRef, GatewayError> {
        let response = self
            .post(
                "/refunds",
                Self::idempotency_key("refund", &charge.0),
                json!({
                    "charge": charge.0,
                    "amount": amount_cents,
                    "reason": reason,
                }),
            )
            .await?;

        Self::expect_object(response).await.map(RefundRef)
    }
}

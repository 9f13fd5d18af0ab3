//! Notification dispatch
//!
//! Fire-and-forget from the core's perspective: a failed delivery becomes a
//! logged warning on the operation outcome, never a request failure.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::EmailConfig,
    models::{enums::HandoverPhase, notification::NotificationEvent},
    repository::BookingStore,
};

use super::SideEffectWarning;

#[derive(Error, Debug)]
#[error("notification delivery failed: {0}")]
pub struct NotificationError(pub String);

/// Delivery channel for booking events
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, user_id: Uuid, event: NotificationEvent)
        -> Result<(), NotificationError>;
}

/// Wrapper that downgrades dispatch failures to outcome warnings
#[derive(Clone)]
pub struct Notifier {
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl Notifier {
    pub fn new(dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Dispatch an event, converting any failure into a warning
    pub async fn send(
        &self,
        user_id: Uuid,
        event: NotificationEvent,
        warnings: &mut Vec<SideEffectWarning>,
    ) {
        let kind = event.kind();
        if let Err(e) = self.dispatcher.notify(user_id, event).await {
            tracing::warn!(%user_id, event = kind, "notification dispatch failed: {}", e);
            warnings.push(SideEffectWarning::new(
                "notify",
                format!("{} to {}: {}", kind, user_id, e),
            ));
        }
    }
}

/// SMTP dispatcher rendering one message per event variant
#[derive(Clone)]
pub struct EmailDispatcher {
    config: EmailConfig,
    store: Arc<dyn BookingStore>,
}

impl EmailDispatcher {
    pub fn new(config: EmailConfig, store: Arc<dyn BookingStore>) -> Self {
        Self { config, store }
    }

    /// Subject and plain-text body for an event. Exhaustive on purpose:
    /// adding an event variant must force a rendering decision here.
    fn render(event: &NotificationEvent) -> (String, String) {
        match event {
            NotificationEvent::BookingRequested { booking_id, total_amount, .. } => (
                "New booking request".to_string(),
                format!(
                    "You received a booking request ({booking_id}) totalling {total_amount}.\n\
                     Approve or decline it from your dashboard."
                ),
            ),
            NotificationEvent::PaymentDue { booking_id, total_amount } => (
                "Booking approved - payment due".to_string(),
                format!(
                    "Your booking request ({booking_id}) was approved.\n\
                     Complete the payment of {total_amount} to confirm the rental."
                ),
            ),
            NotificationEvent::BookingRejected { booking_id, reason } => (
                "Booking declined".to_string(),
                format!("Your booking request ({booking_id}) was declined: {reason}"),
            ),
            NotificationEvent::BookingCancelled { booking_id, cancelled_by, reason } => (
                "Booking cancelled".to_string(),
                format!("Booking {booking_id} was cancelled by the {cancelled_by}: {reason}"),
            ),
            NotificationEvent::BookingConfirmed { booking_id } => (
                "Booking confirmed".to_string(),
                format!(
                    "Payment received for booking {booking_id}.\n\
                     Arrange the pickup with the other party."
                ),
            ),
            NotificationEvent::HandoverConfirmed { booking_id, phase, confirmed_by } => {
                let step = match phase {
                    HandoverPhase::Pickup => "pickup",
                    HandoverPhase::Return => "return",
                };
                (
                    format!("{} confirmation received", step),
                    format!(
                        "The {confirmed_by} confirmed the {step} for booking {booking_id}.\n\
                         Confirm on your side to proceed."
                    ),
                )
            }
            NotificationEvent::RentalStarted { booking_id } => (
                "Rental started".to_string(),
                format!("Both parties confirmed pickup for booking {booking_id}. Enjoy!"),
            ),
            NotificationEvent::RentalCompleted { booking_id, deposit_refunded } => (
                "Rental completed".to_string(),
                format!(
                    "Booking {booking_id} is complete.\n\
                     The security deposit of {deposit_refunded} is being refunded."
                ),
            ),
            NotificationEvent::DamageReported { booking_id, description } => (
                "Damage reported - review required".to_string(),
                format!(
                    "A damage report was filed on booking {booking_id}:\n{description}\n\
                     The deposit is held pending review."
                ),
            ),
            NotificationEvent::PayoutReleased { booking_id, amount } => (
                "Payout released".to_string(),
                format!("Your payout of {amount} for booking {booking_id} is on its way."),
            ),
        }
    }

    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Rentora");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| NotificationError(format!("invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| NotificationError(format!("invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><pre>{}</pre></body></html>"#,
                                body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| NotificationError(format!("failed to build email: {}", e)))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| NotificationError(format!("failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        mailer_builder
            .build()
            .send(&email)
            .map_err(|e| NotificationError(format!("failed to send email: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for EmailDispatcher {
    async fn notify(
        &self,
        user_id: Uuid,
        event: NotificationEvent,
    ) -> Result<(), NotificationError> {
        let user = self
            .store
            .get_user(user_id)
            .await
            .map_err(|e| NotificationError(format!("recipient lookup failed: {}", e)))?;

        let (subject, body) = Self::render(&event);
        self.send_email(&user.email, &subject, &body)
    }
}

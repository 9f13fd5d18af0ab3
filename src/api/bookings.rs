//! Booking lifecycle endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::booking::{Booking, HandoverEvidence},
    models::enums::HandoverPhase,
    services::bookings::BookingRequest,
};

use super::Actor;

/// Create booking request
#[derive(Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    pub listing_id: Uuid,
    pub owner_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Listing's daily rate in currency units
    pub daily_rate: Decimal,
    #[serde(default)]
    pub include_insurance: bool,
    #[serde(default)]
    pub security_deposit: Decimal,
    #[serde(default)]
    pub delivery_fee: Decimal,
    /// Loyalty points the renter redeems against this booking
    #[serde(default)]
    #[validate(range(min = 0))]
    pub points_used: i64,
}

/// Reason carried by a rejection or cancellation
#[derive(Deserialize, Validate, ToSchema)]
pub struct ReasonRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

/// Handover confirmation request
#[derive(Deserialize, Validate, ToSchema)]
pub struct ConfirmHandoverRequest {
    /// Evidence photo URLs
    #[serde(default)]
    #[validate(length(max = 8))]
    pub photos: Vec<String>,
    pub notes: Option<String>,
    /// Damage description; only meaningful on a return confirmation
    pub damage_report: Option<String>,
}

/// Booking response
#[derive(Serialize, ToSchema)]
pub struct BookingResponse {
    pub booking: Booking,
    pub message: String,
}

fn validated<T: Validate>(request: T) -> AppResult<T> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(request)
}

/// Request a booking (renter)
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking requested", body = BookingResponse),
        (status = 400, description = "Invalid request"),
        (status = 422, description = "Owner has not completed payout onboarding"),
        (status = 502, description = "Payment authorization failed")
    )
)]
pub async fn create_booking(
    State(state): State<crate::AppState>,
    Actor(actor_id): Actor,
    Json(request): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let request = validated(request)?;

    let outcome = state
        .services
        .bookings
        .create_booking(
            actor_id,
            BookingRequest {
                listing_id: request.listing_id,
                owner_id: request.owner_id,
                start_date: request.start_date,
                end_date: request.end_date,
                daily_rate: request.daily_rate,
                include_insurance: request.include_insurance,
                security_deposit: request.security_deposit,
                delivery_fee: request.delivery_fee,
                points_used: request.points_used,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            booking: outcome.booking,
            message: "Booking requested, awaiting owner approval".to_string(),
        }),
    ))
}

/// Get a booking (participants only)
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking details", body = Booking),
        (status = 403, description = "Not a party to this booking"),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn get_booking(
    State(state): State<crate::AppState>,
    Actor(actor_id): Actor,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<Booking>> {
    let booking = state.services.bookings.get_booking(booking_id, actor_id).await?;
    Ok(Json(booking))
}

/// Approve a pending booking (owner)
#[utoipa::path(
    post,
    path = "/bookings/{id}/approve",
    tag = "bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking approved, payment due", body = BookingResponse),
        (status = 403, description = "Only the owner may approve"),
        (status = 409, description = "Booking is not pending")
    )
)]
pub async fn approve_booking(
    State(state): State<crate::AppState>,
    Actor(actor_id): Actor,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let outcome = state.services.bookings.approve(booking_id, actor_id).await?;
    Ok(Json(BookingResponse {
        booking: outcome.booking,
        message: "Booking approved, renter notified to pay".to_string(),
    }))
}

/// Reject a pending booking (owner)
#[utoipa::path(
    post,
    path = "/bookings/{id}/reject",
    tag = "bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Booking rejected", body = BookingResponse),
        (status = 403, description = "Only the owner may reject"),
        (status = 409, description = "Booking is not pending")
    )
)]
pub async fn reject_booking(
    State(state): State<crate::AppState>,
    Actor(actor_id): Actor,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<ReasonRequest>,
) -> AppResult<Json<BookingResponse>> {
    let request = validated(request)?;
    let outcome = state
        .services
        .bookings
        .reject(booking_id, actor_id, request.reason)
        .await?;
    Ok(Json(BookingResponse {
        booking: outcome.booking,
        message: "Booking rejected".to_string(),
    }))
}

/// Cancel a booking before pickup (renter or owner)
#[utoipa::path(
    post,
    path = "/bookings/{id}/cancel",
    tag = "bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Booking cancelled", body = BookingResponse),
        (status = 403, description = "Not a party to this booking"),
        (status = 409, description = "Booking can no longer be cancelled")
    )
)]
pub async fn cancel_booking(
    State(state): State<crate::AppState>,
    Actor(actor_id): Actor,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<ReasonRequest>,
) -> AppResult<Json<BookingResponse>> {
    let request = validated(request)?;
    let outcome = state
        .services
        .bookings
        .cancel(booking_id, actor_id, request.reason)
        .await?;
    Ok(Json(BookingResponse {
        booking: outcome.booking,
        message: "Booking cancelled".to_string(),
    }))
}

/// Complete payment for an approved booking (renter)
#[utoipa::path(
    post,
    path = "/bookings/{id}/pay",
    tag = "bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Payment captured, booking confirmed", body = BookingResponse),
        (status = 403, description = "Only the renter may pay"),
        (status = 409, description = "Booking is not awaiting payment"),
        (status = 502, description = "Payment failed")
    )
)]
pub async fn pay_booking(
    State(state): State<crate::AppState>,
    Actor(actor_id): Actor,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let outcome = state
        .services
        .bookings
        .capture_payment(booking_id, actor_id)
        .await?;
    Ok(Json(BookingResponse {
        booking: outcome.booking,
        message: "Payment captured, booking confirmed".to_string(),
    }))
}

/// Confirm the pickup handover (renter or owner)
#[utoipa::path(
    post,
    path = "/bookings/{id}/confirm-pickup",
    tag = "bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = ConfirmHandoverRequest,
    responses(
        (status = 200, description = "Pickup confirmation recorded", body = BookingResponse),
        (status = 403, description = "Not a party to this booking"),
        (status = 409, description = "Booking is not awaiting pickup")
    )
)]
pub async fn confirm_pickup(
    State(state): State<crate::AppState>,
    Actor(actor_id): Actor,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<ConfirmHandoverRequest>,
) -> AppResult<Json<BookingResponse>> {
    confirm_handover(state, actor_id, booking_id, HandoverPhase::Pickup, request).await
}

/// Confirm the return handover (renter or owner)
#[utoipa::path(
    post,
    path = "/bookings/{id}/confirm-return",
    tag = "bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = ConfirmHandoverRequest,
    responses(
        (status = 200, description = "Return confirmation recorded", body = BookingResponse),
        (status = 400, description = "Evidence photo requirements not met"),
        (status = 403, description = "Not a party to this booking"),
        (status = 409, description = "Booking is not in progress")
    )
)]
pub async fn confirm_return(
    State(state): State<crate::AppState>,
    Actor(actor_id): Actor,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<ConfirmHandoverRequest>,
) -> AppResult<Json<BookingResponse>> {
    confirm_handover(state, actor_id, booking_id, HandoverPhase::Return, request).await
}

async fn confirm_handover(
    state: crate::AppState,
    actor_id: Uuid,
    booking_id: Uuid,
    phase: HandoverPhase,
    request: ConfirmHandoverRequest,
) -> AppResult<Json<BookingResponse>> {
    let request = validated(request)?;

    let outcome = state
        .services
        .confirmations
        .confirm(
            booking_id,
            actor_id,
            phase,
            HandoverEvidence {
                photos: request.photos,
                notes: request.notes,
                damage_report: request.damage_report,
            },
        )
        .await?;

    let message = match (phase, outcome.booking.phase_complete(phase)) {
        (HandoverPhase::Pickup, true) => "Pickup confirmed by both parties, rental started",
        (HandoverPhase::Pickup, false) => "Pickup confirmation recorded, awaiting the other party",
        (HandoverPhase::Return, true) => "Return confirmed by both parties, booking completed",
        (HandoverPhase::Return, false) => "Return confirmation recorded, awaiting the other party",
    };

    Ok(Json(BookingResponse {
        booking: outcome.booking,
        message: message.to_string(),
    }))
}

//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{bookings, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rentora API",
        version = "0.3.0",
        description = "Peer-to-peer rental marketplace booking API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Rentora Team", email = "dev@rentora.app")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Bookings
        bookings::create_booking,
        bookings::get_booking,
        bookings::approve_booking,
        bookings::reject_booking,
        bookings::cancel_booking,
        bookings::pay_booking,
        bookings::confirm_pickup,
        bookings::confirm_return,
    ),
    components(
        schemas(
            health::HealthResponse,
            bookings::CreateBookingRequest,
            bookings::ReasonRequest,
            bookings::ConfirmHandoverRequest,
            bookings::BookingResponse,
            crate::error::ErrorResponse,
            crate::models::booking::Booking,
            crate::models::booking::User,
            crate::models::booking::HandoverEvidence,
            crate::models::enums::BookingStatus,
            crate::models::enums::Party,
            crate::models::enums::HandoverPhase,
            crate::models::enums::DepositStatus,
            crate::pricing::PricingBreakdown,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "bookings", description = "Booking lifecycle: request, approval, payment, handover")
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI document and Swagger UI
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

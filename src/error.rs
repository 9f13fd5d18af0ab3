//! Error types for Rentora server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchUser = 4,
    NoSuchBooking = 5,
    BadValue = 6,
    WrongStatus = 7,
    Conflict = 8,
    PaymentFailed = 9,
    PayeeNotOnboarded = 10,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Transition attempted from the wrong booking status. Always rejected
    /// before any side effect.
    #[error("Wrong status: {0}")]
    WrongStatus(String),

    /// Another transition won the compare-and-swap on the same booking.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The payee has no payout destination configured with the gateway.
    #[error("Payee not onboarded: {0}")]
    PayeeNotOnboarded(String),

    /// Gateway-side payment failure. The booking status is left unchanged;
    /// the reason is logged and the client sees a generic message.
    #[error("Payment failed: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchBooking, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::WrongStatus(msg) => {
                (StatusCode::CONFLICT, ErrorCode::WrongStatus, msg.clone())
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Conflict, msg.clone())
            }
            AppError::PayeeNotOnboarded(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::PayeeNotOnboarded, msg.clone())
            }
            AppError::Gateway(reason) => {
                tracing::warn!("Gateway error: {}", reason);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorCode::PaymentFailed,
                    "Payment failed, please try again".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

//! API handlers for Rentora REST endpoints

pub mod bookings;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use uuid::Uuid;

use crate::{error::AppError, AppState};

/// Extractor for the acting user.
///
/// Authentication happens upstream (API gateway); by the time a request
/// reaches this service the verified caller identity is carried in the
/// `X-User-Id` header. The booking core still performs its own role checks
/// (renter vs owner) against the booking record.
pub struct Actor(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authorization("Missing X-User-Id header".to_string()))?;

        let user_id = header
            .parse::<Uuid>()
            .map_err(|_| AppError::Authorization("Invalid X-User-Id header".to_string()))?;

        Ok(Actor(user_id))
    }
}

//! Rentora - Peer-to-Peer Rental Marketplace
//!
//! Booking server for the Rentora marketplace: booking lifecycle, pricing,
//! escrow-style payment orchestration and two-party handover confirmation,
//! exposed as a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod pricing;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    /// Kept alongside the services for the readiness probe
    pub db: sqlx::PgPool,
}

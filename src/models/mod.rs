//! Domain models for the booking core

pub mod booking;
pub mod enums;
pub mod notification;

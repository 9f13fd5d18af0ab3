//! Integration tests

mod api_tests;
mod booking_flow;
mod support;

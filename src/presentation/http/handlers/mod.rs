//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints.

pub mod admin;
pub mod auth;
pub mod booking;
pub mod device;
pub mod health;
pub mod hotel;
pub mod invoice;
pub mod rfid;
pub mod search;
pub mod tag;

//! Integration Tests Entry Point
//!
//! Tests are organized by module:
//! - `api/` - HTTP routing, auth guards and request validation
//! - `common/` - Shared test utilities

mod api;
mod common;

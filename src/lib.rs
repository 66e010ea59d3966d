//! # HotelFlow Library
//!
//! Hotel booking platform with:
//! - Hotel, room and service catalog with tags and images
//! - Multi-room bookings with guests and generated invoices
//! - Date-windowed RFID key reservations and door terminals
//! - PostgreSQL for persistent storage
//! - Optional Redis for catalog caching and rate limiting
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Entities, repository traits and the reservation rules
//! - **Application Layer**: Business services and DTOs
//! - **Infrastructure Layer**: Database, cache, PDF and webhook implementations
//! - **Presentation Layer**: HTTP handlers and middleware
//!
//! ## Module Structure
//!
//! ```text
//! hotelflow/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, reservation rules
//! +-- application/    Services and DTOs
//! +-- infrastructure/ Postgres, Redis, invoices, notifications, metrics
//! +-- presentation/   HTTP routes and middleware
//! +-- shared/         Errors, snowflake IDs, tokens, validation
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;

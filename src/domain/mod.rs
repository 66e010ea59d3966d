//! # Domain Layer
//!
//! The domain layer contains the core business rules of the booking platform.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Core domain entities (Hotel, Room, Booking, RfidKey, etc.)
//! - **value_objects**: Immutable value types (StayPeriod, AssignmentWindow)
//! - **services**: Reservation engine, pricing and stay planning
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Invariants are checked by pure functions the repositories call inside
//!   their transactions

pub mod entities;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use value_objects::*;

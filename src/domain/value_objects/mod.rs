//! Value Objects
//!
//! Immutable value types shared by entities and domain services.

mod stay_period;

pub use stay_period::{AssignmentWindow, PeriodError, StayPeriod};

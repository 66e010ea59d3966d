//! # Domain Services
//!
//! Business rules that span several entities. Everything here is pure and
//! runs without I/O, so repositories can apply it inside their transactions.
//!
//! ## Services
//!
//! - **reservation**: room conflicts, key windows, key state and door access
//! - **PricingService**: stay charges, invoice totals and line items
//! - **StayPlanner**: room combinations for a party size
//! - **ranking**: recommendation scores

mod pricing;
mod ranking;
pub mod reservation;
mod stay_planner;

pub use pricing::{InvoiceTotals, LineItem, PriceOverflow, PricingService};
pub use ranking::{rank_hotels, RankedHotel};
pub use reservation::{AccessDecision, ReservationError, RoomConflict};
pub use stay_planner::{PlanLabel, PlannedRoom, StayPlan, StayPlanner};

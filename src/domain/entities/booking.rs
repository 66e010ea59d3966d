//! Booking entity, its guests and billing details, and the repository trait.
//!
//! Maps to `bookings`, `booking_rooms`, `booking_services`, `guests` and
//! `booking_invoice_details`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::room::Room;
use super::service_item::ServiceItem;
use crate::domain::value_objects::{PeriodError, StayPeriod};
use crate::shared::error::AppError;

/// Booking lifecycle status.
///
/// ```text
/// pending -> confirmed -> active -> finished
///    |          |  \________________/^
///    v          v
/// cancelled  cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    /// Guest is checked in
    Active,
    Cancelled,
    Finished,
}

impl BookingStatus {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "active" => Some(Self::Active),
            "cancelled" => Some(Self::Cancelled),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Finished => "finished",
        }
    }

    /// Statuses that keep the booked rooms occupied.
    pub const HOLDING: [BookingStatus; 3] = [Self::Pending, Self::Confirmed, Self::Active];

    pub fn holds_rooms(&self) -> bool {
        Self::HOLDING.contains(self)
    }

    /// Keys may only be issued for confirmed or checked-in bookings.
    pub fn accepts_keys(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Active)
    }

    /// Entering this status releases every key assignment of the booking.
    pub fn releases_keys(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Finished)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Finished)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Active)
                | (Confirmed, Cancelled)
                | (Confirmed, Finished)
                | (Active, Finished)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Front-desk check-in state recorded by devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    CheckedIn,
    CheckedOut,
}

impl CheckInStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "checked_in" | "checkedin" => Some(Self::CheckedIn),
            "checked_out" | "checkedout" => Some(Self::CheckedOut),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckedIn => "checked_in",
            Self::CheckedOut => "checked_out",
        }
    }
}

/// A reservation of one or more rooms of a single hotel.
///
/// Maps to the `bookings` table:
/// - id: BIGINT PRIMARY KEY
/// - user_id: BIGINT NOT NULL REFERENCES users(id)
/// - hotel_id: BIGINT NOT NULL REFERENCES hotels(id)
/// - start_date, end_date: DATE NOT NULL CHECK (end_date > start_date)
/// - total_price: BIGINT NOT NULL
/// - status: VARCHAR(20) NOT NULL
/// - check_in_token: VARCHAR(64) NULL UNIQUE
/// - check_in_status: VARCHAR(20) NULL, check_in_time / check_out_time: TIMESTAMPTZ NULL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub hotel_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: i64,
    pub status: BookingStatus,
    pub check_in_token: Option<String>,
    pub check_in_status: Option<CheckInStatus>,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn period(&self) -> Result<StayPeriod, PeriodError> {
        StayPeriod::new(self.start_date, self.end_date)
    }

    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days().max(0)
    }
}

/// A person staying under a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: i64,
    pub booking_id: i64,
    pub name: String,
    pub id_number: String,
    pub date_of_birth: Option<NaiveDate>,
}

/// Invoice addressee kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    #[default]
    Private,
    Business,
}

impl CustomerType {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "business" => Self::Business,
            _ => Self::Private,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Business => "business",
        }
    }
}

/// Billing data captured with the booking, used as the invoice buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InvoiceDetail {
    pub booking_id: i64,
    pub customer_type: CustomerType,
    pub full_name: String,
    pub email: String,
    pub company_name: Option<String>,
    pub tax_number: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub address_line: Option<String>,
    pub note: Option<String>,
}

/// Everything needed to insert a booking atomically.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: i64,
    pub user_id: i64,
    pub hotel_id: i64,
    pub period: StayPeriod,
    pub room_ids: Vec<i64>,
    pub service_ids: Vec<i64>,
    pub total_price: i64,
    pub guests: Vec<Guest>,
    pub invoice_detail: Option<InvoiceDetail>,
}

/// An existing booking occupying a room, used for conflict checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomOccupancy {
    pub room_id: i64,
    pub booking_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
}

/// A status change applied with optimistic concurrency on `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub booking_id: i64,
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub check_in_token: Option<String>,
    pub check_in_status: Option<CheckInStatus>,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
}

impl StatusChange {
    pub fn new(booking_id: i64, from: BookingStatus, to: BookingStatus) -> Self {
        Self {
            booking_id,
            from,
            to,
            check_in_token: None,
            check_in_status: None,
            check_in_time: None,
            check_out_time: None,
        }
    }
}

/// Result of a status change or deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChangeOutcome {
    pub booking: Booking,
    /// Key assignments released in the same transaction
    pub released_assignments: u64,
}

/// Rooms of a booking, keyed by booking id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRoomLink {
    pub booking_id: i64,
    pub room: Room,
}

/// Booking list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub user_id: Option<i64>,
    pub hotel_id: Option<i64>,
    pub statuses: Vec<BookingStatus>,
}

/// Repository trait for bookings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a booking, its room and service links, guests and billing details.
    ///
    /// Locks the requested rooms and rejects the insert with a conflict if any
    /// holding booking of those rooms overlaps the requested period.
    async fn reserve(&self, booking: &NewBooking) -> Result<Booking, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>, AppError>;

    async fn find_by_check_in_token(&self, token: &str) -> Result<Option<Booking>, AppError>;

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError>;

    async fn rooms_of(&self, booking_id: i64) -> Result<Vec<Room>, AppError>;

    async fn room_links(&self, booking_ids: &[i64]) -> Result<Vec<BookingRoomLink>, AppError>;

    async fn services_of(&self, booking_id: i64) -> Result<Vec<ServiceItem>, AppError>;

    /// Apply a status change if the booking is still in `change.from`.
    /// Releases the booking's key assignments in the same transaction when
    /// the target status releases keys.
    async fn transition(&self, change: &StatusChange) -> Result<StatusChangeOutcome, AppError>;

    /// Record check-in fields without changing status.
    async fn record_check_in(
        &self,
        booking_id: i64,
        check_in_status: Option<CheckInStatus>,
        check_in_time: Option<DateTime<Utc>>,
        check_out_time: Option<DateTime<Utc>>,
    ) -> Result<Booking, AppError>;

    /// Release key assignments and delete the booking.
    async fn delete(&self, id: i64) -> Result<StatusChangeOutcome, AppError>;

    async fn list_guests(&self, booking_id: i64) -> Result<Vec<Guest>, AppError>;

    /// Add guests, rejecting the whole batch if the total would exceed `max_guests`.
    async fn add_guests(
        &self,
        booking_id: i64,
        guests: &[Guest],
        max_guests: i64,
    ) -> Result<Vec<Guest>, AppError>;

    async fn find_guest(&self, id: i64) -> Result<Option<Guest>, AppError>;

    async fn update_guest(&self, guest: &Guest) -> Result<Guest, AppError>;

    async fn delete_guest(&self, id: i64) -> Result<(), AppError>;

    async fn invoice_detail(&self, booking_id: i64) -> Result<Option<InvoiceDetail>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use BookingStatus::*;

    #[test_case(Pending, Confirmed, true)]
    #[test_case(Pending, Cancelled, true)]
    #[test_case(Pending, Active, false)]
    #[test_case(Pending, Finished, false)]
    #[test_case(Confirmed, Active, true)]
    #[test_case(Confirmed, Finished, true)]
    #[test_case(Confirmed, Cancelled, true)]
    #[test_case(Confirmed, Pending, false)]
    #[test_case(Active, Finished, true)]
    #[test_case(Active, Cancelled, false)]
    #[test_case(Cancelled, Confirmed, false)]
    #[test_case(Finished, Active, false)]
    fn test_status_transitions(from: BookingStatus, to: BookingStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test_case(Pending, true, false, false)]
    #[test_case(Confirmed, true, true, false)]
    #[test_case(Active, true, true, false)]
    #[test_case(Cancelled, false, false, true)]
    #[test_case(Finished, false, false, true)]
    fn test_status_predicates(status: BookingStatus, holds: bool, accepts: bool, releases: bool) {
        assert_eq!(status.holds_rooms(), holds);
        assert_eq!(status.accepts_keys(), accepts);
        assert_eq!(status.releases_keys(), releases);
    }

    #[test]
    fn test_every_exit_from_holding_releases_keys() {
        for from in BookingStatus::HOLDING {
            for to in [Pending, Confirmed, Active, Cancelled, Finished] {
                if from.can_transition_to(to) && !to.holds_rooms() {
                    assert!(to.releases_keys(), "{from} -> {to} keeps keys");
                }
            }
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [Pending, Confirmed, Active, Cancelled, Finished] {
            assert_eq!(BookingStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::from_str("unknown"), None);
    }

    #[test]
    fn test_check_in_status_accepts_legacy_spelling() {
        assert_eq!(CheckInStatus::from_str("checkedIn"), Some(CheckInStatus::CheckedIn));
        assert_eq!(CheckInStatus::from_str("checked_out"), Some(CheckInStatus::CheckedOut));
    }
}

//! RFID key cards and their date-windowed room assignments.
//!
//! Maps to `rfid_keys` and `rfid_assignments`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{AssignmentWindow, PeriodError};
use crate::shared::error::AppError;

/// Stored key status. Whether a key is currently handed out is derived
/// from its assignments, see [`KeyState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RfidKeyStatus {
    #[default]
    Available,
    Lost,
    Disabled,
}

impl RfidKeyStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "available" => Some(Self::Available),
            "lost" => Some(Self::Lost),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Lost => "lost",
            Self::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for RfidKeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Effective state of a key on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyState {
    Available,
    Assigned,
    Lost,
    Disabled,
}

/// A physical key card.
///
/// Maps to the `rfid_keys` table:
/// - id: BIGINT PRIMARY KEY
/// - hotel_id: BIGINT NOT NULL REFERENCES hotels(id)
/// - uid: VARCHAR(64) NOT NULL UNIQUE (card serial)
/// - label: VARCHAR(100) NULL
/// - status: VARCHAR(20) NOT NULL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfidKey {
    pub id: i64,
    pub hotel_id: i64,
    pub uid: String,
    pub label: Option<String>,
    pub status: RfidKeyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A key reserved for a room over a window, optionally for a booking.
///
/// Maps to the `rfid_assignments` table. Unreleased rows of one key never
/// overlap unless they belong to the same reservation; an exclusion
/// constraint enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfidAssignment {
    pub id: i64,
    /// Shared by the rows of one assignment request, one per room
    pub reservation_id: i64,
    pub rfid_key_id: i64,
    /// None for manual room assignments (staff, maintenance)
    pub booking_id: Option<i64>,
    pub room_id: i64,
    pub reserved_from: NaiveDate,
    /// None means open-ended
    pub reserved_to: Option<NaiveDate>,
    pub assigned_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl RfidAssignment {
    pub fn window(&self) -> Result<AssignmentWindow, PeriodError> {
        AssignmentWindow::from_parts(self.reserved_from, self.reserved_to)
    }

    pub fn is_released(&self) -> bool {
        self.released_at.is_some()
    }
}

/// Assignment to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAssignment {
    pub id: i64,
    pub reservation_id: i64,
    pub rfid_key_id: i64,
    pub booking_id: Option<i64>,
    pub room_id: i64,
    pub window: AssignmentWindow,
}

/// Key list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFilter {
    pub hotel_id: Option<i64>,
    pub status: Option<RfidKeyStatus>,
    /// Case-insensitive fragment of the uid or label
    pub search: Option<String>,
}

/// Calendar row: an assignment with the names needed to display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub assignment: RfidAssignment,
    pub key_uid: String,
    pub key_label: Option<String>,
    pub room_name: String,
    pub guest_name: Option<String>,
}

/// Repository trait for keys and assignments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RfidRepository: Send + Sync {
    async fn list_keys(&self, filter: &KeyFilter) -> Result<Vec<RfidKey>, AppError>;

    async fn find_key(&self, id: i64) -> Result<Option<RfidKey>, AppError>;

    async fn find_key_by_uid(&self, uid: &str) -> Result<Option<RfidKey>, AppError>;

    async fn create_key(&self, key: &RfidKey) -> Result<RfidKey, AppError>;

    /// Update uid, label and status. Moving to lost or disabled is rejected
    /// while the key has unreleased assignments.
    async fn update_key(&self, key: &RfidKey) -> Result<RfidKey, AppError>;

    /// Delete a key without unreleased assignments.
    async fn delete_key(&self, id: i64) -> Result<(), AppError>;

    /// Lock the key, validate the reservation against its unreleased
    /// assignments and insert every row, or none.
    async fn assign(
        &self,
        key_id: i64,
        assignments: &[NewAssignment],
    ) -> Result<Vec<RfidAssignment>, AppError>;

    /// Release one assignment, or every unreleased one when `assignment_id` is None.
    async fn release(
        &self,
        key_id: i64,
        assignment_id: Option<i64>,
    ) -> Result<Vec<RfidAssignment>, AppError>;

    async fn assignments_for_key(
        &self,
        key_id: i64,
        include_released: bool,
    ) -> Result<Vec<RfidAssignment>, AppError>;

    /// Unreleased assignments of every key of a hotel.
    async fn unreleased_for_hotel(&self, hotel_id: i64) -> Result<Vec<RfidAssignment>, AppError>;

    /// Assignments of a hotel's keys whose windows intersect `[from, to)`.
    async fn calendar(
        &self,
        hotel_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        key_id: Option<i64>,
    ) -> Result<Vec<CalendarEntry>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_status_round_trip() {
        for status in [RfidKeyStatus::Available, RfidKeyStatus::Lost, RfidKeyStatus::Disabled] {
            assert_eq!(RfidKeyStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(RfidKeyStatus::from_str("assigned"), None);
    }

    #[test]
    fn test_assignment_window() {
        let assignment = RfidAssignment {
            id: 1,
            reservation_id: 1,
            rfid_key_id: 2,
            booking_id: None,
            room_id: 3,
            reserved_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            reserved_to: None,
            assigned_at: Utc::now(),
            released_at: None,
        };
        assert!(assignment.window().unwrap().is_open_ended());
        assert!(!assignment.is_released());
    }
}

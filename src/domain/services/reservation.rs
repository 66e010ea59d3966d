//! Reservation rules for rooms and RFID keys.
//!
//! Everything here is pure. Repositories call these checks inside the
//! transaction that holds the row locks, so the decision and the write see
//! the same state.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::entities::{
    Booking, BookingStatus, KeyState, NewAssignment, RfidAssignment, RfidKey, RfidKeyStatus,
    RoomOccupancy,
};
use crate::domain::value_objects::{AssignmentWindow, PeriodError, StayPeriod};
use crate::shared::error::AppError;

/// A requested room already held by another booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoomConflict {
    pub room_id: i64,
    pub booking_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Why a reservation rule rejected an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReservationError {
    #[error("rooms already booked for these dates: {}", room_list(.0))]
    RoomConflict(Vec<RoomConflict>),

    #[error("booking cannot move from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("key is {0} and cannot be assigned")]
    KeyUnavailable(RfidKeyStatus),

    #[error("key is already reserved by assignment {assignment_id} for an overlapping window")]
    KeyWindowConflict { assignment_id: i64 },

    #[error("a key reservation needs at least one room")]
    EmptyReservation,

    #[error("rooms of one key reservation must share its window")]
    SplitReservation,

    #[error("key has {0} unreleased assignment(s)")]
    KeyInUse(usize),

    #[error("keys can only be issued for confirmed or active bookings, booking is {0}")]
    BookingNotEligible(BookingStatus),

    #[error("room {0} is not part of the booking")]
    RoomNotInBooking(i64),

    #[error(transparent)]
    InvalidPeriod(#[from] PeriodError),
}

/// Contention on a room or key is a 409, anything else a malformed request.
impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::RoomConflict(_)
            | ReservationError::KeyWindowConflict { .. }
            | ReservationError::KeyInUse(_) => AppError::Conflict(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

fn room_list(conflicts: &[RoomConflict]) -> String {
    let mut ids: Vec<i64> = conflicts.iter().map(|c| c.room_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Conflicts between a requested stay and existing occupancies of the requested rooms.
///
/// Only holding bookings count; `ignore_booking` excludes the booking being edited.
pub fn find_room_conflicts(
    requested_rooms: &[i64],
    period: &StayPeriod,
    occupancies: &[RoomOccupancy],
    ignore_booking: Option<i64>,
) -> Vec<RoomConflict> {
    occupancies
        .iter()
        .filter(|o| requested_rooms.contains(&o.room_id))
        .filter(|o| o.status.holds_rooms())
        .filter(|o| Some(o.booking_id) != ignore_booking)
        .filter(|o| o.start_date < period.end() && period.start() < o.end_date)
        .map(|o| RoomConflict {
            room_id: o.room_id,
            booking_id: o.booking_id,
            start_date: o.start_date,
            end_date: o.end_date,
        })
        .collect()
}

/// Reject a new stay if any requested room is taken.
pub fn ensure_rooms_free(
    requested_rooms: &[i64],
    period: &StayPeriod,
    occupancies: &[RoomOccupancy],
) -> Result<(), ReservationError> {
    let conflicts = find_room_conflicts(requested_rooms, period, occupancies, None);
    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(ReservationError::RoomConflict(conflicts))
    }
}

pub fn ensure_transition(from: BookingStatus, to: BookingStatus) -> Result<(), ReservationError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ReservationError::InvalidTransition { from, to })
    }
}

/// Stored windows are validated on insert; a corrupt one is treated as open-ended.
fn stored_window(assignment: &RfidAssignment) -> AssignmentWindow {
    assignment
        .window()
        .unwrap_or_else(|_| AssignmentWindow::open_ended(assignment.reserved_from))
}

/// Validate a key reservation, one row per room, against the key's unreleased assignments.
///
/// Rows of one reservation share its window, so only other reservations can clash.
pub fn check_key_reservation(
    key: &RfidKey,
    requested: &[NewAssignment],
    existing: &[RfidAssignment],
) -> Result<AssignmentWindow, ReservationError> {
    if key.status != RfidKeyStatus::Available {
        return Err(ReservationError::KeyUnavailable(key.status));
    }

    let first = requested.first().ok_or(ReservationError::EmptyReservation)?;
    if requested
        .iter()
        .any(|a| a.reservation_id != first.reservation_id || a.window != first.window)
    {
        return Err(ReservationError::SplitReservation);
    }

    if let Some(clash) = existing
        .iter()
        .filter(|a| !a.is_released() && a.reservation_id != first.reservation_id)
        .find(|a| stored_window(a).overlaps(&first.window))
    {
        return Err(ReservationError::KeyWindowConflict {
            assignment_id: clash.id,
        });
    }

    Ok(first.window)
}

/// Window for issuing a key to a booking's room.
pub fn booking_key_window(
    booking: &Booking,
    booking_room_ids: &[i64],
    room_id: i64,
) -> Result<AssignmentWindow, ReservationError> {
    if !booking.status.accepts_keys() {
        return Err(ReservationError::BookingNotEligible(booking.status));
    }
    if !booking_room_ids.contains(&room_id) {
        return Err(ReservationError::RoomNotInBooking(room_id));
    }
    Ok(AssignmentWindow::bounded(booking.period()?))
}

/// A key may be marked lost or disabled only when nothing is reserved on it.
pub fn ensure_status_change_allowed(
    next: RfidKeyStatus,
    unreleased: &[RfidAssignment],
) -> Result<(), ReservationError> {
    let open = unreleased.iter().filter(|a| !a.is_released()).count();
    if next != RfidKeyStatus::Available && open > 0 {
        return Err(ReservationError::KeyInUse(open));
    }
    Ok(())
}

/// A key can be deleted only when nothing is reserved on it.
pub fn ensure_deletable(unreleased: &[RfidAssignment]) -> Result<(), ReservationError> {
    let open = unreleased.iter().filter(|a| !a.is_released()).count();
    if open > 0 {
        return Err(ReservationError::KeyInUse(open));
    }
    Ok(())
}

/// Effective state of a key on `date`.
pub fn key_state_on(key: &RfidKey, assignments: &[RfidAssignment], date: NaiveDate) -> KeyState {
    match key.status {
        RfidKeyStatus::Lost => KeyState::Lost,
        RfidKeyStatus::Disabled => KeyState::Disabled,
        RfidKeyStatus::Available => {
            let covered = assignments
                .iter()
                .filter(|a| a.rfid_key_id == key.id && !a.is_released())
                .any(|a| stored_window(a).covers(date));
            if covered {
                KeyState::Assigned
            } else {
                KeyState::Available
            }
        }
    }
}

/// Door decision for a card presented at a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    Granted,
    KeyLost,
    KeyDisabled,
    NotAssigned,
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Whether `key` opens `room_id` on `date`.
pub fn grants_access(
    key: &RfidKey,
    assignments: &[RfidAssignment],
    room_id: i64,
    date: NaiveDate,
) -> AccessDecision {
    match key.status {
        RfidKeyStatus::Lost => AccessDecision::KeyLost,
        RfidKeyStatus::Disabled => AccessDecision::KeyDisabled,
        RfidKeyStatus::Available => {
            let open = assignments.iter().any(|a| {
                a.rfid_key_id == key.id
                    && a.room_id == room_id
                    && !a.is_released()
                    && stored_window(a).covers(date)
            });
            if open {
                AccessDecision::Granted
            } else {
                AccessDecision::NotAssigned
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, day).unwrap()
    }

    fn period(a: u32, b: u32) -> StayPeriod {
        StayPeriod::new(d(a), d(b)).unwrap()
    }

    fn occupancy(room_id: i64, booking_id: i64, a: u32, b: u32, status: BookingStatus) -> RoomOccupancy {
        RoomOccupancy {
            room_id,
            booking_id,
            start_date: d(a),
            end_date: d(b),
            status,
        }
    }

    fn key(status: RfidKeyStatus) -> RfidKey {
        RfidKey {
            id: 10,
            hotel_id: 1,
            uid: "04A1B2C3".into(),
            label: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn assignment(id: i64, room_id: i64, from: u32, to: Option<u32>, released: bool) -> RfidAssignment {
        RfidAssignment {
            id,
            reservation_id: id,
            rfid_key_id: 10,
            booking_id: None,
            room_id,
            reserved_from: d(from),
            reserved_to: to.map(d),
            assigned_at: Utc::now(),
            released_at: released.then(Utc::now),
        }
    }

    fn booking(status: BookingStatus) -> Booking {
        Booking {
            id: 99,
            user_id: 1,
            hotel_id: 1,
            start_date: d(10),
            end_date: d(12),
            total_price: 10_000,
            status,
            check_in_token: None,
            check_in_status: None,
            check_in_time: None,
            check_out_time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_room_conflicts_only_for_requested_overlapping_holding_bookings() {
        let occupancies = vec![
            occupancy(1, 100, 1, 5, BookingStatus::Confirmed),
            occupancy(1, 101, 5, 8, BookingStatus::Cancelled),
            occupancy(2, 102, 3, 4, BookingStatus::Pending),
            occupancy(3, 103, 1, 10, BookingStatus::Active),
        ];

        let conflicts = find_room_conflicts(&[1, 2], &period(4, 6), &occupancies, None);

        assert_eq!(
            conflicts,
            vec![RoomConflict {
                room_id: 1,
                booking_id: 100,
                start_date: d(1),
                end_date: d(5),
            }]
        );
    }

    #[test]
    fn test_checkout_day_is_free_for_next_checkin() {
        let occupancies = vec![occupancy(1, 100, 1, 5, BookingStatus::Confirmed)];
        assert!(ensure_rooms_free(&[1], &period(5, 7), &occupancies).is_ok());
    }

    #[test]
    fn test_conflict_error_lists_rooms() {
        let occupancies = vec![
            occupancy(2, 100, 1, 5, BookingStatus::Confirmed),
            occupancy(1, 101, 1, 5, BookingStatus::Pending),
        ];
        let err = ensure_rooms_free(&[1, 2], &period(2, 3), &occupancies).unwrap_err();
        assert_eq!(err.to_string(), "rooms already booked for these dates: 1, 2");
    }

    #[test]
    fn test_ignore_booking_excludes_itself() {
        let occupancies = vec![occupancy(1, 100, 1, 5, BookingStatus::Confirmed)];
        assert!(find_room_conflicts(&[1], &period(2, 3), &occupancies, Some(100)).is_empty());
    }

    fn request(reservation_id: i64, room_id: i64, window: AssignmentWindow) -> NewAssignment {
        NewAssignment {
            id: reservation_id * 10 + room_id,
            reservation_id,
            rfid_key_id: 10,
            booking_id: None,
            room_id,
            window,
        }
    }

    #[test]
    fn test_key_reservation_rejects_unavailable_key() {
        let window = AssignmentWindow::bounded(period(1, 2));
        assert_eq!(
            check_key_reservation(&key(RfidKeyStatus::Lost), &[request(1, 1, window)], &[]),
            Err(ReservationError::KeyUnavailable(RfidKeyStatus::Lost))
        );
    }

    #[test]
    fn test_key_reservation_conflicts_with_unreleased_assignment() {
        let existing = vec![assignment(5, 1, 10, Some(12), false), assignment(6, 1, 1, None, true)];
        let clash = AssignmentWindow::bounded(period(11, 14));
        let fine = AssignmentWindow::bounded(period(12, 14));

        assert_eq!(
            check_key_reservation(&key(RfidKeyStatus::Available), &[request(1, 2, clash)], &existing),
            Err(ReservationError::KeyWindowConflict { assignment_id: 5 })
        );
        assert_eq!(
            check_key_reservation(&key(RfidKeyStatus::Available), &[request(1, 2, fine)], &existing),
            Ok(fine)
        );
    }

    #[test]
    fn test_lifetime_assignment_blocks_later_windows() {
        let existing = vec![assignment(7, 1, 3, None, false)];
        let later = AssignmentWindow::bounded(period(20, 22));
        let earlier = AssignmentWindow::bounded(period(1, 3));

        assert!(check_key_reservation(&key(RfidKeyStatus::Available), &[request(1, 1, later)], &existing).is_err());
        assert!(check_key_reservation(&key(RfidKeyStatus::Available), &[request(1, 1, earlier)], &existing).is_ok());
    }

    #[test]
    fn test_one_reservation_opens_several_rooms() {
        let window = AssignmentWindow::bounded(period(1, 5));
        let rooms = [request(1, 1, window), request(1, 2, window), request(1, 3, window)];
        assert_eq!(
            check_key_reservation(&key(RfidKeyStatus::Available), &rooms, &[]),
            Ok(window)
        );
    }

    #[test]
    fn test_reservation_rows_must_share_window_and_id() {
        let a = AssignmentWindow::bounded(period(1, 5));
        let b = AssignmentWindow::bounded(period(4, 6));
        let available = key(RfidKeyStatus::Available);

        assert_eq!(
            check_key_reservation(&available, &[request(1, 1, a), request(1, 2, b)], &[]),
            Err(ReservationError::SplitReservation)
        );
        assert_eq!(
            check_key_reservation(&available, &[request(1, 1, a), request(2, 2, a)], &[]),
            Err(ReservationError::SplitReservation)
        );
        assert_eq!(
            check_key_reservation(&available, &[], &[]),
            Err(ReservationError::EmptyReservation)
        );
    }

    #[test]
    fn test_later_reservation_still_conflicts_with_multi_room_one() {
        let mut existing = vec![assignment(5, 1, 1, Some(5), false), assignment(6, 2, 1, Some(5), false)];
        for a in &mut existing {
            a.reservation_id = 40;
        }
        let window = AssignmentWindow::bounded(period(3, 8));
        assert_eq!(
            check_key_reservation(&key(RfidKeyStatus::Available), &[request(41, 3, window)], &existing),
            Err(ReservationError::KeyWindowConflict { assignment_id: 5 })
        );
    }

    #[test]
    fn test_booking_key_window() {
        let b = booking(BookingStatus::Confirmed);
        let window = booking_key_window(&b, &[1, 2], 2).unwrap();
        assert_eq!(window, AssignmentWindow::bounded(period(10, 12)));

        assert_eq!(
            booking_key_window(&b, &[1], 2),
            Err(ReservationError::RoomNotInBooking(2))
        );
        assert_eq!(
            booking_key_window(&booking(BookingStatus::Pending), &[1], 1),
            Err(ReservationError::BookingNotEligible(BookingStatus::Pending))
        );
    }

    #[test]
    fn test_status_change_and_delete_guards() {
        let open = vec![assignment(1, 1, 1, Some(3), false)];
        assert_eq!(
            ensure_status_change_allowed(RfidKeyStatus::Lost, &open),
            Err(ReservationError::KeyInUse(1))
        );
        assert!(ensure_status_change_allowed(RfidKeyStatus::Available, &open).is_ok());
        assert!(ensure_status_change_allowed(RfidKeyStatus::Disabled, &[]).is_ok());
        assert!(ensure_deletable(&open).is_err());
        assert!(ensure_deletable(&[assignment(1, 1, 1, Some(3), true)]).is_ok());
    }

    #[test]
    fn test_key_state_is_derived_from_assignments() {
        let assignments = vec![assignment(1, 1, 10, Some(12), false)];
        let k = key(RfidKeyStatus::Available);
        assert_eq!(key_state_on(&k, &assignments, d(11)), KeyState::Assigned);
        assert_eq!(key_state_on(&k, &assignments, d(12)), KeyState::Available);
        assert_eq!(key_state_on(&key(RfidKeyStatus::Disabled), &assignments, d(11)), KeyState::Disabled);
    }

    #[test]
    fn test_access_decision() {
        let assignments = vec![assignment(1, 4, 10, Some(12), false), assignment(2, 5, 10, Some(12), true)];
        let k = key(RfidKeyStatus::Available);
        assert_eq!(grants_access(&k, &assignments, 4, d(11)), AccessDecision::Granted);
        assert_eq!(grants_access(&k, &assignments, 4, d(12)), AccessDecision::NotAssigned);
        assert_eq!(grants_access(&k, &assignments, 5, d(11)), AccessDecision::NotAssigned);
        assert_eq!(grants_access(&key(RfidKeyStatus::Lost), &assignments, 4, d(11)), AccessDecision::KeyLost);
    }

    #[test]
    fn test_ensure_transition() {
        assert!(ensure_transition(BookingStatus::Pending, BookingStatus::Confirmed).is_ok());
        assert_eq!(
            ensure_transition(BookingStatus::Cancelled, BookingStatus::Confirmed),
            Err(ReservationError::InvalidTransition {
                from: BookingStatus::Cancelled,
                to: BookingStatus::Confirmed,
            })
        );
    }

    #[test]
    fn test_contention_maps_to_conflict() {
        let err = AppError::from(ReservationError::RoomConflict(vec![RoomConflict {
            room_id: 1,
            booking_id: 2,
            start_date: d(1),
            end_date: d(3),
        }]));
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(matches!(
            AppError::from(ReservationError::KeyInUse(1)),
            AppError::Conflict(_)
        ));
    }

    #[test]
    fn test_illegal_transition_maps_to_bad_request() {
        let err = AppError::from(ReservationError::InvalidTransition {
            from: BookingStatus::Finished,
            to: BookingStatus::Active,
        });
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}

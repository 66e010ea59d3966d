//! RFID Service
//!
//! Key cards of a hotel and their date-windowed room assignments.
//!
//! Assignments are validated and written by the repository with the key
//! row locked; this service resolves which hotel the caller manages, builds
//! the requested windows and records the outcome.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use super::can_manage;
use crate::domain::services::reservation;
use crate::domain::services::ReservationError;
use crate::domain::{
    Actor, AssignmentWindow, Booking, BookingFilter, BookingRepository, BookingStatus,
    CalendarEntry, Hotel, HotelRepository, KeyFilter, KeyState, NewAssignment, Notification,
    Notifier, RfidAssignment, RfidKey, RfidKeyStatus, RfidRepository, Room, StayPeriod,
    UserRepository,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Widest calendar range served in one request.
const MAX_CALENDAR_DAYS: i64 = 400;

/// RFID service trait
#[async_trait]
pub trait RfidService: Send + Sync {
    async fn list_keys(&self, actor: Actor, query: KeyQuery) -> Result<Vec<KeyView>, RfidError>;

    async fn create_key(&self, actor: Actor, request: CreateKeyDto) -> Result<RfidKey, RfidError>;

    async fn update_key(&self, actor: Actor, key_id: i64, update: UpdateKeyDto) -> Result<RfidKey, RfidError>;

    async fn delete_key(&self, actor: Actor, key_id: i64) -> Result<(), RfidError>;

    /// Reserve a key for one room of a confirmed or active booking, for the stay
    async fn assign_to_booking(
        &self,
        actor: Actor,
        key_id: i64,
        booking_id: i64,
        room_id: i64,
    ) -> Result<RfidAssignment, RfidError>;

    /// Reserve a key for rooms without a booking (staff, maintenance)
    async fn assign_to_rooms(
        &self,
        actor: Actor,
        key_id: i64,
        request: AssignRoomsDto,
    ) -> Result<Vec<RfidAssignment>, RfidError>;

    /// Release one assignment, or all unreleased ones of the key
    async fn release(
        &self,
        actor: Actor,
        key_id: i64,
        assignment_id: Option<i64>,
    ) -> Result<Vec<RfidAssignment>, RfidError>;

    async fn key_assignments(
        &self,
        actor: Actor,
        key_id: i64,
        include_released: bool,
    ) -> Result<Vec<RfidAssignment>, RfidError>;

    async fn calendar(&self, actor: Actor, query: CalendarQuery) -> Result<Vec<CalendarEntry>, RfidError>;

    /// Confirmed and active bookings of the hotel, ready to receive keys
    async fn eligible_bookings(&self, actor: Actor, hotel_id: Option<i64>) -> Result<Vec<EligibleBooking>, RfidError>;
}

#[derive(Debug, Clone, Default)]
pub struct KeyQuery {
    /// Required for super admins acting on one hotel; ignored for hotel admins
    pub hotel_id: Option<i64>,
    pub status: Option<RfidKeyStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateKeyDto {
    pub hotel_id: Option<i64>,
    pub uid: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateKeyDto {
    pub uid: Option<String>,
    pub label: Option<String>,
    pub status: Option<RfidKeyStatus>,
}

#[derive(Debug, Clone)]
pub struct AssignRoomsDto {
    pub room_ids: Vec<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Open-ended from `start_date`, or today
    pub lifetime: bool,
}

#[derive(Debug, Clone)]
pub struct CalendarQuery {
    pub hotel_id: Option<i64>,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub key_id: Option<i64>,
}

/// A key with its state today and the assignment producing it.
#[derive(Debug, Clone)]
pub struct KeyView {
    pub key: RfidKey,
    pub state: KeyState,
    pub current: Option<RfidAssignment>,
    pub upcoming: usize,
}

#[derive(Debug, Clone)]
pub struct EligibleBooking {
    pub booking: Booking,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub rooms: Vec<Room>,
}

/// RFID service errors
#[derive(Debug, thiserror::Error)]
pub enum RfidError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Permission denied")]
    Forbidden,

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Rule(#[from] ReservationError),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<RfidError> for AppError {
    fn from(e: RfidError) -> Self {
        match e {
            RfidError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            RfidError::Forbidden => AppError::Forbidden("Permission denied".into()),
            RfidError::Invalid(msg) => AppError::BadRequest(msg),
            RfidError::Rule(e) => e.into(),
            RfidError::Repository(e) => e,
        }
    }
}

pub(crate) fn normalize_uid(uid: &str) -> String {
    uid.trim().to_ascii_uppercase()
}

fn clean_label(label: Option<String>) -> Option<String> {
    label
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

fn assignment_outcome(e: &AppError) -> &'static str {
    match e {
        AppError::Conflict(_) => "conflict",
        _ => "rejected",
    }
}

/// RfidService implementation
pub struct RfidServiceImpl<K, B, H, U>
where
    K: RfidRepository,
    B: BookingRepository,
    H: HotelRepository,
    U: UserRepository,
{
    rfid_repo: Arc<K>,
    booking_repo: Arc<B>,
    hotel_repo: Arc<H>,
    user_repo: Arc<U>,
    notifier: Arc<dyn Notifier>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<K, B, H, U> RfidServiceImpl<K, B, H, U>
where
    K: RfidRepository,
    B: BookingRepository,
    H: HotelRepository,
    U: UserRepository,
{
    pub fn new(
        rfid_repo: Arc<K>,
        booking_repo: Arc<B>,
        hotel_repo: Arc<H>,
        user_repo: Arc<U>,
        notifier: Arc<dyn Notifier>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            rfid_repo,
            booking_repo,
            hotel_repo,
            user_repo,
            notifier,
            id_generator,
        }
    }

    /// The hotel the caller acts on: a hotel admin's own, or the one a super
    /// admin names.
    async fn managed_hotel(&self, actor: Actor, hotel_id: Option<i64>) -> Result<Hotel, RfidError> {
        if actor.is_hotel_admin() {
            let hotel = self
                .hotel_repo
                .find_by_owner(actor.user_id)
                .await?
                .ok_or(RfidError::NotFound("Hotel"))?;
            if hotel_id.is_some_and(|id| id != hotel.id) {
                return Err(RfidError::Forbidden);
            }
            return Ok(hotel);
        }
        if actor.is_super_admin() {
            let hotel_id = hotel_id.ok_or_else(|| RfidError::Invalid("hotel_id is required".into()))?;
            return self
                .hotel_repo
                .find_by_id(hotel_id)
                .await?
                .ok_or(RfidError::NotFound("Hotel"));
        }
        Err(RfidError::Forbidden)
    }

    async fn managed_key(&self, actor: Actor, key_id: i64) -> Result<RfidKey, RfidError> {
        let key = self
            .rfid_repo
            .find_key(key_id)
            .await?
            .ok_or(RfidError::NotFound("RFID key"))?;
        let hotel = self
            .hotel_repo
            .find_by_id(key.hotel_id)
            .await?
            .ok_or(RfidError::NotFound("Hotel"))?;
        if !can_manage(&actor, &hotel) {
            return Err(RfidError::Forbidden);
        }
        Ok(key)
    }

    /// One row per room, all under a single reservation id.
    fn new_reservation(
        &self,
        key_id: i64,
        booking_id: Option<i64>,
        room_ids: &[i64],
        window: AssignmentWindow,
    ) -> Vec<NewAssignment> {
        let reservation_id = self.id_generator.generate();
        room_ids
            .iter()
            .map(|&room_id| NewAssignment {
                id: self.id_generator.generate(),
                reservation_id,
                rfid_key_id: key_id,
                booking_id,
                room_id,
                window,
            })
            .collect()
    }

    async fn store_assignments(
        &self,
        key: &RfidKey,
        assignments: Vec<NewAssignment>,
    ) -> Result<Vec<RfidAssignment>, RfidError> {
        match self.rfid_repo.assign(key.id, &assignments).await {
            Ok(created) => {
                metrics::record_rfid_assignment("assigned");
                info!(
                    rfid_key_id = key.id,
                    hotel_id = key.hotel_id,
                    count = created.len(),
                    "Key assigned"
                );
                self.notifier
                    .notify(Notification::hotel_sync(key.hotel_id, "key.assigned", None));
                Ok(created)
            }
            Err(e) => {
                metrics::record_rfid_assignment(assignment_outcome(&e));
                warn!(rfid_key_id = key.id, error = %e, "Key assignment rejected");
                Err(e.into())
            }
        }
    }

    async fn views(&self, keys: Vec<RfidKey>) -> Result<Vec<KeyView>, RfidError> {
        let mut hotel_ids: Vec<i64> = keys.iter().map(|k| k.hotel_id).collect();
        hotel_ids.sort_unstable();
        hotel_ids.dedup();

        let mut by_key: HashMap<i64, Vec<RfidAssignment>> = HashMap::new();
        for hotel_id in hotel_ids {
            for assignment in self.rfid_repo.unreleased_for_hotel(hotel_id).await? {
                by_key.entry(assignment.rfid_key_id).or_default().push(assignment);
            }
        }

        let today = Utc::now().date_naive();
        Ok(keys
            .into_iter()
            .map(|key| {
                let assignments = by_key.remove(&key.id).unwrap_or_default();
                let state = reservation::key_state_on(&key, &assignments, today);
                let current = assignments
                    .iter()
                    .find(|a| a.window().is_ok_and(|w| w.covers(today)))
                    .cloned();
                let upcoming = assignments.iter().filter(|a| a.reserved_from > today).count();
                KeyView {
                    key,
                    state,
                    current,
                    upcoming,
                }
            })
            .collect())
    }
}

#[async_trait]
impl<K, B, H, U> RfidService for RfidServiceImpl<K, B, H, U>
where
    K: RfidRepository + 'static,
    B: BookingRepository + 'static,
    H: HotelRepository + 'static,
    U: UserRepository + 'static,
{
    async fn list_keys(&self, actor: Actor, query: KeyQuery) -> Result<Vec<KeyView>, RfidError> {
        // Super admins may list every hotel's keys at once
        let hotel_id = if actor.is_super_admin() && query.hotel_id.is_none() {
            None
        } else {
            Some(self.managed_hotel(actor, query.hotel_id).await?.id)
        };

        let filter = KeyFilter {
            hotel_id,
            status: query.status,
            search: query
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        };
        let keys = self.rfid_repo.list_keys(&filter).await?;
        self.views(keys).await
    }

    async fn create_key(&self, actor: Actor, request: CreateKeyDto) -> Result<RfidKey, RfidError> {
        let hotel = self.managed_hotel(actor, request.hotel_id).await?;
        let uid = normalize_uid(&request.uid);
        if uid.is_empty() {
            return Err(RfidError::Invalid("Key uid is required".into()));
        }

        let now = Utc::now();
        let key = RfidKey {
            id: self.id_generator.generate(),
            hotel_id: hotel.id,
            uid,
            label: clean_label(request.label),
            status: RfidKeyStatus::Available,
            created_at: now,
            updated_at: now,
        };
        let key = self.rfid_repo.create_key(&key).await?;
        info!(rfid_key_id = key.id, hotel_id = key.hotel_id, uid = %key.uid, "Key registered");
        Ok(key)
    }

    async fn update_key(&self, actor: Actor, key_id: i64, update: UpdateKeyDto) -> Result<RfidKey, RfidError> {
        let mut key = self.managed_key(actor, key_id).await?;

        if let Some(uid) = update.uid {
            let uid = normalize_uid(&uid);
            if uid.is_empty() {
                return Err(RfidError::Invalid("Key uid is required".into()));
            }
            key.uid = uid;
        }
        if update.label.is_some() {
            key.label = clean_label(update.label);
        }
        let status_changed = update.status.is_some_and(|s| s != key.status);
        if let Some(status) = update.status {
            key.status = status;
        }

        let key = self.rfid_repo.update_key(&key).await?;
        if status_changed {
            info!(rfid_key_id = key.id, status = %key.status, "Key status changed");
        }
        Ok(key)
    }

    async fn delete_key(&self, actor: Actor, key_id: i64) -> Result<(), RfidError> {
        let key = self.managed_key(actor, key_id).await?;
        self.rfid_repo.delete_key(key.id).await?;
        info!(rfid_key_id = key.id, hotel_id = key.hotel_id, "Key deleted");
        Ok(())
    }

    async fn assign_to_booking(
        &self,
        actor: Actor,
        key_id: i64,
        booking_id: i64,
        room_id: i64,
    ) -> Result<RfidAssignment, RfidError> {
        let key = self.managed_key(actor, key_id).await?;
        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or(RfidError::NotFound("Booking"))?;
        if booking.hotel_id != key.hotel_id {
            return Err(RfidError::Invalid(
                "Booking belongs to another hotel than the key".into(),
            ));
        }

        let room_ids: Vec<i64> = self
            .booking_repo
            .rooms_of(booking_id)
            .await?
            .iter()
            .map(|r| r.id)
            .collect();
        let window = match reservation::booking_key_window(&booking, &room_ids, room_id) {
            Ok(window) => window,
            Err(e) => {
                metrics::record_rfid_assignment("rejected");
                return Err(e.into());
            }
        };

        let assignments = self.new_reservation(key.id, Some(booking_id), &[room_id], window);
        let mut created = self.store_assignments(&key, assignments).await?;
        created
            .pop()
            .ok_or_else(|| RfidError::Repository(AppError::Internal("Assignment was not stored".into())))
    }

    async fn assign_to_rooms(
        &self,
        actor: Actor,
        key_id: i64,
        request: AssignRoomsDto,
    ) -> Result<Vec<RfidAssignment>, RfidError> {
        let key = self.managed_key(actor, key_id).await?;

        let mut room_ids = request.room_ids;
        room_ids.sort_unstable();
        room_ids.dedup();
        if room_ids.is_empty() {
            return Err(RfidError::Invalid("At least one room is required".into()));
        }

        let window = if request.lifetime {
            AssignmentWindow::open_ended(request.start_date.unwrap_or_else(|| Utc::now().date_naive()))
        } else {
            match (request.start_date, request.end_date) {
                (Some(start), Some(end)) => {
                    AssignmentWindow::bounded(StayPeriod::new(start, end).map_err(ReservationError::from)?)
                }
                _ => {
                    return Err(RfidError::Invalid(
                        "start_date and end_date are required unless lifetime is set".into(),
                    ))
                }
            }
        };

        let assignments = self.new_reservation(key.id, None, &room_ids, window);
        self.store_assignments(&key, assignments).await
    }

    async fn release(
        &self,
        actor: Actor,
        key_id: i64,
        assignment_id: Option<i64>,
    ) -> Result<Vec<RfidAssignment>, RfidError> {
        let key = self.managed_key(actor, key_id).await?;
        let released = self.rfid_repo.release(key.id, assignment_id).await?;

        metrics::record_rfid_assignment("released");
        info!(
            rfid_key_id = key.id,
            hotel_id = key.hotel_id,
            count = released.len(),
            "Key released"
        );
        self.notifier
            .notify(Notification::hotel_sync(key.hotel_id, "key.released", None));
        Ok(released)
    }

    async fn key_assignments(
        &self,
        actor: Actor,
        key_id: i64,
        include_released: bool,
    ) -> Result<Vec<RfidAssignment>, RfidError> {
        let key = self.managed_key(actor, key_id).await?;
        Ok(self.rfid_repo.assignments_for_key(key.id, include_released).await?)
    }

    async fn calendar(&self, actor: Actor, query: CalendarQuery) -> Result<Vec<CalendarEntry>, RfidError> {
        if query.to <= query.from {
            return Err(RfidError::Invalid("to must be after from".into()));
        }
        if (query.to - query.from).num_days() > MAX_CALENDAR_DAYS {
            return Err(RfidError::Invalid(format!(
                "Calendar range is limited to {} days",
                MAX_CALENDAR_DAYS
            )));
        }

        let hotel = self.managed_hotel(actor, query.hotel_id).await?;
        if let Some(key_id) = query.key_id {
            let key = self
                .rfid_repo
                .find_key(key_id)
                .await?
                .ok_or(RfidError::NotFound("RFID key"))?;
            if key.hotel_id != hotel.id {
                return Err(RfidError::Forbidden);
            }
        }

        Ok(self
            .rfid_repo
            .calendar(hotel.id, query.from, query.to, query.key_id)
            .await?)
    }

    async fn eligible_bookings(&self, actor: Actor, hotel_id: Option<i64>) -> Result<Vec<EligibleBooking>, RfidError> {
        let hotel = self.managed_hotel(actor, hotel_id).await?;
        let filter = BookingFilter {
            hotel_id: Some(hotel.id),
            statuses: vec![BookingStatus::Confirmed, BookingStatus::Active],
            ..BookingFilter::default()
        };
        let bookings = self.booking_repo.list(&filter).await?;

        let ids: Vec<i64> = bookings.iter().map(|b| b.id).collect();
        let mut rooms: HashMap<i64, Vec<Room>> = HashMap::new();
        for link in self.booking_repo.room_links(&ids).await? {
            rooms.entry(link.booking_id).or_default().push(link.room);
        }

        let mut eligible = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let (guest_name, guest_email) = match self.booking_repo.invoice_detail(booking.id).await? {
                Some(detail) => (Some(detail.full_name), Some(detail.email)),
                None => match self.user_repo.find_by_id(booking.user_id).await? {
                    Some(user) => (Some(user.name), Some(user.email)),
                    None => (None, None),
                },
            };
            eligible.push(EligibleBooking {
                rooms: rooms.remove(&booking.id).unwrap_or_default(),
                booking,
                guest_name,
                guest_email,
            });
        }
        Ok(eligible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BookingRoomLink, MockBookingRepository, MockHotelRepository, MockNotifier,
        MockRfidRepository, MockUserRepository, User, UserRole,
    };
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    type Service =
        RfidServiceImpl<MockRfidRepository, MockBookingRepository, MockHotelRepository, MockUserRepository>;

    struct Mocks {
        keys: MockRfidRepository,
        bookings: MockBookingRepository,
        hotels: MockHotelRepository,
        users: MockUserRepository,
        notifier: MockNotifier,
    }

    impl Mocks {
        fn new() -> Self {
            let mut hotels = MockHotelRepository::new();
            hotels.expect_find_by_id().returning(|id| Ok(Some(hotel(id))));
            hotels.expect_find_by_owner().returning(|owner| {
                Ok((owner == 10).then(|| hotel(1)))
            });
            let mut notifier = MockNotifier::new();
            notifier.expect_notify().return_const(());
            Self {
                keys: MockRfidRepository::new(),
                bookings: MockBookingRepository::new(),
                hotels,
                users: MockUserRepository::new(),
                notifier,
            }
        }

        fn build(self) -> Service {
            RfidServiceImpl::new(
                Arc::new(self.keys),
                Arc::new(self.bookings),
                Arc::new(self.hotels),
                Arc::new(self.users),
                Arc::new(self.notifier),
                Arc::new(SnowflakeGenerator::new(1)),
            )
        }
    }

    fn hotel(id: i64) -> Hotel {
        Hotel {
            id,
            owner_id: if id == 1 { 10 } else { 20 },
            ..Hotel::default()
        }
    }

    fn owner() -> Actor {
        Actor::new(10, UserRole::Hotel)
    }

    fn key(id: i64, hotel_id: i64, status: RfidKeyStatus) -> RfidKey {
        RfidKey {
            id,
            hotel_id,
            uid: format!("04AB{}", id),
            label: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn booking(status: BookingStatus) -> Booking {
        let today = Utc::now().date_naive();
        Booking {
            id: 100,
            user_id: 5,
            hotel_id: 1,
            start_date: today,
            end_date: today + Duration::days(2),
            total_price: 0,
            status,
            check_in_token: None,
            check_in_status: None,
            check_in_time: None,
            check_out_time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn room(id: i64) -> Room {
        Room {
            id,
            hotel_id: 1,
            ..Room::default()
        }
    }

    fn stored(a: &NewAssignment) -> RfidAssignment {
        RfidAssignment {
            id: a.id,
            reservation_id: a.reservation_id,
            rfid_key_id: a.rfid_key_id,
            booking_id: a.booking_id,
            room_id: a.room_id,
            reserved_from: a.window.from,
            reserved_to: a.window.to,
            assigned_at: Utc::now(),
            released_at: None,
        }
    }

    #[tokio::test]
    async fn test_assign_to_booking_uses_stay_window() {
        let mut m = Mocks::new();
        m.keys
            .expect_find_key()
            .returning(|id| Ok(Some(key(id, 1, RfidKeyStatus::Available))));
        m.bookings
            .expect_find_by_id()
            .returning(|_| Ok(Some(booking(BookingStatus::Confirmed))));
        m.bookings.expect_rooms_of().returning(|_| Ok(vec![room(7)]));
        m.keys
            .expect_assign()
            .withf(|key_id, a| *key_id == 3 && a.len() == 1 && a[0].window.to.is_some())
            .times(1)
            .returning(|_, a| Ok(a.iter().map(stored).collect()));

        let assignment = m.build().assign_to_booking(owner(), 3, 100, 7).await.unwrap();

        let b = booking(BookingStatus::Confirmed);
        assert_eq!(assignment.booking_id, Some(100));
        assert_eq!(assignment.reserved_from, b.start_date);
        assert_eq!(assignment.reserved_to, Some(b.end_date));
    }

    #[tokio::test]
    async fn test_pending_booking_cannot_receive_key() {
        let mut m = Mocks::new();
        m.keys
            .expect_find_key()
            .returning(|id| Ok(Some(key(id, 1, RfidKeyStatus::Available))));
        m.bookings
            .expect_find_by_id()
            .returning(|_| Ok(Some(booking(BookingStatus::Pending))));
        m.bookings.expect_rooms_of().returning(|_| Ok(vec![room(7)]));
        m.keys.expect_assign().never();

        let err = m.build().assign_to_booking(owner(), 3, 100, 7).await.unwrap_err();
        assert!(matches!(
            err,
            RfidError::Rule(ReservationError::BookingNotEligible(BookingStatus::Pending))
        ));
    }

    #[tokio::test]
    async fn test_room_outside_booking_rejected() {
        let mut m = Mocks::new();
        m.keys
            .expect_find_key()
            .returning(|id| Ok(Some(key(id, 1, RfidKeyStatus::Available))));
        m.bookings
            .expect_find_by_id()
            .returning(|_| Ok(Some(booking(BookingStatus::Active))));
        m.bookings.expect_rooms_of().returning(|_| Ok(vec![room(7)]));
        m.keys.expect_assign().never();

        let err = m.build().assign_to_booking(owner(), 3, 100, 8).await.unwrap_err();
        assert!(matches!(AppError::from(err), AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_key_of_other_hotel_is_forbidden() {
        let mut m = Mocks::new();
        m.keys
            .expect_find_key()
            .returning(|id| Ok(Some(key(id, 2, RfidKeyStatus::Available))));

        let err = m.build().release(owner(), 3, None).await.unwrap_err();
        assert!(matches!(err, RfidError::Forbidden));
    }

    #[tokio::test]
    async fn test_lifetime_assignment_is_open_ended() {
        let mut m = Mocks::new();
        m.keys
            .expect_find_key()
            .returning(|id| Ok(Some(key(id, 1, RfidKeyStatus::Available))));
        m.keys
            .expect_assign()
            .withf(|_, a| a.len() == 1 && a[0].window.is_open_ended() && a[0].booking_id.is_none())
            .returning(|_, a| Ok(a.iter().map(stored).collect()));

        let created = m
            .build()
            .assign_to_rooms(
                owner(),
                3,
                AssignRoomsDto {
                    room_ids: vec![7, 7],
                    start_date: None,
                    end_date: None,
                    lifetime: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(created[0].reserved_from, Utc::now().date_naive());
    }

    #[tokio::test]
    async fn test_several_rooms_share_one_reservation() {
        let mut m = Mocks::new();
        m.keys
            .expect_find_key()
            .returning(|id| Ok(Some(key(id, 1, RfidKeyStatus::Available))));
        m.keys
            .expect_assign()
            .withf(|_, a| {
                a.len() == 3
                    && a.iter().all(|r| r.reservation_id == a[0].reservation_id && r.window == a[0].window)
                    && a.iter().map(|r| r.room_id).collect::<Vec<_>>() == vec![7, 8, 9]
            })
            .times(1)
            .returning(|_, a| Ok(a.iter().map(stored).collect()));

        let today = Utc::now().date_naive();
        let created = m
            .build()
            .assign_to_rooms(
                owner(),
                3,
                AssignRoomsDto {
                    room_ids: vec![9, 7, 8],
                    start_date: Some(today),
                    end_date: Some(today + Duration::days(3)),
                    lifetime: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.len(), 3);
        assert!(created.iter().all(|a| a.reserved_to == Some(today + Duration::days(3))));
    }

    #[tokio::test]
    async fn test_bounded_assignment_needs_both_dates() {
        let mut m = Mocks::new();
        m.keys
            .expect_find_key()
            .returning(|id| Ok(Some(key(id, 1, RfidKeyStatus::Available))));
        m.keys.expect_assign().never();

        let result = m
            .build()
            .assign_to_rooms(
                owner(),
                3,
                AssignRoomsDto {
                    room_ids: vec![7],
                    start_date: Some(Utc::now().date_naive()),
                    end_date: None,
                    lifetime: false,
                },
            )
            .await;
        assert!(matches!(result, Err(RfidError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_overlap_from_store_is_conflict() {
        let mut m = Mocks::new();
        m.keys
            .expect_find_key()
            .returning(|id| Ok(Some(key(id, 1, RfidKeyStatus::Available))));
        m.keys
            .expect_assign()
            .returning(|_, _| Err(AppError::Conflict("Key is already reserved".into())));

        let today = Utc::now().date_naive();
        let err = m
            .build()
            .assign_to_rooms(
                owner(),
                3,
                AssignRoomsDto {
                    room_ids: vec![7],
                    start_date: Some(today),
                    end_date: Some(today + Duration::days(1)),
                    lifetime: false,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_keys_derives_assigned_state() {
        let mut m = Mocks::new();
        m.keys
            .expect_list_keys()
            .withf(|f| f.hotel_id == Some(1))
            .returning(|_| {
                Ok(vec![
                    key(1, 1, RfidKeyStatus::Available),
                    key(2, 1, RfidKeyStatus::Available),
                    key(3, 1, RfidKeyStatus::Lost),
                ])
            });
        m.keys.expect_unreleased_for_hotel().returning(|_| {
            let today = Utc::now().date_naive();
            Ok(vec![RfidAssignment {
                id: 50,
                reservation_id: 50,
                rfid_key_id: 1,
                booking_id: None,
                room_id: 7,
                reserved_from: today,
                reserved_to: None,
                assigned_at: Utc::now(),
                released_at: None,
            }])
        });

        let views = m.build().list_keys(owner(), KeyQuery::default()).await.unwrap();

        let states: Vec<KeyState> = views.iter().map(|v| v.state).collect();
        assert_eq!(states, vec![KeyState::Assigned, KeyState::Available, KeyState::Lost]);
        assert_eq!(views[0].current.as_ref().map(|a| a.id), Some(50));
    }

    #[tokio::test]
    async fn test_eligible_bookings_fall_back_to_booker() {
        let mut m = Mocks::new();
        m.bookings
            .expect_list()
            .withf(|f| f.statuses == vec![BookingStatus::Confirmed, BookingStatus::Active])
            .returning(|_| Ok(vec![booking(BookingStatus::Confirmed)]));
        m.bookings.expect_room_links().returning(|_| {
            Ok(vec![BookingRoomLink {
                booking_id: 100,
                room: room(7),
            }])
        });
        m.bookings.expect_invoice_detail().returning(|_| Ok(None));
        m.users.expect_find_by_id().returning(|id| {
            Ok(Some(User {
                id,
                name: "Alex Guest".into(),
                email: "alex@example.com".into(),
                ..User::default()
            }))
        });

        let eligible = m.build().eligible_bookings(owner(), None).await.unwrap();

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].guest_name.as_deref(), Some("Alex Guest"));
        assert_eq!(eligible[0].rooms.len(), 1);
    }

    #[tokio::test]
    async fn test_calendar_rejects_inverted_range() {
        let m = Mocks::new();
        let today = Utc::now().date_naive();

        let result = m
            .build()
            .calendar(
                owner(),
                CalendarQuery {
                    hotel_id: None,
                    from: today,
                    to: today,
                    key_id: None,
                },
            )
            .await;
        assert!(matches!(result, Err(RfidError::Invalid(_))));
    }

    #[test]
    fn test_uid_normalization() {
        assert_eq!(normalize_uid("  04ab:c1 "), "04AB:C1");
    }
}

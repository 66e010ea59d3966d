//! Booking Service
//!
//! Creating bookings, moving them through their lifecycle and managing the
//! registered guests. Room availability is decided inside the repository's
//! locked transaction; this service validates everything that does not need
//! the lock and reports the outcome to the hotel.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use super::can_manage;
use crate::domain::services::{PricingService, ReservationError};
use crate::domain::{
    Actor, Booking, BookingFilter, BookingRepository, BookingStatus, Guest, HotelRepository,
    InvoiceDetail, NewBooking, Notification, Notifier, Room, RoomRepository, ServiceItem,
    ServiceItemRepository, StatusChange, StatusChangeOutcome, StayPeriod,
};
use crate::infrastructure::cache::CatalogCache;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;
use crate::shared::tokens::random_hex;

/// Booking service trait
#[async_trait]
pub trait BookingService: Send + Sync {
    async fn create_booking(&self, actor: Actor, request: CreateBookingDto) -> Result<BookingDetail, BookingError>;

    async fn my_bookings(&self, actor: Actor) -> Result<Vec<Booking>, BookingError>;

    async fn get_booking(&self, actor: Actor, booking_id: i64) -> Result<BookingDetail, BookingError>;

    async fn hotel_bookings(&self, actor: Actor, hotel_id: i64) -> Result<Vec<Booking>, BookingError>;

    /// Managers may make any legal transition; the booker may only cancel.
    /// Cancelling or finishing releases the booking's keys.
    async fn update_status(
        &self,
        actor: Actor,
        booking_id: i64,
        status: BookingStatus,
    ) -> Result<StatusChangeOutcome, BookingError>;

    /// Deletes the booking after releasing its keys
    async fn delete_booking(&self, actor: Actor, booking_id: i64) -> Result<StatusChangeOutcome, BookingError>;

    async fn list_guests(&self, actor: Actor, booking_id: i64) -> Result<Vec<Guest>, BookingError>;

    async fn add_guests(
        &self,
        actor: Actor,
        booking_id: i64,
        guests: Vec<GuestDto>,
    ) -> Result<Vec<Guest>, BookingError>;

    async fn update_guest(&self, actor: Actor, guest_id: i64, update: GuestDto) -> Result<Guest, BookingError>;

    async fn delete_guest(&self, actor: Actor, guest_id: i64) -> Result<(), BookingError>;
}

#[derive(Debug, Clone)]
pub struct CreateBookingDto {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub room_ids: Vec<i64>,
    pub service_ids: Vec<i64>,
    pub guests: Vec<GuestDto>,
    pub invoice_detail: Option<InvoiceDetail>,
}

#[derive(Debug, Clone)]
pub struct GuestDto {
    pub name: String,
    pub id_number: String,
    pub date_of_birth: Option<NaiveDate>,
}

/// A booking with its rooms, services, guests and billing data.
#[derive(Debug, Clone)]
pub struct BookingDetail {
    pub booking: Booking,
    pub rooms: Vec<Room>,
    pub services: Vec<ServiceItem>,
    pub guests: Vec<Guest>,
    pub invoice_detail: Option<InvoiceDetail>,
}

/// Booking service errors
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
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

impl From<BookingError> for AppError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            BookingError::Forbidden => AppError::Forbidden("Permission denied".into()),
            BookingError::Invalid(msg) => AppError::BadRequest(msg),
            BookingError::Rule(e) => e.into(),
            BookingError::Repository(e) => e,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Booker,
    Manager,
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// BookingService implementation
pub struct BookingServiceImpl<B, R, S, H>
where
    B: BookingRepository,
    R: RoomRepository,
    S: ServiceItemRepository,
    H: HotelRepository,
{
    booking_repo: Arc<B>,
    room_repo: Arc<R>,
    service_repo: Arc<S>,
    hotel_repo: Arc<H>,
    notifier: Arc<dyn Notifier>,
    catalog_cache: CatalogCache,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<B, R, S, H> BookingServiceImpl<B, R, S, H>
where
    B: BookingRepository,
    R: RoomRepository,
    S: ServiceItemRepository,
    H: HotelRepository,
{
    pub fn new(
        booking_repo: Arc<B>,
        room_repo: Arc<R>,
        service_repo: Arc<S>,
        hotel_repo: Arc<H>,
        notifier: Arc<dyn Notifier>,
        catalog_cache: CatalogCache,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            booking_repo,
            room_repo,
            service_repo,
            hotel_repo,
            notifier,
            catalog_cache,
            id_generator,
        }
    }

    async fn find_booking(&self, booking_id: i64) -> Result<Booking, BookingError> {
        self.booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::NotFound("Booking"))
    }

    async fn access(&self, actor: Actor, booking: &Booking) -> Result<Access, BookingError> {
        if actor.is_super_admin() {
            return Ok(Access::Manager);
        }
        if actor.is_hotel_admin() {
            let owns = self
                .hotel_repo
                .find_by_id(booking.hotel_id)
                .await?
                .is_some_and(|h| h.is_owned_by(actor.user_id));
            if owns {
                return Ok(Access::Manager);
            }
        }
        if booking.user_id == actor.user_id {
            return Ok(Access::Booker);
        }
        Err(BookingError::Forbidden)
    }

    async fn load_detail(&self, booking: Booking) -> Result<BookingDetail, BookingError> {
        let rooms = self.booking_repo.rooms_of(booking.id).await?;
        let services = self.booking_repo.services_of(booking.id).await?;
        let guests = self.booking_repo.list_guests(booking.id).await?;
        let invoice_detail = self.booking_repo.invoice_detail(booking.id).await?;
        Ok(BookingDetail {
            booking,
            rooms,
            services,
            guests,
            invoice_detail,
        })
    }

    /// Rooms of one hotel, all present.
    async fn load_rooms(&self, room_ids: &[i64]) -> Result<Vec<Room>, BookingError> {
        if room_ids.is_empty() {
            return Err(BookingError::Invalid("At least one room is required".into()));
        }
        let rooms = self.room_repo.find_many(room_ids).await?;
        if rooms.len() != room_ids.len() {
            return Err(BookingError::Invalid("Unknown room in booking".into()));
        }
        let hotel_id = rooms[0].hotel_id;
        if rooms.iter().any(|r| r.hotel_id != hotel_id) {
            return Err(BookingError::Invalid(
                "All rooms must belong to the same hotel".into(),
            ));
        }
        Ok(rooms)
    }

    async fn load_services(&self, service_ids: &[i64], hotel_id: i64) -> Result<Vec<ServiceItem>, BookingError> {
        if service_ids.is_empty() {
            return Ok(Vec::new());
        }
        let services = self.service_repo.find_many(service_ids).await?;
        if services.len() != service_ids.len() || services.iter().any(|s| s.hotel_id != hotel_id) {
            return Err(BookingError::Invalid(
                "Services must belong to the booked hotel".into(),
            ));
        }
        Ok(services)
    }

    fn new_guest(&self, booking_id: i64, dto: GuestDto) -> Guest {
        Guest {
            id: self.id_generator.generate(),
            booking_id,
            name: dto.name.trim().to_string(),
            id_number: dto.id_number.trim().to_string(),
            date_of_birth: dto.date_of_birth,
        }
    }

    async fn changed(&self, booking: &Booking, reason: &str) {
        self.notifier
            .notify(Notification::hotel_sync(booking.hotel_id, reason, Some(booking.id)));
        self.catalog_cache.invalidate().await;
    }

    async fn guest_access(&self, actor: Actor, guest_id: i64) -> Result<Guest, BookingError> {
        let guest = self
            .booking_repo
            .find_guest(guest_id)
            .await?
            .ok_or(BookingError::NotFound("Guest"))?;
        let booking = self.find_booking(guest.booking_id).await?;
        self.access(actor, &booking).await?;
        Ok(guest)
    }
}

#[async_trait]
impl<B, R, S, H> BookingService for BookingServiceImpl<B, R, S, H>
where
    B: BookingRepository + 'static,
    R: RoomRepository + 'static,
    S: ServiceItemRepository + 'static,
    H: HotelRepository + 'static,
{
    async fn create_booking(&self, actor: Actor, request: CreateBookingDto) -> Result<BookingDetail, BookingError> {
        let period = StayPeriod::new(request.start_date, request.end_date)
            .map_err(ReservationError::from)?;
        if period.start() < Utc::now().date_naive() {
            return Err(BookingError::Invalid("Start date cannot be in the past".into()));
        }

        let room_ids = dedup(&request.room_ids);
        let rooms = self.load_rooms(&room_ids).await?;
        let hotel_id = rooms[0].hotel_id;
        let services = self.load_services(&dedup(&request.service_ids), hotel_id).await?;

        let capacity: i64 = rooms.iter().map(|r| r.capacity as i64).sum();
        if request.guests.len() as i64 > capacity {
            return Err(BookingError::Invalid(format!(
                "Rooms sleep {} guests, {} given",
                capacity,
                request.guests.len()
            )));
        }

        let id = self.id_generator.generate();
        let total_price = PricingService::booking_total(&rooms, &services, period.nights())
            .map_err(AppError::from)?;
        let new_booking = NewBooking {
            id,
            user_id: actor.user_id,
            hotel_id,
            period,
            room_ids,
            service_ids: services.iter().map(|s| s.id).collect(),
            total_price,
            guests: request
                .guests
                .into_iter()
                .map(|g| self.new_guest(id, g))
                .collect(),
            invoice_detail: request.invoice_detail.map(|d| InvoiceDetail { booking_id: id, ..d }),
        };

        let booking = match self.booking_repo.reserve(&new_booking).await {
            Ok(booking) => booking,
            Err(e) => {
                let outcome = if matches!(e, AppError::Conflict(_)) { "conflict" } else { "rejected" };
                metrics::record_booking(outcome);
                warn!(hotel_id, user_id = actor.user_id, error = %e, "Booking rejected");
                return Err(e.into());
            }
        };
        metrics::record_booking("created");
        info!(
            booking_id = booking.id,
            hotel_id,
            user_id = actor.user_id,
            total_price,
            "Booking created"
        );

        self.changed(&booking, "booking.created").await;
        self.load_detail(booking).await
    }

    async fn my_bookings(&self, actor: Actor) -> Result<Vec<Booking>, BookingError> {
        let filter = BookingFilter {
            user_id: Some(actor.user_id),
            ..BookingFilter::default()
        };
        Ok(self.booking_repo.list(&filter).await?)
    }

    async fn get_booking(&self, actor: Actor, booking_id: i64) -> Result<BookingDetail, BookingError> {
        let booking = self.find_booking(booking_id).await?;
        self.access(actor, &booking).await?;
        self.load_detail(booking).await
    }

    async fn hotel_bookings(&self, actor: Actor, hotel_id: i64) -> Result<Vec<Booking>, BookingError> {
        let hotel = self
            .hotel_repo
            .find_by_id(hotel_id)
            .await?
            .ok_or(BookingError::NotFound("Hotel"))?;
        if !can_manage(&actor, &hotel) {
            return Err(BookingError::Forbidden);
        }

        let filter = BookingFilter {
            hotel_id: Some(hotel_id),
            ..BookingFilter::default()
        };
        Ok(self.booking_repo.list(&filter).await?)
    }

    async fn update_status(
        &self,
        actor: Actor,
        booking_id: i64,
        status: BookingStatus,
    ) -> Result<StatusChangeOutcome, BookingError> {
        let booking = self.find_booking(booking_id).await?;
        let access = self.access(actor, &booking).await?;
        if access == Access::Booker && status != BookingStatus::Cancelled {
            return Err(BookingError::Forbidden);
        }

        let mut change = StatusChange::new(booking_id, booking.status, status);
        if status == BookingStatus::Confirmed {
            change.check_in_token = Some(random_hex(16));
        }

        let outcome = self.booking_repo.transition(&change).await?;
        info!(
            booking_id,
            hotel_id = outcome.booking.hotel_id,
            from = %booking.status,
            to = %status,
            released_keys = outcome.released_assignments,
            "Booking status changed"
        );

        self.changed(&outcome.booking, "booking.status_changed").await;
        Ok(outcome)
    }

    async fn delete_booking(&self, actor: Actor, booking_id: i64) -> Result<StatusChangeOutcome, BookingError> {
        let booking = self.find_booking(booking_id).await?;
        if self.access(actor, &booking).await? != Access::Manager {
            return Err(BookingError::Forbidden);
        }

        let outcome = self.booking_repo.delete(booking_id).await?;
        info!(
            booking_id,
            hotel_id = booking.hotel_id,
            released_keys = outcome.released_assignments,
            "Booking deleted"
        );

        self.changed(&outcome.booking, "booking.deleted").await;
        Ok(outcome)
    }

    async fn list_guests(&self, actor: Actor, booking_id: i64) -> Result<Vec<Guest>, BookingError> {
        let booking = self.find_booking(booking_id).await?;
        self.access(actor, &booking).await?;
        Ok(self.booking_repo.list_guests(booking_id).await?)
    }

    async fn add_guests(
        &self,
        actor: Actor,
        booking_id: i64,
        guests: Vec<GuestDto>,
    ) -> Result<Vec<Guest>, BookingError> {
        let booking = self.find_booking(booking_id).await?;
        self.access(actor, &booking).await?;
        if booking.status.is_terminal() {
            return Err(BookingError::Invalid(format!(
                "Cannot add guests to a {} booking",
                booking.status
            )));
        }

        let capacity: i64 = self
            .booking_repo
            .rooms_of(booking_id)
            .await?
            .iter()
            .map(|r| r.capacity as i64)
            .sum();
        let guests: Vec<Guest> = guests
            .into_iter()
            .map(|g| self.new_guest(booking_id, g))
            .collect();

        Ok(self.booking_repo.add_guests(booking_id, &guests, capacity).await?)
    }

    async fn update_guest(&self, actor: Actor, guest_id: i64, update: GuestDto) -> Result<Guest, BookingError> {
        let guest = self.guest_access(actor, guest_id).await?;
        let updated = Guest {
            name: update.name.trim().to_string(),
            id_number: update.id_number.trim().to_string(),
            date_of_birth: update.date_of_birth,
            ..guest
        };
        Ok(self.booking_repo.update_guest(&updated).await?)
    }

    async fn delete_guest(&self, actor: Actor, guest_id: i64) -> Result<(), BookingError> {
        self.guest_access(actor, guest_id).await?;
        Ok(self.booking_repo.delete_guest(guest_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Hotel, MockBookingRepository, MockHotelRepository, MockNotifier, MockRoomRepository,
        MockServiceItemRepository, UserRole,
    };
    use chrono::Duration;

    type Service = BookingServiceImpl<
        MockBookingRepository,
        MockRoomRepository,
        MockServiceItemRepository,
        MockHotelRepository,
    >;

    struct Mocks {
        bookings: MockBookingRepository,
        rooms: MockRoomRepository,
        services: MockServiceItemRepository,
        hotels: MockHotelRepository,
        notifier: MockNotifier,
    }

    impl Mocks {
        fn new() -> Self {
            let mut hotels = MockHotelRepository::new();
            hotels.expect_find_by_id().returning(|id| {
                Ok(Some(Hotel {
                    id,
                    owner_id: 10,
                    ..Hotel::default()
                }))
            });
            Self {
                bookings: MockBookingRepository::new(),
                rooms: MockRoomRepository::new(),
                services: MockServiceItemRepository::new(),
                hotels,
                notifier: MockNotifier::new(),
            }
        }

        fn build(self) -> Service {
            BookingServiceImpl::new(
                Arc::new(self.bookings),
                Arc::new(self.rooms),
                Arc::new(self.services),
                Arc::new(self.hotels),
                Arc::new(self.notifier),
                CatalogCache::disabled(),
                Arc::new(SnowflakeGenerator::new(1)),
            )
        }
    }

    fn guest() -> Actor {
        Actor::new(5, UserRole::Guest)
    }

    fn owner() -> Actor {
        Actor::new(10, UserRole::Hotel)
    }

    fn room(id: i64, hotel_id: i64, capacity: i32) -> Room {
        Room {
            id,
            hotel_id,
            price_per_night: 10_000,
            base_price: 1_000,
            capacity,
            ..Room::default()
        }
    }

    fn booking(status: BookingStatus) -> Booking {
        let today = Utc::now().date_naive();
        let now = Utc::now();
        Booking {
            id: 100,
            user_id: 5,
            hotel_id: 1,
            start_date: today + Duration::days(1),
            end_date: today + Duration::days(3),
            total_price: 21_000,
            status,
            check_in_token: None,
            check_in_status: None,
            check_in_time: None,
            check_out_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn request(room_ids: Vec<i64>, guests: usize) -> CreateBookingDto {
        let today = Utc::now().date_naive();
        CreateBookingDto {
            start_date: today + Duration::days(1),
            end_date: today + Duration::days(3),
            room_ids,
            service_ids: vec![],
            guests: (0..guests)
                .map(|i| GuestDto {
                    name: format!("Guest {}", i),
                    id_number: format!("ID{}", i),
                    date_of_birth: None,
                })
                .collect(),
            invoice_detail: None,
        }
    }

    fn expect_detail(bookings: &mut MockBookingRepository) {
        bookings.expect_rooms_of().returning(|_| Ok(vec![]));
        bookings.expect_services_of().returning(|_| Ok(vec![]));
        bookings.expect_list_guests().returning(|_| Ok(vec![]));
        bookings.expect_invoice_detail().returning(|_| Ok(None));
    }

    #[tokio::test]
    async fn test_create_prices_server_side_and_notifies_hotel() {
        let mut m = Mocks::new();
        m.rooms
            .expect_find_many()
            .returning(|ids| Ok(ids.iter().map(|id| room(*id, 1, 2)).collect()));
        m.bookings
            .expect_reserve()
            .withf(|b| b.total_price == 2 * (1_000 + 10_000 * 2) && b.room_ids == vec![1, 2])
            .times(1)
            .returning(|b| {
                Ok(Booking {
                    id: b.id,
                    total_price: b.total_price,
                    ..booking(BookingStatus::Pending)
                })
            });
        expect_detail(&mut m.bookings);
        m.notifier
            .expect_notify()
            .withf(|n| n.hotel_id == 1)
            .times(1)
            .return_const(());

        let detail = m
            .build()
            .create_booking(guest(), request(vec![2, 1, 2], 3))
            .await
            .unwrap();

        assert_eq!(detail.booking.total_price, 42_000);
    }

    #[tokio::test]
    async fn test_create_rejects_rooms_of_different_hotels() {
        let mut m = Mocks::new();
        m.rooms
            .expect_find_many()
            .returning(|_| Ok(vec![room(1, 1, 2), room(2, 2, 2)]));
        m.bookings.expect_reserve().never();

        let result = m.build().create_booking(guest(), request(vec![1, 2], 1)).await;
        assert!(matches!(result, Err(BookingError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_more_guests_than_beds() {
        let mut m = Mocks::new();
        m.rooms.expect_find_many().returning(|_| Ok(vec![room(1, 1, 2)]));
        m.bookings.expect_reserve().never();

        let result = m.build().create_booking(guest(), request(vec![1], 3)).await;
        assert!(matches!(result, Err(BookingError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_stay() {
        let mut m = Mocks::new();
        m.rooms.expect_find_many().never();

        let mut req = request(vec![1], 1);
        req.end_date = req.start_date;

        let err = m.build().create_booking(guest(), req).await.unwrap_err();
        assert!(matches!(AppError::from(err), AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_room_conflict_surfaces_as_409() {
        let mut m = Mocks::new();
        m.rooms.expect_find_many().returning(|_| Ok(vec![room(1, 1, 2)]));
        m.bookings
            .expect_reserve()
            .returning(|_| Err(AppError::Conflict("rooms already booked for these dates: 1".into())));
        m.notifier.expect_notify().never();

        let err = m.build().create_booking(guest(), request(vec![1], 1)).await.unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_booker_may_only_cancel() {
        let mut m = Mocks::new();
        m.bookings
            .expect_find_by_id()
            .returning(|_| Ok(Some(booking(BookingStatus::Pending))));
        m.bookings.expect_transition().never();

        let result = m
            .build()
            .update_status(guest(), 100, BookingStatus::Confirmed)
            .await;
        assert!(matches!(result, Err(BookingError::Forbidden)));
    }

    #[tokio::test]
    async fn test_confirm_issues_check_in_token() {
        let mut m = Mocks::new();
        m.bookings
            .expect_find_by_id()
            .returning(|_| Ok(Some(booking(BookingStatus::Pending))));
        m.bookings
            .expect_transition()
            .withf(|c| {
                c.to == BookingStatus::Confirmed
                    && c.check_in_token.as_ref().is_some_and(|t| t.len() == 32)
            })
            .times(1)
            .returning(|c| {
                Ok(StatusChangeOutcome {
                    booking: Booking {
                        status: c.to,
                        check_in_token: c.check_in_token.clone(),
                        ..booking(BookingStatus::Pending)
                    },
                    released_assignments: 0,
                })
            });
        m.notifier.expect_notify().times(1).return_const(());

        let updated = m
            .build()
            .update_status(owner(), 100, BookingStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(updated.booking.status, BookingStatus::Confirmed);
        assert_eq!(updated.released_assignments, 0);
    }

    #[tokio::test]
    async fn test_stranger_cannot_read_booking() {
        let mut m = Mocks::new();
        m.bookings
            .expect_find_by_id()
            .returning(|_| Ok(Some(booking(BookingStatus::Pending))));

        let result = m.build().get_booking(Actor::new(77, UserRole::Guest), 100).await;
        assert!(matches!(result, Err(BookingError::Forbidden)));
    }

    #[tokio::test]
    async fn test_booker_cannot_delete() {
        let mut m = Mocks::new();
        m.bookings
            .expect_find_by_id()
            .returning(|_| Ok(Some(booking(BookingStatus::Pending))));
        m.bookings.expect_delete().never();

        let result = m.build().delete_booking(guest(), 100).await;
        assert!(matches!(result, Err(BookingError::Forbidden)));
    }

    #[tokio::test]
    async fn test_booker_cancel_releases_keys() {
        let mut m = Mocks::new();
        m.bookings
            .expect_find_by_id()
            .returning(|_| Ok(Some(booking(BookingStatus::Confirmed))));
        m.bookings
            .expect_transition()
            .withf(|c| c.from == BookingStatus::Confirmed && c.to == BookingStatus::Cancelled)
            .times(1)
            .returning(|c| {
                Ok(StatusChangeOutcome {
                    booking: Booking {
                        status: c.to,
                        ..booking(c.from)
                    },
                    released_assignments: if c.to.releases_keys() { 2 } else { 0 },
                })
            });
        m.notifier.expect_notify().times(1).return_const(());

        let outcome = m
            .build()
            .update_status(guest(), 100, BookingStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(outcome.booking.status, BookingStatus::Cancelled);
        assert_eq!(outcome.released_assignments, 2);
    }

    #[tokio::test]
    async fn test_manager_delete_releases_keys() {
        let mut m = Mocks::new();
        m.bookings
            .expect_find_by_id()
            .returning(|_| Ok(Some(booking(BookingStatus::Active))));
        m.bookings.expect_delete().withf(|id| *id == 100).times(1).returning(|_| {
            Ok(StatusChangeOutcome {
                booking: booking(BookingStatus::Active),
                released_assignments: 1,
            })
        });
        m.notifier
            .expect_notify()
            .withf(|n| n.payload["reason"] == "booking.deleted")
            .times(1)
            .return_const(());

        let outcome = m.build().delete_booking(owner(), 100).await.unwrap();
        assert_eq!(outcome.released_assignments, 1);
    }

    #[tokio::test]
    async fn test_add_guests_passes_room_capacity() {
        let mut m = Mocks::new();
        m.bookings
            .expect_find_by_id()
            .returning(|_| Ok(Some(booking(BookingStatus::Confirmed))));
        m.bookings
            .expect_rooms_of()
            .returning(|_| Ok(vec![room(1, 1, 2), room(2, 1, 3)]));
        m.bookings
            .expect_add_guests()
            .withf(|_, guests, max| guests.len() == 1 && *max == 5)
            .returning(|_, guests, _| Ok(guests.to_vec()));

        let added = m
            .build()
            .add_guests(
                guest(),
                100,
                vec![GuestDto {
                    name: " Sam ".into(),
                    id_number: "X1".into(),
                    date_of_birth: None,
                }],
            )
            .await
            .unwrap();
        assert_eq!(added[0].name, "Sam");
    }
}

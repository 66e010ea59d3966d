//! Device Service
//!
//! Hotel terminals (door controllers, front-desk kiosks) authenticate with a
//! bearer token and see only their own hotel. Super admins issue and rotate
//! the tokens.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use super::rfid_service::normalize_uid;
use crate::domain::services::{reservation, AccessDecision};
use crate::domain::{
    Actor, Booking, BookingFilter, BookingRepository, BookingRoomLink, BookingStatus,
    CheckInStatus, Device, DeviceRepository, HotelRepository, Notification, Notifier,
    RfidRepository, Room, RoomRepository, StatusChange,
};
use crate::infrastructure::cache::CatalogCache;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;
use crate::shared::tokens::{random_hex, sha256_hex};

/// Device service trait
#[async_trait]
pub trait DeviceService: Send + Sync {
    /// Resolve an active device from its bearer token
    async fn authenticate(&self, token: &str) -> Result<Device, DeviceError>;

    /// Bookings the terminal has to know about, with the hotel's rooms
    async fn sync(&self, device: &Device) -> Result<DeviceSync, DeviceError>;

    async fn update_check_in(
        &self,
        device: &Device,
        booking_id: i64,
        update: CheckInUpdate,
    ) -> Result<Booking, DeviceError>;

    async fn check_in_by_token(&self, device: &Device, token: &str) -> Result<Booking, DeviceError>;

    async fn access(&self, device: &Device, uid: &str, room_id: i64) -> Result<AccessCheck, DeviceError>;

    async fn list_devices(&self, actor: Actor) -> Result<Vec<Device>, DeviceError>;

    async fn create_device(
        &self,
        actor: Actor,
        hotel_id: i64,
        name: Option<String>,
    ) -> Result<IssuedDevice, DeviceError>;

    async fn update_device(
        &self,
        actor: Actor,
        device_id: i64,
        update: UpdateDeviceDto,
    ) -> Result<Device, DeviceError>;

    async fn delete_device(&self, actor: Actor, device_id: i64) -> Result<(), DeviceError>;

    async fn regenerate_token(&self, actor: Actor, device_id: i64) -> Result<IssuedDevice, DeviceError>;
}

#[derive(Debug, Clone)]
pub struct DeviceSync {
    pub bookings: Vec<Booking>,
    pub rooms: Vec<Room>,
    pub links: Vec<BookingRoomLink>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckInUpdate {
    pub status: Option<CheckInStatus>,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateDeviceDto {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

/// A device together with its plaintext token, returned exactly once.
#[derive(Debug, Clone)]
pub struct IssuedDevice {
    pub device: Device,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct AccessCheck {
    pub decision: AccessDecision,
    pub rfid_key_id: Option<i64>,
    pub booking_id: Option<i64>,
}

/// Device service errors
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Invalid device token")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Permission denied")]
    Forbidden,

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<DeviceError> for AppError {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::Unauthorized => AppError::Unauthorized("Invalid device token".into()),
            DeviceError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            DeviceError::Forbidden => AppError::Forbidden("Permission denied".into()),
            DeviceError::Invalid(msg) => AppError::BadRequest(msg),
            DeviceError::Repository(e) => e,
        }
    }
}

/// 32 random bytes, hex encoded.
fn new_device_token() -> String {
    random_hex(32)
}

fn clean_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// DeviceService implementation
pub struct DeviceServiceImpl<D, B, R, K, H>
where
    D: DeviceRepository,
    B: BookingRepository,
    R: RoomRepository,
    K: RfidRepository,
    H: HotelRepository,
{
    device_repo: Arc<D>,
    booking_repo: Arc<B>,
    room_repo: Arc<R>,
    rfid_repo: Arc<K>,
    hotel_repo: Arc<H>,
    notifier: Arc<dyn Notifier>,
    catalog_cache: CatalogCache,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<D, B, R, K, H> DeviceServiceImpl<D, B, R, K, H>
where
    D: DeviceRepository,
    B: BookingRepository,
    R: RoomRepository,
    K: RfidRepository,
    H: HotelRepository,
{
    pub fn new(
        device_repo: Arc<D>,
        booking_repo: Arc<B>,
        room_repo: Arc<R>,
        rfid_repo: Arc<K>,
        hotel_repo: Arc<H>,
        notifier: Arc<dyn Notifier>,
        catalog_cache: CatalogCache,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            device_repo,
            booking_repo,
            room_repo,
            rfid_repo,
            hotel_repo,
            notifier,
            catalog_cache,
            id_generator,
        }
    }

    async fn changed(&self, booking: &Booking, reason: &str) {
        self.notifier
            .notify(Notification::hotel_sync(booking.hotel_id, reason, Some(booking.id)));
        self.catalog_cache.invalidate().await;
    }

    /// Bookings of other hotels are reported as missing.
    async fn hotel_booking(&self, device: &Device, booking_id: i64) -> Result<Booking, DeviceError> {
        self.booking_repo
            .find_by_id(booking_id)
            .await?
            .filter(|b| b.hotel_id == device.hotel_id)
            .ok_or(DeviceError::NotFound("Booking"))
    }

    async fn find_device(&self, device_id: i64) -> Result<Device, DeviceError> {
        self.device_repo
            .find_by_id(device_id)
            .await?
            .ok_or(DeviceError::NotFound("Device"))
    }

    fn require_super_admin(actor: Actor) -> Result<(), DeviceError> {
        if actor.is_super_admin() {
            Ok(())
        } else {
            Err(DeviceError::Forbidden)
        }
    }

    async fn check_in(&self, device: &Device, booking: Booking, at: DateTime<Utc>) -> Result<Booking, DeviceError> {
        let mut change = StatusChange::new(booking.id, booking.status, BookingStatus::Active);
        change.check_in_status = Some(CheckInStatus::CheckedIn);
        change.check_in_time = Some(at);
        let outcome = self.booking_repo.transition(&change).await?;

        info!(booking_id = booking.id, device_id = device.id, "Guest checked in");
        self.changed(&outcome.booking, "booking.checked_in").await;
        Ok(outcome.booking)
    }
}

#[async_trait]
impl<D, B, R, K, H> DeviceService for DeviceServiceImpl<D, B, R, K, H>
where
    D: DeviceRepository + 'static,
    B: BookingRepository + 'static,
    R: RoomRepository + 'static,
    K: RfidRepository + 'static,
    H: HotelRepository + 'static,
{
    async fn authenticate(&self, token: &str) -> Result<Device, DeviceError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(DeviceError::Unauthorized);
        }
        self.device_repo
            .find_by_token_hash(&sha256_hex(token))
            .await?
            .filter(|d| d.is_active)
            .ok_or(DeviceError::Unauthorized)
    }

    async fn sync(&self, device: &Device) -> Result<DeviceSync, DeviceError> {
        let filter = BookingFilter {
            hotel_id: Some(device.hotel_id),
            statuses: vec![BookingStatus::Confirmed, BookingStatus::Active],
            ..BookingFilter::default()
        };
        let bookings = self.booking_repo.list(&filter).await?;
        let ids: Vec<i64> = bookings.iter().map(|b| b.id).collect();
        let links = self.booking_repo.room_links(&ids).await?;
        let rooms = self.room_repo.list_by_hotel(device.hotel_id).await?;

        Ok(DeviceSync {
            bookings,
            rooms,
            links,
        })
    }

    async fn update_check_in(
        &self,
        device: &Device,
        booking_id: i64,
        update: CheckInUpdate,
    ) -> Result<Booking, DeviceError> {
        let booking = self.hotel_booking(device, booking_id).await?;
        let now = Utc::now();

        match (update.status, booking.status) {
            (Some(CheckInStatus::CheckedIn), BookingStatus::Confirmed) => {
                self.check_in(device, booking, update.check_in_time.unwrap_or(now))
                    .await
            }
            (Some(CheckInStatus::CheckedOut), BookingStatus::Active) => {
                let mut change = StatusChange::new(booking.id, booking.status, BookingStatus::Finished);
                change.check_in_status = Some(CheckInStatus::CheckedOut);
                change.check_out_time = Some(update.check_out_time.unwrap_or(now));
                let outcome = self.booking_repo.transition(&change).await?;

                info!(
                    booking_id,
                    device_id = device.id,
                    released_keys = outcome.released_assignments,
                    "Guest checked out"
                );
                self.changed(&outcome.booking, "booking.checked_out").await;
                Ok(outcome.booking)
            }
            (_, status) if status.is_terminal() => Err(DeviceError::Invalid(format!(
                "Booking is {} and cannot be checked in or out",
                status
            ))),
            (status, _) => Ok(self
                .booking_repo
                .record_check_in(booking_id, status, update.check_in_time, update.check_out_time)
                .await?),
        }
    }

    async fn check_in_by_token(&self, device: &Device, token: &str) -> Result<Booking, DeviceError> {
        let booking = self
            .booking_repo
            .find_by_check_in_token(token.trim())
            .await?
            .filter(|b| b.hotel_id == device.hotel_id)
            .ok_or(DeviceError::NotFound("Booking"))?;

        match booking.status {
            BookingStatus::Confirmed => self.check_in(device, booking, Utc::now()).await,
            BookingStatus::Active => Ok(booking),
            status => Err(DeviceError::Invalid(format!("Booking is {} and cannot be checked in", status))),
        }
    }

    async fn access(&self, device: &Device, uid: &str, room_id: i64) -> Result<AccessCheck, DeviceError> {
        let key = self
            .rfid_repo
            .find_key_by_uid(&normalize_uid(uid))
            .await?
            .filter(|k| k.hotel_id == device.hotel_id);

        let Some(key) = key else {
            info!(device_id = device.id, room_id, "Unknown key presented");
            return Ok(AccessCheck {
                decision: AccessDecision::NotAssigned,
                rfid_key_id: None,
                booking_id: None,
            });
        };

        let assignments = self.rfid_repo.assignments_for_key(key.id, false).await?;
        let today = Utc::now().date_naive();
        let decision = reservation::grants_access(&key, &assignments, room_id, today);
        let booking_id = decision
            .is_granted()
            .then(|| {
                assignments
                    .iter()
                    .find(|a| a.room_id == room_id && a.window().is_ok_and(|w| w.covers(today)))
                    .and_then(|a| a.booking_id)
            })
            .flatten();

        info!(
            device_id = device.id,
            rfid_key_id = key.id,
            room_id,
            granted = decision.is_granted(),
            "Door access checked"
        );
        Ok(AccessCheck {
            decision,
            rfid_key_id: Some(key.id),
            booking_id,
        })
    }

    async fn list_devices(&self, actor: Actor) -> Result<Vec<Device>, DeviceError> {
        Self::require_super_admin(actor)?;
        Ok(self.device_repo.list().await?)
    }

    async fn create_device(
        &self,
        actor: Actor,
        hotel_id: i64,
        name: Option<String>,
    ) -> Result<IssuedDevice, DeviceError> {
        Self::require_super_admin(actor)?;
        self.hotel_repo
            .find_by_id(hotel_id)
            .await?
            .ok_or(DeviceError::NotFound("Hotel"))?;

        let token = new_device_token();
        let now = Utc::now();
        let device = Device {
            id: self.id_generator.generate(),
            hotel_id,
            name: clean_name(name),
            token_hash: sha256_hex(&token),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let device = self.device_repo.create(&device).await?;

        info!(device_id = device.id, hotel_id, "Device registered");
        Ok(IssuedDevice { device, token })
    }

    async fn update_device(
        &self,
        actor: Actor,
        device_id: i64,
        update: UpdateDeviceDto,
    ) -> Result<Device, DeviceError> {
        Self::require_super_admin(actor)?;
        let mut device = self.find_device(device_id).await?;
        if update.name.is_some() {
            device.name = clean_name(update.name);
        }
        if let Some(active) = update.is_active {
            device.is_active = active;
        }
        Ok(self.device_repo.update(&device).await?)
    }

    async fn delete_device(&self, actor: Actor, device_id: i64) -> Result<(), DeviceError> {
        Self::require_super_admin(actor)?;
        self.find_device(device_id).await?;
        self.device_repo.delete(device_id).await?;
        info!(device_id, "Device deleted");
        Ok(())
    }

    async fn regenerate_token(&self, actor: Actor, device_id: i64) -> Result<IssuedDevice, DeviceError> {
        Self::require_super_admin(actor)?;
        self.find_device(device_id).await?;

        let token = new_device_token();
        let device = self.device_repo.rotate_token(device_id, &sha256_hex(&token)).await?;
        info!(device_id, "Device token rotated");
        Ok(IssuedDevice { device, token })
    }
}

/// Rooms grouped per booking, as terminals display them.
pub fn rooms_by_booking(links: &[BookingRoomLink]) -> HashMap<i64, Vec<i64>> {
    let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
    for link in links {
        grouped.entry(link.booking_id).or_default().push(link.room.id);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        MockBookingRepository, MockDeviceRepository, MockHotelRepository, MockNotifier,
        MockRfidRepository, MockRoomRepository, RfidAssignment, RfidKey, RfidKeyStatus,
        StatusChangeOutcome, UserRole,
    };
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    type Service = DeviceServiceImpl<
        MockDeviceRepository,
        MockBookingRepository,
        MockRoomRepository,
        MockRfidRepository,
        MockHotelRepository,
    >;

    struct Mocks {
        devices: MockDeviceRepository,
        bookings: MockBookingRepository,
        rooms: MockRoomRepository,
        keys: MockRfidRepository,
        hotels: MockHotelRepository,
        notifier: MockNotifier,
        cache: CatalogCache,
    }

    impl Mocks {
        fn new() -> Self {
            let mut notifier = MockNotifier::new();
            notifier.expect_notify().return_const(());
            Self {
                devices: MockDeviceRepository::new(),
                bookings: MockBookingRepository::new(),
                rooms: MockRoomRepository::new(),
                keys: MockRfidRepository::new(),
                hotels: MockHotelRepository::new(),
                notifier,
                cache: CatalogCache::disabled(),
            }
        }

        fn build(self) -> Service {
            DeviceServiceImpl::new(
                Arc::new(self.devices),
                Arc::new(self.bookings),
                Arc::new(self.rooms),
                Arc::new(self.keys),
                Arc::new(self.hotels),
                Arc::new(self.notifier),
                self.cache,
                Arc::new(SnowflakeGenerator::new(1)),
            )
        }
    }

    fn device(active: bool) -> Device {
        Device {
            id: 9,
            hotel_id: 1,
            name: Some("Front desk".into()),
            token_hash: sha256_hex("secret-token"),
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn booking(hotel_id: i64, status: BookingStatus) -> Booking {
        let today = Utc::now().date_naive();
        Booking {
            id: 100,
            user_id: 5,
            hotel_id,
            start_date: today,
            end_date: today + Duration::days(2),
            total_price: 0,
            status,
            check_in_token: Some("abc".into()),
            check_in_status: None,
            check_in_time: None,
            check_out_time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn applied(change: &StatusChange) -> Result<StatusChangeOutcome, AppError> {
        Ok(StatusChangeOutcome {
            booking: Booking {
                status: change.to,
                check_in_status: change.check_in_status,
                ..booking(1, change.from)
            },
            released_assignments: if change.to.releases_keys() { 2 } else { 0 },
        })
    }

    #[tokio::test]
    async fn test_authenticate_hashes_token_and_requires_active() {
        let mut m = Mocks::new();
        m.devices
            .expect_find_by_token_hash()
            .withf(|hash| hash == sha256_hex("secret-token"))
            .returning(|_| Ok(Some(device(false))));

        let result = m.build().authenticate("secret-token").await;
        assert!(matches!(result, Err(DeviceError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_checked_in_activates_confirmed_booking() {
        let mut m = Mocks::new();
        m.bookings
            .expect_find_by_id()
            .returning(|_| Ok(Some(booking(1, BookingStatus::Confirmed))));
        m.bookings
            .expect_transition()
            .withf(|c| c.to == BookingStatus::Active && c.check_in_time.is_some())
            .times(1)
            .returning(applied);
        let cache = m.cache.clone();

        let updated = m
            .build()
            .update_check_in(
                &device(true),
                100,
                CheckInUpdate {
                    status: Some(CheckInStatus::CheckedIn),
                    ..CheckInUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, BookingStatus::Active);
        assert_eq!(cache.generation(), 1);
    }

    #[tokio::test]
    async fn test_checked_out_finishes_active_booking() {
        let mut m = Mocks::new();
        m.bookings
            .expect_find_by_id()
            .returning(|_| Ok(Some(booking(1, BookingStatus::Active))));
        m.bookings
            .expect_transition()
            .withf(|c| c.to == BookingStatus::Finished && c.check_out_time.is_some())
            .times(1)
            .returning(applied);
        let cache = m.cache.clone();

        let updated = m
            .build()
            .update_check_in(
                &device(true),
                100,
                CheckInUpdate {
                    status: Some(CheckInStatus::CheckedOut),
                    ..CheckInUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, BookingStatus::Finished);
        assert_eq!(cache.generation(), 1);
    }

    #[tokio::test]
    async fn test_other_hotels_booking_is_hidden() {
        let mut m = Mocks::new();
        m.bookings
            .expect_find_by_id()
            .returning(|_| Ok(Some(booking(2, BookingStatus::Confirmed))));
        m.bookings.expect_transition().never();

        let result = m
            .build()
            .update_check_in(&device(true), 100, CheckInUpdate::default())
            .await;
        assert!(matches!(result, Err(DeviceError::NotFound("Booking"))));
    }

    #[tokio::test]
    async fn test_check_in_by_token_is_idempotent() {
        let mut m = Mocks::new();
        m.bookings
            .expect_find_by_check_in_token()
            .withf(|t| t == "abc")
            .returning(|_| Ok(Some(booking(1, BookingStatus::Active))));
        m.bookings.expect_transition().never();
        let cache = m.cache.clone();

        let booking = m.build().check_in_by_token(&device(true), " abc ").await.unwrap();
        assert_eq!(booking.status, BookingStatus::Active);
        assert_eq!(cache.generation(), 0);
    }

    #[tokio::test]
    async fn test_access_granted_for_assigned_room() {
        let mut m = Mocks::new();
        m.keys.expect_find_key_by_uid().withf(|uid| uid == "04AB").returning(|uid| {
            Ok(Some(RfidKey {
                id: 3,
                hotel_id: 1,
                uid: uid.to_string(),
                label: None,
                status: RfidKeyStatus::Available,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }))
        });
        m.keys.expect_assignments_for_key().returning(|key_id, _| {
            Ok(vec![RfidAssignment {
                id: 50,
                reservation_id: 50,
                rfid_key_id: key_id,
                booking_id: Some(100),
                room_id: 7,
                reserved_from: Utc::now().date_naive(),
                reserved_to: None,
                assigned_at: Utc::now(),
                released_at: None,
            }])
        });
        let service = m.build();

        let granted = service.access(&device(true), "04ab", 7).await.unwrap();
        assert_eq!(granted.decision, AccessDecision::Granted);
        assert_eq!(granted.booking_id, Some(100));

        let denied = service.access(&device(true), "04ab", 8).await.unwrap();
        assert_eq!(denied.decision, AccessDecision::NotAssigned);
    }

    #[tokio::test]
    async fn test_create_device_returns_token_once() {
        let mut m = Mocks::new();
        m.hotels.expect_find_by_id().returning(|id| {
            Ok(Some(crate::domain::Hotel {
                id,
                ..crate::domain::Hotel::default()
            }))
        });
        m.devices.expect_create().returning(|d| Ok(d.clone()));

        let issued = m
            .build()
            .create_device(Actor::new(1, UserRole::SuperAdmin), 1, Some(" Door ".into()))
            .await
            .unwrap();
        assert_eq!(issued.token.len(), 64);
        assert_eq!(issued.device.token_hash, sha256_hex(&issued.token));
        assert_eq!(issued.device.name.as_deref(), Some("Door"));
    }

    #[tokio::test]
    async fn test_hotel_admin_cannot_manage_devices() {
        let m = Mocks::new();
        let result = m.build().list_devices(Actor::new(1, UserRole::Hotel)).await;
        assert!(matches!(result, Err(DeviceError::Forbidden)));
    }
}

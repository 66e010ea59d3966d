//! # Domain Entities
//!
//! Core domain entities of the booking platform. All entities map directly
//! to their corresponding database tables.
//!
//! ## Core Entities
//!
//! - **Hotel**, **Room**, **ServiceItem**: the bookable catalog
//! - **Booking** with its **Guest**s and **InvoiceDetail**
//! - **RfidKey** and **RfidAssignment**: key cards reserved for rooms over date windows
//! - **Invoice**: one per booking
//!
//! ## Supporting Entities
//!
//! - **User** and **Session**: accounts and refresh tokens
//! - **ServiceTag**, **Image**: catalog decoration
//! - **Device**: hotel terminals calling the device API
//! - **PendingNotification**: webhook deliveries awaiting retry
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod booking;
mod catalog;
mod device;
mod hotel;
mod image;
mod invoice;
mod notification;
mod rfid;
mod room;
mod service_item;
mod session;
mod tag;
mod user;

pub use booking::{
    Booking, BookingFilter, BookingRepository, BookingRoomLink, BookingStatus, CheckInStatus,
    CustomerType, Guest, InvoiceDetail, NewBooking, RoomOccupancy, StatusChange,
    StatusChangeOutcome,
};
pub use catalog::{
    BookedWindow, CatalogHotel, CatalogRepository, CatalogRoom, PlatformStats,
    RecommendationCandidate, SearchCandidate,
};
pub use device::{Device, DeviceRepository};
pub use hotel::{Hotel, HotelRepository, HotelType};
pub use image::{Image, ImageRepository};
pub use invoice::{format_invoice_number, Invoice, InvoiceRepository, InvoiceStatus, NewInvoice};
pub use notification::{
    Notification, NotificationKind, NotificationRepository, Notifier, PendingNotification,
};
pub use rfid::{
    CalendarEntry, KeyFilter, KeyState, NewAssignment, RfidAssignment, RfidKey, RfidKeyStatus,
    RfidRepository,
};
pub use room::{Room, RoomRepository};
pub use service_item::{ServiceItem, ServiceItemRepository};
pub use session::{Session, SessionRepository};
pub use tag::{ServiceTag, TagRepository, TagUsage};
pub use user::{Actor, User, UserRemoval, UserRepository, UserRole};

#[cfg(test)]
pub use booking::MockBookingRepository;
#[cfg(test)]
pub use catalog::MockCatalogRepository;
#[cfg(test)]
pub use device::MockDeviceRepository;
#[cfg(test)]
pub use hotel::MockHotelRepository;
#[cfg(test)]
pub use invoice::MockInvoiceRepository;
#[cfg(test)]
pub use notification::{MockNotificationRepository, MockNotifier};
#[cfg(test)]
pub use rfid::MockRfidRepository;
#[cfg(test)]
pub use room::MockRoomRepository;
#[cfg(test)]
pub use service_item::MockServiceItemRepository;
#[cfg(test)]
pub use session::MockSessionRepository;
#[cfg(test)]
pub use user::MockUserRepository;
#[cfg(test)]
pub use image::MockImageRepository;
#[cfg(test)]
pub use tag::MockTagRepository;

//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! This module provides concrete implementations of the repository traits
//! defined in the domain layer. Each repository handles data access for
//! a specific entity type.
//!
//! ## Available Repositories
//!
//! - **UserRepository** / **SessionRepository** - Accounts and refresh tokens
//! - **HotelRepository** / **RoomRepository** / **ServiceItemRepository** - Catalog management
//! - **TagRepository** / **ImageRepository** - Catalog decoration
//! - **BookingRepository** - Room reservations, guests, status changes
//! - **RfidRepository** - Key cards and their date-windowed assignments
//! - **InvoiceRepository** - Invoices with per-year numbering
//! - **DeviceRepository** - Hotel terminal credentials
//! - **NotificationRepository** - Failed webhook deliveries
//! - **CatalogRepository** - Read models for search and the back office
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgBookingRepository, PgRfidRepository};
//!
//! fn setup_repositories(pool: PgPool) {
//!     let bookings = PgBookingRepository::new(pool.clone());
//!     let keys = PgRfidRepository::new(pool);
//! }
//! ```

use crate::domain::BookingStatus;

pub mod booking_repository;
pub mod catalog_repository;
pub mod device_repository;
pub mod hotel_repository;
pub mod image_repository;
pub mod invoice_repository;
pub mod notification_repository;
pub mod rfid_repository;
pub mod room_repository;
pub mod service_item_repository;
pub mod session_repository;
pub mod tag_repository;
pub mod user_repository;

pub use booking_repository::PgBookingRepository;
pub use catalog_repository::PgCatalogRepository;
pub use device_repository::PgDeviceRepository;
pub use hotel_repository::PgHotelRepository;
pub use image_repository::PgImageRepository;
pub use invoice_repository::PgInvoiceRepository;
pub use notification_repository::PgNotificationRepository;
pub use rfid_repository::PgRfidRepository;
pub use room_repository::PgRoomRepository;
pub use service_item_repository::PgServiceItemRepository;
pub use session_repository::PgSessionRepository;
pub use tag_repository::PgTagRepository;
pub use user_repository::PgUserRepository;

/// Booking statuses that keep rooms occupied, as bound SQL text values.
fn holding_statuses() -> Vec<&'static str> {
    BookingStatus::HOLDING.iter().map(|s| s.as_str()).collect()
}

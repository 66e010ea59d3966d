//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: Registration, login, JWT and refresh tokens, profile
//! - **HotelService**: Hotels, rooms and extra services
//! - **TagService**: Service tags and images
//! - **BookingService**: Bookings, status changes and guests
//! - **RfidService**: Key cards and their room assignments
//! - **SearchService**: Availability search, recommendations, catalog
//! - **InvoiceService**: Invoice drafts, approval, sending and download
//! - **DeviceService**: Hotel terminals and their API
//! - **AdminService**: Super admin back office

use crate::domain::{Actor, Hotel};

pub mod admin_service;
pub mod auth_service;
pub mod booking_service;
pub mod device_service;
pub mod hotel_service;
pub mod invoice_service;
pub mod rfid_service;
pub mod search_service;
pub mod tag_service;

// Re-export auth service types
pub use auth_service::{
    decode_claims, AuthError, AuthService, AuthServiceImpl, AuthTokens, Claims, RegisterDto,
    RegisterHotelDto, UpdateProfileDto,
};

// Re-export catalog management types
pub use hotel_service::{
    CreateRoomDto, CreateServiceDto, HotelDetail, HotelError, HotelService, HotelServiceImpl,
    UpdateHotelDto, UpdateRoomDto, UpdateServiceDto,
};
pub use tag_service::{TagError, TagService, TagServiceImpl};

// Re-export booking service types
pub use booking_service::{
    BookingDetail, BookingError, BookingService, BookingServiceImpl, CreateBookingDto, GuestDto,
};

// Re-export RFID service types
pub use rfid_service::{
    AssignRoomsDto, CalendarQuery, CreateKeyDto, EligibleBooking, KeyQuery, KeyView, RfidError,
    RfidService, RfidServiceImpl, UpdateKeyDto,
};

pub use search_service::{SearchError, SearchQuery, SearchResult, SearchService, SearchServiceImpl};

pub use invoice_service::{InvoiceError, InvoiceService, InvoiceServiceImpl, RenderedInvoice};

pub use device_service::{
    AccessCheck, CheckInUpdate, DeviceError, DeviceService, DeviceServiceImpl, DeviceSync,
    IssuedDevice, UpdateDeviceDto,
};

pub use admin_service::{AdminError, AdminService, AdminServiceImpl, AdminUpdateUserDto, UserQuery};

/// Super admins manage every hotel; a hotel admin only their own.
pub(crate) fn can_manage(actor: &Actor, hotel: &Hotel) -> bool {
    actor.is_super_admin() || (actor.is_hotel_admin() && hotel.is_owned_by(actor.user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;

    #[test]
    fn test_can_manage() {
        let hotel = Hotel {
            owner_id: 7,
            ..Hotel::default()
        };
        assert!(can_manage(&Actor::new(1, UserRole::SuperAdmin), &hotel));
        assert!(can_manage(&Actor::new(7, UserRole::Hotel), &hotel));
        assert!(!can_manage(&Actor::new(8, UserRole::Hotel), &hotel));
        // Owning the id is not enough without the hotel role
        assert!(!can_manage(&Actor::new(7, UserRole::Guest), &hotel));
    }
}

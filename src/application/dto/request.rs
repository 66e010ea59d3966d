//! Request DTOs
//!
//! Data structures for API request bodies and query strings. Ids travel as
//! decimal strings and are parsed in the handlers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{
    BookingStatus, CheckInStatus, CustomerType, HotelType, RfidKeyStatus, UserRole,
};
use crate::shared::validation::validate_id_list;

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Guest registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Hotel admin registration, creating the hotel in the same step
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterHotelRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Hotel name must be 1-100 characters"))]
    pub hotel_name: String,

    #[validate(length(min = 1, max = 255, message = "Location must be 1-255 characters"))]
    pub location: String,

    pub description: Option<String>,

    #[serde(default)]
    pub hotel_type: HotelType,

    #[validate(range(min = 1, max = 5, message = "Star rating must be 1-5"))]
    pub star_rating: Option<i16>,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Update own profile request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 50, message = "Tax number must be at most 50 characters"))]
    pub tax_number: Option<String>,

    #[validate(length(max = 50, message = "Bank account must be at most 50 characters"))]
    pub bank_account: Option<String>,

    #[validate(length(max = 50, message = "EU tax number must be at most 50 characters"))]
    pub eu_tax_number: Option<String>,
}

// ---------------------------------------------------------------------------
// Catalog management
// ---------------------------------------------------------------------------

/// Hotel list query parameters
#[derive(Debug, Deserialize)]
pub struct HotelListQuery {
    pub location: Option<String>,
}

/// Update hotel request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateHotelRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Location must be 1-255 characters"))]
    pub location: Option<String>,

    pub description: Option<String>,
    pub hotel_type: Option<HotelType>,

    #[validate(range(min = 1, max = 5, message = "Star rating must be 1-5"))]
    pub star_rating: Option<i16>,

    #[validate(url(message = "Cover image must be a valid URL"))]
    pub cover_image: Option<String>,
}

/// Create room request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[validate(range(min = 0, max = 100000000, message = "Price must be between 0 and 100000000"))]
    pub price_per_night: i64,

    #[serde(default)]
    #[validate(range(min = 0, max = 100000000, message = "Base price must be between 0 and 100000000"))]
    pub base_price: i64,

    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: i32,
}

/// Update room request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoomRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,

    #[validate(range(min = 0, max = 100000000, message = "Price must be between 0 and 100000000"))]
    pub price_per_night: Option<i64>,

    #[validate(range(min = 0, max = 100000000, message = "Base price must be between 0 and 100000000"))]
    pub base_price: Option<i64>,

    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: Option<i32>,
}

/// Create hotel service request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[validate(range(min = 0, max = 100000000, message = "Price must be between 0 and 100000000"))]
    pub price: i64,
}

/// Update hotel service request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateServiceRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,

    #[validate(range(min = 0, max = 100000000, message = "Price must be between 0 and 100000000"))]
    pub price: Option<i64>,
}

/// Create or rename a tag
#[derive(Debug, Deserialize, Validate)]
pub struct TagRequest {
    #[validate(length(min = 1, max = 50, message = "Tag name must be 1-50 characters"))]
    pub name: String,
}

/// Attach a tag to a hotel or room
#[derive(Debug, Deserialize)]
pub struct AttachTagRequest {
    pub tag_id: String,
}

/// Create image request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateImageRequest {
    #[validate(url(message = "Invalid image URL"))]
    pub url: String,

    pub room_id: Option<String>,
}

/// Link an existing image to a room
#[derive(Debug, Deserialize)]
pub struct LinkImageRequest {
    pub image_id: String,
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

/// A guest staying under a booking
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct GuestRequest {
    #[validate(length(min = 1, max = 100, message = "Guest name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 50, message = "ID number must be 1-50 characters"))]
    pub id_number: String,

    pub date_of_birth: Option<NaiveDate>,
}

/// Billing data used as the invoice buyer
#[derive(Debug, Deserialize, Validate)]
pub struct InvoiceDetailRequest {
    #[serde(default)]
    pub customer_type: CustomerType,

    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(max = 100, message = "Company name must be at most 100 characters"))]
    pub company_name: Option<String>,

    #[validate(length(max = 50, message = "Tax number must be at most 50 characters"))]
    pub tax_number: Option<String>,

    #[validate(length(max = 100, message = "Country must be at most 100 characters"))]
    pub country: Option<String>,

    #[validate(length(max = 100, message = "City must be at most 100 characters"))]
    pub city: Option<String>,

    #[validate(length(max = 20, message = "Postal code must be at most 20 characters"))]
    pub postal_code: Option<String>,

    #[validate(length(max = 255, message = "Address must be at most 255 characters"))]
    pub address_line: Option<String>,

    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

/// Create booking request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[validate(length(min = 1, message = "At least one room is required"))]
    #[validate(custom(function = "validate_id_list"))]
    pub room_ids: Vec<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_id_list"))]
    pub service_ids: Vec<String>,

    #[serde(default)]
    #[validate(nested)]
    pub guests: Vec<GuestRequest>,

    #[validate(nested)]
    pub invoice_detail: Option<InvoiceDetailRequest>,
}

/// Change a booking's status
#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

/// Register more guests on a booking
#[derive(Debug, Deserialize, Validate)]
pub struct AddGuestsRequest {
    #[validate(length(min = 1, message = "At least one guest is required"))]
    #[validate(nested)]
    pub guests: Vec<GuestRequest>,
}

// ---------------------------------------------------------------------------
// RFID keys
// ---------------------------------------------------------------------------

/// Key list query parameters
#[derive(Debug, Deserialize)]
pub struct KeyListQuery {
    pub hotel_id: Option<String>,
    pub status: Option<RfidKeyStatus>,
    pub search: Option<String>,
}

/// Register a key card
#[derive(Debug, Deserialize, Validate)]
pub struct CreateKeyRequest {
    pub hotel_id: Option<String>,

    #[validate(length(min = 1, max = 64, message = "UID must be 1-64 characters"))]
    pub uid: String,

    #[validate(length(max = 100, message = "Label must be at most 100 characters"))]
    pub label: Option<String>,
}

/// Update a key card
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateKeyRequest {
    #[validate(length(min = 1, max = 64, message = "UID must be 1-64 characters"))]
    pub uid: Option<String>,

    #[validate(length(max = 100, message = "Label must be at most 100 characters"))]
    pub label: Option<String>,

    pub status: Option<RfidKeyStatus>,
}

/// Issue a key for a booking's room
#[derive(Debug, Deserialize)]
pub struct AssignKeyRequest {
    pub booking_id: String,
    pub room_id: String,
}

/// Issue a key for rooms without a booking
#[derive(Debug, Deserialize, Validate)]
pub struct AssignRoomRequest {
    #[validate(length(min = 1, message = "At least one room is required"))]
    #[validate(custom(function = "validate_id_list"))]
    pub room_ids: Vec<String>,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    #[serde(default)]
    pub lifetime: bool,
}

/// Release one assignment, or all of the key's when omitted
#[derive(Debug, Default, Deserialize)]
pub struct ReleaseKeyRequest {
    pub assignment_id: Option<String>,
}

/// Key assignment history query
#[derive(Debug, Deserialize)]
pub struct AssignmentsQuery {
    #[serde(default)]
    pub include_released: bool,
}

/// Key calendar query
#[derive(Debug, Deserialize)]
pub struct CalendarParams {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub key_id: Option<String>,
    pub hotel_id: Option<String>,
}

/// Optional hotel selector for super admins
#[derive(Debug, Deserialize)]
pub struct HotelScopeQuery {
    pub hotel_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

fn default_guests() -> u32 {
    1
}

/// Availability search query
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub city: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_guests")]
    pub guests: u32,
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// Check-in state reported by a terminal
#[derive(Debug, Deserialize)]
pub struct CheckInUpdateRequest {
    pub check_in_status: Option<CheckInStatus>,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
}

/// Check in by the code printed on the booking confirmation
#[derive(Debug, Deserialize, Validate)]
pub struct CheckInByTokenRequest {
    #[validate(length(min = 1, max = 64, message = "Token must be 1-64 characters"))]
    pub token: String,
}

/// Card presented at a door
#[derive(Debug, Deserialize, Validate)]
pub struct AccessRequest {
    #[validate(length(min = 1, max = 64, message = "UID must be 1-64 characters"))]
    pub uid: String,

    pub room_id: String,
}

// ---------------------------------------------------------------------------
// Super admin
// ---------------------------------------------------------------------------

/// User list query
#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Change a user's name or role
#[derive(Debug, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub role: Option<UserRole>,
}

/// Booking list filter
#[derive(Debug, Deserialize)]
pub struct AdminBookingQuery {
    pub status: Option<BookingStatus>,
}

/// Register a hotel terminal
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDeviceRequest {
    pub hotel_id: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Rename or (de)activate a terminal
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDeviceRequest {
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::validation::validate_body;

    #[test]
    fn test_booking_request_parses_dates_and_defaults() {
        let body: CreateBookingRequest = serde_json::from_str(
            r#"{"start_date":"2026-05-01","end_date":"2026-05-03","room_ids":["12"]}"#,
        )
        .unwrap();
        assert_eq!(body.start_date, NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
        assert!(body.service_ids.is_empty() && body.guests.is_empty());
        assert!(validate_body(&body).is_ok());
    }

    #[test]
    fn test_booking_request_rejects_bad_room_ids() {
        let body: CreateBookingRequest = serde_json::from_str(
            r#"{"start_date":"2026-05-01","end_date":"2026-05-03","room_ids":["abc"]}"#,
        )
        .unwrap();
        assert!(validate_body(&body).is_err());
    }

    #[test]
    fn test_nested_guest_validation() {
        let body: AddGuestsRequest =
            serde_json::from_str(r#"{"guests":[{"name":"","id_number":"X1"}]}"#).unwrap();
        assert!(validate_body(&body).is_err());
    }

    #[test]
    fn test_star_rating_range() {
        let body = UpdateHotelRequest {
            name: None,
            location: None,
            description: None,
            hotel_type: None,
            star_rating: Some(6),
            cover_image: None,
        };
        assert!(validate_body(&body).is_err());
    }

    #[test]
    fn test_search_guests_default_to_one() {
        let params: SearchParams = serde_json::from_str(
            r#"{"city":"Szeged","start_date":"2026-05-01","end_date":"2026-05-02"}"#,
        )
        .unwrap();
        assert_eq!(params.guests, 1);
    }

    #[test]
    fn test_bank_account_fits_column() {
        let profile = |len: usize| UpdateProfileRequest {
            name: None,
            tax_number: None,
            bank_account: Some("1".repeat(len)),
            eu_tax_number: None,
        };
        assert!(validate_body(&profile(50)).is_ok());
        assert!(validate_body(&profile(51)).is_err());
    }

    #[test]
    fn test_room_price_is_capped() {
        let room = |price: i64| CreateRoomRequest {
            name: "Deluxe".into(),
            description: None,
            price_per_night: price,
            base_price: 0,
            capacity: 2,
        };
        assert!(validate_body(&room(100_000_000)).is_ok());
        assert!(validate_body(&room(100_000_001)).is_err());
        assert!(validate_body(&room(-1)).is_err());
    }

    #[test]
    fn test_service_price_is_capped() {
        let body: UpdateServiceRequest = serde_json::from_str(r#"{"price":9223372036854775807}"#).unwrap();
        assert!(validate_body(&body).is_err());
    }
}

//! Response DTOs
//!
//! Data structures for API response bodies. Snowflake ids are rendered as
//! strings so JavaScript clients keep full precision.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::application::services::{
    device_service::rooms_by_booking, AccessCheck, AuthTokens, BookingDetail, DeviceSync,
    EligibleBooking, HotelDetail, IssuedDevice, KeyView, SearchResult,
};
use crate::domain::services::{AccessDecision, PlanLabel, RankedHotel, StayPlan};
use crate::domain::{
    BookedWindow, Booking, BookingStatus, CalendarEntry, CatalogHotel, CatalogRoom, CheckInStatus,
    CustomerType, Device, Guest, Hotel, HotelType, Image, Invoice, InvoiceDetail, InvoiceStatus,
    KeyState, RfidAssignment, RfidKey, RfidKeyStatus, Room, ServiceItem, ServiceTag, TagUsage,
    User, UserRole,
};

/// Authentication tokens response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

impl From<AuthTokens> for TokenResponse {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            token_type: tokens.token_type,
        }
    }
}

/// Registration and login response (user, tokens and, for hotel admins,
/// their hotel)
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel: Option<HotelResponse>,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

impl AuthResponse {
    pub fn new(user: User, hotel: Option<Hotel>, tokens: AuthTokens) -> Self {
        Self {
            user: user.into(),
            hotel: hotel.map(Into::into),
            tokens: tokens.into(),
        }
    }
}

/// User response
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub tax_number: Option<String>,
    pub bank_account: Option<String>,
    pub eu_tax_number: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
            role: user.role,
            tax_number: user.tax_number,
            bank_account: user.bank_account,
            eu_tax_number: user.eu_tax_number,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HotelResponse {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub hotel_type: HotelType,
    pub star_rating: Option<i16>,
    pub cover_image: Option<String>,
    pub created_at: String,
}

impl From<Hotel> for HotelResponse {
    fn from(hotel: Hotel) -> Self {
        Self {
            id: hotel.id.to_string(),
            owner_id: hotel.owner_id.to_string(),
            name: hotel.name,
            location: hotel.location,
            description: hotel.description,
            hotel_type: hotel.hotel_type,
            star_rating: hotel.star_rating,
            cover_image: hotel.cover_image,
            created_at: hotel.created_at.to_rfc3339(),
        }
    }
}

/// Public hotel page
#[derive(Debug, Serialize)]
pub struct HotelDetailResponse {
    #[serde(flatten)]
    pub hotel: HotelResponse,
    pub rooms: Vec<RoomResponse>,
    pub services: Vec<ServiceResponse>,
    pub tags: Vec<TagResponse>,
}

impl From<HotelDetail> for HotelDetailResponse {
    fn from(detail: HotelDetail) -> Self {
        Self {
            hotel: detail.hotel.into(),
            rooms: detail.rooms.into_iter().map(Into::into).collect(),
            services: detail.services.into_iter().map(Into::into).collect(),
            tags: detail.tags.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub id: String,
    pub hotel_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_per_night: i64,
    pub base_price: i64,
    pub capacity: i32,
    pub created_at: String,
}

impl From<Room> for RoomResponse {
    fn from(room: Room) -> Self {
        Self {
            id: room.id.to_string(),
            hotel_id: room.hotel_id.to_string(),
            name: room.name,
            description: room.description,
            price_per_night: room.price_per_night,
            base_price: room.base_price,
            capacity: room.capacity,
            created_at: room.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceResponse {
    pub id: String,
    pub hotel_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
}

impl From<ServiceItem> for ServiceResponse {
    fn from(item: ServiceItem) -> Self {
        Self {
            id: item.id.to_string(),
            hotel_id: item.hotel_id.to_string(),
            name: item.name,
            description: item.description,
            price: item.price,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: String,
    pub name: String,
}

impl From<ServiceTag> for TagResponse {
    fn from(tag: ServiceTag) -> Self {
        Self {
            id: tag.id.to_string(),
            name: tag.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagUsageResponse {
    #[serde(flatten)]
    pub tag: TagResponse,
    pub hotel_count: i64,
    pub room_count: i64,
}

impl From<TagUsage> for TagUsageResponse {
    fn from(usage: TagUsage) -> Self {
        Self {
            tag: usage.tag.into(),
            hotel_count: usage.hotel_count,
            room_count: usage.room_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub id: String,
    pub url: String,
    pub created_at: String,
}

impl From<Image> for ImageResponse {
    fn from(image: Image) -> Self {
        Self {
            id: image.id.to_string(),
            url: image.url,
            created_at: image.created_at.to_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub user_id: String,
    pub hotel_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub nights: i64,
    pub total_price: i64,
    pub status: BookingStatus,
    pub check_in_token: Option<String>,
    pub check_in_status: Option<CheckInStatus>,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub created_at: String,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id.to_string(),
            user_id: booking.user_id.to_string(),
            hotel_id: booking.hotel_id.to_string(),
            nights: booking.nights(),
            start_date: booking.start_date,
            end_date: booking.end_date,
            total_price: booking.total_price,
            status: booking.status,
            check_in_token: booking.check_in_token,
            check_in_status: booking.check_in_status,
            check_in_time: booking.check_in_time,
            check_out_time: booking.check_out_time,
            created_at: booking.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GuestResponse {
    pub id: String,
    pub booking_id: String,
    pub name: String,
    pub id_number: String,
    pub date_of_birth: Option<NaiveDate>,
}

impl From<Guest> for GuestResponse {
    fn from(guest: Guest) -> Self {
        Self {
            id: guest.id.to_string(),
            booking_id: guest.booking_id.to_string(),
            name: guest.name,
            id_number: guest.id_number,
            date_of_birth: guest.date_of_birth,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceDetailResponse {
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

impl From<InvoiceDetail> for InvoiceDetailResponse {
    fn from(detail: InvoiceDetail) -> Self {
        Self {
            customer_type: detail.customer_type,
            full_name: detail.full_name,
            email: detail.email,
            company_name: detail.company_name,
            tax_number: detail.tax_number,
            country: detail.country,
            city: detail.city,
            postal_code: detail.postal_code,
            address_line: detail.address_line,
            note: detail.note,
        }
    }
}

/// Booking with rooms, services, guests and billing data
#[derive(Debug, Serialize)]
pub struct BookingDetailResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    pub rooms: Vec<RoomResponse>,
    pub services: Vec<ServiceResponse>,
    pub guests: Vec<GuestResponse>,
    pub invoice_detail: Option<InvoiceDetailResponse>,
}

impl From<BookingDetail> for BookingDetailResponse {
    fn from(detail: BookingDetail) -> Self {
        Self {
            booking: detail.booking.into(),
            rooms: detail.rooms.into_iter().map(Into::into).collect(),
            services: detail.services.into_iter().map(Into::into).collect(),
            guests: detail.guests.into_iter().map(Into::into).collect(),
            invoice_detail: detail.invoice_detail.map(Into::into),
        }
    }
}

// ---------------------------------------------------------------------------
// RFID keys
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct KeyResponse {
    pub id: String,
    pub hotel_id: String,
    pub uid: String,
    pub label: Option<String>,
    pub status: RfidKeyStatus,
    pub created_at: String,
}

impl From<RfidKey> for KeyResponse {
    fn from(key: RfidKey) -> Self {
        Self {
            id: key.id.to_string(),
            hotel_id: key.hotel_id.to_string(),
            uid: key.uid,
            label: key.label,
            status: key.status,
            created_at: key.created_at.to_rfc3339(),
        }
    }
}

/// Key list entry with today's effective state
#[derive(Debug, Serialize)]
pub struct KeyViewResponse {
    #[serde(flatten)]
    pub key: KeyResponse,
    pub state: KeyState,
    pub current_assignment: Option<AssignmentResponse>,
    pub upcoming_assignments: usize,
}

impl From<KeyView> for KeyViewResponse {
    fn from(view: KeyView) -> Self {
        Self {
            key: view.key.into(),
            state: view.state,
            current_assignment: view.current.map(Into::into),
            upcoming_assignments: view.upcoming,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub id: String,
    pub reservation_id: String,
    pub rfid_key_id: String,
    pub booking_id: Option<String>,
    pub room_id: String,
    pub reserved_from: NaiveDate,
    pub reserved_to: Option<NaiveDate>,
    pub lifetime: bool,
    pub assigned_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl From<RfidAssignment> for AssignmentResponse {
    fn from(a: RfidAssignment) -> Self {
        Self {
            id: a.id.to_string(),
            reservation_id: a.reservation_id.to_string(),
            rfid_key_id: a.rfid_key_id.to_string(),
            booking_id: a.booking_id.map(|id| id.to_string()),
            room_id: a.room_id.to_string(),
            reserved_from: a.reserved_from,
            lifetime: a.reserved_to.is_none(),
            reserved_to: a.reserved_to,
            assigned_at: a.assigned_at,
            released_at: a.released_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CalendarEntryResponse {
    #[serde(flatten)]
    pub assignment: AssignmentResponse,
    pub key_uid: String,
    pub key_label: Option<String>,
    pub room_name: String,
    pub guest_name: Option<String>,
}

impl From<CalendarEntry> for CalendarEntryResponse {
    fn from(entry: CalendarEntry) -> Self {
        Self {
            assignment: entry.assignment.into(),
            key_uid: entry.key_uid,
            key_label: entry.key_label,
            room_name: entry.room_name,
            guest_name: entry.guest_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EligibleBookingResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub rooms: Vec<RoomResponse>,
}

impl From<EligibleBooking> for EligibleBookingResponse {
    fn from(eligible: EligibleBooking) -> Self {
        Self {
            booking: eligible.booking.into(),
            guest_name: eligible.guest_name,
            guest_email: eligible.guest_email,
            rooms: eligible.rooms.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PlannedRoomResponse {
    pub room_id: String,
    pub name: String,
    pub capacity: i32,
    pub price: i64,
}

#[derive(Debug, Serialize)]
pub struct StayPlanResponse {
    pub label: PlanLabel,
    pub room_count: usize,
    pub capacity: i32,
    pub total_price: i64,
    pub rooms: Vec<PlannedRoomResponse>,
}

impl From<StayPlan> for StayPlanResponse {
    fn from(plan: StayPlan) -> Self {
        Self {
            label: plan.label,
            room_count: plan.room_count,
            capacity: plan.capacity,
            total_price: plan.total_price,
            rooms: plan
                .rooms
                .into_iter()
                .map(|r| PlannedRoomResponse {
                    room_id: r.room_id.to_string(),
                    name: r.name,
                    capacity: r.capacity,
                    price: r.price,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResultResponse {
    pub hotel: HotelResponse,
    pub nights: i64,
    pub plans: Vec<StayPlanResponse>,
}

impl From<SearchResult> for SearchResultResponse {
    fn from(result: SearchResult) -> Self {
        Self {
            hotel: result.hotel.into(),
            nights: result.nights,
            plans: result.plans.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub hotel: HotelResponse,
    pub score: f64,
    pub min_price: Option<i64>,
    pub popularity: i64,
    pub cover_image: Option<String>,
    pub tags: Vec<TagResponse>,
}

impl From<RankedHotel> for RecommendationResponse {
    fn from(ranked: RankedHotel) -> Self {
        let c = ranked.candidate;
        Self {
            hotel: c.hotel.into(),
            score: ranked.score,
            min_price: c.min_price,
            popularity: c.popularity,
            cover_image: c.cover_image,
            tags: c.tags.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogRoomResponse {
    #[serde(flatten)]
    pub room: RoomResponse,
    pub images: Vec<String>,
    pub tags: Vec<TagResponse>,
    pub booked: Vec<BookedWindow>,
}

impl From<CatalogRoom> for CatalogRoomResponse {
    fn from(entry: CatalogRoom) -> Self {
        Self {
            room: entry.room.into(),
            images: entry.images,
            tags: entry.tags.into_iter().map(Into::into).collect(),
            booked: entry.booked,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogHotelResponse {
    #[serde(flatten)]
    pub hotel: HotelResponse,
    pub min_price: Option<i64>,
    pub booking_count: i64,
    pub rooms: Vec<CatalogRoomResponse>,
    pub services: Vec<ServiceResponse>,
    pub tags: Vec<TagResponse>,
}

impl From<CatalogHotel> for CatalogHotelResponse {
    fn from(entry: CatalogHotel) -> Self {
        Self {
            min_price: entry.min_price(),
            booking_count: entry.booking_count,
            hotel: entry.hotel.into(),
            rooms: entry.rooms.into_iter().map(Into::into).collect(),
            services: entry.services.into_iter().map(Into::into).collect(),
            tags: entry.tags.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: String,
    pub booking_id: String,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub subtotal: i64,
    pub tax_amount: i64,
    pub total_amount: i64,
    pub tax_rate: i64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub has_pdf: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: String,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id.to_string(),
            booking_id: invoice.booking_id.to_string(),
            invoice_number: invoice.invoice_number,
            status: invoice.status,
            subtotal: invoice.subtotal,
            tax_amount: invoice.tax_amount,
            total_amount: invoice.total_amount,
            tax_rate: invoice.tax_rate,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            has_pdf: invoice.pdf_path.is_some(),
            approved_at: invoice.approved_at,
            sent_at: invoice.sent_at,
            created_at: invoice.created_at.to_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub id: String,
    pub hotel_id: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        Self {
            id: device.id.to_string(),
            hotel_id: device.hotel_id.to_string(),
            name: device.name,
            is_active: device.is_active,
            created_at: device.created_at.to_rfc3339(),
            updated_at: device.updated_at.to_rfc3339(),
        }
    }
}

/// A device with its plaintext token; shown only on creation and rotation
#[derive(Debug, Serialize)]
pub struct IssuedDeviceResponse {
    #[serde(flatten)]
    pub device: DeviceResponse,
    pub token: String,
}

impl From<IssuedDevice> for IssuedDeviceResponse {
    fn from(issued: IssuedDevice) -> Self {
        Self {
            device: issued.device.into(),
            token: issued.token,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeviceBookingResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    pub room_ids: Vec<String>,
}

/// Everything a terminal caches locally
#[derive(Debug, Serialize)]
pub struct DeviceSyncResponse {
    pub bookings: Vec<DeviceBookingResponse>,
    pub rooms: Vec<RoomResponse>,
}

impl From<DeviceSync> for DeviceSyncResponse {
    fn from(sync: DeviceSync) -> Self {
        let mut grouped: HashMap<i64, Vec<i64>> = rooms_by_booking(&sync.links);
        Self {
            bookings: sync
                .bookings
                .into_iter()
                .map(|booking| DeviceBookingResponse {
                    room_ids: grouped
                        .remove(&booking.id)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|id| id.to_string())
                        .collect(),
                    booking: booking.into(),
                })
                .collect(),
            rooms: sync.rooms.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub granted: bool,
    pub decision: AccessDecision,
    pub rfid_key_id: Option<String>,
    pub booking_id: Option<String>,
}

impl From<AccessCheck> for AccessResponse {
    fn from(check: AccessCheck) -> Self {
        Self {
            granted: check.decision.is_granted(),
            decision: check.decision,
            rfid_key_id: check.rfid_key_id.map(|id| id.to_string()),
            booking_id: check.booking_id.map(|id| id.to_string()),
        }
    }
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BookingRoomLink;

    fn booking(id: i64) -> Booking {
        let now = Utc::now();
        Booking {
            id,
            user_id: 2,
            hotel_id: 3,
            start_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            total_price: 300,
            status: BookingStatus::Confirmed,
            check_in_token: None,
            check_in_status: None,
            check_in_time: None,
            check_out_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_booking_ids_are_strings() {
        let json = serde_json::to_value(BookingResponse::from(booking(1234567890123))).unwrap();
        assert_eq!(json["id"], "1234567890123");
        assert_eq!(json["nights"], 3);
        assert_eq!(json["start_date"], "2026-05-01");
    }

    #[test]
    fn test_device_sync_groups_rooms_per_booking() {
        let room = Room {
            id: 9,
            hotel_id: 3,
            ..Room::default()
        };
        let sync = DeviceSync {
            bookings: vec![booking(1), booking(2)],
            rooms: vec![room.clone()],
            links: vec![BookingRoomLink {
                booking_id: 1,
                room: room.clone(),
            }],
        };

        let response = DeviceSyncResponse::from(sync);
        assert_eq!(response.bookings[0].room_ids, vec!["9".to_string()]);
        assert!(response.bookings[1].room_ids.is_empty());
    }

    #[test]
    fn test_open_ended_assignment_is_lifetime() {
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
        let response = AssignmentResponse::from(assignment);
        assert!(response.lifetime);
        assert!(response.booking_id.is_none());
    }

    #[test]
    fn test_access_response_reports_grant() {
        let response = AccessResponse::from(AccessCheck {
            decision: AccessDecision::KeyLost,
            rfid_key_id: Some(5),
            booking_id: None,
        });
        assert!(!response.granted);
        assert_eq!(serde_json::to_value(&response).unwrap()["decision"], "key_lost");
    }
}

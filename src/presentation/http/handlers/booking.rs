//! Booking and Guest Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    AddGuestsRequest, CreateBookingRequest, GuestRequest, InvoiceDetailRequest,
    UpdateBookingStatusRequest,
};
use crate::application::dto::response::{BookingDetailResponse, BookingResponse, GuestResponse};
use crate::application::services::{
    BookingService, BookingServiceImpl, CreateBookingDto, GuestDto,
};
use crate::domain::InvoiceDetail;
use crate::infrastructure::repositories::{
    PgBookingRepository, PgHotelRepository, PgRoomRepository, PgServiceItemRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, parse_ids, validate_body};
use crate::startup::AppState;

type Service = BookingServiceImpl<
    PgBookingRepository,
    PgRoomRepository,
    PgServiceItemRepository,
    PgHotelRepository,
>;

fn booking_service(state: &AppState) -> Service {
    BookingServiceImpl::new(
        Arc::new(PgBookingRepository::new(state.db.clone())),
        Arc::new(PgRoomRepository::new(state.db.clone())),
        Arc::new(PgServiceItemRepository::new(state.db.clone())),
        Arc::new(PgHotelRepository::new(state.db.clone())),
        state.notifier.clone(),
        state.catalog_cache.clone(),
        state.snowflake.clone(),
    )
}

impl From<GuestRequest> for GuestDto {
    fn from(guest: GuestRequest) -> Self {
        Self {
            name: guest.name,
            id_number: guest.id_number,
            date_of_birth: guest.date_of_birth,
        }
    }
}

impl InvoiceDetailRequest {
    fn into_detail(self) -> InvoiceDetail {
        InvoiceDetail {
            customer_type: self.customer_type,
            full_name: self.full_name,
            email: self.email,
            company_name: self.company_name,
            tax_number: self.tax_number,
            country: self.country,
            city: self.city,
            postal_code: self.postal_code,
            address_line: self.address_line,
            note: self.note,
            // Set by the service once the booking id exists
            ..InvoiceDetail::default()
        }
    }
}

/// Book rooms (and optional services) of one hotel
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingDetailResponse>), AppError> {
    validate_body(&body)?;

    let request = CreateBookingDto {
        start_date: body.start_date,
        end_date: body.end_date,
        room_ids: parse_ids(&body.room_ids, "room ID")?,
        service_ids: parse_ids(&body.service_ids, "service ID")?,
        guests: body.guests.into_iter().map(Into::into).collect(),
        invoice_detail: body.invoice_detail.map(InvoiceDetailRequest::into_detail),
    };

    let detail = booking_service(&state)
        .create_booking(auth.actor(), request)
        .await?;

    Ok((StatusCode::CREATED, Json(detail.into())))
}

/// Bookings made by the caller
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = booking_service(&state).my_bookings(auth.actor()).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(booking_id): Path<String>,
) -> Result<Json<BookingDetailResponse>, AppError> {
    let booking_id = parse_id(&booking_id, "booking ID")?;
    let detail = booking_service(&state)
        .get_booking(auth.actor(), booking_id)
        .await?;
    Ok(Json(detail.into()))
}

/// Bookings of a hotel, for its owner
pub async fn hotel_bookings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(hotel_id): Path<String>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let hotel_id = parse_id(&hotel_id, "hotel ID")?;
    let bookings = booking_service(&state)
        .hotel_bookings(auth.actor(), hotel_id)
        .await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(booking_id): Path<String>,
    Json(body): Json<UpdateBookingStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking_id = parse_id(&booking_id, "booking ID")?;
    let outcome = booking_service(&state)
        .update_status(auth.actor(), booking_id, body.status)
        .await?;
    Ok(Json(outcome.booking.into()))
}

pub async fn delete_booking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(booking_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let booking_id = parse_id(&booking_id, "booking ID")?;
    booking_service(&state)
        .delete_booking(auth.actor(), booking_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Guests
// ---------------------------------------------------------------------------

pub async fn list_guests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(booking_id): Path<String>,
) -> Result<Json<Vec<GuestResponse>>, AppError> {
    let booking_id = parse_id(&booking_id, "booking ID")?;
    let guests = booking_service(&state)
        .list_guests(auth.actor(), booking_id)
        .await?;
    Ok(Json(guests.into_iter().map(Into::into).collect()))
}

pub async fn add_guests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(booking_id): Path<String>,
    Json(body): Json<AddGuestsRequest>,
) -> Result<(StatusCode, Json<Vec<GuestResponse>>), AppError> {
    validate_body(&body)?;
    let booking_id = parse_id(&booking_id, "booking ID")?;

    let guests = booking_service(&state)
        .add_guests(
            auth.actor(),
            booking_id,
            body.guests.into_iter().map(Into::into).collect(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(guests.into_iter().map(Into::into).collect()),
    ))
}

pub async fn update_guest(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(guest_id): Path<String>,
    Json(body): Json<GuestRequest>,
) -> Result<Json<GuestResponse>, AppError> {
    validate_body(&body)?;
    let guest_id = parse_id(&guest_id, "guest ID")?;
    let guest = booking_service(&state)
        .update_guest(auth.actor(), guest_id, body.into())
        .await?;
    Ok(Json(guest.into()))
}

pub async fn delete_guest(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(guest_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let guest_id = parse_id(&guest_id, "guest ID")?;
    booking_service(&state)
        .delete_guest(auth.actor(), guest_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

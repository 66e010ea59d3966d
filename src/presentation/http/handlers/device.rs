//! Device Handlers
//!
//! The terminal API (authenticated by device token) and super-admin device
//! management.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    AccessRequest, CheckInByTokenRequest, CheckInUpdateRequest, CreateDeviceRequest,
    UpdateDeviceRequest,
};
use crate::application::dto::response::{
    AccessResponse, BookingResponse, DeviceResponse, DeviceSyncResponse, IssuedDeviceResponse,
};
use crate::application::services::{
    CheckInUpdate, DeviceService, DeviceServiceImpl, UpdateDeviceDto,
};
use crate::domain::Device;
use crate::infrastructure::repositories::{
    PgBookingRepository, PgDeviceRepository, PgHotelRepository, PgRfidRepository,
    PgRoomRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, validate_body};
use crate::startup::AppState;

type Service = DeviceServiceImpl<
    PgDeviceRepository,
    PgBookingRepository,
    PgRoomRepository,
    PgRfidRepository,
    PgHotelRepository,
>;

pub(crate) fn device_service(state: &AppState) -> Service {
    DeviceServiceImpl::new(
        Arc::new(PgDeviceRepository::new(state.db.clone())),
        Arc::new(PgBookingRepository::new(state.db.clone())),
        Arc::new(PgRoomRepository::new(state.db.clone())),
        Arc::new(PgRfidRepository::new(state.db.clone())),
        Arc::new(PgHotelRepository::new(state.db.clone())),
        state.notifier.clone(),
        state.catalog_cache.clone(),
        state.snowflake.clone(),
    )
}

// ---------------------------------------------------------------------------
// Terminal API
// ---------------------------------------------------------------------------

/// Confirmed and active bookings of the device's hotel, with its rooms
pub async fn sync(
    State(state): State<AppState>,
    Extension(device): Extension<Device>,
) -> Result<Json<DeviceSyncResponse>, AppError> {
    let sync = device_service(&state).sync(&device).await?;
    Ok(Json(sync.into()))
}

/// Record check-in or check-out reported by the terminal
pub async fn update_check_in(
    State(state): State<AppState>,
    Extension(device): Extension<Device>,
    Path(booking_id): Path<String>,
    Json(body): Json<CheckInUpdateRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking_id = parse_id(&booking_id, "booking ID")?;

    let update = CheckInUpdate {
        status: body.check_in_status,
        check_in_time: body.check_in_time,
        check_out_time: body.check_out_time,
    };
    let booking = device_service(&state)
        .update_check_in(&device, booking_id, update)
        .await?;

    Ok(Json(booking.into()))
}

/// Check in by the code from the booking confirmation
pub async fn check_in_by_token(
    State(state): State<AppState>,
    Extension(device): Extension<Device>,
    Json(body): Json<CheckInByTokenRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    validate_body(&body)?;
    let booking = device_service(&state)
        .check_in_by_token(&device, body.token.trim())
        .await?;
    Ok(Json(booking.into()))
}

/// Door decision for a presented card
pub async fn access(
    State(state): State<AppState>,
    Extension(device): Extension<Device>,
    Json(body): Json<AccessRequest>,
) -> Result<Json<AccessResponse>, AppError> {
    validate_body(&body)?;
    let room_id = parse_id(&body.room_id, "room ID")?;
    let check = device_service(&state)
        .access(&device, &body.uid, room_id)
        .await?;
    Ok(Json(check.into()))
}

// ---------------------------------------------------------------------------
// Super admin device management
// ---------------------------------------------------------------------------

pub async fn list_devices(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<DeviceResponse>>, AppError> {
    let devices = device_service(&state).list_devices(auth.actor()).await?;
    Ok(Json(devices.into_iter().map(Into::into).collect()))
}

/// Register a terminal; the token is only returned here
pub async fn create_device(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<IssuedDeviceResponse>), AppError> {
    validate_body(&body)?;
    let hotel_id = parse_id(&body.hotel_id, "hotel ID")?;
    let issued = device_service(&state)
        .create_device(auth.actor(), hotel_id, body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(issued.into())))
}

pub async fn update_device(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(device_id): Path<String>,
    Json(body): Json<UpdateDeviceRequest>,
) -> Result<Json<DeviceResponse>, AppError> {
    validate_body(&body)?;
    let device_id = parse_id(&device_id, "device ID")?;
    let update = UpdateDeviceDto {
        name: body.name,
        is_active: body.is_active,
    };
    let device = device_service(&state)
        .update_device(auth.actor(), device_id, update)
        .await?;
    Ok(Json(device.into()))
}

pub async fn delete_device(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(device_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let device_id = parse_id(&device_id, "device ID")?;
    device_service(&state)
        .delete_device(auth.actor(), device_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn regenerate_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(device_id): Path<String>,
) -> Result<Json<IssuedDeviceResponse>, AppError> {
    let device_id = parse_id(&device_id, "device ID")?;
    let issued = device_service(&state)
        .regenerate_token(auth.actor(), device_id)
        .await?;
    Ok(Json(issued.into()))
}

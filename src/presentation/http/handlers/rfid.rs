//! RFID Key Handlers
//!
//! Key inventory and date-windowed room assignments for hotel admins.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    AssignKeyRequest, AssignRoomRequest, AssignmentsQuery, CalendarParams, CreateKeyRequest,
    HotelScopeQuery, KeyListQuery, ReleaseKeyRequest, UpdateKeyRequest,
};
use crate::application::dto::response::{
    AssignmentResponse, CalendarEntryResponse, EligibleBookingResponse, KeyResponse,
    KeyViewResponse,
};
use crate::application::services::{
    AssignRoomsDto, CalendarQuery, CreateKeyDto, KeyQuery, RfidService, RfidServiceImpl,
    UpdateKeyDto,
};
use crate::infrastructure::repositories::{
    PgBookingRepository, PgHotelRepository, PgRfidRepository, PgUserRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, parse_ids, validate_body};
use crate::startup::AppState;

type Service =
    RfidServiceImpl<PgRfidRepository, PgBookingRepository, PgHotelRepository, PgUserRepository>;

pub(crate) fn rfid_service(state: &AppState) -> Service {
    RfidServiceImpl::new(
        Arc::new(PgRfidRepository::new(state.db.clone())),
        Arc::new(PgBookingRepository::new(state.db.clone())),
        Arc::new(PgHotelRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        state.notifier.clone(),
        state.snowflake.clone(),
    )
}

fn optional_id(value: Option<&str>, field: &str) -> Result<Option<i64>, AppError> {
    value.map(|v| parse_id(v, field)).transpose()
}

pub(crate) fn key_query(query: KeyListQuery) -> Result<KeyQuery, AppError> {
    Ok(KeyQuery {
        hotel_id: optional_id(query.hotel_id.as_deref(), "hotel ID")?,
        status: query.status,
        search: query.search,
    })
}

/// Keys of the hotel with their state today
pub async fn list_keys(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<KeyListQuery>,
) -> Result<Json<Vec<KeyViewResponse>>, AppError> {
    let keys = rfid_service(&state)
        .list_keys(auth.actor(), key_query(query)?)
        .await?;
    Ok(Json(keys.into_iter().map(Into::into).collect()))
}

pub async fn create_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateKeyRequest>,
) -> Result<(StatusCode, Json<KeyResponse>), AppError> {
    validate_body(&body)?;

    let request = CreateKeyDto {
        hotel_id: optional_id(body.hotel_id.as_deref(), "hotel ID")?,
        uid: body.uid,
        label: body.label,
    };
    let key = rfid_service(&state).create_key(auth.actor(), request).await?;

    Ok((StatusCode::CREATED, Json(key.into())))
}

pub async fn update_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(key_id): Path<String>,
    Json(body): Json<UpdateKeyRequest>,
) -> Result<Json<KeyResponse>, AppError> {
    validate_body(&body)?;
    let key_id = parse_id(&key_id, "key ID")?;

    let update = UpdateKeyDto {
        uid: body.uid,
        label: body.label,
        status: body.status,
    };
    let key = rfid_service(&state)
        .update_key(auth.actor(), key_id, update)
        .await?;

    Ok(Json(key.into()))
}

pub async fn delete_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(key_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let key_id = parse_id(&key_id, "key ID")?;
    rfid_service(&state).delete_key(auth.actor(), key_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reserve the key for one room of a booking, for the length of the stay
pub async fn assign_to_booking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(key_id): Path<String>,
    Json(body): Json<AssignKeyRequest>,
) -> Result<(StatusCode, Json<AssignmentResponse>), AppError> {
    let key_id = parse_id(&key_id, "key ID")?;
    let booking_id = parse_id(&body.booking_id, "booking ID")?;
    let room_id = parse_id(&body.room_id, "room ID")?;

    let assignment = rfid_service(&state)
        .assign_to_booking(auth.actor(), key_id, booking_id, room_id)
        .await?;

    Ok((StatusCode::CREATED, Json(assignment.into())))
}

/// Reserve the key for rooms without a booking
pub async fn assign_to_rooms(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(key_id): Path<String>,
    Json(body): Json<AssignRoomRequest>,
) -> Result<(StatusCode, Json<Vec<AssignmentResponse>>), AppError> {
    validate_body(&body)?;
    let key_id = parse_id(&key_id, "key ID")?;

    let request = AssignRoomsDto {
        room_ids: parse_ids(&body.room_ids, "room ID")?,
        start_date: body.start_date,
        end_date: body.end_date,
        lifetime: body.lifetime,
    };
    let assignments = rfid_service(&state)
        .assign_to_rooms(auth.actor(), key_id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(assignments.into_iter().map(Into::into).collect()),
    ))
}

/// Release one assignment, or every unreleased one when the body names none
pub async fn release(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(key_id): Path<String>,
    body: Option<Json<ReleaseKeyRequest>>,
) -> Result<Json<Vec<AssignmentResponse>>, AppError> {
    let key_id = parse_id(&key_id, "key ID")?;
    let Json(body) = body.unwrap_or_default();
    let assignment_id = optional_id(body.assignment_id.as_deref(), "assignment ID")?;

    let released = rfid_service(&state)
        .release(auth.actor(), key_id, assignment_id)
        .await?;

    Ok(Json(released.into_iter().map(Into::into).collect()))
}

pub async fn key_assignments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(key_id): Path<String>,
    Query(query): Query<AssignmentsQuery>,
) -> Result<Json<Vec<AssignmentResponse>>, AppError> {
    let key_id = parse_id(&key_id, "key ID")?;
    let assignments = rfid_service(&state)
        .key_assignments(auth.actor(), key_id, query.include_released)
        .await?;
    Ok(Json(assignments.into_iter().map(Into::into).collect()))
}

/// Assignments intersecting `[from, to)`, released ones included
pub async fn calendar(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<CalendarParams>,
) -> Result<Json<Vec<CalendarEntryResponse>>, AppError> {
    let query = CalendarQuery {
        hotel_id: optional_id(params.hotel_id.as_deref(), "hotel ID")?,
        from: params.from,
        to: params.to,
        key_id: optional_id(params.key_id.as_deref(), "key ID")?,
    };
    let entries = rfid_service(&state).calendar(auth.actor(), query).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// Confirmed and active bookings that can receive keys
pub async fn eligible_bookings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<HotelScopeQuery>,
) -> Result<Json<Vec<EligibleBookingResponse>>, AppError> {
    let hotel_id = optional_id(query.hotel_id.as_deref(), "hotel ID")?;
    let bookings = rfid_service(&state)
        .eligible_bookings(auth.actor(), hotel_id)
        .await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

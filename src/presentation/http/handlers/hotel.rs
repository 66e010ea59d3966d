//! Hotel, Room and Service Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    CreateRoomRequest, CreateServiceRequest, HotelListQuery, UpdateHotelRequest,
    UpdateRoomRequest, UpdateServiceRequest,
};
use crate::application::dto::response::{
    HotelDetailResponse, HotelResponse, RoomResponse, ServiceResponse,
};
use crate::application::services::{
    CreateRoomDto, CreateServiceDto, HotelService, HotelServiceImpl, UpdateHotelDto,
    UpdateRoomDto, UpdateServiceDto,
};
use crate::infrastructure::repositories::{
    PgHotelRepository, PgRoomRepository, PgServiceItemRepository, PgTagRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, validate_body};
use crate::startup::AppState;

type Service =
    HotelServiceImpl<PgHotelRepository, PgRoomRepository, PgServiceItemRepository, PgTagRepository>;

fn hotel_service(state: &AppState) -> Service {
    HotelServiceImpl::new(
        Arc::new(PgHotelRepository::new(state.db.clone())),
        Arc::new(PgRoomRepository::new(state.db.clone())),
        Arc::new(PgServiceItemRepository::new(state.db.clone())),
        Arc::new(PgTagRepository::new(state.db.clone())),
        state.catalog_cache.clone(),
        state.snowflake.clone(),
    )
}

// ---------------------------------------------------------------------------
// Hotels
// ---------------------------------------------------------------------------

/// List hotels, optionally filtered by location
pub async fn list_hotels(
    State(state): State<AppState>,
    Query(query): Query<HotelListQuery>,
) -> Result<Json<Vec<HotelResponse>>, AppError> {
    let hotels = hotel_service(&state).list_hotels(query.location).await?;
    Ok(Json(hotels.into_iter().map(Into::into).collect()))
}

/// Public hotel page with rooms, services and tags
pub async fn get_hotel(
    State(state): State<AppState>,
    Path(hotel_id): Path<String>,
) -> Result<Json<HotelDetailResponse>, AppError> {
    let hotel_id = parse_id(&hotel_id, "hotel ID")?;
    let detail = hotel_service(&state).get_hotel(hotel_id).await?;
    Ok(Json(detail.into()))
}

/// The calling hotel admin's own hotel
pub async fn my_hotel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<HotelDetailResponse>, AppError> {
    let detail = hotel_service(&state).my_hotel(auth.actor()).await?;
    Ok(Json(detail.into()))
}

pub async fn update_hotel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(hotel_id): Path<String>,
    Json(body): Json<UpdateHotelRequest>,
) -> Result<Json<HotelResponse>, AppError> {
    validate_body(&body)?;
    let hotel_id = parse_id(&hotel_id, "hotel ID")?;

    let update = UpdateHotelDto {
        name: body.name,
        location: body.location,
        description: body.description,
        hotel_type: body.hotel_type,
        star_rating: body.star_rating,
        cover_image: body.cover_image,
    };
    let hotel = hotel_service(&state)
        .update_hotel(auth.actor(), hotel_id, update)
        .await?;

    Ok(Json(hotel.into()))
}

pub async fn delete_hotel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(hotel_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let hotel_id = parse_id(&hotel_id, "hotel ID")?;
    hotel_service(&state).delete_hotel(auth.actor(), hotel_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

pub async fn list_rooms(
    State(state): State<AppState>,
    Path(hotel_id): Path<String>,
) -> Result<Json<Vec<RoomResponse>>, AppError> {
    let hotel_id = parse_id(&hotel_id, "hotel ID")?;
    let rooms = hotel_service(&state).list_rooms(hotel_id).await?;
    Ok(Json(rooms.into_iter().map(Into::into).collect()))
}

pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomResponse>, AppError> {
    let room_id = parse_id(&room_id, "room ID")?;
    let room = hotel_service(&state).get_room(room_id).await?;
    Ok(Json(room.into()))
}

pub async fn create_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(hotel_id): Path<String>,
    Json(body): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), AppError> {
    validate_body(&body)?;
    let hotel_id = parse_id(&hotel_id, "hotel ID")?;

    let request = CreateRoomDto {
        name: body.name,
        description: body.description,
        price_per_night: body.price_per_night,
        base_price: body.base_price,
        capacity: body.capacity,
    };
    let room = hotel_service(&state)
        .create_room(auth.actor(), hotel_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(room.into())))
}

pub async fn update_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(room_id): Path<String>,
    Json(body): Json<UpdateRoomRequest>,
) -> Result<Json<RoomResponse>, AppError> {
    validate_body(&body)?;
    let room_id = parse_id(&room_id, "room ID")?;

    let update = UpdateRoomDto {
        name: body.name,
        description: body.description,
        price_per_night: body.price_per_night,
        base_price: body.base_price,
        capacity: body.capacity,
    };
    let room = hotel_service(&state)
        .update_room(auth.actor(), room_id, update)
        .await?;

    Ok(Json(room.into()))
}

pub async fn delete_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(room_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let room_id = parse_id(&room_id, "room ID")?;
    hotel_service(&state).delete_room(auth.actor(), room_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

pub async fn list_services(
    State(state): State<AppState>,
    Path(hotel_id): Path<String>,
) -> Result<Json<Vec<ServiceResponse>>, AppError> {
    let hotel_id = parse_id(&hotel_id, "hotel ID")?;
    let services = hotel_service(&state).list_services(hotel_id).await?;
    Ok(Json(services.into_iter().map(Into::into).collect()))
}

pub async fn get_service(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
) -> Result<Json<ServiceResponse>, AppError> {
    let service_id = parse_id(&service_id, "service ID")?;
    let service = hotel_service(&state).get_service(service_id).await?;
    Ok(Json(service.into()))
}

pub async fn create_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(hotel_id): Path<String>,
    Json(body): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ServiceResponse>), AppError> {
    validate_body(&body)?;
    let hotel_id = parse_id(&hotel_id, "hotel ID")?;

    let request = CreateServiceDto {
        name: body.name,
        description: body.description,
        price: body.price,
    };
    let service = hotel_service(&state)
        .create_service(auth.actor(), hotel_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(service.into())))
}

pub async fn update_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(service_id): Path<String>,
    Json(body): Json<UpdateServiceRequest>,
) -> Result<Json<ServiceResponse>, AppError> {
    validate_body(&body)?;
    let service_id = parse_id(&service_id, "service ID")?;

    let update = UpdateServiceDto {
        name: body.name,
        description: body.description,
        price: body.price,
    };
    let service = hotel_service(&state)
        .update_service(auth.actor(), service_id, update)
        .await?;

    Ok(Json(service.into()))
}

pub async fn delete_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(service_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let service_id = parse_id(&service_id, "service ID")?;
    hotel_service(&state)
        .delete_service(auth.actor(), service_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
